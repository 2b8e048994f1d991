//! Exclusive tile claims shared by every actor in the world.

use std::collections::BTreeMap;

use gridwalk_core::{ActorId, ReservationView, Tile};
use thiserror::Error;

/// Reasons an explicit release is refused.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ReleaseError {
    /// Nobody holds the tile.
    #[error("tile {tile:?} is not reserved")]
    NotReserved {
        /// Tile named in the release.
        tile: Tile,
    },
    /// The tile belongs to a different actor.
    #[error("tile {tile:?} is held by actor {holder:?}, not {requester:?}")]
    NotHolder {
        /// Tile named in the release.
        tile: Tile,
        /// Actor that holds the tile.
        holder: ActorId,
        /// Actor that attempted the release.
        requester: ActorId,
    },
}

/// Two-way index of reserved tiles and their holders.
///
/// Both maps are updated together so that a tile has at most one holder and
/// an actor holds at most one tile.
#[derive(Clone, Debug, Default)]
pub struct ReservationTable {
    holders: BTreeMap<Tile, ActorId>,
    held: BTreeMap<ActorId, Tile>,
}

impl ReservationTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `tile` for `actor`.
    ///
    /// Succeeds without change when the actor already holds the tile. Fails
    /// without touching the table when another actor holds it. Otherwise the
    /// actor's previous tile is released before the new claim is recorded.
    pub fn reserve(&mut self, actor: ActorId, tile: Tile) -> bool {
        match self.holders.get(&tile) {
            Some(holder) if *holder == actor => return true,
            Some(_) => return false,
            None => {}
        }

        let _ = self.release(actor);
        let _ = self.holders.insert(tile, actor);
        let _ = self.held.insert(actor, tile);
        true
    }

    /// Releases whatever tile the actor holds.
    pub fn release(&mut self, actor: ActorId) -> Option<Tile> {
        let tile = self.held.remove(&actor)?;
        let _ = self.holders.remove(&tile);
        Some(tile)
    }

    /// Releases `tile` on behalf of `actor`, refusing if the actor is not its holder.
    pub fn release_tile(&mut self, actor: ActorId, tile: Tile) -> Result<(), ReleaseError> {
        match self.holders.get(&tile) {
            None => Err(ReleaseError::NotReserved { tile }),
            Some(holder) if *holder != actor => Err(ReleaseError::NotHolder {
                tile,
                holder: *holder,
                requester: actor,
            }),
            Some(_) => {
                let _ = self.release(actor);
                Ok(())
            }
        }
    }

    /// Actor holding the tile, if any.
    #[must_use]
    pub fn holder(&self, tile: Tile) -> Option<ActorId> {
        self.holders.get(&tile).copied()
    }

    /// Tile held by the actor, if any.
    #[must_use]
    pub fn held_by(&self, actor: ActorId) -> Option<Tile> {
        self.held.get(&actor).copied()
    }

    /// Reports whether any actor holds the tile.
    #[must_use]
    pub fn is_reserved(&self, tile: Tile) -> bool {
        self.holders.contains_key(&tile)
    }

    /// Number of reserved tiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.holders.len()
    }

    /// Reports whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.holders.is_empty()
    }

    /// Removes every reservation.
    pub fn clear(&mut self) {
        self.holders.clear();
        self.held.clear();
    }

    /// Evicts reservations whose holder fails `is_alive`, returning them in actor order.
    pub fn sweep<F>(&mut self, mut is_alive: F) -> Vec<(ActorId, Tile)>
    where
        F: FnMut(ActorId) -> bool,
    {
        let leaked: Vec<(ActorId, Tile)> = self
            .held
            .iter()
            .filter(|(actor, _)| !is_alive(**actor))
            .map(|(actor, tile)| (*actor, *tile))
            .collect();
        for (actor, _) in &leaked {
            let _ = self.release(*actor);
        }
        leaked
    }

    /// Read-only view for systems.
    #[must_use]
    pub fn view(&self) -> ReservationView<'_> {
        ReservationView::new(&self.holders)
    }
}
