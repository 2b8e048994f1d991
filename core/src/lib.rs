#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Gridwalk engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! snapshots through [`ActorView`], [`ReservationView`] and the [`WorldQuery`]
//! trait, and respond exclusively with new command batches.

use std::{collections::BTreeMap, time::Duration};

use bitflags::bitflags;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Configures the mapping between world positions and grid tiles.
    ConfigureGrid {
        /// Edge length of a square tile measured in world units.
        tile_size: f32,
        /// World-space offset of the tile lattice origin.
        offset: Vec3,
    },
    /// Replaces the tuning that governs interpolated motion.
    ConfigureMotion {
        /// New motion tuning.
        config: MotionConfig,
    },
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Places a static block into the scene.
    PlaceBlock {
        /// Tile the block stands on.
        tile: Tile,
        /// Height level of the block.
        level: i32,
        /// Behaviour of the block.
        kind: BlockKind,
    },
    /// Requests that a new actor enter the world.
    SpawnActor {
        /// Construction-time description of the actor.
        spec: ActorSpec,
    },
    /// Removes an actor from the world and releases its reservation.
    DespawnActor {
        /// Identifier of the actor to remove.
        actor: ActorId,
    },
    /// Asks the world to commit the actor to the first admissible candidate tile.
    ///
    /// Candidates are tried in order. A candidate is admissible when it is not
    /// occupied, not reserved, can be reserved, and is still unoccupied after
    /// the reservation was taken.
    RequestMove {
        /// Identifier of the actor attempting to move.
        actor: ActorId,
        /// Destination tiles in order of preference.
        candidates: Vec<Tile>,
        /// What to do when no candidate is admissible.
        fallback: MoveFallback,
    },
    /// Applies damage to an actor.
    DealDamage {
        /// Actor receiving the damage.
        target: ActorId,
        /// Amount of health removed.
        amount: u32,
    },
    /// Restores health to an actor, capped at its maximum.
    Heal {
        /// Actor receiving the healing.
        target: ActorId,
        /// Amount of health restored.
        amount: u32,
    },
    /// Spends mana; refused without change when the pool holds less.
    UseMana {
        /// Actor paying the cost.
        actor: ActorId,
        /// Mana required.
        amount: u32,
    },
    /// Refills mana, capped at the actor's maximum.
    RestoreMana {
        /// Actor receiving the mana.
        actor: ActorId,
        /// Mana restored.
        amount: u32,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms a new grid mapping.
    GridConfigured {
        /// Edge length of a tile in world units.
        tile_size: f32,
        /// World-space offset of the lattice origin.
        offset: Vec3,
    },
    /// Reports that a grid configuration was rejected and the previous one kept.
    GridRejected {
        /// Reason the configuration was invalid.
        reason: GridError,
    },
    /// Confirms that a block was added to the scene.
    BlockPlaced {
        /// Tile the block stands on.
        tile: Tile,
        /// Height level of the block.
        level: i32,
        /// Behaviour of the block.
        kind: BlockKind,
    },
    /// Confirms that an actor entered the world.
    ActorSpawned {
        /// Identifier assigned to the actor.
        actor: ActorId,
        /// Kind of the actor.
        kind: ActorKind,
        /// Tile the actor stands on.
        tile: Tile,
        /// Indicates whether the spawn tile could be reserved.
        reserved: bool,
    },
    /// Confirms that an actor left the world.
    ActorDespawned {
        /// Identifier of the removed actor.
        actor: ActorId,
        /// Reservation released by the removal, if any.
        released: Option<Tile>,
    },
    /// Announces that an actor committed to a move and began its transit.
    MoveCommitted {
        /// Identifier of the moving actor.
        actor: ActorId,
        /// Tile the actor departed from.
        from: Tile,
        /// Tile the actor reserved and travels to.
        to: Tile,
        /// Indicates whether the move climbs an elevator.
        elevated: bool,
    },
    /// Reports that a move request could not be honoured.
    MoveRejected {
        /// Identifier of the actor that stays in place.
        actor: ActorId,
        /// Reason the request failed.
        reason: MoveRejection,
    },
    /// One-way notification of the direction an actor faces.
    FacingChanged {
        /// Identifier of the actor.
        actor: ActorId,
        /// New facing direction.
        direction: Direction,
    },
    /// Confirms that an actor completed a transit and stands on a tile.
    ActorSettled {
        /// Identifier of the actor.
        actor: ActorId,
        /// Tile the actor stands on.
        tile: Tile,
        /// Height level the actor stands in.
        level: i32,
    },
    /// Reports that a transit was aborted and the actor restored.
    MoveRolledBack {
        /// Identifier of the actor.
        actor: ActorId,
        /// Tile whose reservation was re-asserted.
        tile: Tile,
        /// Exact position the actor was restored to.
        position: Vec3,
    },
    /// Announces that an actor lost support and started falling.
    FallStarted {
        /// Identifier of the actor.
        actor: ActorId,
        /// Level the actor fell from.
        from_level: i32,
    },
    /// Announces that a falling actor found support again.
    FallEnded {
        /// Identifier of the actor.
        actor: ActorId,
        /// Tile the actor landed on.
        tile: Tile,
        /// Level the actor landed in.
        level: i32,
    },
    /// Reports the degraded jitter applied when an actor could not separate.
    ActorNudged {
        /// Identifier of the actor.
        actor: ActorId,
        /// Position after the nudge.
        position: Vec3,
    },
    /// Confirms that damage was applied.
    ActorDamaged {
        /// Identifier of the damaged actor.
        actor: ActorId,
        /// Amount of health removed.
        amount: u32,
        /// Health left after the damage.
        remaining: u32,
    },
    /// Confirms that healing was applied.
    ActorHealed {
        /// Identifier of the healed actor.
        actor: ActorId,
        /// Amount of health restored after capping.
        amount: u32,
        /// Health after healing.
        health: u32,
    },
    /// Confirms that mana was spent.
    ManaSpent {
        /// Identifier of the caster.
        actor: ActorId,
        /// Mana removed from the pool.
        amount: u32,
        /// Mana left afterwards.
        remaining: u32,
    },
    /// Reports a mana payment the pool could not cover.
    ManaInsufficient {
        /// Identifier of the caster.
        actor: ActorId,
        /// Mana that was asked for.
        requested: u32,
        /// Mana in the pool.
        available: u32,
    },
    /// Confirms that mana was restored.
    ManaRestored {
        /// Identifier of the actor.
        actor: ActorId,
        /// Mana added after capping.
        amount: u32,
        /// Mana after restoring.
        mana: u32,
    },
    /// Announces that an actor's health reached zero.
    ///
    /// Monsters are despawned right after; the player stays in the world.
    ActorDied {
        /// Identifier of the actor.
        actor: ActorId,
        /// Kind of the actor.
        kind: ActorKind,
    },
    /// Reports a reservation held by an actor that no longer exists.
    ReservationLeaked {
        /// Identifier recorded as holder.
        actor: ActorId,
        /// Tile that was evicted from the table.
        tile: Tile,
    },
}

/// Reasons a grid configuration is refused.
#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum GridError {
    /// The tile size was zero, negative, or not finite.
    #[error("tile size must be finite and positive, got {0}")]
    InvalidTileSize(f32),
    /// The lattice offset contained a non-finite component.
    #[error("grid offset must be finite")]
    NonFiniteOffset,
}

/// Reasons a move request is refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveRejection {
    /// The actor is already in transit.
    Busy,
    /// The actor is falling and cannot move laterally.
    Falling,
    /// The request carried no candidate tiles.
    NoCandidates,
    /// Every candidate was occupied, reserved, or lost the double-check.
    Exhausted,
}

/// Behaviour applied when every candidate of a move request is refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MoveFallback {
    /// Remain in place for this tick.
    Stay,
    /// Apply a small random offset as a last resort.
    Jitter,
}

/// Tuning that governs interpolated motion inside the world.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Factor applied to an actor's speed on diagonal moves.
    pub diagonal_speed_multiplier: f32,
    /// Maximum horizontal offset applied by the jitter fallback.
    pub jitter_radius: f32,
    /// Level of an implicit ground plane under every tile, if any.
    pub ground_level: Option<i32>,
    /// Number of tiles a directional probe inspects.
    pub probe_reach: u32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            diagonal_speed_multiplier: 0.75,
            jitter_radius: 0.3,
            ground_level: Some(-1),
            probe_reach: 1,
        }
    }
}

/// Unique identifier assigned to an actor.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ActorId(u32);

impl ActorId {
    /// Creates a new actor identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Distinguishes the player from monsters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorKind {
    /// The player-controlled character.
    Player,
    /// A computer-controlled monster.
    Monster,
}

bitflags! {
    /// Capabilities fixed when an actor is constructed.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ActorFlags: u8 {
        /// Actor descends when nothing supports it.
        const FALLS           = 1 << 0;
        /// Actor climbs elevator blocks while moving.
        const RIDES_ELEVATORS = 1 << 1;
    }
}

impl Default for ActorFlags {
    fn default() -> Self {
        Self::all()
    }
}

/// Construction-time description of an actor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActorSpec {
    /// Kind of actor to create.
    pub kind: ActorKind,
    /// Initial world position.
    pub position: Vec3,
    /// Linear speed in world units per second.
    pub speed: f32,
    /// Maximum and initial health.
    pub max_health: u32,
    /// Maximum and initial mana.
    pub max_mana: u32,
    /// Capability flags.
    pub flags: ActorFlags,
}

impl ActorSpec {
    /// Default player speed in world units per second.
    pub const PLAYER_SPEED: f32 = 5.0;
    /// Default player health.
    pub const PLAYER_HEALTH: u32 = 645;
    /// Default player mana.
    pub const PLAYER_MANA: u32 = 550;
    /// Default monster speed in world units per second.
    pub const MONSTER_SPEED: f32 = 5.0;
    /// Default monster health.
    pub const MONSTER_HEALTH: u32 = 100;

    /// Describes a player with default attributes at the provided position.
    #[must_use]
    pub fn player(position: Vec3) -> Self {
        Self {
            kind: ActorKind::Player,
            position,
            speed: Self::PLAYER_SPEED,
            max_health: Self::PLAYER_HEALTH,
            max_mana: Self::PLAYER_MANA,
            flags: ActorFlags::default(),
        }
    }

    /// Describes a monster with default attributes at the provided position.
    #[must_use]
    pub fn monster(position: Vec3) -> Self {
        Self {
            kind: ActorKind::Monster,
            position,
            speed: Self::MONSTER_SPEED,
            max_health: Self::MONSTER_HEALTH,
            max_mana: 0,
            flags: ActorFlags::default(),
        }
    }

    /// Overrides the speed.
    #[must_use]
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    /// Overrides the maximum health.
    #[must_use]
    pub fn with_health(mut self, max_health: u32) -> Self {
        self.max_health = max_health;
        self
    }

    /// Overrides the maximum mana.
    #[must_use]
    pub fn with_mana(mut self, max_mana: u32) -> Self {
        self.max_mana = max_mana;
        self
    }

    /// Overrides the capability flags.
    #[must_use]
    pub fn with_flags(mut self, flags: ActorFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// Grid directions available to actors, four cardinal and four diagonal.
///
/// East and West run along the x axis, North and South along the z axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Toward increasing x.
    East,
    /// Toward decreasing x.
    West,
    /// Toward increasing z.
    North,
    /// Toward decreasing z.
    South,
    /// Toward increasing x and z.
    NorthEast,
    /// Toward increasing x and decreasing z.
    SouthEast,
    /// Toward decreasing x and increasing z.
    NorthWest,
    /// Toward decreasing x and z.
    SouthWest,
}

impl Direction {
    /// Every direction in canonical enumeration order.
    pub const ALL: [Direction; 8] = [
        Direction::East,
        Direction::West,
        Direction::North,
        Direction::South,
        Direction::NorthEast,
        Direction::SouthEast,
        Direction::NorthWest,
        Direction::SouthWest,
    ];

    /// Column and row offsets of a single step in this direction.
    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::East => (1, 0),
            Self::West => (-1, 0),
            Self::North => (0, 1),
            Self::South => (0, -1),
            Self::NorthEast => (1, 1),
            Self::SouthEast => (1, -1),
            Self::NorthWest => (-1, 1),
            Self::SouthWest => (-1, -1),
        }
    }

    /// Reports whether the direction moves along both axes.
    #[must_use]
    pub const fn is_diagonal(self) -> bool {
        let (column, row) = self.delta();
        column != 0 && row != 0
    }

    /// Resolves the direction whose step matches the signs of the offsets.
    ///
    /// Returns `None` when both offsets are zero.
    #[must_use]
    pub fn from_delta(column: i32, row: i32) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|direction| direction.delta() == (column.signum(), row.signum()))
    }

    /// Direction of the first step from `from` toward `to`, moving on both axes
    /// when both differ.
    #[must_use]
    pub fn toward(from: Tile, to: Tile) -> Option<Self> {
        Self::from_delta(to.column() - from.column(), to.row() - from.row())
    }

    /// Cardinal part of the direction; diagonals keep their north/south half.
    #[must_use]
    pub const fn cardinal(self) -> Self {
        match self {
            Direction::NorthEast | Direction::NorthWest => Direction::North,
            Direction::SouthEast | Direction::SouthWest => Direction::South,
            other => other,
        }
    }
}

/// Discrete cell of the horizontal movement grid.
///
/// Height is deliberately not part of tile identity.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Tile {
    column: i32,
    row: i32,
}

impl Tile {
    /// Creates a tile from its column (x) and row (z) indices.
    #[must_use]
    pub const fn new(column: i32, row: i32) -> Self {
        Self { column, row }
    }

    /// Column index along the x axis.
    #[must_use]
    pub const fn column(&self) -> i32 {
        self.column
    }

    /// Row index along the z axis.
    #[must_use]
    pub const fn row(&self) -> i32 {
        self.row
    }

    /// Tile reached by a single step in `direction`.
    #[must_use]
    pub const fn step(self, direction: Direction) -> Self {
        let (column, row) = direction.delta();
        Self::new(self.column + column, self.row + row)
    }

    /// The eight surrounding tiles in canonical direction order.
    #[must_use]
    pub fn neighbors(self) -> [Tile; 8] {
        Direction::ALL.map(|direction| self.step(direction))
    }

    /// Number of king moves separating two tiles.
    #[must_use]
    pub fn chebyshev_distance(self, other: Tile) -> u32 {
        self.column
            .abs_diff(other.column)
            .max(self.row.abs_diff(other.row))
    }

    /// Reports whether `other` is one of the eight surrounding tiles.
    #[must_use]
    pub fn is_adjacent(self, other: Tile) -> bool {
        self.chebyshev_distance(other) == 1
    }

    /// Straight-line distance between tile indices.
    #[must_use]
    pub fn distance(self, other: Tile) -> f32 {
        let column = (self.column - other.column) as f32;
        let row = (self.row - other.row) as f32;
        column.hypot(row)
    }
}

/// Converts a vertical world coordinate into the level band it belongs to.
#[must_use]
pub fn level_of(height: f32) -> i32 {
    height.round() as i32
}

/// Behaviour of a static scene block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    /// Walls and props; always blocking.
    Scenery,
    /// Walkable floor that supports actors standing above it.
    Ground,
    /// Ramp that supports actors and lifts movers by one level.
    Elevator,
}

impl BlockKind {
    /// Reports whether an actor standing directly above is supported.
    #[must_use]
    pub const fn supports(self) -> bool {
        matches!(self, Self::Ground | Self::Elevator)
    }
}

/// Classification of what a world query found.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Contact {
    /// Nothing of interest.
    Clear,
    /// Blocking scenery.
    Scenery,
    /// Another monster.
    Monster(ActorId),
    /// The player.
    Player(ActorId),
    /// An elevator surface.
    Elevator,
    /// A ground surface.
    Ground,
}

impl Contact {
    /// Reports whether the contact prevents entering the tile.
    #[must_use]
    pub const fn is_blocking(self) -> bool {
        matches!(self, Self::Scenery | Self::Monster(_) | Self::Player(_))
    }

    /// Identifier of the actor behind the contact, if any.
    #[must_use]
    pub const fn actor(self) -> Option<ActorId> {
        match self {
            Self::Monster(actor) | Self::Player(actor) => Some(actor),
            _ => None,
        }
    }
}

/// Phase of an actor's motion state machine as seen from outside the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotionPhase {
    /// Stationary and ready to accept a move.
    Idle,
    /// Interpolating toward a reserved tile.
    Moving,
    /// Stepping down one level at a time.
    Falling,
}

/// Per-frame movement intent produced by the input collaborator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct MovementIntent(Option<Direction>);

impl MovementIntent {
    /// Intent that requests no movement.
    #[must_use]
    pub const fn none() -> Self {
        Self(None)
    }

    /// Intent that requests a step in `direction`.
    #[must_use]
    pub const fn toward(direction: Direction) -> Self {
        Self(Some(direction))
    }

    /// Requested direction, if any.
    #[must_use]
    pub const fn direction(&self) -> Option<Direction> {
        self.0
    }

    /// Reports whether the intent requests movement.
    #[must_use]
    pub const fn is_some(&self) -> bool {
        self.0.is_some()
    }
}

/// Immutable representation of a single actor's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActorSnapshot {
    /// Unique identifier assigned to the actor.
    pub id: ActorId,
    /// Kind of the actor.
    pub kind: ActorKind,
    /// Continuous world position.
    pub position: Vec3,
    /// Tile the position maps to.
    pub tile: Tile,
    /// Level band the actor stands in.
    pub level: i32,
    /// Tile currently reserved by the actor, if any.
    pub reserved: Option<Tile>,
    /// Current motion phase.
    pub phase: MotionPhase,
    /// Direction the actor faces.
    pub facing: Direction,
    /// Linear speed in world units per second.
    pub speed: f32,
    /// Remaining health.
    pub health: u32,
    /// Maximum health.
    pub max_health: u32,
    /// Remaining mana.
    pub mana: u32,
    /// Maximum mana.
    pub max_mana: u32,
    /// Capability flags.
    pub flags: ActorFlags,
}

impl ActorSnapshot {
    /// Reports whether the actor can accept a new move.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.phase == MotionPhase::Idle
    }

    /// Reports whether the actor still has health left.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.health > 0
    }
}

/// Read-only snapshot describing all actors in the world.
#[derive(Clone, Debug, Default)]
pub struct ActorView {
    snapshots: Vec<ActorSnapshot>,
}

impl ActorView {
    /// Creates a new actor view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<ActorSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &ActorSnapshot> {
        self.snapshots.iter()
    }

    /// Snapshot of the actor with the provided identifier.
    #[must_use]
    pub fn get(&self, actor: ActorId) -> Option<&ActorSnapshot> {
        self.snapshots
            .binary_search_by_key(&actor, |snapshot| snapshot.id)
            .ok()
            .map(|index| &self.snapshots[index])
    }

    /// Snapshot of the player with the lowest identifier, if present.
    #[must_use]
    pub fn player(&self) -> Option<&ActorSnapshot> {
        self.snapshots
            .iter()
            .find(|snapshot| snapshot.kind == ActorKind::Player)
    }

    /// Number of captured snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view holds no actors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<ActorSnapshot> {
        self.snapshots
    }
}

/// Read-only view into the tile reservation table.
#[derive(Clone, Copy, Debug)]
pub struct ReservationView<'a> {
    holders: &'a BTreeMap<Tile, ActorId>,
}

impl<'a> ReservationView<'a> {
    /// Captures a view backed by the provided holder map.
    #[must_use]
    pub fn new(holders: &'a BTreeMap<Tile, ActorId>) -> Self {
        Self { holders }
    }

    /// Actor holding the tile, if any.
    #[must_use]
    pub fn holder(&self, tile: Tile) -> Option<ActorId> {
        self.holders.get(&tile).copied()
    }

    /// Reports whether any actor holds the tile.
    #[must_use]
    pub fn is_reserved(&self, tile: Tile) -> bool {
        self.holders.contains_key(&tile)
    }

    /// Reports whether the tile is held by an actor other than `actor`.
    #[must_use]
    pub fn is_reserved_by_other(&self, tile: Tile, actor: ActorId) -> bool {
        self.holder(tile).map_or(false, |holder| holder != actor)
    }

    /// Number of reserved tiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.holders.len()
    }

    /// Reports whether no tile is reserved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.holders.is_empty()
    }

    /// Iterator over reserved tiles and their holders in tile order.
    pub fn iter(&self) -> impl Iterator<Item = (Tile, ActorId)> + 'a {
        self.holders.iter().map(|(tile, actor)| (*tile, *actor))
    }
}

/// Spatial queries the movement arbitrator consumes.
///
/// Implementations answer from physical state only. Reservation bookkeeping
/// is exposed separately through [`ReservationView`].
pub trait WorldQuery {
    /// Tile the world position maps to.
    fn tile_of(&self, position: Vec3) -> Tile;

    /// Reports whether static scenery fills the tile in the given level band.
    fn is_scenery(&self, tile: Tile, level: i32) -> bool;

    /// Reports whether scenery or another actor physically occupies the tile
    /// in the given level band. `ignore` excludes the querying actor.
    fn is_occupied(&self, tile: Tile, level: i32, ignore: Option<ActorId>) -> bool;

    /// Actor truly co-located on the tile and level band, excluding `ignore`.
    fn actor_contact(&self, tile: Tile, level: i32, ignore: Option<ActorId>) -> Contact;

    /// First non-clear contact found stepping from `tile` in `direction`.
    fn probe(&self, tile: Tile, level: i32, direction: Direction, ignore: Option<ActorId>)
        -> Contact;

    /// Reports whether a block, the ground plane or another actor lies
    /// directly below the position.
    fn has_support(&self, position: Vec3) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{de::DeserializeOwned, Serialize};

    #[test]
    fn diagonals_resolve_to_their_vertical_cardinal() {
        assert_eq!(Direction::NorthEast.cardinal(), Direction::North);
        assert_eq!(Direction::SouthWest.cardinal(), Direction::South);
        assert_eq!(Direction::West.cardinal(), Direction::West);
    }

    #[test]
    fn neighbors_follow_canonical_order() {
        let origin = Tile::new(2, -1);
        assert_eq!(
            origin.neighbors(),
            [
                Tile::new(3, -1),
                Tile::new(1, -1),
                Tile::new(2, 0),
                Tile::new(2, -2),
                Tile::new(3, 0),
                Tile::new(3, -2),
                Tile::new(1, 0),
                Tile::new(1, -2),
            ]
        );
        assert!(origin.neighbors().iter().all(|tile| origin.is_adjacent(*tile)));
    }

    #[test]
    fn chebyshev_distance_counts_king_moves() {
        let origin = Tile::new(0, 0);
        assert_eq!(origin.chebyshev_distance(Tile::new(3, -2)), 3);
        assert_eq!(origin.chebyshev_distance(origin), 0);
        assert!(!origin.is_adjacent(origin));
        assert!(!origin.is_adjacent(Tile::new(2, 0)));
    }

    #[test]
    fn toward_uses_offset_signs() {
        let origin = Tile::new(1, 1);
        assert_eq!(
            Direction::toward(origin, Tile::new(5, 1)),
            Some(Direction::East)
        );
        assert_eq!(
            Direction::toward(origin, Tile::new(-3, -7)),
            Some(Direction::SouthWest)
        );
        assert_eq!(Direction::toward(origin, origin), None);
    }

    #[test]
    fn diagonal_directions_are_flagged() {
        let diagonals: Vec<_> = Direction::ALL
            .into_iter()
            .filter(|direction| direction.is_diagonal())
            .collect();
        assert_eq!(
            diagonals,
            vec![
                Direction::NorthEast,
                Direction::SouthEast,
                Direction::NorthWest,
                Direction::SouthWest
            ]
        );
    }

    #[test]
    fn level_rounds_to_nearest_band() {
        assert_eq!(level_of(0.0), 0);
        assert_eq!(level_of(0.49), 0);
        assert_eq!(level_of(1.6), 2);
        assert_eq!(level_of(-0.6), -1);
    }

    #[test]
    fn actor_view_sorts_and_finds_player() {
        let monster = snapshot(ActorId::new(4), ActorKind::Monster);
        let player = snapshot(ActorId::new(2), ActorKind::Player);
        let view = ActorView::from_snapshots(vec![monster, player]);

        let ids: Vec<_> = view.iter().map(|snapshot| snapshot.id.get()).collect();
        assert_eq!(ids, vec![2, 4]);
        assert_eq!(view.player().map(|snapshot| snapshot.id), Some(ActorId::new(2)));
        assert_eq!(view.get(ActorId::new(4)).map(|s| s.kind), Some(ActorKind::Monster));
        assert!(view.get(ActorId::new(9)).is_none());
    }

    #[test]
    fn reservation_view_distinguishes_holders() {
        let mut holders = BTreeMap::new();
        let _ = holders.insert(Tile::new(1, 1), ActorId::new(7));
        let view = ReservationView::new(&holders);

        assert!(view.is_reserved(Tile::new(1, 1)));
        assert!(!view.is_reserved_by_other(Tile::new(1, 1), ActorId::new(7)));
        assert!(view.is_reserved_by_other(Tile::new(1, 1), ActorId::new(8)));
        assert!(!view.is_reserved(Tile::new(0, 0)));
    }

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn scenario_values_round_trip_through_bincode() {
        assert_round_trip(&Tile::new(-4, 9));
        assert_round_trip(&ActorFlags::FALLS);
        assert_round_trip(&MotionConfig::default());
    }

    fn snapshot(id: ActorId, kind: ActorKind) -> ActorSnapshot {
        ActorSnapshot {
            id,
            kind,
            position: Vec3::ZERO,
            tile: Tile::default(),
            level: 0,
            reserved: None,
            phase: MotionPhase::Idle,
            facing: Direction::South,
            speed: 1.0,
            health: 1,
            max_health: 1,
            mana: 0,
            max_mana: 0,
            flags: ActorFlags::default(),
        }
    }
}
