#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic movement system that decides where actors try to step.
//!
//! The system never mutates the world. It reads actor snapshots, the
//! reservation table and spatial queries, and proposes ordered candidate
//! tiles through [`Command::RequestMove`]. The world arbitrates.

mod input;
mod route;

use std::{
    collections::{BTreeMap, VecDeque},
    time::Duration,
};

use gridwalk_core::{
    ActorId, ActorKind, ActorSnapshot, ActorView, Command, Contact, Direction, Event,
    MoveFallback, MovementIntent, ReservationView, Tile, WorldQuery,
};
use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace};

pub use input::{KeyState, UnknownKey};

const DEFAULT_CHASE_RANGE: f32 = 10.0;
const DEFAULT_REPOSITION_INTERVAL: Duration = Duration::from_secs(4);
const DEFAULT_RNG_SEED: u64 = 0x5eed_0f_c4a5e;

/// Configuration parameters required to construct the movement system.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    chase_range: f32,
    reposition_interval: Duration,
    rng_seed: u64,
}

impl Config {
    /// Creates a configuration from the chase radius in world units, the
    /// cadence at which adjacent monsters shuffle around the player, and the
    /// seed of the shuffle.
    #[must_use]
    pub const fn new(chase_range: f32, reposition_interval: Duration, rng_seed: u64) -> Self {
        Self {
            chase_range,
            reposition_interval,
            rng_seed,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(
            DEFAULT_CHASE_RANGE,
            DEFAULT_REPOSITION_INTERVAL,
            DEFAULT_RNG_SEED,
        )
    }
}

/// Pure system that reacts to world events and emits movement commands.
#[derive(Debug)]
pub struct Movement {
    chase_range: f32,
    reposition_interval: Duration,
    rng: ChaCha8Rng,
    reposition_timers: BTreeMap<ActorId, Duration>,
    pending_destination: Option<Tile>,
    route: VecDeque<Tile>,
}

impl Movement {
    /// Creates a new movement system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            chase_range: config.chase_range,
            reposition_interval: config.reposition_interval,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            reposition_timers: BTreeMap::new(),
            pending_destination: None,
            route: VecDeque::new(),
        }
    }

    /// Queues a pointer destination for the player, planned on the next tick.
    pub fn set_destination(&mut self, tile: Tile) {
        self.pending_destination = Some(tile);
        self.route.clear();
    }

    /// Tiles the player still has to walk along the queued path.
    pub fn route(&self) -> impl Iterator<Item = Tile> + '_ {
        self.route.iter().copied()
    }

    /// Consumes world events and immutable views to emit movement commands.
    ///
    /// Decisions are only taken for batches containing
    /// [`Event::TimeAdvanced`]; follow-up batches only update bookkeeping.
    pub fn handle<Q: WorldQuery>(
        &mut self,
        events: &[Event],
        actors: &ActorView,
        world: &Q,
        reservations: ReservationView<'_>,
        intent: MovementIntent,
        out: &mut Vec<Command>,
    ) {
        let mut dt = Duration::ZERO;
        let mut advanced = false;
        for event in events {
            match event {
                Event::TimeAdvanced { dt: step } => {
                    dt = dt.saturating_add(*step);
                    advanced = true;
                }
                Event::ActorDespawned { actor, .. } => {
                    let _ = self.reposition_timers.remove(actor);
                }
                _ => {}
            }
        }
        if !advanced {
            return;
        }

        let player = actors.player();
        if let Some(player) = player {
            self.steer_player(player, world, intent, out);
        } else {
            self.route.clear();
            self.pending_destination = None;
        }

        for monster in actors.iter().filter(|actor| actor.kind == ActorKind::Monster) {
            let Some(player) = player else {
                debug!(monster = monster.id.get(), "no player to chase");
                continue;
            };
            self.steer_monster(monster, player, world, reservations, dt, out);
        }
    }

    fn steer_player<Q: WorldQuery>(
        &mut self,
        player: &ActorSnapshot,
        world: &Q,
        intent: MovementIntent,
        out: &mut Vec<Command>,
    ) {
        if !player.is_alive() {
            self.route.clear();
            self.pending_destination = None;
            return;
        }
        if let Some(direction) = intent.direction() {
            self.route.clear();
            self.pending_destination = None;
            if !player.is_idle() {
                return;
            }
            match world.probe(player.tile, player.level, direction, Some(player.id)) {
                Contact::Scenery | Contact::Monster(_) => {
                    trace!(?direction, "player step blocked");
                }
                _ => out.push(Command::RequestMove {
                    actor: player.id,
                    candidates: vec![player.tile.step(direction)],
                    fallback: MoveFallback::Stay,
                }),
            }
            return;
        }

        if let Some(destination) = self.pending_destination.take() {
            match route::plan(world, player.tile, player.level, destination) {
                Some(path) => self.route = path.into(),
                None => debug!(?destination, "no route to destination"),
            }
        }

        if !player.is_idle() || self.separate(player, world, out) {
            return;
        }
        while self.route.front() == Some(&player.tile) {
            let _ = self.route.pop_front();
        }
        let Some(next) = self.route.front().copied() else {
            return;
        };

        let blocked = !player.tile.is_adjacent(next)
            || world.is_occupied(next, player.level, Some(player.id));
        if blocked {
            debug!(?next, "queued path blocked, discarding");
            self.route.clear();
            return;
        }
        out.push(Command::RequestMove {
            actor: player.id,
            candidates: vec![next],
            fallback: MoveFallback::Stay,
        });
    }

    fn steer_monster<Q: WorldQuery>(
        &mut self,
        monster: &ActorSnapshot,
        player: &ActorSnapshot,
        world: &Q,
        reservations: ReservationView<'_>,
        dt: Duration,
        out: &mut Vec<Command>,
    ) {
        if monster.position.distance(player.position) > self.chase_range {
            let _ = self.reposition_timers.remove(&monster.id);
            return;
        }

        if monster.is_idle() && self.separate(monster, world, out) {
            return;
        }

        if monster.tile.chebyshev_distance(player.tile) <= 1 {
            let timer = self.reposition_timers.entry(monster.id).or_default();
            *timer = timer.saturating_add(dt);
            if *timer < self.reposition_interval || !monster.is_idle() {
                return;
            }
            *timer = Duration::ZERO;

            let mut candidates = player.tile.neighbors().to_vec();
            candidates.shuffle(&mut self.rng);
            candidates.retain(|tile| *tile != monster.tile);
            trace!(monster = monster.id.get(), "repositioning around player");
            out.push(Command::RequestMove {
                actor: monster.id,
                candidates,
                fallback: MoveFallback::Stay,
            });
            return;
        }

        let _ = self.reposition_timers.remove(&monster.id);
        if !monster.is_idle() {
            return;
        }
        if let Some(candidates) = chase(monster, player, world, reservations) {
            out.push(Command::RequestMove {
                actor: monster.id,
                candidates,
                fallback: MoveFallback::Stay,
            });
        }
    }

    /// Pushes an idle actor sharing its tile off to a neighbour.
    fn separate<Q: WorldQuery>(
        &self,
        actor: &ActorSnapshot,
        world: &Q,
        out: &mut Vec<Command>,
    ) -> bool {
        if world.actor_contact(actor.tile, actor.level, Some(actor.id)) == Contact::Clear {
            return false;
        }
        trace!(actor = actor.id.get(), "separating from co-located actor");
        out.push(Command::RequestMove {
            actor: actor.id,
            candidates: actor.tile.neighbors().to_vec(),
            fallback: MoveFallback::Jitter,
        });
        true
    }
}

impl Default for Movement {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

/// Direction along the axis with the larger offset; horizontal wins ties.
#[must_use]
pub fn primary_direction(from: Tile, to: Tile) -> Option<Direction> {
    let column = to.column() - from.column();
    let row = to.row() - from.row();
    if column == 0 && row == 0 {
        return None;
    }
    if column.abs() >= row.abs() {
        Direction::from_delta(column, 0)
    } else {
        Direction::from_delta(0, row)
    }
}

fn chase<Q: WorldQuery>(
    monster: &ActorSnapshot,
    player: &ActorSnapshot,
    world: &Q,
    reservations: ReservationView<'_>,
) -> Option<Vec<Tile>> {
    let primary = primary_direction(monster.tile, player.tile)?;
    let probe = |direction| world.probe(monster.tile, monster.level, direction, Some(monster.id));

    match probe(primary) {
        Contact::Monster(_) => {
            let Some(target) = free_tile_near_player(monster, player, world, reservations) else {
                return alternatives(monster, player.tile, world);
            };
            match primary_direction(monster.tile, target) {
                Some(direction) if !matches!(probe(direction), Contact::Monster(_)) => {
                    Some(vec![monster.tile.step(direction)])
                }
                _ => alternatives(monster, target, world),
            }
        }
        Contact::Scenery | Contact::Player(_) => alternatives(monster, player.tile, world),
        Contact::Clear | Contact::Elevator | Contact::Ground => {
            Some(vec![monster.tile.step(primary)])
        }
    }
}

/// Free tile around the player closest to the monster.
fn free_tile_near_player<Q: WorldQuery>(
    monster: &ActorSnapshot,
    player: &ActorSnapshot,
    world: &Q,
    reservations: ReservationView<'_>,
) -> Option<Tile> {
    player
        .tile
        .neighbors()
        .into_iter()
        .filter(|tile| {
            !world.is_occupied(*tile, player.level, Some(monster.id))
                && !reservations.is_reserved_by_other(*tile, monster.id)
        })
        .min_by(|a, b| {
            a.distance(monster.tile)
                .total_cmp(&b.distance(monster.tile))
        })
}

/// Unblocked neighbours ordered by their distance to the goal.
fn alternatives<Q: WorldQuery>(
    monster: &ActorSnapshot,
    goal: Tile,
    world: &Q,
) -> Option<Vec<Tile>> {
    let mut directions = Direction::ALL.to_vec();
    directions.sort_by(|a, b| {
        monster
            .tile
            .step(*a)
            .distance(goal)
            .total_cmp(&monster.tile.step(*b).distance(goal))
    });
    let candidates: Vec<Tile> = directions
        .into_iter()
        .filter(|direction| {
            !world
                .probe(monster.tile, monster.level, *direction, Some(monster.id))
                .is_blocking()
        })
        .map(|direction| monster.tile.step(direction))
        .collect();

    if candidates.is_empty() {
        trace!(monster = monster.id.get(), "boxed in, no alternative");
        return None;
    }
    Some(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_direction_prefers_larger_axis() {
        let origin = Tile::new(0, 0);
        assert_eq!(primary_direction(origin, Tile::new(3, 1)), Some(Direction::East));
        assert_eq!(primary_direction(origin, Tile::new(-1, -4)), Some(Direction::South));
        assert_eq!(primary_direction(origin, Tile::new(0, 2)), Some(Direction::North));
    }

    #[test]
    fn primary_direction_ties_go_horizontal() {
        let origin = Tile::new(2, 2);
        assert_eq!(primary_direction(origin, Tile::new(0, 4)), Some(Direction::West));
        assert_eq!(primary_direction(origin, Tile::new(5, -1)), Some(Direction::East));
        assert_eq!(primary_direction(origin, origin), None);
    }
}
