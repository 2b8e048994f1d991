#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Gridwalk.
//!
//! The world owns the tile mapper, the static scene, every actor and the
//! reservation table. It advances actor motion only in response to
//! [`Command::Tick`] and reports every outcome through [`Event`] values.

mod actor;
mod grid;
mod occupancy;
mod reservation;
mod scene;

use std::{collections::BTreeMap, time::Duration};

use glam::Vec3;
use gridwalk_core::{
    level_of, ActorFlags, ActorId, ActorKind, ActorSpec, Command, Contact, Direction, Event,
    MotionConfig, MoveFallback, MoveRejection, Tile, WorldQuery,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace, warn};

use actor::{Actor, Motion, Transit};
use scene::Scene;

pub use grid::TileMapper;
pub use occupancy::SceneQuery;
pub use reservation::{ReleaseError, ReservationTable};

const DEFAULT_SEED: u64 = 0x6772_6964_7761_6c6b;

/// Represents the authoritative Gridwalk world state.
#[derive(Debug)]
pub struct World {
    mapper: TileMapper,
    motion: MotionConfig,
    scene: Scene,
    actors: BTreeMap<ActorId, Actor>,
    reservations: ReservationTable,
    next_actor_id: u32,
    rng: ChaCha8Rng,
    tick_index: u64,
}

impl World {
    /// Creates an empty world with a unit grid and default motion tuning.
    #[must_use]
    pub fn new() -> Self {
        Self::with_seed(DEFAULT_SEED)
    }

    /// Creates an empty world whose jitter fallback draws from the provided seed.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            mapper: TileMapper::default(),
            motion: MotionConfig::default(),
            scene: Scene::new(),
            actors: BTreeMap::new(),
            reservations: ReservationTable::new(),
            next_actor_id: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
            tick_index: 0,
        }
    }

    fn supported(&self, position: Vec3) -> bool {
        SceneQuery::new(&self.mapper, &self.scene, &self.actors, &self.motion).has_support(position)
    }

    fn configure_grid(&mut self, tile_size: f32, offset: Vec3, out_events: &mut Vec<Event>) {
        let mapper = match TileMapper::new(tile_size, offset) {
            Ok(mapper) => mapper,
            Err(reason) => {
                warn!(%reason, "grid configuration rejected");
                out_events.push(Event::GridRejected { reason });
                return;
            }
        };

        self.mapper = mapper;
        self.reservations.clear();
        for actor in self.actors.values_mut() {
            if let Motion::Moving(transit) | Motion::Falling(transit) = &mut actor.motion {
                transit.remap(&mapper);
            }
            let tile = mapper.to_tile(actor.claim_position());
            if !self.reservations.reserve(actor.id, tile) {
                warn!(actor = actor.id.get(), ?tile, "tile already claimed after regrid");
            }
        }
        out_events.push(Event::GridConfigured { tile_size, offset });
    }

    fn configure_motion(&mut self, config: MotionConfig) {
        let multiplier = config.diagonal_speed_multiplier;
        if !multiplier.is_finite() || multiplier <= 0.0 {
            warn!(multiplier, "diagonal speed multiplier must be positive, keeping motion config");
            return;
        }
        self.motion = config;
    }

    fn spawn(&mut self, spec: ActorSpec, out_events: &mut Vec<Event>) {
        let id = ActorId::new(self.next_actor_id);
        self.next_actor_id = self.next_actor_id.saturating_add(1);

        let speed = if spec.speed.is_finite() && spec.speed > 0.0 {
            spec.speed
        } else {
            let fallback = match spec.kind {
                ActorKind::Player => ActorSpec::PLAYER_SPEED,
                ActorKind::Monster => ActorSpec::MONSTER_SPEED,
            };
            warn!(actor = id.get(), speed = spec.speed, fallback, "invalid speed replaced");
            fallback
        };

        let position = self.mapper.snap(spec.position);
        let tile = self.mapper.to_tile(position);
        let reserved = self.reservations.reserve(id, tile);
        if !reserved {
            debug!(actor = id.get(), ?tile, "spawned on a reserved tile");
        }

        let _ = self.actors.insert(
            id,
            Actor {
                id,
                kind: spec.kind,
                position,
                facing: Direction::South,
                speed,
                health: spec.max_health,
                max_health: spec.max_health,
                mana: spec.max_mana,
                max_mana: spec.max_mana,
                flags: spec.flags,
                motion: Motion::Idle,
            },
        );
        out_events.push(Event::ActorSpawned {
            actor: id,
            kind: spec.kind,
            tile,
            reserved,
        });
    }

    fn despawn(&mut self, id: ActorId, out_events: &mut Vec<Event>) {
        if self.actors.remove(&id).is_none() {
            warn!(actor = id.get(), "despawn of unknown actor ignored");
            return;
        }
        let released = self.reservations.release(id);
        out_events.push(Event::ActorDespawned {
            actor: id,
            released,
        });
    }

    fn request_move(
        &mut self,
        id: ActorId,
        candidates: Vec<Tile>,
        fallback: MoveFallback,
        out_events: &mut Vec<Event>,
    ) {
        let Some(actor) = self.actors.get(&id).copied() else {
            warn!(actor = id.get(), "move request for unknown actor ignored");
            return;
        };
        let rejection = match actor.motion {
            Motion::Moving(_) => Some(MoveRejection::Busy),
            Motion::Falling(_) => Some(MoveRejection::Falling),
            Motion::Idle if candidates.is_empty() => Some(MoveRejection::NoCandidates),
            Motion::Idle => None,
        };
        if let Some(reason) = rejection {
            trace!(actor = id.get(), ?reason, "move rejected");
            out_events.push(Event::MoveRejected { actor: id, reason });
            return;
        }

        let origin = self.mapper.to_tile(actor.position);
        let level = actor.level();
        for candidate in candidates {
            if candidate == origin {
                continue;
            }

            let query = SceneQuery::new(&self.mapper, &self.scene, &self.actors, &self.motion);
            if query.is_occupied(candidate, level, Some(id)) {
                continue;
            }
            if self.reservations.view().is_reserved_by_other(candidate, id) {
                continue;
            }

            let previous = self.reservations.held_by(id);
            if !self.reservations.reserve(id, candidate) {
                continue;
            }
            if query.is_occupied(candidate, level, Some(id)) {
                let _ = self.reservations.release(id);
                if let Some(previous) = previous {
                    let _ = self.reservations.reserve(id, previous);
                }
                continue;
            }

            self.commit(actor, origin, candidate, out_events);
            return;
        }

        match fallback {
            MoveFallback::Stay => {
                trace!(actor = id.get(), "every candidate refused");
                out_events.push(Event::MoveRejected {
                    actor: id,
                    reason: MoveRejection::Exhausted,
                });
            }
            MoveFallback::Jitter => self.nudge(actor, out_events),
        }
    }

    fn commit(&mut self, actor: Actor, origin: Tile, candidate: Tile, out_events: &mut Vec<Event>) {
        let id = actor.id;
        let direction = Direction::toward(origin, candidate);
        let start = actor.position;
        let mut end = self.mapper.center(candidate, start.y);

        let query = SceneQuery::new(&self.mapper, &self.scene, &self.actors, &self.motion);
        let elevated = actor.flags.contains(ActorFlags::RIDES_ELEVATORS)
            && direction.map_or(false, |direction| {
                query.probe(origin, actor.level(), direction, Some(id)) == Contact::Elevator
            });
        if elevated {
            end.y += 1.0;
        }

        let speed = match direction {
            Some(direction) if direction.is_diagonal() => {
                actor.speed * self.motion.diagonal_speed_multiplier
            }
            _ => actor.speed,
        };
        let transit = Transit::new(start, end, origin, speed);

        let Some(stored) = self.actors.get_mut(&id) else {
            return;
        };
        stored.motion = Motion::Moving(transit);
        if let Some(direction) = direction {
            if stored.facing != direction {
                stored.facing = direction;
                out_events.push(Event::FacingChanged {
                    actor: id,
                    direction,
                });
            }
        }

        debug!(actor = id.get(), ?origin, ?candidate, elevated, "move committed");
        out_events.push(Event::MoveCommitted {
            actor: id,
            from: origin,
            to: candidate,
            elevated,
        });
    }

    fn nudge(&mut self, actor: Actor, out_events: &mut Vec<Event>) {
        let radius = self.motion.jitter_radius.max(0.0);
        let offset = Vec3::new(
            self.rng.gen_range(-radius..=radius),
            0.0,
            self.rng.gen_range(-radius..=radius),
        );
        let position = self.mapper.snap(actor.position) + offset;
        let tile = self.mapper.to_tile(position);
        if tile != self.mapper.to_tile(actor.position) {
            let query = SceneQuery::new(&self.mapper, &self.scene, &self.actors, &self.motion);
            if query.is_occupied(tile, actor.level(), Some(actor.id)) {
                debug!(actor = actor.id.get(), ?tile, "nudge target occupied, staying");
                return;
            }
            if !self.reservations.reserve(actor.id, tile) {
                debug!(actor = actor.id.get(), ?tile, "nudge target reserved, staying");
                return;
            }
        }

        let Some(stored) = self.actors.get_mut(&actor.id) else {
            return;
        };
        stored.position = position;
        debug!(actor = actor.id.get(), "no free neighbour, nudged");
        out_events.push(Event::ActorNudged {
            actor: actor.id,
            position,
        });
    }

    fn tick(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        self.tick_index = self.tick_index.saturating_add(1);
        out_events.push(Event::TimeAdvanced { dt });

        let ids: Vec<ActorId> = self.actors.keys().copied().collect();
        for id in ids {
            let Some(actor) = self.actors.get(&id).copied() else {
                continue;
            };
            match actor.motion {
                Motion::Idle => {
                    if actor.flags.contains(ActorFlags::FALLS) && !self.supported(actor.position) {
                        self.begin_fall(actor, out_events);
                    }
                }
                Motion::Moving(transit) => self.advance_transit(actor, transit, false, dt, out_events),
                Motion::Falling(transit) => self.advance_transit(actor, transit, true, dt, out_events),
            }
        }

        let actors = &self.actors;
        for (actor, tile) in self.reservations.sweep(|holder| actors.contains_key(&holder)) {
            warn!(actor = actor.get(), ?tile, "reservation outlived its holder");
            out_events.push(Event::ReservationLeaked { actor, tile });
        }
    }

    fn begin_fall(&mut self, actor: Actor, out_events: &mut Vec<Event>) {
        debug!(actor = actor.id.get(), level = actor.level(), "fall started");
        out_events.push(Event::FallStarted {
            actor: actor.id,
            from_level: actor.level(),
        });
        self.step_down(actor);
    }

    fn step_down(&mut self, actor: Actor) {
        let tile = self.mapper.to_tile(actor.position);
        let end = self.mapper.center(tile, actor.position.y - 1.0);
        let transit = Transit::new(actor.position, end, tile, actor.speed);
        if let Some(stored) = self.actors.get_mut(&actor.id) {
            stored.motion = Motion::Falling(transit);
        }
    }

    fn advance_transit(
        &mut self,
        actor: Actor,
        mut transit: Transit,
        falling: bool,
        dt: Duration,
        out_events: &mut Vec<Event>,
    ) {
        let id = actor.id;
        transit.advance(dt);
        let position = transit.position();
        let tile = self.mapper.to_tile(position);
        let level = level_of(position.y);

        let Some(stored) = self.actors.get_mut(&id) else {
            return;
        };
        stored.position = position;

        let left_origin = tile != transit.origin || level != transit.origin_level();
        let query = SceneQuery::new(&self.mapper, &self.scene, &self.actors, &self.motion);
        let collided = left_origin
            && matches!(query.actor_contact(tile, level, Some(id)), Contact::Monster(_));
        if collided {
            self.roll_back(id, transit, out_events);
            if falling && self.supported(transit.start) {
                debug!(actor = id.get(), "fall ended on an actor below");
                out_events.push(Event::FallEnded {
                    actor: id,
                    tile: transit.origin,
                    level: level_of(transit.start.y),
                });
            }
            return;
        }

        if !transit.is_complete() {
            if let Some(stored) = self.actors.get_mut(&id) {
                stored.motion = if falling {
                    Motion::Falling(transit)
                } else {
                    Motion::Moving(transit)
                };
            }
            return;
        }

        let landed = Actor {
            position,
            motion: Motion::Idle,
            ..actor
        };
        let _ = self.actors.insert(id, landed);
        let supported = self.supported(position);

        if falling {
            if supported {
                debug!(actor = id.get(), level, "fall ended");
                out_events.push(Event::FallEnded {
                    actor: id,
                    tile,
                    level,
                });
            } else {
                self.step_down(landed);
            }
            return;
        }

        out_events.push(Event::ActorSettled {
            actor: id,
            tile,
            level,
        });
        if actor.flags.contains(ActorFlags::FALLS) && !supported {
            self.begin_fall(landed, out_events);
        }
    }

    fn roll_back(&mut self, id: ActorId, transit: Transit, out_events: &mut Vec<Event>) {
        if let Some(stored) = self.actors.get_mut(&id) {
            stored.position = transit.start;
            stored.motion = Motion::Idle;
        }
        let _ = self.reservations.release(id);
        if !self.reservations.reserve(id, transit.origin) {
            warn!(actor = id.get(), tile = ?transit.origin, "origin claimed during transit");
        }
        debug!(actor = id.get(), tile = ?transit.origin, "collision, move rolled back");
        out_events.push(Event::MoveRolledBack {
            actor: id,
            tile: transit.origin,
            position: transit.start,
        });
    }

    fn deal_damage(&mut self, target: ActorId, amount: u32, out_events: &mut Vec<Event>) {
        if amount == 0 {
            return;
        }
        let Some(actor) = self.actors.get_mut(&target) else {
            warn!(actor = target.get(), "damage to unknown actor ignored");
            return;
        };
        if actor.health == 0 {
            trace!(actor = target.get(), "damage to a dead actor ignored");
            return;
        }
        let remaining = actor.health.saturating_sub(amount);
        let applied = actor.health - remaining;
        actor.health = remaining;
        let kind = actor.kind;
        out_events.push(Event::ActorDamaged {
            actor: target,
            amount: applied,
            remaining,
        });

        if remaining == 0 {
            debug!(actor = target.get(), ?kind, "actor died");
            out_events.push(Event::ActorDied {
                actor: target,
                kind,
            });
            if kind == ActorKind::Monster {
                self.despawn(target, out_events);
            }
        }
    }

    fn heal(&mut self, target: ActorId, amount: u32, out_events: &mut Vec<Event>) {
        if amount == 0 {
            return;
        }
        let Some(actor) = self.actors.get_mut(&target) else {
            warn!(actor = target.get(), "heal of unknown actor ignored");
            return;
        };
        let applied = amount.min(actor.max_health.saturating_sub(actor.health));
        actor.health += applied;
        out_events.push(Event::ActorHealed {
            actor: target,
            amount: applied,
            health: actor.health,
        });
    }

    fn use_mana(&mut self, id: ActorId, amount: u32, out_events: &mut Vec<Event>) {
        let Some(actor) = self.actors.get_mut(&id) else {
            warn!(actor = id.get(), "mana payment by unknown actor ignored");
            return;
        };
        if actor.mana < amount {
            debug!(actor = id.get(), amount, available = actor.mana, "not enough mana");
            out_events.push(Event::ManaInsufficient {
                actor: id,
                requested: amount,
                available: actor.mana,
            });
            return;
        }
        actor.mana -= amount;
        out_events.push(Event::ManaSpent {
            actor: id,
            amount,
            remaining: actor.mana,
        });
    }

    fn restore_mana(&mut self, id: ActorId, amount: u32, out_events: &mut Vec<Event>) {
        if amount == 0 {
            return;
        }
        let Some(actor) = self.actors.get_mut(&id) else {
            warn!(actor = id.get(), "mana for unknown actor ignored");
            return;
        };
        let applied = amount.min(actor.max_mana.saturating_sub(actor.mana));
        actor.mana += applied;
        out_events.push(Event::ManaRestored {
            actor: id,
            amount: applied,
            mana: actor.mana,
        });
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureGrid { tile_size, offset } => {
            world.configure_grid(tile_size, offset, out_events);
        }
        Command::ConfigureMotion { config } => world.configure_motion(config),
        Command::Tick { dt } => world.tick(dt, out_events),
        Command::PlaceBlock { tile, level, kind } => {
            let _ = world.scene.place(tile, level, kind);
            out_events.push(Event::BlockPlaced { tile, level, kind });
        }
        Command::SpawnActor { spec } => world.spawn(spec, out_events),
        Command::DespawnActor { actor } => world.despawn(actor, out_events),
        Command::RequestMove {
            actor,
            candidates,
            fallback,
        } => world.request_move(actor, candidates, fallback, out_events),
        Command::DealDamage { target, amount } => world.deal_damage(target, amount, out_events),
        Command::Heal { target, amount } => world.heal(target, amount, out_events),
        Command::UseMana { actor, amount } => world.use_mana(actor, amount, out_events),
        Command::RestoreMana { actor, amount } => world.restore_mana(actor, amount, out_events),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use gridwalk_core::{ActorView, BlockKind, MotionConfig, ReservationView, Tile};

    use super::{SceneQuery, TileMapper, World};

    /// Captures a read-only view of every actor.
    #[must_use]
    pub fn actor_view(world: &World) -> ActorView {
        ActorView::from_snapshots(
            world
                .actors
                .values()
                .map(|actor| actor.snapshot(&world.mapper, world.reservations.held_by(actor.id)))
                .collect(),
        )
    }

    /// Exposes the reservation table without granting mutation.
    #[must_use]
    pub fn reservations(world: &World) -> ReservationView<'_> {
        world.reservations.view()
    }

    /// Spatial query surface consumed by systems.
    #[must_use]
    pub fn scene(world: &World) -> SceneQuery<'_> {
        SceneQuery::new(&world.mapper, &world.scene, &world.actors, &world.motion)
    }

    /// Active mapping between positions and tiles.
    #[must_use]
    pub fn mapper(world: &World) -> &TileMapper {
        &world.mapper
    }

    /// Active motion tuning.
    #[must_use]
    pub fn motion_config(world: &World) -> MotionConfig {
        world.motion
    }

    /// Static blocks in address order.
    pub fn blocks(world: &World) -> impl Iterator<Item = (Tile, i32, BlockKind)> + '_ {
        world.scene.iter()
    }

    /// Number of ticks processed so far.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }
}
