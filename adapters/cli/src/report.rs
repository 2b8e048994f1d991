//! Summary of a finished run, printable as text or JSON.

use std::{collections::BTreeMap, fmt};

use glam::Vec3;
use gridwalk_core::{ActorId, ActorKind, Event, MotionPhase, Tile};
use gridwalk_world::{query, World};
use serde::Serialize;

/// Final state of a simulation.
#[derive(Debug, Serialize)]
pub(crate) struct Report {
    frames: u32,
    ticks: u64,
    actors: Vec<ActorLine>,
    reservations: usize,
    blocks: usize,
    events: BTreeMap<&'static str, usize>,
}

#[derive(Debug, Serialize)]
struct ActorLine {
    id: ActorId,
    kind: ActorKind,
    tile: Tile,
    level: i32,
    position: Vec3,
    phase: MotionPhase,
    health: u32,
    max_health: u32,
    mana: u32,
    max_mana: u32,
    reserved: Option<Tile>,
}

impl Report {
    /// Captures the world and tallies the event log.
    pub(crate) fn capture(world: &World, events: &[Event], frames: u32) -> Self {
        let actors = query::actor_view(world)
            .into_vec()
            .into_iter()
            .map(|actor| ActorLine {
                id: actor.id,
                kind: actor.kind,
                tile: actor.tile,
                level: actor.level,
                position: actor.position,
                phase: actor.phase,
                health: actor.health,
                max_health: actor.max_health,
                mana: actor.mana,
                max_mana: actor.max_mana,
                reserved: actor.reserved,
            })
            .collect();

        let mut tally = BTreeMap::new();
        for event in events {
            *tally.entry(event_name(event)).or_insert(0) += 1;
        }

        Self {
            frames,
            ticks: query::tick_index(world),
            actors,
            reservations: query::reservations(world).len(),
            blocks: query::blocks(world).count(),
            events: tally,
        }
    }

    pub(crate) fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} frames, {} ticks, {} blocks, {} reservations",
            self.frames, self.ticks, self.blocks, self.reservations
        )?;
        for actor in &self.actors {
            let kind = match actor.kind {
                ActorKind::Player => "player",
                ActorKind::Monster => "monster",
            };
            writeln!(
                f,
                "  #{:<3} {kind:<7} tile ({:>3}, {:>3}) level {:>2}  {:?}  hp {}/{}  mp {}/{}",
                actor.id.get(),
                actor.tile.column(),
                actor.tile.row(),
                actor.level,
                actor.phase,
                actor.health,
                actor.max_health,
                actor.mana,
                actor.max_mana,
            )?;
        }
        for (name, count) in &self.events {
            writeln!(f, "  {name}: {count}")?;
        }
        Ok(())
    }
}

fn event_name(event: &Event) -> &'static str {
    match event {
        Event::TimeAdvanced { .. } => "time_advanced",
        Event::GridConfigured { .. } => "grid_configured",
        Event::GridRejected { .. } => "grid_rejected",
        Event::BlockPlaced { .. } => "block_placed",
        Event::ActorSpawned { .. } => "actor_spawned",
        Event::ActorDespawned { .. } => "actor_despawned",
        Event::MoveCommitted { .. } => "move_committed",
        Event::MoveRejected { .. } => "move_rejected",
        Event::FacingChanged { .. } => "facing_changed",
        Event::ActorSettled { .. } => "actor_settled",
        Event::MoveRolledBack { .. } => "move_rolled_back",
        Event::FallStarted { .. } => "fall_started",
        Event::FallEnded { .. } => "fall_ended",
        Event::ActorNudged { .. } => "actor_nudged",
        Event::ActorDamaged { .. } => "actor_damaged",
        Event::ActorHealed { .. } => "actor_healed",
        Event::ManaSpent { .. } => "mana_spent",
        Event::ManaInsufficient { .. } => "mana_insufficient",
        Event::ManaRestored { .. } => "mana_restored",
        Event::ActorDied { .. } => "actor_died",
        Event::ReservationLeaked { .. } => "reservation_leaked",
    }
}
