//! Frame loop that pumps the world and its systems.

use std::time::Duration;

use gridwalk_core::{ActorId, Command, Event};
use gridwalk_system_combat::Combat;
use gridwalk_system_movement::Movement;
use gridwalk_world::{self as world, query, World};
use tracing::{debug, info, warn};

use crate::scenario::{FrameInput, Scenario, ScenarioError};

/// Upper bound on command/event exchanges inside one frame.
const MAX_PUMP_ROUNDS: usize = 16;

/// Headless simulation driven by a scenario.
#[derive(Debug)]
pub(crate) struct Simulation {
    world: World,
    movement: Movement,
    combat: Combat,
    frame_dt: Duration,
    spawned: Vec<ActorId>,
    log: Vec<Event>,
    frames: u32,
}

impl Simulation {
    /// Builds the level described by the scenario.
    pub(crate) fn new(scenario: &Scenario, frame_dt: Duration) -> Result<Self, ScenarioError> {
        let mut simulation = Self {
            world: World::with_seed(scenario.seed()),
            movement: Movement::new(scenario.movement_config()?),
            combat: Combat::new(scenario.combat_config()?),
            frame_dt,
            spawned: Vec::new(),
            log: Vec::new(),
            frames: 0,
        };

        let mut events = Vec::new();
        for command in scenario.setup_commands() {
            world::apply(&mut simulation.world, command, &mut events);
        }
        for event in &events {
            match event {
                Event::ActorSpawned { actor, .. } => simulation.spawned.push(*actor),
                Event::GridRejected { reason } => warn!(%reason, "grid configuration rejected"),
                _ => {}
            }
        }
        info!(
            actors = simulation.spawned.len(),
            blocks = query::blocks(&simulation.world).count(),
            "scenario loaded"
        );
        simulation.log = events;
        Ok(simulation)
    }

    /// Runs `frames` frames, feeding each one its scripted input.
    pub(crate) fn run(&mut self, scenario: &Scenario, frames: u32) {
        for frame in 0..frames {
            self.step(scenario.input_at(frame));
        }
        info!(
            frames = self.frames,
            events = self.log.len(),
            "simulation finished"
        );
    }

    /// Advances one frame: input, tick, then system passes until quiescent.
    pub(crate) fn step(&mut self, input: FrameInput) {
        if let Some(tile) = input.destination {
            self.movement.set_destination(tile);
        }
        if input.deselect {
            self.combat.deselect();
        }
        if let Some(actor) = input.select.and_then(|index| self.spawned.get(index)) {
            self.combat.select(*actor);
        }
        if let Some(ability) = input.cast {
            self.combat.cast(ability);
        }

        let mut events = Vec::new();
        if let Some(amount) = input.restore_mana {
            let player = query::actor_view(&self.world).player().map(|player| player.id);
            match player {
                Some(actor) => world::apply(
                    &mut self.world,
                    Command::RestoreMana { actor, amount },
                    &mut events,
                ),
                None => debug!("no player to restore mana to"),
            }
        }
        world::apply(
            &mut self.world,
            Command::Tick { dt: self.frame_dt },
            &mut events,
        );

        for round in 0.. {
            if events.is_empty() {
                break;
            }
            if round == MAX_PUMP_ROUNDS {
                warn!(frame = self.frames, "frame did not settle");
                break;
            }

            let actors = query::actor_view(&self.world);
            let mut commands = Vec::new();
            self.movement.handle(
                &events,
                &actors,
                &query::scene(&self.world),
                query::reservations(&self.world),
                input.intent,
                &mut commands,
            );
            self.combat.handle(&events, &actors, &mut commands);

            self.log.append(&mut events);
            for command in commands {
                world::apply(&mut self.world, command, &mut events);
            }
        }

        debug!(frame = self.frames, "frame complete");
        self.frames += 1;
    }

    pub(crate) fn world(&self) -> &World {
        &self.world
    }

    pub(crate) fn events(&self) -> &[Event] {
        &self.log
    }

    pub(crate) fn frames(&self) -> u32 {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridwalk_core::{ActorKind, ActorSpec};
    use gridwalk_system_combat::Ability;

    const SAMPLE: &str = include_str!("../scenarios/ambush.toml");

    fn sample() -> (Scenario, Simulation) {
        let scenario = Scenario::parse(SAMPLE).expect("sample is valid");
        let simulation =
            Simulation::new(&scenario, scenario.frame_duration()).expect("sample builds");
        (scenario, simulation)
    }

    #[test]
    fn setup_spawns_every_actor() {
        let (_, simulation) = sample();
        assert_eq!(query::actor_view(simulation.world()).len(), 5);
        assert_eq!(simulation.frames(), 0);
    }

    #[test]
    fn sample_run_never_shares_tiles() {
        let (scenario, mut simulation) = sample();
        for frame in 0..scenario.frames() {
            simulation.step(scenario.input_at(frame));

            let view = query::actor_view(simulation.world());
            let mut held: Vec<_> = view.iter().filter_map(|actor| actor.reserved).collect();
            let total = held.len();
            held.sort();
            held.dedup();
            assert_eq!(held.len(), total, "two actors share a tile on frame {frame}");
        }
        assert_eq!(simulation.frames(), scenario.frames());
        assert!(simulation
            .events()
            .iter()
            .any(|event| matches!(event, Event::MoveCommitted { .. })));
    }

    #[test]
    fn monsters_close_in_and_strike() {
        let (scenario, mut simulation) = sample();
        simulation.run(&scenario, scenario.frames());

        let player = query::actor_view(simulation.world())
            .player()
            .map(|actor| actor.id)
            .expect("player survives");
        assert!(simulation.events().iter().any(|event| matches!(
            event,
            Event::ActorDamaged { actor, .. } if *actor == player
        )));
        assert!(simulation.events().iter().any(|event| matches!(
            event,
            Event::ActorDied {
                kind: ActorKind::Monster,
                ..
            }
        )));
    }

    #[test]
    fn scripted_cast_spends_player_mana() {
        let (_, mut simulation) = sample();
        simulation.step(FrameInput {
            cast: Some(Ability::MagicWave),
            ..FrameInput::default()
        });

        let player = query::actor_view(simulation.world())
            .player()
            .map(|actor| (actor.id, actor.mana))
            .expect("player present");
        assert_eq!(player.1, ActorSpec::PLAYER_MANA - 20);
        assert!(simulation.events().contains(&Event::ManaSpent {
            actor: player.0,
            amount: 20,
            remaining: ActorSpec::PLAYER_MANA - 20,
        }));

        simulation.step(FrameInput {
            restore_mana: Some(50),
            ..FrameInput::default()
        });
        assert!(simulation.events().contains(&Event::ManaRestored {
            actor: player.0,
            amount: 20,
            mana: ActorSpec::PLAYER_MANA,
        }));
    }

    #[test]
    fn identical_runs_produce_identical_logs() {
        let (scenario, mut first) = sample();
        let (_, mut second) = sample();
        first.run(&scenario, 40);
        second.run(&scenario, 40);
        assert_eq!(first.events(), second.events());
    }
}
