#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic combat system: monster melee, the player's auto-attack and
//! mana-fuelled abilities.

mod ability;

use std::{
    collections::{BTreeMap, BTreeSet},
    time::Duration,
};

use gridwalk_core::{ActorId, ActorKind, ActorSnapshot, ActorView, Command, Event, Tile};
use tracing::{debug, trace};

pub use ability::Ability;

const DEFAULT_ATTACK_INTERVAL: Duration = Duration::from_secs(2);
const DEFAULT_ATTACK_DAMAGE: u32 = 10;
const DEFAULT_AUTO_ATTACK_INTERVAL: Duration = Duration::from_secs(3);
const DEFAULT_AUTO_ATTACK_DAMAGE: u32 = 50;
const DEFAULT_CHASE_RANGE: f32 = 10.0;

/// Configuration parameters required to construct the combat system.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    attack_interval: Duration,
    attack_damage: u32,
    auto_attack_interval: Duration,
    auto_attack_damage: u32,
    chase_range: f32,
}

impl Config {
    /// Creates a configuration for monster melee and the selection auto-attack.
    #[must_use]
    pub const fn new(
        attack_interval: Duration,
        attack_damage: u32,
        auto_attack_interval: Duration,
        auto_attack_damage: u32,
        chase_range: f32,
    ) -> Self {
        Self {
            attack_interval,
            attack_damage,
            auto_attack_interval,
            auto_attack_damage,
            chase_range,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(
            DEFAULT_ATTACK_INTERVAL,
            DEFAULT_ATTACK_DAMAGE,
            DEFAULT_AUTO_ATTACK_INTERVAL,
            DEFAULT_AUTO_ATTACK_DAMAGE,
            DEFAULT_CHASE_RANGE,
        )
    }
}

#[derive(Clone, Copy, Debug)]
struct Selection {
    target: ActorId,
    cooldown: Duration,
}

/// Pure system that converts contact time into damage commands.
#[derive(Debug)]
pub struct Combat {
    config: Config,
    melee_timers: BTreeMap<ActorId, Duration>,
    selection: Option<Selection>,
    casts: Vec<Ability>,
}

impl Combat {
    /// Creates a new combat system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            melee_timers: BTreeMap::new(),
            selection: None,
            casts: Vec::new(),
        }
    }

    /// Queues an ability; it is cast on the next tick if the player can pay.
    pub fn cast(&mut self, ability: Ability) {
        self.casts.push(ability);
    }

    /// Selects a monster for auto-attack; the first strike lands on the next tick.
    pub fn select(&mut self, target: ActorId) {
        self.selection = Some(Selection {
            target,
            cooldown: Duration::ZERO,
        });
    }

    /// Clears the current selection.
    pub fn deselect(&mut self) {
        self.selection = None;
    }

    /// Currently selected monster, if any.
    #[must_use]
    pub fn selected(&self) -> Option<ActorId> {
        self.selection.map(|selection| selection.target)
    }

    /// Consumes world events and the actor view to emit damage commands.
    pub fn handle(&mut self, events: &[Event], actors: &ActorView, out: &mut Vec<Command>) {
        let mut dt = Duration::ZERO;
        let mut advanced = false;
        for event in events {
            match event {
                Event::TimeAdvanced { dt: step } => {
                    dt = dt.saturating_add(*step);
                    advanced = true;
                }
                Event::ActorDied { actor, .. } | Event::ActorDespawned { actor, .. } => {
                    let _ = self.melee_timers.remove(actor);
                    if self.selected() == Some(*actor) {
                        debug!(actor = actor.get(), "selected monster gone");
                        self.selection = None;
                    }
                }
                _ => {}
            }
        }
        if !advanced {
            return;
        }

        let Some(player) = actors.player() else {
            trace!("no player present, combat idle");
            self.casts.clear();
            return;
        };
        if !player.is_alive() {
            trace!("player is dead, combat idle");
            self.casts.clear();
            return;
        }

        self.cast_abilities(actors, player, out);

        for monster in actors
            .iter()
            .filter(|actor| actor.kind == ActorKind::Monster)
        {
            if !self.engaged(monster, player) {
                continue;
            }
            let timer = self.melee_timers.entry(monster.id).or_default();
            *timer = timer.saturating_add(dt);
            if *timer >= self.config.attack_interval {
                *timer = Duration::ZERO;
                trace!(monster = monster.id.get(), "melee hit");
                out.push(Command::DealDamage {
                    target: player.id,
                    amount: self.config.attack_damage,
                });
            }
        }

        self.auto_attack(actors, player, dt, out);
    }

    fn cast_abilities(
        &mut self,
        actors: &ActorView,
        player: &ActorSnapshot,
        out: &mut Vec<Command>,
    ) {
        let mut mana = player.mana;
        for ability in std::mem::take(&mut self.casts) {
            let cost = ability.mana_cost();
            if mana < cost {
                debug!(?ability, cost, mana, "not enough mana to cast");
                continue;
            }
            mana -= cost;
            out.push(Command::UseMana {
                actor: player.id,
                amount: cost,
            });

            let area: BTreeSet<Tile> = ability
                .tiles(player.tile, player.facing)
                .into_iter()
                .collect();
            let mut hits = 0_usize;
            for monster in actors.iter().filter(|actor| {
                actor.kind == ActorKind::Monster
                    && actor.level == player.level
                    && area.contains(&actor.tile)
            }) {
                hits += 1;
                out.push(Command::DealDamage {
                    target: monster.id,
                    amount: ability.damage(),
                });
            }
            debug!(?ability, hits, "ability cast");
        }
    }

    fn auto_attack(
        &mut self,
        actors: &ActorView,
        player: &ActorSnapshot,
        dt: Duration,
        out: &mut Vec<Command>,
    ) {
        let Some(selection) = self.selection.as_mut() else {
            return;
        };
        let Some(target) = actors.get(selection.target) else {
            debug!(actor = selection.target.get(), "selected actor missing");
            self.selection = None;
            return;
        };

        selection.cooldown = selection.cooldown.saturating_sub(dt);
        if !selection.cooldown.is_zero() {
            return;
        }
        selection.cooldown = self.config.auto_attack_interval;
        if target.tile.chebyshev_distance(player.tile) <= 1 {
            trace!(monster = target.id.get(), "auto-attack");
            out.push(Command::DealDamage {
                target: target.id,
                amount: self.config.auto_attack_damage,
            });
        }
    }

    fn engaged(&self, monster: &ActorSnapshot, player: &ActorSnapshot) -> bool {
        monster.position.distance(player.position) <= self.config.chase_range
            && monster.tile.chebyshev_distance(player.tile) <= 1
    }
}

impl Default for Combat {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
