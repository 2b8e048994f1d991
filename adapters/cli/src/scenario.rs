//! TOML scenario files describing a level, its actors and a frame script.

use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use glam::Vec3;
use gridwalk_core::{
    ActorFlags, ActorKind, ActorSpec, BlockKind, Command, MotionConfig, MovementIntent, Tile,
};
use gridwalk_system_combat::{Ability, Config as CombatConfig};
use gridwalk_system_movement::{Config as MovementConfig, KeyState, UnknownKey};
use serde::Deserialize;
use thiserror::Error;

const DEFAULT_FRAMES: u32 = 120;
const DEFAULT_FRAME_MILLIS: u64 = 100;

/// Errors raised while loading or validating a scenario.
#[derive(Debug, Error)]
pub(crate) enum ScenarioError {
    #[error("failed to read scenario {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid scenario syntax")]
    Parse(#[from] toml::de::Error),
    #[error("scenario declares no actors")]
    NoActors,
    #[error("`{field}` must be a finite, non-negative number of seconds")]
    InvalidDuration { field: &'static str },
    #[error("frame duration must be positive")]
    ZeroFrame,
    #[error("script step at frame {frame} selects unknown actor #{index}")]
    UnknownActor { frame: u32, index: usize },
    #[error("script step at frame {frame} has invalid keys")]
    Keys {
        frame: u32,
        #[source]
        source: UnknownKey,
    },
}

/// Fully parsed scenario.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Scenario {
    #[serde(default)]
    seed: u64,
    frames: Option<u32>,
    frame_millis: Option<u64>,
    #[serde(default)]
    grid: GridSection,
    #[serde(default)]
    motion: MotionConfig,
    #[serde(default)]
    movement: MovementSection,
    #[serde(default)]
    combat: CombatSection,
    #[serde(default)]
    blocks: Vec<BlockEntry>,
    actors: Vec<ActorEntry>,
    #[serde(default)]
    script: Vec<ScriptStep>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GridSection {
    tile_size: f32,
    #[serde(default)]
    offset: Vec3,
}

impl Default for GridSection {
    fn default() -> Self {
        Self {
            tile_size: 1.0,
            offset: Vec3::ZERO,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct MovementSection {
    chase_range: f32,
    reposition_secs: f32,
}

impl Default for MovementSection {
    fn default() -> Self {
        Self {
            chase_range: 10.0,
            reposition_secs: 4.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct CombatSection {
    attack_secs: f32,
    attack_damage: u32,
    auto_attack_secs: f32,
    auto_attack_damage: u32,
    chase_range: f32,
}

impl Default for CombatSection {
    fn default() -> Self {
        Self {
            attack_secs: 2.0,
            attack_damage: 10,
            auto_attack_secs: 3.0,
            auto_attack_damage: 50,
            chase_range: 10.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BlockEntry {
    tile: Tile,
    #[serde(default)]
    level: i32,
    kind: BlockKind,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ActorEntry {
    kind: ActorKind,
    position: Vec3,
    speed: Option<f32>,
    health: Option<u32>,
    mana: Option<u32>,
    falls: Option<bool>,
    rides_elevators: Option<bool>,
}

impl ActorEntry {
    fn spec(&self) -> ActorSpec {
        let mut spec = match self.kind {
            ActorKind::Player => ActorSpec::player(self.position),
            ActorKind::Monster => ActorSpec::monster(self.position),
        };
        if let Some(speed) = self.speed {
            spec = spec.with_speed(speed);
        }
        if let Some(health) = self.health {
            spec = spec.with_health(health);
        }
        if let Some(mana) = self.mana {
            spec = spec.with_mana(mana);
        }
        let mut flags = ActorFlags::default();
        flags.set(ActorFlags::FALLS, self.falls.unwrap_or(true));
        flags.set(ActorFlags::RIDES_ELEVATORS, self.rides_elevators.unwrap_or(true));
        spec.with_flags(flags)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScriptStep {
    frame: u32,
    #[serde(default)]
    keys: String,
    #[serde(default = "one")]
    hold: u32,
    destination: Option<Tile>,
    select: Option<usize>,
    #[serde(default)]
    deselect: bool,
    cast: Option<Ability>,
    restore_mana: Option<u32>,
}

fn one() -> u32 {
    1
}

/// Player input applied at the start of a frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct FrameInput {
    pub(crate) intent: MovementIntent,
    pub(crate) destination: Option<Tile>,
    /// Index into the scenario's actor list.
    pub(crate) select: Option<usize>,
    pub(crate) deselect: bool,
    pub(crate) cast: Option<Ability>,
    pub(crate) restore_mana: Option<u32>,
}

impl Scenario {
    /// Reads and validates a scenario file.
    pub(crate) fn load(path: &Path) -> Result<Self, ScenarioError> {
        let text = fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Parses and validates scenario text.
    pub(crate) fn parse(text: &str) -> Result<Self, ScenarioError> {
        let scenario: Self = toml::from_str(text)?;
        if scenario.actors.is_empty() {
            return Err(ScenarioError::NoActors);
        }
        if scenario.frame_millis == Some(0) {
            return Err(ScenarioError::ZeroFrame);
        }
        for step in &scenario.script {
            let _ = KeyState::from_keys(&step.keys).map_err(|source| ScenarioError::Keys {
                frame: step.frame,
                source,
            })?;
            if let Some(index) = step.select {
                if index >= scenario.actors.len() {
                    return Err(ScenarioError::UnknownActor {
                        frame: step.frame,
                        index,
                    });
                }
            }
        }
        let _ = scenario.movement_config()?;
        let _ = scenario.combat_config()?;
        Ok(scenario)
    }

    pub(crate) fn seed(&self) -> u64 {
        self.seed
    }

    pub(crate) fn frames(&self) -> u32 {
        self.frames.unwrap_or(DEFAULT_FRAMES)
    }

    pub(crate) fn frame_duration(&self) -> Duration {
        Duration::from_millis(self.frame_millis.unwrap_or(DEFAULT_FRAME_MILLIS))
    }

    /// Commands that build the level and its population, in order.
    pub(crate) fn setup_commands(&self) -> Vec<Command> {
        let mut commands = vec![
            Command::ConfigureGrid {
                tile_size: self.grid.tile_size,
                offset: self.grid.offset,
            },
            Command::ConfigureMotion {
                config: self.motion,
            },
        ];
        commands.extend(self.blocks.iter().map(|block| Command::PlaceBlock {
            tile: block.tile,
            level: block.level,
            kind: block.kind,
        }));
        commands.extend(
            self.actors
                .iter()
                .map(|actor| Command::SpawnActor { spec: actor.spec() }),
        );
        commands
    }

    pub(crate) fn movement_config(&self) -> Result<MovementConfig, ScenarioError> {
        Ok(MovementConfig::new(
            self.movement.chase_range,
            seconds(self.movement.reposition_secs, "movement.reposition_secs")?,
            self.seed,
        ))
    }

    pub(crate) fn combat_config(&self) -> Result<CombatConfig, ScenarioError> {
        Ok(CombatConfig::new(
            seconds(self.combat.attack_secs, "combat.attack_secs")?,
            self.combat.attack_damage,
            seconds(self.combat.auto_attack_secs, "combat.auto_attack_secs")?,
            self.combat.auto_attack_damage,
            self.combat.chase_range,
        ))
    }

    /// Input for the given frame. Later steps override earlier ones.
    pub(crate) fn input_at(&self, frame: u32) -> FrameInput {
        let mut input = FrameInput::default();
        for step in &self.script {
            if step.frame == frame {
                input.destination = step.destination.or(input.destination);
                input.select = step.select.or(input.select);
                input.deselect |= step.deselect;
                input.cast = step.cast.or(input.cast);
                input.restore_mana = step.restore_mana.or(input.restore_mana);
            }
            let held = frame >= step.frame && frame - step.frame < step.hold.max(1);
            if held && !step.keys.is_empty() {
                if let Ok(keys) = KeyState::from_keys(&step.keys) {
                    input.intent = keys.intent();
                }
            }
        }
        input
    }
}

fn seconds(value: f32, field: &'static str) -> Result<Duration, ScenarioError> {
    if value.is_sign_negative() {
        return Err(ScenarioError::InvalidDuration { field });
    }
    Duration::try_from_secs_f32(value).map_err(|_| ScenarioError::InvalidDuration { field })
}
