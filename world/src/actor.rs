//! Actor state and the interpolated transit primitive shared by moves and falls.

use std::time::Duration;

use glam::Vec3;
use gridwalk_core::{
    level_of, ActorFlags, ActorId, ActorKind, ActorSnapshot, Direction, MotionPhase, Tile,
};

use crate::grid::TileMapper;

#[derive(Clone, Copy, Debug)]
pub(crate) struct Actor {
    pub(crate) id: ActorId,
    pub(crate) kind: ActorKind,
    pub(crate) position: Vec3,
    pub(crate) facing: Direction,
    pub(crate) speed: f32,
    pub(crate) health: u32,
    pub(crate) max_health: u32,
    pub(crate) mana: u32,
    pub(crate) max_mana: u32,
    pub(crate) flags: ActorFlags,
    pub(crate) motion: Motion,
}

impl Actor {
    pub(crate) fn level(&self) -> i32 {
        level_of(self.position.y)
    }

    /// Position whose tile the actor should hold a reservation for.
    pub(crate) fn claim_position(&self) -> Vec3 {
        match self.motion {
            Motion::Moving(transit) => transit.end,
            Motion::Idle | Motion::Falling(_) => self.position,
        }
    }

    pub(crate) fn snapshot(&self, mapper: &TileMapper, reserved: Option<Tile>) -> ActorSnapshot {
        ActorSnapshot {
            id: self.id,
            kind: self.kind,
            position: self.position,
            tile: mapper.to_tile(self.position),
            level: self.level(),
            reserved,
            phase: self.motion.phase(),
            facing: self.facing,
            speed: self.speed,
            health: self.health,
            max_health: self.max_health,
            mana: self.mana,
            max_mana: self.max_mana,
            flags: self.flags,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) enum Motion {
    Idle,
    Moving(Transit),
    Falling(Transit),
}

impl Motion {
    pub(crate) fn phase(&self) -> MotionPhase {
        match self {
            Self::Idle => MotionPhase::Idle,
            Self::Moving(_) => MotionPhase::Moving,
            Self::Falling(_) => MotionPhase::Falling,
        }
    }
}

/// Linear interpolation between two positions over a fixed duration.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Transit {
    pub(crate) start: Vec3,
    pub(crate) end: Vec3,
    pub(crate) origin: Tile,
    elapsed: Duration,
    duration: Duration,
}

impl Transit {
    /// `speed` must be positive; callers sanitize it on spawn.
    pub(crate) fn new(start: Vec3, end: Vec3, origin: Tile, speed: f32) -> Self {
        let distance = start.distance(end);
        let duration = if distance <= f32::EPSILON {
            Duration::ZERO
        } else {
            Duration::try_from_secs_f32(distance / speed).unwrap_or(Duration::MAX)
        };
        Self {
            start,
            end,
            origin,
            elapsed: Duration::ZERO,
            duration,
        }
    }

    pub(crate) fn advance(&mut self, dt: Duration) {
        self.elapsed = self.elapsed.saturating_add(dt).min(self.duration);
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// Interpolated position; exactly `end` once complete.
    pub(crate) fn position(&self) -> Vec3 {
        if self.is_complete() {
            return self.end;
        }
        let t = (self.elapsed.as_secs_f32() / self.duration.as_secs_f32()).min(1.0);
        self.start.lerp(self.end, t)
    }

    pub(crate) fn origin_level(&self) -> i32 {
        level_of(self.start.y)
    }

    pub(crate) fn remap(&mut self, mapper: &TileMapper) {
        self.origin = mapper.to_tile(self.start);
    }
}
