//! Spatial answers about scenery and co-located actors.
//!
//! Occupancy is a physical notion and never consults the reservation table.

use std::collections::BTreeMap;

use glam::Vec3;
use gridwalk_core::{
    level_of, ActorId, ActorKind, BlockKind, Contact, Direction, MotionConfig, Tile, WorldQuery,
};

use crate::{actor::Actor, grid::TileMapper, scene::Scene};

/// [`WorldQuery`] implementation backed by the world's scene and actors.
#[derive(Clone, Copy, Debug)]
pub struct SceneQuery<'a> {
    mapper: &'a TileMapper,
    scene: &'a Scene,
    actors: &'a BTreeMap<ActorId, Actor>,
    motion: &'a MotionConfig,
}

impl<'a> SceneQuery<'a> {
    pub(crate) fn new(
        mapper: &'a TileMapper,
        scene: &'a Scene,
        actors: &'a BTreeMap<ActorId, Actor>,
        motion: &'a MotionConfig,
    ) -> Self {
        Self {
            mapper,
            scene,
            actors,
            motion,
        }
    }
}

impl WorldQuery for SceneQuery<'_> {
    fn tile_of(&self, position: Vec3) -> Tile {
        self.mapper.to_tile(position)
    }

    fn is_scenery(&self, tile: Tile, level: i32) -> bool {
        self.scene.is_scenery(tile, level)
    }

    fn is_occupied(&self, tile: Tile, level: i32, ignore: Option<ActorId>) -> bool {
        self.scene.is_scenery(tile, level) || self.actor_contact(tile, level, ignore) != Contact::Clear
    }

    fn actor_contact(&self, tile: Tile, level: i32, ignore: Option<ActorId>) -> Contact {
        self.actors
            .values()
            .filter(|actor| Some(actor.id) != ignore)
            .find(|actor| {
                self.mapper.to_tile(actor.position) == tile
                    && (actor.position.y - level as f32).abs() < 1.0
            })
            .map_or(Contact::Clear, |actor| match actor.kind {
                ActorKind::Player => Contact::Player(actor.id),
                ActorKind::Monster => Contact::Monster(actor.id),
            })
    }

    fn probe(
        &self,
        tile: Tile,
        level: i32,
        direction: Direction,
        ignore: Option<ActorId>,
    ) -> Contact {
        let mut cursor = tile;
        for _ in 0..self.motion.probe_reach {
            cursor = cursor.step(direction);
            if self.scene.is_scenery(cursor, level) {
                return Contact::Scenery;
            }
            let contact = self.actor_contact(cursor, level, ignore);
            if contact != Contact::Clear {
                return contact;
            }
            match self.scene.block_at(cursor, level) {
                Some(BlockKind::Elevator) => return Contact::Elevator,
                Some(BlockKind::Ground) => return Contact::Ground,
                Some(BlockKind::Scenery) | None => {}
            }
        }
        Contact::Clear
    }

    fn has_support(&self, position: Vec3) -> bool {
        let tile = self.mapper.to_tile(position);
        let level = level_of(position.y);
        if self.scene.supports(tile, level, self.motion.ground_level) {
            return true;
        }
        self.actors.values().any(|actor| {
            actor.level() == level - 1 && self.mapper.to_tile(actor.position) == tile
        })
    }
}
