//! Static blocks that make up the level geometry.

use std::collections::BTreeMap;

use gridwalk_core::{BlockKind, Tile};

/// Sparse set of unit blocks addressed by tile and level.
#[derive(Clone, Debug, Default)]
pub(crate) struct Scene {
    blocks: BTreeMap<(Tile, i32), BlockKind>,
}

impl Scene {
    /// Creates an empty scene.
    #[must_use]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Places a block, replacing any block at the same address.
    pub(crate) fn place(&mut self, tile: Tile, level: i32, kind: BlockKind) -> Option<BlockKind> {
        self.blocks.insert((tile, level), kind)
    }

    /// Block at the address, if any.
    #[must_use]
    pub(crate) fn block_at(&self, tile: Tile, level: i32) -> Option<BlockKind> {
        self.blocks.get(&(tile, level)).copied()
    }

    /// Reports whether scenery fills the address.
    #[must_use]
    pub(crate) fn is_scenery(&self, tile: Tile, level: i32) -> bool {
        self.block_at(tile, level) == Some(BlockKind::Scenery)
    }

    /// Reports whether an actor standing in `level` is held up by the scene.
    ///
    /// The implicit ground plane supports every level directly above it.
    #[must_use]
    pub(crate) fn supports(&self, tile: Tile, level: i32, ground_level: Option<i32>) -> bool {
        if self
            .block_at(tile, level - 1)
            .map_or(false, BlockKind::supports)
        {
            return true;
        }
        ground_level.map_or(false, |ground| level - 1 <= ground)
    }

    /// Iterator over every block in address order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (Tile, i32, BlockKind)> + '_ {
        self.blocks
            .iter()
            .map(|((tile, level), kind)| (*tile, *level, *kind))
    }
}
