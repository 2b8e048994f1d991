//! Conversion between continuous world positions and grid tiles.

use glam::Vec3;
use gridwalk_core::{GridError, Tile};

/// Maps world positions onto the tile lattice.
///
/// Only the horizontal axes are quantized. The vertical coordinate passes
/// through untouched so that height stays a per-actor attribute rather than
/// part of tile identity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileMapper {
    tile_size: f32,
    offset: Vec3,
}

impl TileMapper {
    /// Creates a mapper, validating the lattice parameters.
    pub fn new(tile_size: f32, offset: Vec3) -> Result<Self, GridError> {
        if !tile_size.is_finite() || tile_size <= 0.0 {
            return Err(GridError::InvalidTileSize(tile_size));
        }
        if !offset.is_finite() {
            return Err(GridError::NonFiniteOffset);
        }
        Ok(Self { tile_size, offset })
    }

    /// Edge length of a tile in world units.
    #[must_use]
    pub const fn tile_size(&self) -> f32 {
        self.tile_size
    }

    /// World-space offset of the lattice origin.
    #[must_use]
    pub const fn offset(&self) -> Vec3 {
        self.offset
    }

    /// Tile whose centre is nearest to the position.
    #[must_use]
    pub fn to_tile(&self, position: Vec3) -> Tile {
        let column = ((position.x - self.offset.x) / self.tile_size).round();
        let row = ((position.z - self.offset.z) / self.tile_size).round();
        Tile::new(column as i32, row as i32)
    }

    /// World position of a tile centre at the provided height.
    #[must_use]
    pub fn center(&self, tile: Tile, height: f32) -> Vec3 {
        Vec3::new(
            tile.column() as f32 * self.tile_size + self.offset.x,
            height,
            tile.row() as f32 * self.tile_size + self.offset.z,
        )
    }

    /// Snaps the position to the nearest tile centre, keeping its height.
    #[must_use]
    pub fn snap(&self, position: Vec3) -> Vec3 {
        self.center(self.to_tile(position), position.y)
    }
}

impl Default for TileMapper {
    fn default() -> Self {
        Self {
            tile_size: 1.0,
            offset: Vec3::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_nearest_tile() {
        let mapper = TileMapper::default();
        assert_eq!(mapper.to_tile(Vec3::new(0.49, 3.0, -0.51)), Tile::new(0, -1));
        assert_eq!(mapper.to_tile(Vec3::new(2.5, 0.0, 1.2)), Tile::new(3, 1));
    }

    #[test]
    fn honours_size_and_offset() {
        let mapper = TileMapper::new(2.0, Vec3::new(0.5, 0.0, -1.0)).expect("valid grid");
        let tile = mapper.to_tile(Vec3::new(4.4, 0.0, 3.2));
        assert_eq!(tile, Tile::new(2, 2));
        assert_eq!(mapper.center(tile, 7.0), Vec3::new(4.5, 7.0, 3.0));
    }

    #[test]
    fn snapping_is_idempotent_and_keeps_height() {
        let mapper = TileMapper::new(0.75, Vec3::new(0.1, 0.0, 0.2)).expect("valid grid");
        let samples = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(-3.31, 1.5, 8.02),
            Vec3::new(12.9, -2.0, -7.44),
            Vec3::new(0.474, 0.25, 0.574),
        ];
        for position in samples {
            let snapped = mapper.snap(position);
            assert_eq!(snapped.y, position.y);
            assert_eq!(mapper.to_tile(snapped), mapper.to_tile(position));
            assert_eq!(mapper.snap(snapped), snapped);
        }
    }

    #[test]
    fn rejects_degenerate_configuration() {
        assert_eq!(
            TileMapper::new(0.0, Vec3::ZERO),
            Err(GridError::InvalidTileSize(0.0))
        );
        assert!(TileMapper::new(f32::NAN, Vec3::ZERO).is_err());
        assert_eq!(
            TileMapper::new(1.0, Vec3::new(f32::INFINITY, 0.0, 0.0)),
            Err(GridError::NonFiniteOffset)
        );
    }
}
