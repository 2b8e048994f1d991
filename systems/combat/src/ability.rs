//! Player abilities: mana cost, damage and the tiles each one strikes.

use gridwalk_core::{Direction, Tile};
use serde::{Deserialize, Serialize};

/// Spells the player can cast from the tile it stands on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ability {
    /// Nine tiles straight ahead, diagonals included.
    MagicWave,
    /// Cheap three-wide wave, four tiles deep.
    EnergyWave,
    /// Three-wide wave, four tiles deep.
    FireWave,
    /// Three-wide wave, four tiles deep.
    TerraWave,
    /// 3x3 blast five tiles ahead.
    GreatFireball,
    /// 3x3 blast five tiles ahead.
    StoneShower,
    /// 3x3 blast five tiles ahead.
    Avalanche,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Area {
    Line { length: i32 },
    Wave { reach: i32 },
    Burst { distance: i32 },
}

impl Ability {
    /// Every ability in declaration order.
    pub const ALL: [Ability; 7] = [
        Ability::MagicWave,
        Ability::EnergyWave,
        Ability::FireWave,
        Ability::TerraWave,
        Ability::GreatFireball,
        Ability::StoneShower,
        Ability::Avalanche,
    ];

    /// Mana spent per cast.
    #[must_use]
    pub const fn mana_cost(self) -> u32 {
        match self {
            Ability::MagicWave | Ability::EnergyWave => 20,
            Ability::FireWave | Ability::TerraWave => 170,
            Ability::GreatFireball | Ability::StoneShower | Ability::Avalanche => 530,
        }
    }

    /// Damage dealt to every monster in the area.
    #[must_use]
    pub const fn damage(self) -> u32 {
        match self {
            Ability::MagicWave => 50,
            Ability::EnergyWave => 150,
            Ability::FireWave | Ability::StoneShower => 130,
            Ability::TerraWave => 160,
            Ability::GreatFireball | Ability::Avalanche => 120,
        }
    }

    const fn area(self) -> Area {
        match self {
            Ability::MagicWave => Area::Line { length: 9 },
            Ability::EnergyWave | Ability::FireWave | Ability::TerraWave => {
                Area::Wave { reach: 4 }
            }
            Ability::GreatFireball | Ability::StoneShower | Ability::Avalanche => {
                Area::Burst { distance: 5 }
            }
        }
    }

    /// Tiles struck when cast from `origin` while facing `facing`.
    ///
    /// Waves and blasts use the cardinal part of the facing.
    #[must_use]
    pub fn tiles(self, origin: Tile, facing: Direction) -> Vec<Tile> {
        match self.area() {
            Area::Line { length } => (1..=length).map(|i| offset(origin, facing, i, 0)).collect(),
            Area::Wave { reach } => {
                let direction = facing.cardinal();
                (1..=reach)
                    .flat_map(|i| (-1..=1).map(move |side| offset(origin, direction, i, side)))
                    .collect()
            }
            Area::Burst { distance } => {
                let direction = facing.cardinal();
                let (column, row) = direction.delta();
                let centre = Tile::new(
                    origin.column() + column * distance,
                    origin.row() + row * distance,
                );
                (-1..=1)
                    .flat_map(|x| {
                        (-1..=1).map(move |z| Tile::new(centre.column() + x, centre.row() + z))
                    })
                    .collect()
            }
        }
    }
}

/// Tile `ahead` steps along `direction` and `side` steps across it.
fn offset(origin: Tile, direction: Direction, ahead: i32, side: i32) -> Tile {
    let (column, row) = direction.delta();
    Tile::new(
        origin.column() + column * ahead - row * side,
        origin.row() + row * ahead + column * side,
    )
}
