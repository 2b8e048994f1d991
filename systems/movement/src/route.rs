//! A* planning for pointer-driven destinations.

use gridwalk_core::{Direction, Tile, WorldQuery};
use pathfinding::prelude::astar;

const CARDINAL_COST: u32 = 10;
const DIAGONAL_COST: u32 = 14;
/// Extra tiles around the start/goal box the search may explore.
const SEARCH_MARGIN: i32 = 8;

/// Plans an 8-connected path avoiding scenery, excluding `start`.
///
/// The search is confined to the bounding box of both endpoints grown by a
/// margin so that unreachable goals terminate.
pub(crate) fn plan<Q: WorldQuery>(world: &Q, start: Tile, level: i32, goal: Tile) -> Option<Vec<Tile>> {
    if world.is_scenery(goal, level) {
        return None;
    }

    let min_column = start.column().min(goal.column()) - SEARCH_MARGIN;
    let max_column = start.column().max(goal.column()) + SEARCH_MARGIN;
    let min_row = start.row().min(goal.row()) - SEARCH_MARGIN;
    let max_row = start.row().max(goal.row()) + SEARCH_MARGIN;
    let in_bounds = |tile: &Tile| {
        (min_column..=max_column).contains(&tile.column()) && (min_row..=max_row).contains(&tile.row())
    };

    let (path, _) = astar(
        &start,
        |&tile| {
            Direction::ALL
                .into_iter()
                .map(move |direction| {
                    let cost = if direction.is_diagonal() {
                        DIAGONAL_COST
                    } else {
                        CARDINAL_COST
                    };
                    (tile.step(direction), cost)
                })
                .filter(|(next, _)| in_bounds(next) && !world.is_scenery(*next, level))
                .collect::<Vec<_>>()
        },
        |&tile| octile(tile, goal),
        |&tile| tile == goal,
    )?;

    Some(path.into_iter().skip(1).collect())
}

fn octile(from: Tile, to: Tile) -> u32 {
    let columns = from.column().abs_diff(to.column());
    let rows = from.row().abs_diff(to.row());
    let diagonal = columns.min(rows);
    let straight = columns.max(rows) - diagonal;
    diagonal * DIAGONAL_COST + straight * CARDINAL_COST
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridwalk_core::{BlockKind, Command};
    use gridwalk_world::{self as world, query, World};

    fn walled(tiles: &[Tile]) -> World {
        let mut world = World::new();
        let mut events = Vec::new();
        for tile in tiles {
            world::apply(
                &mut world,
                Command::PlaceBlock {
                    tile: *tile,
                    level: 0,
                    kind: BlockKind::Scenery,
                },
                &mut events,
            );
        }
        world
    }

    #[test]
    fn open_ground_prefers_diagonals() {
        let world = World::new();
        let path = plan(&query::scene(&world), Tile::new(0, 0), 0, Tile::new(3, 3)).expect("path");
        assert_eq!(path, vec![Tile::new(1, 1), Tile::new(2, 2), Tile::new(3, 3)]);
    }

    #[test]
    fn routes_around_scenery() {
        let wall = [Tile::new(1, -1), Tile::new(1, 0), Tile::new(1, 1)];
        let world = walled(&wall);
        let path = plan(&query::scene(&world), Tile::new(0, 0), 0, Tile::new(2, 0)).expect("path");

        assert_eq!(path.last(), Some(&Tile::new(2, 0)));
        assert!(path.iter().all(|tile| !wall.contains(tile)));
        assert_eq!(path.len(), 4);
    }

    #[test]
    fn enclosed_goal_has_no_route() {
        let goal = Tile::new(5, 5);
        let world = walled(&goal.neighbors());
        assert_eq!(plan(&query::scene(&world), Tile::new(0, 0), 0, goal), None);
        assert_eq!(plan(&query::scene(&world), Tile::new(0, 0), 0, Tile::new(6, 5)), None);
    }

    #[test]
    fn octile_matches_step_costs() {
        assert_eq!(octile(Tile::new(0, 0), Tile::new(3, 1)), 14 + 20);
        assert_eq!(octile(Tile::new(2, 2), Tile::new(2, 2)), 0);
    }
}
