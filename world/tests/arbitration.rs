use std::{collections::BTreeSet, time::Duration};

use glam::Vec3;
use gridwalk_core::{
    ActorId, ActorSpec, BlockKind, Command, Event, MotionConfig, MotionPhase, MoveFallback,
    MoveRejection, Tile,
};
use gridwalk_world::{self as world, query, World};

fn apply_all(world: &mut World, commands: Vec<Command>) -> Vec<Event> {
    let mut events = Vec::new();
    for command in commands {
        world::apply(world, command, &mut events);
    }
    events
}

fn spawn(world: &mut World, spec: ActorSpec) -> ActorId {
    let events = apply_all(world, vec![Command::SpawnActor { spec }]);
    match events.as_slice() {
        [Event::ActorSpawned { actor, .. }] => *actor,
        other => panic!("unexpected spawn events: {other:?}"),
    }
}

fn at(column: i32, row: i32) -> Vec3 {
    Vec3::new(column as f32, 0.0, row as f32)
}

fn request(actor: ActorId, candidates: Vec<Tile>, fallback: MoveFallback) -> Command {
    Command::RequestMove {
        actor,
        candidates,
        fallback,
    }
}

fn tick(millis: u64) -> Command {
    Command::Tick {
        dt: Duration::from_millis(millis),
    }
}

#[test]
fn racing_actors_get_exactly_one_commit() {
    let mut world = World::new();
    let left = spawn(&mut world, ActorSpec::monster(at(0, 0)));
    let right = spawn(&mut world, ActorSpec::monster(at(2, 0)));
    let contested = Tile::new(1, 0);

    let events = apply_all(
        &mut world,
        vec![
            request(left, vec![contested], MoveFallback::Stay),
            request(right, vec![contested], MoveFallback::Stay),
        ],
    );

    let commits: Vec<_> = events
        .iter()
        .filter(|event| matches!(event, Event::MoveCommitted { .. }))
        .collect();
    assert_eq!(commits.len(), 1);
    assert!(events.contains(&Event::MoveRejected {
        actor: right,
        reason: MoveRejection::Exhausted,
    }));
    assert_eq!(query::reservations(&world).holder(contested), Some(left));

    let view = query::actor_view(&world);
    assert_eq!(
        view.get(right).and_then(|snapshot| snapshot.reserved),
        Some(Tile::new(2, 0))
    );
}

#[test]
fn collision_mid_transit_restores_exact_start() {
    let mut world = World::new();
    let mover = spawn(&mut world, ActorSpec::monster(at(3, 2)).with_speed(1.0));
    let start = query::actor_view(&world)
        .get(mover)
        .map(|snapshot| snapshot.position)
        .expect("mover spawned");

    let _ = apply_all(
        &mut world,
        vec![
            request(mover, vec![Tile::new(4, 2)], MoveFallback::Stay),
            tick(200),
        ],
    );
    let intruder = spawn(&mut world, ActorSpec::monster(at(4, 2)));

    let events = apply_all(&mut world, vec![tick(400)]);

    assert!(events.contains(&Event::MoveRolledBack {
        actor: mover,
        tile: Tile::new(3, 2),
        position: start,
    }));
    let view = query::actor_view(&world);
    let snapshot = view.get(mover).expect("mover present");
    assert_eq!(snapshot.position, start);
    assert_eq!(snapshot.phase, MotionPhase::Idle);
    assert_eq!(snapshot.reserved, Some(Tile::new(3, 2)));
    assert_eq!(view.get(intruder).and_then(|s| s.reserved), None);
    assert!(!query::reservations(&world).is_reserved(Tile::new(4, 2)));
}

#[test]
fn falling_stops_on_first_supported_level() {
    let mut world = World::new();
    let _ = apply_all(
        &mut world,
        vec![
            Command::ConfigureMotion {
                config: MotionConfig {
                    ground_level: None,
                    ..MotionConfig::default()
                },
            },
            Command::PlaceBlock {
                tile: Tile::new(0, 0),
                level: 0,
                kind: BlockKind::Ground,
            },
        ],
    );
    let faller = spawn(
        &mut world,
        ActorSpec::player(Vec3::new(0.0, 3.0, 0.0)).with_speed(5.0),
    );

    let mut log = Vec::new();
    let mut lowest = i32::MAX;
    for _ in 0..6 {
        log.extend(apply_all(&mut world, vec![tick(1_000)]));
        let view = query::actor_view(&world);
        let level = view.get(faller).map(|s| s.level).expect("faller present");
        lowest = lowest.min(level);
    }

    assert_eq!(lowest, 1);
    let started = log
        .iter()
        .filter(|event| matches!(event, Event::FallStarted { .. }))
        .count();
    assert_eq!(started, 1);
    assert!(log.contains(&Event::FallStarted {
        actor: faller,
        from_level: 3,
    }));
    assert!(log.contains(&Event::FallEnded {
        actor: faller,
        tile: Tile::new(0, 0),
        level: 1,
    }));

    let view = query::actor_view(&world);
    let snapshot = view.get(faller).expect("faller present");
    assert_eq!(snapshot.position, Vec3::new(0.0, 1.0, 0.0));
    assert_eq!(snapshot.phase, MotionPhase::Idle);
}

#[test]
fn falling_actor_rejects_lateral_moves() {
    let mut world = World::new();
    let faller = spawn(&mut world, ActorSpec::monster(Vec3::new(0.0, 4.0, 0.0)));
    let _ = apply_all(&mut world, vec![tick(10)]);

    let events = apply_all(
        &mut world,
        vec![request(faller, vec![Tile::new(1, 0)], MoveFallback::Stay)],
    );
    assert_eq!(
        events,
        vec![Event::MoveRejected {
            actor: faller,
            reason: MoveRejection::Falling,
        }]
    );
}

#[test]
fn elevator_raises_mover_one_level() {
    let mut world = World::new();
    let _ = apply_all(
        &mut world,
        vec![Command::PlaceBlock {
            tile: Tile::new(1, 0),
            level: 0,
            kind: BlockKind::Elevator,
        }],
    );
    let rider = spawn(&mut world, ActorSpec::player(at(0, 0)));

    let events = apply_all(
        &mut world,
        vec![
            request(rider, vec![Tile::new(1, 0)], MoveFallback::Stay),
            tick(1_000),
            tick(1_000),
        ],
    );

    assert!(events.contains(&Event::MoveCommitted {
        actor: rider,
        from: Tile::new(0, 0),
        to: Tile::new(1, 0),
        elevated: true,
    }));
    assert!(events.contains(&Event::ActorSettled {
        actor: rider,
        tile: Tile::new(1, 0),
        level: 1,
    }));
    assert!(!events
        .iter()
        .any(|event| matches!(event, Event::FallStarted { .. })));
}

#[test]
fn walking_off_a_ledge_starts_a_fall() {
    let mut world = World::new();
    let _ = apply_all(
        &mut world,
        vec![Command::PlaceBlock {
            tile: Tile::new(0, 0),
            level: 0,
            kind: BlockKind::Ground,
        }],
    );
    let walker = spawn(&mut world, ActorSpec::monster(Vec3::new(0.0, 1.0, 0.0)));

    let events = apply_all(
        &mut world,
        vec![
            request(walker, vec![Tile::new(0, -1)], MoveFallback::Stay),
            tick(1_000),
        ],
    );

    let settled = events.iter().position(|event| {
        *event
            == Event::ActorSettled {
                actor: walker,
                tile: Tile::new(0, -1),
                level: 1,
            }
    });
    let fell = events.iter().position(|event| {
        *event
            == Event::FallStarted {
                actor: walker,
                from_level: 1,
            }
    });
    assert!(settled.is_some());
    assert!(fell > settled);
}

#[test]
fn surrounded_actor_keeps_its_reservation() {
    let mut world = World::new();
    let center = spawn(&mut world, ActorSpec::monster(at(0, 0)));
    for neighbor in Tile::new(0, 0).neighbors() {
        let _ = spawn(
            &mut world,
            ActorSpec::monster(at(neighbor.column(), neighbor.row())),
        );
    }
    let before = query::actor_view(&world)
        .get(center)
        .copied()
        .expect("center spawned");

    let events = apply_all(
        &mut world,
        vec![request(
            center,
            Tile::new(0, 0).neighbors().to_vec(),
            MoveFallback::Stay,
        )],
    );

    assert_eq!(
        events,
        vec![Event::MoveRejected {
            actor: center,
            reason: MoveRejection::Exhausted,
        }]
    );
    let after = query::actor_view(&world)
        .get(center)
        .copied()
        .expect("center present");
    assert_eq!(after.position, before.position);
    assert_eq!(after.reserved, Some(Tile::new(0, 0)));
}

#[test]
fn jitter_fallback_nudges_within_radius() {
    let mut world = World::with_seed(7);
    let origin = Tile::new(0, 0);
    let commands = origin
        .neighbors()
        .into_iter()
        .map(|tile| Command::PlaceBlock {
            tile,
            level: 0,
            kind: BlockKind::Scenery,
        })
        .collect();
    let _ = apply_all(&mut world, commands);
    let _first = spawn(&mut world, ActorSpec::monster(at(0, 0)));
    let second = spawn(&mut world, ActorSpec::monster(at(0, 0)));

    let events = apply_all(
        &mut world,
        vec![request(
            second,
            origin.neighbors().to_vec(),
            MoveFallback::Jitter,
        )],
    );

    let nudged = events.iter().find_map(|event| match event {
        Event::ActorNudged { actor, position } if *actor == second => Some(*position),
        _ => None,
    });
    let position = nudged.expect("second actor nudged");
    assert!(position.x.abs() <= 0.3 + f32::EPSILON);
    assert!(position.z.abs() <= 0.3 + f32::EPSILON);
    assert_eq!(position.y, 0.0);
}

#[test]
fn despawn_frees_tile_for_next_actor() {
    let mut world = World::new();
    let first = spawn(&mut world, ActorSpec::monster(at(5, 5)));
    let events = apply_all(&mut world, vec![Command::DespawnActor { actor: first }]);
    assert_eq!(
        events,
        vec![Event::ActorDespawned {
            actor: first,
            released: Some(Tile::new(5, 5)),
        }]
    );

    let events = apply_all(
        &mut world,
        vec![Command::SpawnActor {
            spec: ActorSpec::monster(at(5, 5)),
        }],
    );
    assert!(matches!(
        events.as_slice(),
        [Event::ActorSpawned { reserved: true, .. }]
    ));
}

#[test]
fn crowded_traffic_never_shares_tiles() {
    let mut world = World::new();
    let mut actors = Vec::new();
    for column in 0..4 {
        for row in 0..2 {
            actors.push(spawn(&mut world, ActorSpec::monster(at(column, row))));
        }
    }

    for round in 0..20usize {
        let view = query::actor_view(&world);
        let mut commands = Vec::new();
        for (index, actor) in actors.iter().enumerate() {
            let Some(snapshot) = view.get(*actor) else {
                continue;
            };
            let mut candidates = snapshot.tile.neighbors().to_vec();
            let len = candidates.len();
            candidates.rotate_left((index + round) % len);
            commands.push(request(*actor, candidates, MoveFallback::Stay));
        }
        commands.push(tick(120));
        let _ = apply_all(&mut world, commands);

        let view = query::actor_view(&world);
        let held: Vec<Tile> = view.iter().filter_map(|snapshot| snapshot.reserved).collect();
        let unique: BTreeSet<Tile> = held.iter().copied().collect();
        assert_eq!(held.len(), unique.len(), "two actors share a tile");
        assert_eq!(query::reservations(&world).len(), held.len());
    }
}

#[test]
fn repeated_jitter_never_enters_scenery() {
    let mut world = World::with_seed(11);
    let origin = Tile::new(0, 0);
    let mut commands: Vec<Command> = origin
        .neighbors()
        .into_iter()
        .map(|tile| Command::PlaceBlock {
            tile,
            level: 0,
            kind: BlockKind::Scenery,
        })
        .collect();
    commands.push(Command::ConfigureMotion {
        config: MotionConfig {
            jitter_radius: 1.2,
            ..MotionConfig::default()
        },
    });
    let _ = apply_all(&mut world, commands);
    let _first = spawn(&mut world, ActorSpec::monster(at(0, 0)));
    let second = spawn(&mut world, ActorSpec::monster(at(0, 0)));

    for _ in 0..200 {
        let _ = apply_all(
            &mut world,
            vec![
                request(second, origin.neighbors().to_vec(), MoveFallback::Jitter),
                tick(100),
            ],
        );
        let view = query::actor_view(&world);
        let snapshot = view.get(second).expect("second present");
        assert_eq!(snapshot.tile, origin, "jitter left the cell: {snapshot:?}");
        assert!(snapshot.position.x.abs() <= 0.5);
        assert!(snapshot.position.z.abs() <= 0.5);
    }
}

#[test]
fn reposition_across_player_tile_completes() {
    let mut world = World::new();
    let _player = spawn(&mut world, ActorSpec::player(at(0, 0)));
    let monster = spawn(&mut world, ActorSpec::monster(at(1, 0)));

    let mut commands = vec![request(monster, vec![Tile::new(-1, 0)], MoveFallback::Stay)];
    commands.extend((0..6).map(|_| tick(100)));
    let events = apply_all(&mut world, commands);

    assert!(!events
        .iter()
        .any(|event| matches!(event, Event::MoveRolledBack { .. })));
    assert!(events.contains(&Event::ActorSettled {
        actor: monster,
        tile: Tile::new(-1, 0),
        level: 0,
    }));
    assert_eq!(
        query::reservations(&world).holder(Tile::new(-1, 0)),
        Some(monster)
    );
}

#[test]
fn falling_onto_an_actor_lands_on_top() {
    let mut world = World::new();
    let _below = spawn(&mut world, ActorSpec::monster(at(0, 0)));
    let above = spawn(&mut world, ActorSpec::monster(Vec3::new(0.0, 2.0, 0.0)));

    let events = apply_all(&mut world, (0..50).map(|_| tick(100)).collect());

    let started = events
        .iter()
        .filter(|event| matches!(event, Event::FallStarted { actor, .. } if *actor == above))
        .count();
    assert_eq!(started, 1);
    assert!(events.contains(&Event::FallEnded {
        actor: above,
        tile: Tile::new(0, 0),
        level: 1,
    }));
    assert!(!events
        .iter()
        .any(|event| matches!(event, Event::MoveRolledBack { .. })));

    let view = query::actor_view(&world);
    let snapshot = view.get(above).expect("above present");
    assert_eq!(snapshot.position.y, 1.0);
    assert_eq!(snapshot.phase, MotionPhase::Idle);
}
