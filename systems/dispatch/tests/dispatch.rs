use std::time::Duration;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tactical_grid_core::{
    AgentId, CellCoord, GridConfiguration, GridError, TerrainKind, TerrainPalette, Vec3,
};
use tactical_grid_system_dispatch::{Dispatcher, Selectable, UnitType, UnitTypeError};
use tactical_grid_system_movement::MovementState;
use tactical_grid_system_placement::{BuildingDefinition, PlacementValidator};
use tactical_grid_world::{pathfinding::AStar, Grid};

const TICK: Duration = Duration::from_millis(100);

fn palette() -> TerrainPalette {
    TerrainPalette::new(vec![
        TerrainKind::new("grass", true, 1),
        TerrainKind::new("water", false, 1),
    ])
}

fn open_grid(width: u32, height: u32) -> Grid {
    Grid::build_with(
        GridConfiguration::new(width, height, 1.0, true),
        &palette(),
        |_| 0,
    )
    .expect("open grid")
}

fn dispatcher_with(grid: &Grid, cells: &[CellCoord]) -> (Dispatcher, Vec<AgentId>) {
    let mut dispatcher = Dispatcher::default();
    let ids = cells
        .iter()
        .map(|coord| dispatcher.spawn_agent_at(grid.world_position(*coord)))
        .collect();
    (dispatcher, ids)
}

#[test]
fn spawned_agents_receive_sequential_ids() {
    let grid = open_grid(3, 3);
    let (dispatcher, ids) = dispatcher_with(&grid, &[CellCoord::new(0, 0), CellCoord::new(1, 1)]);

    assert_eq!(ids, vec![AgentId::new(0), AgentId::new(1)]);
    assert_eq!(dispatcher.units().count(), 2);
    let unit = dispatcher.unit(ids[1]).expect("registered unit");
    assert_eq!(unit.agent().position(), grid.world_position(CellCoord::new(1, 1)));
    assert_eq!(unit.agent().speed(), UnitType::default().move_speed);
    assert_eq!(unit.label(), "infantry");
}

#[test]
fn exclusive_select_replaces_selection_and_fires_hooks() {
    let grid = open_grid(3, 3);
    let (mut dispatcher, ids) =
        dispatcher_with(&grid, &[CellCoord::new(0, 0), CellCoord::new(2, 2)]);

    assert!(dispatcher.select(ids[0], false));
    assert!(dispatcher.unit(ids[0]).expect("unit").is_highlighted());

    assert!(dispatcher.select(ids[1], false));
    assert_eq!(dispatcher.selection(), &[ids[1]]);
    assert!(
        !dispatcher.unit(ids[0]).expect("unit").is_highlighted(),
        "exclusive selection deselects previous entries"
    );
    assert!(dispatcher.unit(ids[1]).expect("unit").is_highlighted());
}

#[test]
fn additive_select_keeps_order_and_ignores_duplicates() {
    let grid = open_grid(4, 1);
    let (mut dispatcher, ids) = dispatcher_with(
        &grid,
        &[
            CellCoord::new(0, 0),
            CellCoord::new(1, 0),
            CellCoord::new(2, 0),
        ],
    );

    assert!(dispatcher.select(ids[2], true));
    assert!(dispatcher.select(ids[0], true));
    assert!(dispatcher.select(ids[2], true));

    assert_eq!(dispatcher.selection(), &[ids[2], ids[0]]);
}

#[test]
fn selecting_unknown_agent_is_refused() {
    let grid = open_grid(2, 2);
    let (mut dispatcher, ids) = dispatcher_with(&grid, &[CellCoord::new(0, 0)]);
    assert!(dispatcher.select(ids[0], false));

    assert!(!dispatcher.select(AgentId::new(99), false));
    assert_eq!(
        dispatcher.selection(),
        &[ids[0]],
        "a refused selection leaves the current one untouched"
    );
}

#[test]
fn deselect_all_clears_highlights() {
    let grid = open_grid(3, 1);
    let (mut dispatcher, ids) = dispatcher_with(&grid, &[CellCoord::new(0, 0), CellCoord::new(2, 0)]);
    for id in &ids {
        assert!(dispatcher.select(*id, true));
    }

    dispatcher.deselect_all();

    assert!(dispatcher.selection().is_empty());
    assert!(dispatcher.units().all(|unit| !unit.is_highlighted()));
}

#[test]
fn command_move_only_affects_selected_agents() {
    let grid = open_grid(6, 6);
    let (mut dispatcher, ids) = dispatcher_with(
        &grid,
        &[
            CellCoord::new(0, 0),
            CellCoord::new(0, 5),
            CellCoord::new(5, 0),
        ],
    );
    assert!(dispatcher.select(ids[0], true));
    assert!(dispatcher.select(ids[1], true));

    dispatcher
        .command_move(&grid, &AStar::new(), CellCoord::new(5, 5))
        .expect("target in bounds");

    let state = |id| dispatcher.unit(id).expect("unit").agent().state();
    assert_eq!(state(ids[0]), MovementState::Moving);
    assert_eq!(state(ids[1]), MovementState::Moving);
    assert_eq!(state(ids[2]), MovementState::Idle);
}

#[test]
fn selected_agents_converge_on_target() {
    let grid = open_grid(6, 6);
    let target = CellCoord::new(3, 3);
    let (mut dispatcher, ids) = dispatcher_with(
        &grid,
        &[
            CellCoord::new(0, 0),
            CellCoord::new(5, 5),
            CellCoord::new(0, 5),
        ],
    );
    for id in &ids {
        assert!(dispatcher.select(*id, true));
    }

    dispatcher
        .command_move(&grid, &AStar::new(), target)
        .expect("target in bounds");
    for _ in 0..100 {
        dispatcher.tick(TICK);
    }

    for unit in dispatcher.units() {
        assert_eq!(unit.agent().state(), MovementState::Idle);
        assert_eq!(grid.world_to_coordinate(unit.agent().position()), target);
    }
}

#[test]
fn out_of_bounds_target_is_an_error() {
    let grid = open_grid(4, 4);
    let (mut dispatcher, ids) = dispatcher_with(&grid, &[CellCoord::new(1, 1)]);
    assert!(dispatcher.select(ids[0], false));

    let result = dispatcher.command_move(&grid, &AStar::new(), CellCoord::new(4, 0));

    assert!(matches!(
        result,
        Err(GridError::OutOfBoundsCoordinate { .. })
    ));
    assert_eq!(
        dispatcher.unit(ids[0]).expect("unit").agent().state(),
        MovementState::Idle
    );
}

#[test]
fn unreachable_target_leaves_agents_idle() {
    let grid = Grid::build_with(GridConfiguration::new(5, 3, 1.0, true), &palette(), |coord| {
        usize::from(coord.x() == 2)
    })
    .expect("walled grid");
    let (mut dispatcher, ids) = dispatcher_with(&grid, &[CellCoord::new(0, 1)]);
    assert!(dispatcher.select(ids[0], false));

    dispatcher
        .command_move(&grid, &AStar::new(), CellCoord::new(4, 1))
        .expect("target in bounds");

    assert_eq!(
        dispatcher.unit(ids[0]).expect("unit").agent().state(),
        MovementState::Idle
    );
}

#[test]
fn demo_agents_land_on_walkable_cells() {
    let grid = Grid::build_with(GridConfiguration::new(8, 8, 1.0, true), &palette(), |coord| {
        usize::from(coord.x() % 2 == 1)
    })
    .expect("striped grid");
    let mut dispatcher = Dispatcher::default();
    let mut rng = ChaCha8Rng::seed_from_u64(7);

    let ids = dispatcher.spawn_demo_agents(&grid, 5, &mut rng);

    assert_eq!(ids.len(), 5);
    for unit in dispatcher.units() {
        let coord = grid.world_to_coordinate(unit.agent().position());
        assert!(grid.cell(coord).expect("in bounds").is_walkable());
    }
}

#[test]
fn demo_spawn_gives_up_without_walkable_cells() {
    let grid = Grid::build_with(
        GridConfiguration::new(4, 4, 1.0, true),
        &palette(),
        |_| 1,
    )
    .expect("flooded grid");
    let mut dispatcher = Dispatcher::default();
    let mut rng = ChaCha8Rng::seed_from_u64(1);

    let ids = dispatcher.spawn_demo_agents(&grid, 3, &mut rng);

    assert!(ids.is_empty());
    assert_eq!(dispatcher.units().count(), 0);
}

#[test]
fn demo_spawn_is_reproducible_for_a_seed() {
    let grid = open_grid(10, 10);
    let positions = |seed| {
        let mut dispatcher = Dispatcher::default();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let _ = dispatcher.spawn_demo_agents(&grid, 6, &mut rng);
        dispatcher
            .units()
            .map(|unit| unit.agent().position().to_array())
            .collect::<Vec<_>>()
    };

    assert_eq!(positions(42), positions(42));
}

#[test]
fn agents_spawn_on_free_cells_around_placed_building() {
    let mut grid = open_grid(6, 6);
    let definition = BuildingDefinition {
        spawned_agents: 3,
        ..BuildingDefinition::new("barracks", 2, 2)
    };
    let footprint = definition.footprint_at(CellCoord::new(2, 2));
    assert!(PlacementValidator::new().commit(&mut grid, &footprint));

    let mut dispatcher = Dispatcher::default();
    let ids = dispatcher.spawn_around(&grid, &footprint, definition.spawned_agents);

    let coords: Vec<_> = ids
        .iter()
        .map(|id| {
            let unit = dispatcher.unit(*id).expect("spawned unit");
            grid.world_to_coordinate(unit.agent().position())
        })
        .collect();
    assert_eq!(
        coords,
        vec![
            CellCoord::new(1, 4),
            CellCoord::new(2, 4),
            CellCoord::new(3, 4),
        ]
    );
}

#[test]
fn spawn_around_skips_blocked_and_outside_cells() {
    let mut grid = open_grid(3, 3);
    grid.set_walkable_override(CellCoord::new(1, 1), false)
        .expect("in bounds");
    let footprint = BuildingDefinition::new("post", 1, 1).footprint_at(CellCoord::new(0, 0));
    assert!(PlacementValidator::new().commit(&mut grid, &footprint));

    let mut dispatcher = Dispatcher::default();
    let ids = dispatcher.spawn_around(&grid, &footprint, 8);

    let coords: Vec<_> = ids
        .iter()
        .map(|id| grid.world_to_coordinate(dispatcher.unit(*id).expect("unit").agent().position()))
        .collect();
    assert_eq!(coords, vec![CellCoord::new(0, 1), CellCoord::new(1, 0)]);
}

#[test]
fn dispatch_replay_is_deterministic() {
    let grid = open_grid(8, 8);
    let run = || {
        let mut dispatcher = Dispatcher::new(UnitType {
            name: "scout".to_owned(),
            move_speed: 4.0,
        })
        .expect("valid unit type");
        let mut rng = ChaCha8Rng::seed_from_u64(2024);
        for id in dispatcher.spawn_demo_agents(&grid, 4, &mut rng) {
            assert!(dispatcher.select(id, true));
        }
        dispatcher
            .command_move(&grid, &AStar::new(), CellCoord::new(7, 7))
            .expect("target in bounds");

        let mut trace = Vec::new();
        for _ in 0..30 {
            dispatcher.tick(TICK);
            trace.extend(dispatcher.units().map(|unit| unit.agent().position().to_array()));
        }
        trace
    };

    assert_eq!(run(), run());
}

#[test]
fn spawn_agent_at_accepts_any_position() {
    let mut dispatcher = Dispatcher::default();
    let id = dispatcher.spawn_agent_at(Vec3::new(-5.0, 0.0, 100.0));
    assert_eq!(
        dispatcher.unit(id).expect("unit").agent().position(),
        Vec3::new(-5.0, 0.0, 100.0)
    );
}

#[test]
fn demo_spawn_caps_oversized_requests_at_free_cells() {
    let mut grid = open_grid(3, 3);
    grid.set_occupied(CellCoord::new(1, 1), true)
        .expect("in bounds");
    let mut dispatcher = Dispatcher::default();
    let mut rng = ChaCha8Rng::seed_from_u64(9);

    let ids = dispatcher.spawn_demo_agents(&grid, usize::MAX, &mut rng);

    assert!(!ids.is_empty());
    assert!(ids.len() <= 8, "only eight cells are free");
    let mut cells: Vec<_> = dispatcher
        .units()
        .map(|unit| grid.world_to_coordinate(unit.agent().position()))
        .collect();
    cells.sort();
    cells.dedup();
    assert_eq!(cells.len(), ids.len(), "demo agents never share a cell");
    assert!(!cells.contains(&CellCoord::new(1, 1)));
}

#[test]
fn dispatcher_rejects_unit_type_that_cannot_move() {
    for move_speed in [-1.0, 0.0, f32::NAN] {
        let result = Dispatcher::new(UnitType {
            name: "stuck".to_owned(),
            move_speed,
        });
        assert!(
            matches!(result, Err(UnitTypeError::InvalidMoveSpeed { .. })),
            "speed {move_speed} must be refused"
        );
    }
}
