#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a scripted, headless tactical grid session.

mod scenario;

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use scenario::Scenario;
use tactical_grid_core::CellCoord;
use tactical_grid_system_dispatch::{Dispatcher, Selectable};
use tactical_grid_system_movement::MovementState;
use tactical_grid_system_placement::{
    BuildingDefinition, ConfirmOutcome, PlacedBuilding, PlacementSession,
};
use tactical_grid_world::{pathfinding::AStar, Grid};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const TICK: Duration = Duration::from_millis(100);

/// Command line arguments accepted by the tactical grid binary.
#[derive(Debug, Parser)]
#[command(name = "tactical-grid", about = "Headless tactical grid session")]
struct CliArgs {
    /// TOML scenario file; the built-in scenario is used when omitted.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Overrides the number of grid columns.
    #[arg(long)]
    width: Option<u32>,
    /// Overrides the number of grid rows.
    #[arg(long)]
    height: Option<u32>,
    /// Overrides the cell side length in world units.
    #[arg(long)]
    node_size: Option<f32>,
    /// Lays the grid on the XY plane instead of XZ.
    #[arg(long)]
    xy_plane: bool,
    /// Seed for terrain assignment and demo spawns.
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Number of demo agents spawned on random walkable cells.
    #[arg(long, default_value_t = 4)]
    agents: usize,
    /// Number of simulation ticks to run after the move command.
    #[arg(long, default_value_t = 200)]
    ticks: u32,
    /// Move target as `x,y`; defaults to the corner opposite the origin.
    #[arg(long, value_name = "X,Y", value_parser = parse_coord)]
    target: Option<CellCoord>,
    /// Log filter directive; takes precedence over `RUST_LOG`.
    #[arg(long)]
    log_level: Option<String>,
}

impl CliArgs {
    fn scenario(&self) -> Result<Scenario> {
        let mut scenario = match &self.config {
            Some(path) => Scenario::load(path)?,
            None => Scenario::default(),
        };

        if let Some(width) = self.width {
            scenario.grid.width = width;
        }
        if let Some(height) = self.height {
            scenario.grid.height = height;
        }
        if let Some(node_size) = self.node_size {
            scenario.grid.node_size = node_size;
        }
        if self.xy_plane {
            scenario.grid.use_planar_xz = false;
        }

        Ok(scenario)
    }
}

fn parse_coord(value: &str) -> Result<CellCoord, String> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| format!("expected `x,y`, got `{value}`"))?;
    let x = x.trim().parse().map_err(|_| format!("invalid x in `{value}`"))?;
    let y = y.trim().parse().map_err(|_| format!("invalid y in `{value}`"))?;
    Ok(CellCoord::new(x, y))
}

fn init_tracing(log_level: Option<&str>) {
    let filter = match log_level {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Summary of a finished headless session.
#[derive(Debug, PartialEq)]
struct SessionReport {
    placed: Vec<PlacedBuilding>,
    agents: usize,
    arrived: usize,
    target: CellCoord,
}

fn run(args: &CliArgs) -> Result<(SessionReport, Dispatcher, Grid)> {
    let scenario = args.scenario()?;
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let mut grid = Grid::build(scenario.grid, &scenario.palette(), &mut rng)
        .context("failed to build grid")?;

    let mut dispatcher =
        Dispatcher::new(scenario.unit.clone()).context("invalid unit configuration")?;
    let _ = dispatcher.spawn_demo_agents(&grid, args.agents, &mut rng);

    let mut placed = Vec::new();
    for definition in &scenario.buildings {
        match place_near_center(&mut grid, definition) {
            Some(building) => {
                let spawned = building.spawned_agents;
                let _ = dispatcher.spawn_around(&grid, &building.footprint, spawned);
                placed.push(building);
            }
            None => warn!(building = %definition.id, "no free spot for building"),
        }
    }

    let ids: Vec<_> = dispatcher.units().map(|unit| unit.agent().id()).collect();
    for id in ids {
        let _ = dispatcher.select(id, true);
    }

    let target = args.target.unwrap_or_else(|| {
        CellCoord::new(
            i32::try_from(grid.width()).unwrap_or(i32::MAX) - 1,
            i32::try_from(grid.height()).unwrap_or(i32::MAX) - 1,
        )
    });
    dispatcher
        .command_move(&grid, &AStar::new(), target)
        .with_context(|| format!("cannot command a move to {target}"))?;

    for _ in 0..args.ticks {
        dispatcher.tick(TICK);
    }

    let arrived = dispatcher
        .units()
        .filter(|unit| {
            unit.agent().state() == MovementState::Idle
                && grid.world_to_coordinate(unit.agent().position()) == target
        })
        .count();
    let report = SessionReport {
        placed,
        agents: dispatcher.units().count(),
        arrived,
        target,
    };
    Ok((report, dispatcher, grid))
}

/// Places `definition` on the free spot closest to the grid center.
fn place_near_center(grid: &mut Grid, definition: &BuildingDefinition) -> Option<PlacedBuilding> {
    let center = CellCoord::new(
        i32::try_from(grid.width() / 2).unwrap_or(i32::MAX),
        i32::try_from(grid.height() / 2).unwrap_or(i32::MAX),
    );
    let mut candidates: Vec<CellCoord> = grid.cells().map(|cell| cell.coord()).collect();
    candidates.sort_by_key(|coord| (coord.manhattan_distance(center), *coord));

    let mut session = PlacementSession::begin(definition.clone());
    for origin in candidates {
        let preview = session.hover(grid, grid.world_position(origin));
        if !preview.placeable {
            continue;
        }
        match session.confirm(grid) {
            ConfirmOutcome::Placed(building) => return Some(building),
            ConfirmOutcome::Rejected { session: open, .. } => session = open,
        }
    }

    session.cancel();
    None
}

/// Entry point for the tactical grid command-line interface.
fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(args.log_level.as_deref());

    let (report, dispatcher, grid) = run(&args)?;
    info!(
        agents = report.agents,
        arrived = report.arrived,
        "session finished"
    );

    for building in &report.placed {
        println!(
            "placed {} at {} ({}x{})",
            building.id,
            building.footprint.origin,
            building.footprint.width,
            building.footprint.height
        );
    }
    for unit in dispatcher.units() {
        let agent = unit.agent();
        println!(
            "agent {} [{}] at {} {:?}",
            agent.id().get(),
            unit.label(),
            grid.world_to_coordinate(agent.position()),
            agent.state()
        );
    }
    println!(
        "{} of {} agents reached {}",
        report.arrived, report.agents, report.target
    );
    Ok(())
}
