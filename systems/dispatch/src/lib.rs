#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Agent roster, selection set and command fan-out.
//!
//! The [`Dispatcher`] owns every spawned unit, keeps the player's selection
//! in insertion order and forwards move commands to each selected agent in
//! that order. Agents never coordinate with each other.

use std::{
    collections::{BTreeMap, BTreeSet},
    time::Duration,
};

use rand::Rng;
use serde::{Deserialize, Serialize};
use tactical_grid_core::{AgentId, CellCoord, Footprint, GridError, Vec3};
use tactical_grid_system_movement::Agent;
use tactical_grid_world::{pathfinding::Pathfinder, Grid};
use tracing::{debug, info, warn};

const DEFAULT_MOVE_SPEED: f32 = 3.0;
const DRAWS_PER_DEMO_AGENT: usize = 64;

/// Hooks invoked when an entity enters or leaves the selection.
pub trait Selectable {
    /// Called once when the entity joins the selection.
    fn on_select(&mut self);
    /// Called once when the entity leaves the selection.
    fn on_deselect(&mut self);
    /// Short label for presentation layers.
    fn label(&self) -> &str;
}

/// Configuration shared by every unit the dispatcher spawns.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnitType {
    /// Display name of the unit type.
    pub name: String,
    /// Travel speed in world units per second.
    #[serde(default = "default_move_speed")]
    pub move_speed: f32,
}

impl Default for UnitType {
    fn default() -> Self {
        Self {
            name: "infantry".to_owned(),
            move_speed: DEFAULT_MOVE_SPEED,
        }
    }
}

fn default_move_speed() -> f32 {
    DEFAULT_MOVE_SPEED
}

impl UnitType {
    /// Rejects a move speed that is not a finite number above zero.
    pub fn validate(&self) -> Result<(), UnitTypeError> {
        if self.move_speed.is_finite() && self.move_speed > 0.0 {
            Ok(())
        } else {
            Err(UnitTypeError::InvalidMoveSpeed {
                name: self.name.clone(),
                move_speed: self.move_speed,
            })
        }
    }
}

/// Malformed unit configuration.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum UnitTypeError {
    /// Agents of this type would never approach their waypoints.
    #[error("unit type `{name}` has move speed {move_speed}; it must be finite and positive")]
    InvalidMoveSpeed {
        /// Name of the offending unit type.
        name: String,
        /// Declared move speed.
        move_speed: f32,
    },
}

/// A spawned agent together with its selection state.
#[derive(Clone, Debug, PartialEq)]
pub struct Unit {
    agent: Agent,
    label: String,
    highlighted: bool,
}

impl Unit {
    /// Movement-bearing agent backing the unit.
    #[must_use]
    pub const fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Reports whether the unit is rendered as selected.
    #[must_use]
    pub const fn is_highlighted(&self) -> bool {
        self.highlighted
    }
}

impl Selectable for Unit {
    fn on_select(&mut self) {
        self.highlighted = true;
    }

    fn on_deselect(&mut self) {
        self.highlighted = false;
    }

    fn label(&self) -> &str {
        &self.label
    }
}

/// Owns the units and fans commands out to the selected ones.
#[derive(Debug)]
pub struct Dispatcher {
    unit_type: UnitType,
    units: BTreeMap<AgentId, Unit>,
    selection: Vec<AgentId>,
    next_id: u32,
}

impl Dispatcher {
    /// Creates an empty roster spawning units of `unit_type`.
    ///
    /// Fails when the unit type's move speed is not finite and positive.
    pub fn new(unit_type: UnitType) -> Result<Self, UnitTypeError> {
        unit_type.validate()?;
        Ok(Self::with_valid_unit_type(unit_type))
    }

    fn with_valid_unit_type(unit_type: UnitType) -> Self {
        Self {
            unit_type,
            units: BTreeMap::new(),
            selection: Vec::new(),
            next_id: 0,
        }
    }

    /// Spawns a unit at an arbitrary world position.
    ///
    /// Bypasses every spawn rule; intended for test and debug harnesses.
    pub fn spawn_agent_at(&mut self, position: Vec3) -> AgentId {
        let id = AgentId::new(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        let unit = Unit {
            agent: Agent::new(id, position, self.unit_type.move_speed),
            label: self.unit_type.name.clone(),
            highlighted: false,
        };
        let _ = self.units.insert(id, unit);
        debug!(agent = id.get(), ?position, "agent spawned");
        id
    }

    /// Spawns up to `count` units on distinct, uniformly random walkable cells.
    ///
    /// At most one unit lands on each free cell, and the search gives up after
    /// a bounded number of draws, so a grid with few or no walkable cells
    /// yields fewer units instead of stalling.
    pub fn spawn_demo_agents<R>(&mut self, grid: &Grid, count: usize, rng: &mut R) -> Vec<AgentId>
    where
        R: Rng,
    {
        let free = grid
            .cells()
            .filter(|cell| cell.is_walkable() && !cell.is_occupied())
            .count();
        let wanted = count.min(free);
        let mut spawned = Vec::with_capacity(wanted);
        let mut taken = BTreeSet::new();

        let mut draws = wanted.saturating_mul(DRAWS_PER_DEMO_AGENT);
        while spawned.len() < wanted && draws > 0 {
            draws -= 1;
            let coord = CellCoord::new(
                rng.gen_range(0..to_i32(grid.width())),
                rng.gen_range(0..to_i32(grid.height())),
            );
            let Ok(cell) = grid.cell(coord) else {
                continue;
            };
            if !cell.is_walkable() || cell.is_occupied() || !taken.insert(coord) {
                continue;
            }
            spawned.push(self.spawn_agent_at(cell.world_position()));
        }

        if spawned.len() < count {
            warn!(
                requested = count,
                spawned = spawned.len(),
                "not enough walkable cells for demo agents"
            );
        }
        spawned
    }

    /// Spawns up to `count` units on free cells bordering `footprint`.
    ///
    /// The ring around the footprint is scanned clockwise from the cell
    /// north-west of it; each free cell receives at most one unit.
    pub fn spawn_around(
        &mut self,
        grid: &Grid,
        footprint: &Footprint,
        count: u32,
    ) -> Vec<AgentId> {
        let wanted = usize::try_from(count).unwrap_or(usize::MAX);
        let positions: Vec<Vec3> = perimeter(footprint)
            .into_iter()
            .filter_map(|coord| grid.cell(coord).ok())
            .filter(|cell| cell.is_walkable() && !cell.is_occupied())
            .map(|cell| cell.world_position())
            .take(wanted)
            .collect();

        let spawned: Vec<AgentId> = positions
            .into_iter()
            .map(|position| self.spawn_agent_at(position))
            .collect();
        info!(
            origin = %footprint.origin,
            spawned = spawned.len(),
            "agents spawned around placement"
        );
        spawned
    }

    /// Unit registered under `id`.
    #[must_use]
    pub fn unit(&self, id: AgentId) -> Option<&Unit> {
        self.units.get(&id)
    }

    /// Every unit in identifier order.
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    /// Selected agents in the order they were selected.
    #[must_use]
    pub fn selection(&self) -> &[AgentId] {
        &self.selection
    }

    /// Adds `id` to the selection, first clearing it unless `additive`.
    ///
    /// Returns `false` when no unit is registered under `id`.
    pub fn select(&mut self, id: AgentId, additive: bool) -> bool {
        if !self.units.contains_key(&id) {
            return false;
        }

        if !additive {
            self.deselect_all();
        }

        if !self.selection.contains(&id) {
            self.selection.push(id);
            if let Some(unit) = self.units.get_mut(&id) {
                unit.on_select();
            }
        }
        true
    }

    /// Invokes the deselect hook on every selected unit and clears the selection.
    pub fn deselect_all(&mut self) {
        for id in self.selection.drain(..) {
            if let Some(unit) = self.units.get_mut(&id) {
                unit.on_deselect();
            }
        }
    }

    /// Sends every selected agent toward `target`, one after another.
    ///
    /// Fails only when `target` lies outside the grid. Agents that find no
    /// route stay idle.
    pub fn command_move<P>(
        &mut self,
        grid: &Grid,
        pathfinder: &P,
        target: CellCoord,
    ) -> Result<(), GridError>
    where
        P: Pathfinder + ?Sized,
    {
        let goal = grid.cell(target)?.world_position();
        for id in &self.selection {
            if let Some(unit) = self.units.get_mut(id) {
                unit.agent.set_target(grid, pathfinder, goal);
            }
        }
        info!(%target, agents = self.selection.len(), "move commanded");
        Ok(())
    }

    /// Advances every unit by one tick in identifier order.
    pub fn tick(&mut self, dt: Duration) {
        for unit in self.units.values_mut() {
            unit.agent.advance(dt);
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::with_valid_unit_type(UnitType::default())
    }
}

fn perimeter(footprint: &Footprint) -> Vec<CellCoord> {
    if footprint.width == 0 || footprint.height == 0 {
        return Vec::new();
    }

    let low = footprint.min_corner();
    let high = low.offset(to_i32(footprint.width) - 1, to_i32(footprint.height) - 1);
    let (west, east) = (low.x() - 1, high.x() + 1);
    let (south, north) = (low.y() - 1, high.y() + 1);

    let mut ring = Vec::new();
    ring.extend((west..=east).map(|x| CellCoord::new(x, north)));
    ring.extend((south..north).rev().map(|y| CellCoord::new(east, y)));
    ring.extend((west..east).rev().map(|x| CellCoord::new(x, south)));
    ring.extend((south + 1..north).map(|y| CellCoord::new(west, y)));
    ring
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}
