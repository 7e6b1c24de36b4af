#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-agent path following.
//!
//! Each [`Agent`] owns a [`MovementController`] that acquires a path from a
//! [`Pathfinder`] when given a target and then walks it waypoint by waypoint,
//! one tick at a time. A new target always replaces the current path.

use std::time::Duration;

use tactical_grid_core::{AgentId, Vec3};
use tactical_grid_world::{
    pathfinding::{Path, Pathfinder},
    Grid,
};
use tracing::{debug, trace};

/// Distance below which a waypoint counts as reached, in world units.
pub const ARRIVAL_RADIUS: f32 = 0.05;

/// Movement phase of an agent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MovementState {
    /// No path is being followed.
    #[default]
    Idle,
    /// The agent is walking toward `path[index]`.
    Moving,
}

/// Path-follow state machine for a single agent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MovementController {
    path: Path,
    index: usize,
    state: MovementState,
}

impl MovementController {
    /// Creates an idle controller without a path.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            path: Path::empty(),
            index: 0,
            state: MovementState::Idle,
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn state(&self) -> MovementState {
        self.state
    }

    /// Reports whether the controller is following a path.
    #[must_use]
    pub fn is_moving(&self) -> bool {
        self.state == MovementState::Moving
    }

    /// Path acquired by the most recent target request.
    #[must_use]
    pub const fn path(&self) -> &Path {
        &self.path
    }

    /// Index of the waypoint currently walked toward.
    #[must_use]
    pub const fn path_index(&self) -> usize {
        self.index
    }

    /// Replaces the current path with one from `position` to `goal`.
    ///
    /// Both positions are projected onto the grid. The controller moves only
    /// when the new path has more than one cell; an empty path (no route)
    /// leaves it idle without signalling the caller.
    pub fn set_target<P>(&mut self, grid: &Grid, pathfinder: &P, position: Vec3, goal: Vec3)
    where
        P: Pathfinder + ?Sized,
    {
        let start = grid.world_to_coordinate(position);
        let goal = grid.world_to_coordinate(goal);

        self.path = pathfinder.find_path(grid, start, goal);
        self.index = 0;
        self.state = if self.path.len() > 1 {
            MovementState::Moving
        } else {
            MovementState::Idle
        };

        if self.path.is_empty() {
            debug!(%start, %goal, "no route; staying idle");
        }
    }

    /// Moves `position` toward the current waypoint by at most `speed * dt`.
    ///
    /// A step that is not a positive number leaves `position` unchanged.
    pub fn advance(&mut self, position: &mut Vec3, speed: f32, dt: Duration) {
        if self.state != MovementState::Moving {
            return;
        }

        let Some(waypoint) = self.path.get(self.index).map(|cell| cell.world_position()) else {
            self.state = MovementState::Idle;
            return;
        };

        *position = move_towards(*position, waypoint, speed * dt.as_secs_f32());

        if position.distance(waypoint) < ARRIVAL_RADIUS {
            trace!(index = self.index, "waypoint reached");
            self.index += 1;
            if self.index >= self.path.len() {
                self.state = MovementState::Idle;
            }
        }
    }
}

/// Movement-bearing entity with a continuous world position.
#[derive(Clone, Debug, PartialEq)]
pub struct Agent {
    id: AgentId,
    position: Vec3,
    speed: f32,
    controller: MovementController,
}

impl Agent {
    /// Creates an idle agent at `position` moving at `speed` world units per second.
    #[must_use]
    pub const fn new(id: AgentId, position: Vec3, speed: f32) -> Self {
        Self {
            id,
            position,
            speed,
            controller: MovementController::new(),
        }
    }

    /// Identifier of the agent.
    #[must_use]
    pub const fn id(&self) -> AgentId {
        self.id
    }

    /// Current world position.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Travel speed in world units per second.
    #[must_use]
    pub const fn speed(&self) -> f32 {
        self.speed
    }

    /// Path-follow state machine.
    #[must_use]
    pub const fn controller(&self) -> &MovementController {
        &self.controller
    }

    /// Current movement phase.
    #[must_use]
    pub const fn state(&self) -> MovementState {
        self.controller.state()
    }

    /// Requests a path from the agent's position to `goal`, replacing any current one.
    pub fn set_target<P>(&mut self, grid: &Grid, pathfinder: &P, goal: Vec3)
    where
        P: Pathfinder + ?Sized,
    {
        self.controller
            .set_target(grid, pathfinder, self.position, goal);
    }

    /// Advances the agent by one tick.
    pub fn advance(&mut self, dt: Duration) {
        self.controller.advance(&mut self.position, self.speed, dt);
    }
}

fn move_towards(current: Vec3, target: Vec3, max_step: f32) -> Vec3 {
    if max_step.is_nan() || max_step <= 0.0 {
        return current;
    }
    let delta = target - current;
    let distance = delta.length();
    if distance <= max_step || distance <= f32::EPSILON {
        target
    } else {
        current + delta / distance * max_step
    }
}
