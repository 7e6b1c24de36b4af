#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Footprint reservation rules and the placement session that drives them.
//!
//! [`PlacementValidator`] is the only component that mutates grid occupancy.
//! A [`PlacementSession`] represents one in-progress placement: it is created
//! by [`PlacementSession::begin`] and consumed by either
//! [`PlacementSession::confirm`] or [`PlacementSession::cancel`].

use serde::{Deserialize, Serialize};
use tactical_grid_core::{CellCoord, Footprint, PlacementRejection, Vec3};
use tactical_grid_world::Grid;
use tracing::{debug, info, warn};

/// Checks and commits footprint reservations against a grid.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlacementValidator;

impl PlacementValidator {
    /// Creates a validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Explains why `footprint` cannot be reserved, if it cannot.
    ///
    /// Every covered coordinate must be in bounds, effectively walkable and
    /// not yet occupied.
    pub fn check(&self, grid: &Grid, footprint: &Footprint) -> Result<(), PlacementRejection> {
        if footprint.width == 0 || footprint.height == 0 {
            return Err(PlacementRejection::EmptyFootprint);
        }

        for coord in footprint.covered() {
            let cell = grid
                .cell(coord)
                .map_err(|_| PlacementRejection::OutOfBounds)?;
            if !cell.is_walkable() {
                return Err(PlacementRejection::Unwalkable);
            }
            if cell.is_occupied() {
                return Err(PlacementRejection::Occupied);
            }
        }

        Ok(())
    }

    /// Reports whether `footprint` can be reserved right now.
    #[must_use]
    pub fn can_place(&self, grid: &Grid, footprint: &Footprint) -> bool {
        self.check(grid, footprint).is_ok()
    }

    /// Re-validates and, if valid, reserves every covered cell.
    ///
    /// Reserved cells become occupied and lose their walkable override.
    /// Nothing is mutated when validation fails.
    pub fn commit(&self, grid: &mut Grid, footprint: &Footprint) -> bool {
        if let Err(reason) = self.check(grid, footprint) {
            debug!(origin = %footprint.origin, ?reason, "placement rejected");
            return false;
        }

        for coord in footprint.covered() {
            let reserved = grid
                .set_occupied(coord, true)
                .and_then(|()| grid.set_walkable_override(coord, false));
            if let Err(error) = reserved {
                warn!(%error, "validated footprint left the grid");
                return false;
            }
        }

        info!(
            origin = %footprint.origin,
            width = footprint.width,
            height = footprint.height,
            "footprint reserved"
        );
        true
    }
}

/// Static description of something that can be placed on the grid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingDefinition {
    /// Identifier shown in build menus.
    pub id: String,
    /// Footprint extent along `x`.
    pub width: u32,
    /// Footprint extent along `y`.
    pub height: u32,
    /// Column of the anchor cell within the footprint.
    #[serde(default)]
    pub offset_x: i32,
    /// Row of the anchor cell within the footprint.
    #[serde(default)]
    pub offset_y: i32,
    /// Agents spawned next to the building once it is placed.
    #[serde(default)]
    pub spawned_agents: u32,
}

impl BuildingDefinition {
    /// Creates a definition anchored at its lowest corner that spawns nothing.
    #[must_use]
    pub fn new(id: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            id: id.into(),
            width,
            height,
            offset_x: 0,
            offset_y: 0,
            spawned_agents: 0,
        }
    }

    /// Footprint of the building anchored at `origin`.
    #[must_use]
    pub const fn footprint_at(&self, origin: CellCoord) -> Footprint {
        Footprint::new(origin, self.width, self.height, self.offset_x, self.offset_y)
    }
}

/// Feedback for presentation layers while a placement is in progress.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlacementPreview {
    /// Cell under the pointer that anchors the footprint.
    pub origin: CellCoord,
    /// Cells the building would cover.
    pub footprint: Footprint,
    /// Whether confirming now would succeed.
    pub placeable: bool,
}

/// Result of a successful confirmation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlacedBuilding {
    /// Identifier of the placed definition.
    pub id: String,
    /// Cells reserved for the building.
    pub footprint: Footprint,
    /// Agents to spawn next to the building.
    pub spawned_agents: u32,
}

/// Reasons a confirmation did not place anything.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfirmRejection {
    /// The pointer never hovered the grid, so no origin is known.
    NoOrigin,
    /// The footprint failed validation.
    Invalid(PlacementRejection),
}

/// Outcome of [`PlacementSession::confirm`].
#[derive(Debug)]
pub enum ConfirmOutcome {
    /// The footprint was reserved and the session is finished.
    Placed(PlacedBuilding),
    /// Nothing was reserved; the session is handed back so placement can continue.
    Rejected {
        /// The still-open session.
        session: PlacementSession,
        /// Why the confirmation failed.
        reason: ConfirmRejection,
    },
}

/// One in-progress placement of a building.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacementSession {
    definition: BuildingDefinition,
    footprint: Footprint,
    origin: Option<CellCoord>,
}

impl PlacementSession {
    /// Opens a session for `definition`. No origin is known until the first hover.
    #[must_use]
    pub fn begin(definition: BuildingDefinition) -> Self {
        let footprint = definition.footprint_at(CellCoord::default());
        debug!(building = %definition.id, "placement started");
        Self {
            definition,
            footprint,
            origin: None,
        }
    }

    /// Definition being placed.
    #[must_use]
    pub fn definition(&self) -> &BuildingDefinition {
        &self.definition
    }

    /// Cell anchoring the footprint, once the pointer hovered the grid.
    #[must_use]
    pub const fn origin(&self) -> Option<CellCoord> {
        self.origin
    }

    /// Turns the footprint a quarter turn around its anchor.
    pub fn rotate(&mut self) {
        self.footprint = self.footprint.rotated();
    }

    /// Moves the anchor to the cell under `world_position` and reports placeability.
    pub fn hover(&mut self, grid: &Grid, world_position: Vec3) -> PlacementPreview {
        let origin = grid.world_to_coordinate(world_position);
        self.origin = Some(origin);
        self.footprint = self.footprint.anchored_at(origin);
        PlacementPreview {
            origin,
            footprint: self.footprint,
            placeable: PlacementValidator::new().can_place(grid, &self.footprint),
        }
    }

    /// Validates and commits the footprint under the last hovered origin.
    pub fn confirm(self, grid: &mut Grid) -> ConfirmOutcome {
        if self.origin.is_none() {
            return ConfirmOutcome::Rejected {
                session: self,
                reason: ConfirmRejection::NoOrigin,
            };
        }

        let validator = PlacementValidator::new();
        if let Err(reason) = validator.check(grid, &self.footprint) {
            return ConfirmOutcome::Rejected {
                session: self,
                reason: ConfirmRejection::Invalid(reason),
            };
        }

        if !validator.commit(grid, &self.footprint) {
            return ConfirmOutcome::Rejected {
                session: self,
                reason: ConfirmRejection::Invalid(PlacementRejection::OutOfBounds),
            };
        }

        ConfirmOutcome::Placed(PlacedBuilding {
            id: self.definition.id,
            footprint: self.footprint,
            spawned_agents: self.definition.spawned_agents,
        })
    }

    /// Abandons the placement without touching the grid.
    pub fn cancel(self) {
        debug!(building = %self.definition.id, "placement cancelled");
    }
}
