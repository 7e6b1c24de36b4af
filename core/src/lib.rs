#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the tactical grid engine.
//!
//! This crate defines the vocabulary that connects the authoritative grid,
//! the search, the placement rules and the agents that walk the map. Cells
//! are addressed exclusively through [`CellCoord`], terrain is described by
//! shared [`TerrainKind`] values collected into a [`TerrainPalette`], and
//! every fatal boundary or configuration violation is reported through
//! [`GridError`]. Gameplay-level refusals such as a rejected footprint are
//! expressed with [`PlacementRejection`] instead and never abort the caller.

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};

pub use glam::Vec3;

/// Integer address of a single grid cell.
///
/// Coordinates may lie outside any particular grid; bounds are only
/// meaningful relative to the grid that interprets them.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct CellCoord {
    x: i32,
    y: i32,
}

impl CellCoord {
    /// Creates a new grid coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Column index of the cell.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Row index of the cell.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Returns the coordinate displaced by the provided deltas.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }

    /// Returns the adjacent coordinate in the provided direction.
    #[must_use]
    pub const fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        self.offset(dx, dy)
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Cardinal directions used for 4-connected traversal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Movement toward increasing `y`.
    North,
    /// Movement toward increasing `x`.
    East,
    /// Movement toward decreasing `y`.
    South,
    /// Movement toward decreasing `x`.
    West,
}

impl Direction {
    /// All directions in the fixed order used for neighbor expansion.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Coordinate delta produced by a single step in this direction.
    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::North => (0, 1),
            Self::East => (1, 0),
            Self::South => (0, -1),
            Self::West => (-1, 0),
        }
    }
}

/// Unique identifier assigned to an agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentId(u32);

impl AgentId {
    /// Creates a new agent identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Display color attached to a terrain kind. Irrelevant to the simulation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DisplayColor {
    red: u8,
    green: u8,
    blue: u8,
}

impl DisplayColor {
    /// Creates a new color from byte RGB components.
    #[must_use]
    pub const fn from_rgb(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Red component of the color.
    #[must_use]
    pub const fn red(&self) -> u8 {
        self.red
    }

    /// Green component of the color.
    #[must_use]
    pub const fn green(&self) -> u8 {
        self.green
    }

    /// Blue component of the color.
    #[must_use]
    pub const fn blue(&self) -> u8 {
        self.blue
    }
}

/// Immutable description of a terrain type shared by many cells.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainKind {
    name: String,
    walkable: bool,
    movement_cost: i32,
    #[serde(default)]
    display_color: DisplayColor,
}

impl TerrainKind {
    /// Creates a terrain kind without display attributes.
    ///
    /// The movement cost is not validated here; [`TerrainPalette::validate`]
    /// rejects costs below one when a grid is built from the palette.
    #[must_use]
    pub fn new(name: impl Into<String>, walkable: bool, movement_cost: i32) -> Self {
        Self {
            name: name.into(),
            walkable,
            movement_cost,
            display_color: DisplayColor::default(),
        }
    }

    /// Attaches a display color to the terrain kind.
    #[must_use]
    pub fn with_display_color(mut self, display_color: DisplayColor) -> Self {
        self.display_color = display_color;
        self
    }

    /// Human readable terrain name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Intrinsic walkability of the terrain.
    #[must_use]
    pub const fn walkable(&self) -> bool {
        self.walkable
    }

    /// Cost paid for entering a cell of this terrain.
    #[must_use]
    pub const fn movement_cost(&self) -> i32 {
        self.movement_cost
    }

    /// Color used by presentation layers.
    #[must_use]
    pub const fn display_color(&self) -> DisplayColor {
        self.display_color
    }
}

/// Ordered collection of terrain kinds available to grid construction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "Vec<TerrainKind>")]
pub struct TerrainPalette {
    kinds: Vec<Arc<TerrainKind>>,
}

impl TerrainPalette {
    /// Creates a palette from the provided kinds, preserving their order.
    #[must_use]
    pub fn new(kinds: Vec<TerrainKind>) -> Self {
        Self {
            kinds: kinds.into_iter().map(Arc::new).collect(),
        }
    }

    /// Number of kinds in the palette.
    #[must_use]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Reports whether the palette holds no kinds.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Shared handle to the kind stored at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Arc<TerrainKind>> {
        self.kinds.get(index)
    }

    /// Iterator over the kinds in palette order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<TerrainKind>> {
        self.kinds.iter()
    }

    /// Ensures the palette can back a grid.
    ///
    /// Every movement cost must be at least one, otherwise the Manhattan
    /// heuristic would overestimate and search results lose optimality.
    pub fn validate(&self) -> Result<(), GridError> {
        if self.kinds.is_empty() {
            return Err(GridError::EmptyTerrainPalette);
        }

        match self.kinds.iter().find(|kind| kind.movement_cost() < 1) {
            Some(kind) => Err(GridError::MalformedTerrainPalette {
                name: kind.name().to_owned(),
                movement_cost: kind.movement_cost(),
            }),
            None => Ok(()),
        }
    }
}

impl From<Vec<TerrainKind>> for TerrainPalette {
    fn from(kinds: Vec<TerrainKind>) -> Self {
        Self::new(kinds)
    }
}

/// Shape and projection parameters of a grid.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfiguration {
    /// Number of columns.
    pub width: u32,
    /// Number of rows.
    pub height: u32,
    /// Side length of a single cell in world units.
    pub node_size: f32,
    /// Lays the grid on the XZ plane when set, otherwise on the XY plane.
    pub use_planar_xz: bool,
}

impl GridConfiguration {
    /// Creates a configuration from explicit values.
    #[must_use]
    pub const fn new(width: u32, height: u32, node_size: f32, use_planar_xz: bool) -> Self {
        Self {
            width,
            height,
            node_size,
            use_planar_xz,
        }
    }
}

impl Default for GridConfiguration {
    fn default() -> Self {
        Self::new(10, 10, 1.0, true)
    }
}

/// Rectangular set of coordinates covered by a placement.
///
/// Covered coordinates are `origin + (x - offset_x, y - offset_y)` for
/// `x` in `0..width` and `y` in `0..height`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Footprint {
    /// Cell the footprint is anchored to.
    pub origin: CellCoord,
    /// Extent along `x`.
    pub width: u32,
    /// Extent along `y`.
    pub height: u32,
    /// Column of the anchor within the footprint.
    pub offset_x: i32,
    /// Row of the anchor within the footprint.
    pub offset_y: i32,
}

impl Footprint {
    /// Creates a footprint anchored at `origin`.
    #[must_use]
    pub const fn new(
        origin: CellCoord,
        width: u32,
        height: u32,
        offset_x: i32,
        offset_y: i32,
    ) -> Self {
        Self {
            origin,
            width,
            height,
            offset_x,
            offset_y,
        }
    }

    /// Returns the same footprint anchored at a different cell.
    #[must_use]
    pub const fn anchored_at(self, origin: CellCoord) -> Self {
        Self { origin, ..self }
    }

    /// Lowest corner of the covered rectangle.
    #[must_use]
    pub const fn min_corner(&self) -> CellCoord {
        self.origin.offset(-self.offset_x, -self.offset_y)
    }

    /// Iterates the covered coordinates, column by column.
    pub fn covered(&self) -> impl Iterator<Item = CellCoord> {
        let corner = self.min_corner();
        let height = self.height;
        (0..self.width).flat_map(move |x| {
            (0..height).map(move |y| corner.offset(extent_to_i32(x), extent_to_i32(y)))
        })
    }

    /// Turns the footprint a quarter turn around its anchor cell.
    ///
    /// Width and height swap, and the anchor keeps addressing the same
    /// physical cell of the building after the turn.
    #[must_use]
    pub fn rotated(self) -> Self {
        Self {
            origin: self.origin,
            width: self.height,
            height: self.width,
            offset_x: self.offset_y,
            offset_y: extent_to_i32(self.width)
                .saturating_sub(1)
                .saturating_sub(self.offset_x),
        }
    }
}

fn extent_to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// Reasons a footprint cannot be reserved. Not an error: callers surface it as feedback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlacementRejection {
    /// The footprint covers no cells.
    EmptyFootprint,
    /// A covered coordinate lies outside the grid.
    OutOfBounds,
    /// A covered cell is not effectively walkable.
    Unwalkable,
    /// A covered cell is already reserved by another placement.
    Occupied,
}

/// Fatal grid access and configuration failures.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum GridError {
    /// A coordinate outside the grid extent was used to read or write a cell.
    #[error("coordinate {coord} lies outside the {width}x{height} grid")]
    OutOfBoundsCoordinate {
        /// Offending coordinate.
        coord: CellCoord,
        /// Grid width at the time of access.
        width: u32,
        /// Grid height at the time of access.
        height: u32,
    },
    /// A terrain kind declares a movement cost below one.
    #[error("terrain `{name}` declares movement cost {movement_cost}; costs must be at least 1")]
    MalformedTerrainPalette {
        /// Name of the offending terrain kind.
        name: String,
        /// Declared movement cost.
        movement_cost: i32,
    },
    /// The palette contains no terrain kinds.
    #[error("terrain palette is empty")]
    EmptyTerrainPalette,
    /// A terrain assignment referenced a palette slot that does not exist.
    #[error("terrain index {index} is outside a palette of {available} kinds")]
    UnknownTerrain {
        /// Requested palette index.
        index: usize,
        /// Number of kinds in the palette.
        available: usize,
    },
    /// The configured node size cannot project cells into world space.
    #[error("node size {node_size} must be finite and greater than zero")]
    InvalidNodeSize {
        /// Configured node size.
        node_size: f32,
    },
}
