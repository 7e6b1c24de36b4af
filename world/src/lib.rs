#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative terrain and occupancy state for the tactical grid.
//!
//! The [`Grid`] owns exactly one [`Cell`] per coordinate and is the only
//! place walkability is stored. Searches read it through
//! [`pathfinding::Pathfinder`]; placement is the only runtime writer of the
//! occupancy and walkable-override flags.

pub mod pathfinding;

use std::sync::Arc;

use rand::Rng;
use tactical_grid_core::{
    CellCoord, Direction, GridConfiguration, GridError, TerrainKind, TerrainPalette, Vec3,
};
use tracing::info;

/// Downward shift of every cell boundary, in cell widths, absorbing projection round-off.
const COORDINATE_EPSILON: f32 = 1e-4;

/// One addressable square of the grid.
#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    coord: CellCoord,
    terrain: Arc<TerrainKind>,
    walkable_override: bool,
    occupied: bool,
    world_position: Vec3,
}

impl Cell {
    /// Coordinate that addresses the cell.
    #[must_use]
    pub const fn coord(&self) -> CellCoord {
        self.coord
    }

    /// Terrain shared with every other cell of the same kind.
    #[must_use]
    pub fn terrain(&self) -> &TerrainKind {
        &self.terrain
    }

    /// Runtime walkability flag, independent of the terrain's own flag.
    #[must_use]
    pub const fn walkable_override(&self) -> bool {
        self.walkable_override
    }

    /// Reports whether a placement reserved the cell.
    #[must_use]
    pub const fn is_occupied(&self) -> bool {
        self.occupied
    }

    /// Position of the cell origin in world space.
    #[must_use]
    pub const fn world_position(&self) -> Vec3 {
        self.world_position
    }

    /// Effective walkability: terrain flag AND runtime override.
    #[must_use]
    pub fn is_walkable(&self) -> bool {
        self.terrain.walkable() && self.walkable_override
    }

    /// Cost paid by a path for entering this cell.
    #[must_use]
    pub fn entry_cost(&self) -> u32 {
        // Palette validation guarantees a cost of at least one.
        self.terrain.movement_cost().unsigned_abs()
    }
}

/// Fixed-size grid of cells addressed by [`CellCoord`].
#[derive(Clone, Debug)]
pub struct Grid {
    config: GridConfiguration,
    cells: Vec<Cell>,
}

impl Grid {
    /// Builds a grid assigning each cell a uniformly random palette entry.
    pub fn build<R>(
        config: GridConfiguration,
        palette: &TerrainPalette,
        rng: &mut R,
    ) -> Result<Self, GridError>
    where
        R: Rng,
    {
        let choices = palette.len();
        Self::build_with(config, palette, |_| rng.gen_range(0..choices.max(1)))
    }

    /// Builds a grid using `assign` to pick the palette index for every coordinate.
    ///
    /// Fails before any cell is created when the palette is malformed or the
    /// node size cannot project cells into world space.
    pub fn build_with<F>(
        config: GridConfiguration,
        palette: &TerrainPalette,
        mut assign: F,
    ) -> Result<Self, GridError>
    where
        F: FnMut(CellCoord) -> usize,
    {
        palette.validate()?;
        if !config.node_size.is_finite() || config.node_size <= 0.0 {
            return Err(GridError::InvalidNodeSize {
                node_size: config.node_size,
            });
        }

        let capacity_u64 = u64::from(config.width) * u64::from(config.height);
        let capacity = usize::try_from(capacity_u64).unwrap_or(0);
        let mut cells = Vec::with_capacity(capacity);

        for y in 0..config.height {
            for x in 0..config.width {
                let coord = CellCoord::new(to_i32(x), to_i32(y));
                let index = assign(coord);
                let terrain = palette
                    .get(index)
                    .ok_or(GridError::UnknownTerrain {
                        index,
                        available: palette.len(),
                    })?
                    .clone();
                cells.push(Cell {
                    coord,
                    terrain,
                    walkable_override: true,
                    occupied: false,
                    world_position: project(&config, coord),
                });
            }
        }

        info!(
            width = config.width,
            height = config.height,
            node_size = config.node_size,
            planar_xz = config.use_planar_xz,
            "grid built"
        );

        Ok(Self { config, cells })
    }

    /// Configuration the grid was built from.
    #[must_use]
    pub const fn configuration(&self) -> &GridConfiguration {
        &self.config
    }

    /// Number of columns.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.config.width
    }

    /// Number of rows.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.config.height
    }

    /// Reports whether the coordinate addresses a cell of this grid.
    #[must_use]
    pub fn is_in_bounds(&self, coord: CellCoord) -> bool {
        self.index(coord).is_some()
    }

    /// Reads the cell at `coord`.
    pub fn cell(&self, coord: CellCoord) -> Result<&Cell, GridError> {
        let index = self.checked_index(coord)?;
        Ok(&self.cells[index])
    }

    /// Marks the cell at `coord` as reserved or free.
    pub fn set_occupied(&mut self, coord: CellCoord, occupied: bool) -> Result<(), GridError> {
        let index = self.checked_index(coord)?;
        self.cells[index].occupied = occupied;
        Ok(())
    }

    /// Sets the runtime walkability flag of the cell at `coord`.
    pub fn set_walkable_override(
        &mut self,
        coord: CellCoord,
        walkable: bool,
    ) -> Result<(), GridError> {
        let index = self.checked_index(coord)?;
        self.cells[index].walkable_override = walkable;
        Ok(())
    }

    /// Read-only iteration over every cell in row-major order.
    pub fn cells(&self) -> impl ExactSizeIterator<Item = &Cell> {
        self.cells.iter()
    }

    /// In-bounds neighbors of `coord`, in North, East, South, West order.
    pub fn neighbors(&self, coord: CellCoord) -> impl Iterator<Item = &Cell> + '_ {
        Direction::ALL
            .into_iter()
            .filter_map(move |direction| self.cell(coord.step(direction)).ok())
    }

    /// World position of the cell origin addressed by `coord`.
    ///
    /// Defined for any coordinate, including ones outside the grid.
    #[must_use]
    pub fn world_position(&self, coord: CellCoord) -> Vec3 {
        project(&self.config, coord)
    }

    /// Projects a world position onto the cell containing it.
    ///
    /// Uses `floor` on both axes after shifting every cell boundary down by
    /// `1e-4` cell widths, so column `x` covers
    /// `[x - 1e-4, x + 1 - 1e-4) * node_size`. A cell's own world position
    /// therefore always maps back to that cell. The result may lie outside
    /// the grid; a non-finite position maps to `(i32::MIN, i32::MIN)`.
    #[must_use]
    pub fn world_to_coordinate(&self, position: Vec3) -> CellCoord {
        let node_size = self.config.node_size;
        let planar = if self.config.use_planar_xz {
            position.z
        } else {
            position.y
        };
        if !position.x.is_finite() || !planar.is_finite() {
            return CellCoord::new(i32::MIN, i32::MIN);
        }
        let x = (position.x / node_size + COORDINATE_EPSILON).floor();
        let y = (planar / node_size + COORDINATE_EPSILON).floor();
        CellCoord::new(x as i32, y as i32)
    }

    pub(crate) fn index(&self, coord: CellCoord) -> Option<usize> {
        let x = u32::try_from(coord.x()).ok()?;
        let y = u32::try_from(coord.y()).ok()?;
        if x < self.config.width && y < self.config.height {
            let row = usize::try_from(y).ok()?;
            let column = usize::try_from(x).ok()?;
            let width = usize::try_from(self.config.width).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }

    pub(crate) fn cell_at(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    fn checked_index(&self, coord: CellCoord) -> Result<usize, GridError> {
        self.index(coord).ok_or(GridError::OutOfBoundsCoordinate {
            coord,
            width: self.config.width,
            height: self.config.height,
        })
    }
}

fn project(config: &GridConfiguration, coord: CellCoord) -> Vec3 {
    let x = coord.x() as f32;
    let y = coord.y() as f32;
    let unscaled = if config.use_planar_xz {
        Vec3::new(x, 0.0, y)
    } else {
        Vec3::new(x, y, 0.0)
    };
    unscaled * config.node_size
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}
