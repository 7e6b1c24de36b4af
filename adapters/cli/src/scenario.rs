//! Scenario files describing the grid, its terrain and what gets placed on it.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::Deserialize;
use tactical_grid_core::{DisplayColor, GridConfiguration, TerrainKind, TerrainPalette};
use tactical_grid_system_dispatch::UnitType;
use tactical_grid_system_placement::BuildingDefinition;

/// Everything the headless driver needs to set up a session.
///
/// Missing tables fall back to the built-in scenario.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct Scenario {
    /// Grid extent, cell size and plane.
    pub(crate) grid: GridConfiguration,
    /// Terrain kinds the grid is painted with.
    pub(crate) terrain: Vec<TerrainKind>,
    /// Unit type shared by every spawned agent.
    pub(crate) unit: UnitType,
    /// Buildings placed in order during the session.
    pub(crate) buildings: Vec<BuildingDefinition>,
}

impl Scenario {
    /// Reads and parses a TOML scenario file.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("failed to parse scenario {}", path.display()))
    }

    /// Parses a scenario from TOML text.
    pub(crate) fn parse(contents: &str) -> Result<Self> {
        let scenario: Self = toml::from_str(contents)?;
        scenario.unit.validate()?;
        Ok(scenario)
    }

    /// Terrain palette built from the scenario's terrain table.
    pub(crate) fn palette(&self) -> TerrainPalette {
        TerrainPalette::new(self.terrain.clone())
    }
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            grid: GridConfiguration::default(),
            terrain: vec![
                TerrainKind::new("grass", true, 1)
                    .with_display_color(DisplayColor::from_rgb(96, 160, 72)),
                TerrainKind::new("mud", true, 3)
                    .with_display_color(DisplayColor::from_rgb(120, 90, 60)),
                TerrainKind::new("water", false, 1)
                    .with_display_color(DisplayColor::from_rgb(48, 96, 200)),
            ],
            unit: UnitType::default(),
            buildings: vec![BuildingDefinition {
                spawned_agents: 2,
                ..BuildingDefinition::new("barracks", 2, 2)
            }],
        }
    }
}
