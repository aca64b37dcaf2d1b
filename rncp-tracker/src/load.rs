//! Reference and user data files.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::info;

use rncp_engine::{experience, Catalog, LevelTable, ProfessionalExperience, SimulationState};

fn read(path: &Path, what: &str) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {} from {}", what, path.display()))
}

pub fn level_table(path: &Path) -> Result<LevelTable> {
    let json = read(path, "level table")?;
    let table = LevelTable::from_json(&json)
        .with_context(|| format!("Invalid level table {}", path.display()))?;
    info!(path = %path.display(), max_level = table.max_level(), "Level table loaded");
    Ok(table)
}

pub fn catalog(path: &Path, table: &LevelTable) -> Result<Catalog> {
    let json = read(path, "catalog")?;
    Catalog::from_json(&json, table).with_context(|| format!("Invalid catalog {}", path.display()))
}

/// Saved simulation, or an empty one when no path is configured.
pub fn simulation(path: Option<&Path>) -> Result<SimulationState> {
    let Some(path) = path else {
        return Ok(SimulationState::default());
    };
    let json = read(path, "simulation state")?;
    let state: SimulationState = serde_json::from_str(&json)
        .with_context(|| format!("Invalid simulation state {}", path.display()))?;
    info!(
        path = %path.display(),
        simulated = state.simulated_count(),
        custom = state.custom_projects().len(),
        "Simulation state loaded"
    );
    Ok(state)
}

/// Professional experiences, or none when no path is configured.
pub fn experiences(path: Option<&Path>) -> Result<Vec<ProfessionalExperience>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let json = read(path, "professional experiences")?;
    let list = experience::import_json(&json)
        .with_context(|| format!("Invalid professional experiences {}", path.display()))?;
    info!(
        path = %path.display(),
        real = experience::real_count(&list),
        total = list.len(),
        "Professional experiences loaded"
    );
    Ok(list)
}
