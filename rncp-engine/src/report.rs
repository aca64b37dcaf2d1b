//! Full progress report for one user.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::anchors::LevelTable;
use crate::catalog::Catalog;
use crate::experience::{self, ProfessionalExperience};
use crate::progression::{simulated_total_xp, simulation_result, SimulationResult};
use crate::simulation::SimulationState;
use crate::validation::{real_progress_percentage, validate_all, UserProgress, ValidationInput, ValidationResult};

/// Real-data completion of one certification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificationProgress {
    pub certification_id: String,
    pub percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    pub user_id: u64,
    pub current_level: f64,
    #[serde(rename = "currentXP")]
    pub current_xp: u64,
    pub projected_level: f64,
    #[serde(rename = "projectedXP")]
    pub projected_xp: u64,
    pub simulation: SimulationResult,
    pub validations: Vec<ValidationResult>,
    pub real_progress: Vec<CertificationProgress>,
}

impl ProgressReport {
    /// Keep only the given certification
    pub fn retain_certification(&mut self, certification_id: &str) {
        self.validations.retain(|v| v.certification_id == certification_id);
        self.real_progress.retain(|p| p.certification_id == certification_id);
    }
}

/// Everything a report is built from.
#[derive(Debug, Clone, Copy)]
pub struct ReportInput<'a> {
    pub user_id: u64,
    pub table: &'a LevelTable,
    pub catalog: &'a Catalog,
    pub progress: &'a UserProgress,
    pub simulation: &'a SimulationState,
    pub experiences: &'a [ProfessionalExperience],
}

/// Project the user's level and validate every certification.
///
/// Custom projects from the simulation are merged into the catalog first, so
/// they count both toward XP and toward their category.
pub fn build_report(input: ReportInput<'_>) -> ProgressReport {
    let catalog = input.catalog.with_custom_projects(input.simulation.custom_projects());
    let progress = input.progress;

    let projected_xp = simulated_total_xp(progress.current_xp, input.simulation, &catalog)
        .saturating_add(experience::total_xp(input.experiences));
    let simulation = simulation_result(input.table, projected_xp);

    let validation_input = ValidationInput {
        projected_level: simulation.projected_level,
        progress,
        simulation: input.simulation,
    };
    let validations = validate_all(&catalog, &validation_input);

    let real_progress = catalog
        .certifications()
        .iter()
        .map(|definition| CertificationProgress {
            certification_id: definition.id.clone(),
            percentage: real_progress_percentage(definition, progress, input.simulation),
        })
        .collect();

    info!(
        user_id = input.user_id,
        current_level = progress.current_level,
        projected_level = simulation.projected_level,
        validated = validations.iter().filter(|v| v.overall_ok).count(),
        "Progress report built"
    );

    ProgressReport {
        user_id: input.user_id,
        current_level: progress.current_level,
        current_xp: progress.current_xp,
        projected_level: simulation.projected_level,
        projected_xp,
        simulation,
        validations,
        real_progress,
    }
}
