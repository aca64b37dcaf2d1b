//! Certification validation
//!
//! Evaluates RNCP definitions against the user's upstream progress plus the
//! local simulation. Missing or empty inputs are treated as zero progress,
//! never as an error.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{Catalog, CertificationDefinition, ProjectCategory, SimulatorProject};
use crate::matcher::{find_percentage, is_completed, GradeMap, DEFAULT_PERCENTAGE};
use crate::progression::adjusted_xp;
use crate::simulation::SimulationState;

/// Progress rebuilt from upstream data on every sync.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    pub current_level: f64,
    pub current_xp: u64,
    pub events: u32,
    pub professional_experience_months: u32,
    /// Upstream project names of validated projects (opaque strings)
    pub completed_project_identifiers: Vec<String>,
    /// Upstream grade percentage per validated project name
    #[serde(default)]
    pub completed_grades: GradeMap,
}

/// Everything validation reads.
#[derive(Debug, Clone, Copy)]
pub struct ValidationInput<'a> {
    /// Level including simulated XP
    pub projected_level: f64,
    pub progress: &'a UserProgress,
    pub simulation: &'a SimulationState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryValidation {
    pub category_id: String,
    pub required_count: u32,
    pub current_count: u32,
    #[serde(rename = "requiredXP")]
    pub required_xp: u64,
    #[serde(rename = "currentXP")]
    pub current_xp: u64,
    pub is_valid: bool,
    /// Local ids of the projects counted toward this category
    pub matched_project_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub certification_id: String,
    pub level_ok: bool,
    pub events_ok: bool,
    pub professional_experience_ok: bool,
    pub per_category: Vec<CategoryValidation>,
    pub overall_ok: bool,
}

/// How a catalog project counts toward a category.
enum Contribution {
    Completed,
    Simulated,
}

fn classify(
    project: &SimulatorProject,
    validated: &[&str],
    input: &ValidationInput<'_>,
) -> Option<Contribution> {
    let key = project.local_key();
    if is_completed(key, &input.progress.completed_project_identifiers) {
        return Some(Contribution::Completed);
    }
    if is_completed(key, validated) || input.simulation.is_project_simulated(project) {
        return Some(Contribution::Simulated);
    }
    None
}

/// Validate one category.
///
/// Completed projects are weighted by their upstream grade; simulated ones
/// by the local override and boost.
pub fn validate_category(category: &ProjectCategory, input: &ValidationInput<'_>) -> CategoryValidation {
    // completed identifiers first, then simulated keys
    let validated: Vec<&str> = input
        .progress
        .completed_project_identifiers
        .iter()
        .map(String::as_str)
        .chain(input.simulation.simulated_projects())
        .collect();

    let mut matched_project_ids = Vec::new();
    let mut current_xp = 0u64;

    for project in &category.projects {
        let xp = match classify(project, &validated, input) {
            Some(Contribution::Completed) => {
                let pct = find_percentage(project, &input.progress.completed_grades, DEFAULT_PERCENTAGE);
                (project.xp as f64 * pct as f64 / 100.0).round() as u64
            }
            Some(Contribution::Simulated) => adjusted_xp(project, input.simulation),
            None => continue,
        };
        current_xp = current_xp.saturating_add(xp);
        matched_project_ids.push(project.id.clone());
    }

    let current_count = matched_project_ids.len() as u32;
    let is_valid = current_count >= category.required_count && current_xp >= category.required_xp;

    CategoryValidation {
        category_id: category.id.clone(),
        required_count: category.required_count,
        current_count,
        required_xp: category.required_xp,
        current_xp,
        is_valid,
        matched_project_ids,
    }
}

/// Validate one certification.
pub fn validate_certification(
    definition: &CertificationDefinition,
    input: &ValidationInput<'_>,
) -> ValidationResult {
    let progress = input.progress;
    let level_ok = input.projected_level >= definition.level;
    let events_ok = progress.events >= definition.required_events;
    let professional_experience_ok =
        progress.professional_experience_months >= definition.required_professional_experience_months;

    let per_category: Vec<CategoryValidation> = definition
        .categories
        .iter()
        .map(|category| validate_category(category, input))
        .collect();

    let overall_ok = level_ok
        && events_ok
        && professional_experience_ok
        && per_category.iter().all(|c| c.is_valid);

    debug!(
        certification = %definition.id,
        level_ok,
        events_ok,
        professional_experience_ok,
        overall_ok,
        "Certification validated"
    );

    ValidationResult {
        certification_id: definition.id.clone(),
        level_ok,
        events_ok,
        professional_experience_ok,
        per_category,
        overall_ok,
    }
}

/// Validate every certification in catalog order.
pub fn validate_all(catalog: &Catalog, input: &ValidationInput<'_>) -> Vec<ValidationResult> {
    catalog
        .certifications()
        .iter()
        .map(|definition| validate_certification(definition, input))
        .collect()
}

/// Percentage of criteria met with real data only.
///
/// One criterion each for the current (not projected) level, events and
/// professional experience; two per category (count and XP) counting only
/// completed, non-simulated projects at catalog XP.
pub fn real_progress_percentage(
    definition: &CertificationDefinition,
    progress: &UserProgress,
    simulation: &SimulationState,
) -> u32 {
    let mut total = 3u32;
    let mut met = [
        progress.current_level >= definition.level,
        progress.events >= definition.required_events,
        progress.professional_experience_months >= definition.required_professional_experience_months,
    ]
    .iter()
    .filter(|ok| **ok)
    .count() as u32;

    for category in &definition.categories {
        let real: Vec<&SimulatorProject> = category
            .projects
            .iter()
            .filter(|p| {
                is_completed(p.local_key(), &progress.completed_project_identifiers)
                    && !simulation.is_project_simulated(p)
            })
            .collect();

        let count = real.len() as u32;
        let xp = real.iter().map(|p| p.xp).fold(0, u64::saturating_add);

        total += 2;
        if count >= category.required_count {
            met += 1;
        }
        if xp >= category.required_xp {
            met += 1;
        }
    }

    (met as f64 / total as f64 * 100.0).round() as u32
}
