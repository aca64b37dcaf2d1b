//! Caller-owned simulation state
//!
//! Everything the user toggles locally to preview projects they have not
//! completed yet. The engine only reads this state; persisting it is the
//! caller's business (it is `serde`-serializable for any key-value store).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::catalog::SimulatorProject;
use crate::matcher::DEFAULT_PERCENTAGE;

/// Lowest accepted percentage override
pub const MIN_PERCENTAGE: u32 = 50;

/// Highest accepted percentage override
pub const MAX_PERCENTAGE: u32 = 125;

/// Prefix of generated custom project ids
pub const CUSTOM_PROJECT_PREFIX: &str = "custom-";

/// Local what-if state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimulationState {
    /// Simulated project ids or slugs
    simulated_projects: BTreeSet<String>,
    /// Simulated sub-project ids, keyed by parent project id
    simulated_sub_projects: BTreeMap<String, BTreeSet<String>>,
    /// Percentage overrides keyed by project id; 100 is never stored
    percentages: BTreeMap<String, u32>,
    /// Project ids with the coalition boost enabled
    boosts: BTreeSet<String>,
    /// User-defined projects
    custom_projects: Vec<SimulatorProject>,
}

impl SimulationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any project or sub-project is simulated
    pub fn has_simulations(&self) -> bool {
        !self.simulated_projects.is_empty() || !self.simulated_sub_projects.is_empty()
    }

    /// Number of simulated projects, counting each composite project once
    pub fn simulated_count(&self) -> usize {
        self.simulated_projects.len() + self.simulated_sub_projects.len()
    }

    // ------------------------------------------------------------------
    // Projects
    // ------------------------------------------------------------------

    /// Add or remove a project from the simulation. Returns the new state.
    pub fn toggle_project(&mut self, key: &str) -> bool {
        if self.simulated_projects.remove(key) {
            debug!(project = key, "Project unsimulated");
            false
        } else {
            self.simulated_projects.insert(key.to_string());
            debug!(project = key, "Project simulated");
            true
        }
    }

    /// Whether `key` (id or slug) is in the simulated set
    pub fn is_simulated(&self, key: &str) -> bool {
        self.simulated_projects.contains(key)
    }

    pub fn simulated_projects(&self) -> impl Iterator<Item = &str> {
        self.simulated_projects.iter().map(String::as_str)
    }

    /// Whether a catalog project counts as locally simulated.
    ///
    /// Leaf projects are simulated by id or slug; composite projects are
    /// simulated once every sub-project is.
    pub fn is_project_simulated(&self, project: &SimulatorProject) -> bool {
        if self.is_simulated(&project.id) {
            return true;
        }
        if let Some(slug) = &project.slug {
            if self.is_simulated(slug) {
                return true;
            }
        }
        project.has_sub_projects() && self.all_sub_projects_simulated(project)
    }

    // ------------------------------------------------------------------
    // Sub-projects
    // ------------------------------------------------------------------

    /// Add or remove a sub-project. The parent entry disappears with its last sub-project.
    pub fn toggle_sub_project(&mut self, project_id: &str, sub_id: &str) -> bool {
        let subs = self
            .simulated_sub_projects
            .entry(project_id.to_string())
            .or_default();

        let now_simulated = if subs.remove(sub_id) {
            false
        } else {
            subs.insert(sub_id.to_string());
            true
        };

        if subs.is_empty() {
            self.simulated_sub_projects.remove(project_id);
        }
        now_simulated
    }

    /// Simulated sub-project ids of a parent project
    pub fn sub_projects_of(&self, project_id: &str) -> Option<&BTreeSet<String>> {
        self.simulated_sub_projects.get(project_id)
    }

    /// Parent project ids with at least one simulated sub-project
    pub fn simulated_sub_project_parents(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.simulated_sub_projects
            .iter()
            .map(|(id, subs)| (id.as_str(), subs))
    }

    /// Whether every sub-project of `project` is simulated
    pub fn all_sub_projects_simulated(&self, project: &SimulatorProject) -> bool {
        match self.simulated_sub_projects.get(&project.id) {
            Some(subs) => project.sub_projects.iter().all(|s| subs.contains(&s.id)),
            None => false,
        }
    }

    // ------------------------------------------------------------------
    // Percentages and boosts
    // ------------------------------------------------------------------

    /// Set a percentage override, clamped to 50–125. 100 clears the override.
    pub fn set_percentage(&mut self, project_id: &str, percentage: u32) {
        let percentage = percentage.clamp(MIN_PERCENTAGE, MAX_PERCENTAGE);
        if percentage == DEFAULT_PERCENTAGE {
            self.percentages.remove(project_id);
        } else {
            self.percentages.insert(project_id.to_string(), percentage);
        }
    }

    /// Override for a project, 100 when unset
    pub fn percentage(&self, project_id: &str) -> u32 {
        self.percentages
            .get(project_id)
            .map(|p| (*p).clamp(MIN_PERCENTAGE, MAX_PERCENTAGE))
            .unwrap_or(DEFAULT_PERCENTAGE)
    }

    pub fn toggle_boost(&mut self, project_id: &str) -> bool {
        if self.boosts.remove(project_id) {
            false
        } else {
            self.boosts.insert(project_id.to_string());
            true
        }
    }

    pub fn is_boosted(&self, project_id: &str) -> bool {
        self.boosts.contains(project_id)
    }

    fn set_boost(&mut self, project_id: &str, enabled: bool) {
        if enabled {
            self.boosts.insert(project_id.to_string());
        } else {
            self.boosts.remove(project_id);
        }
    }

    // ------------------------------------------------------------------
    // Custom projects
    // ------------------------------------------------------------------

    pub fn custom_projects(&self) -> &[SimulatorProject] {
        &self.custom_projects
    }

    /// Create a custom project and simulate it right away. Returns its id.
    pub fn add_custom_project(&mut self, name: &str, xp: u64, percentage: u32, boost: bool) -> String {
        let id = format!("{}{}", CUSTOM_PROJECT_PREFIX, uuid::Uuid::new_v4());
        let project = SimulatorProject::new(id.clone(), name, xp).with_slug(slugify(name));

        self.custom_projects.push(project);
        self.simulated_projects.insert(id.clone());
        self.set_percentage(&id, percentage);
        self.set_boost(&id, boost);

        debug!(id = %id, name, xp, "Custom project added");
        id
    }

    /// Update a custom project in place. Returns false if it does not exist.
    pub fn edit_custom_project(
        &mut self,
        id: &str,
        name: &str,
        xp: u64,
        percentage: u32,
        boost: bool,
    ) -> bool {
        let Some(project) = self.custom_projects.iter_mut().find(|p| p.id == id) else {
            return false;
        };
        project.name = name.to_string();
        project.xp = xp;
        project.slug = Some(slugify(name));

        self.set_percentage(id, percentage);
        self.set_boost(id, boost);
        true
    }

    /// Remove a custom project and unsimulate it. Returns false if it does not exist.
    pub fn delete_custom_project(&mut self, id: &str) -> bool {
        let before = self.custom_projects.len();
        self.custom_projects.retain(|p| p.id != id);
        self.simulated_projects.remove(id);
        self.custom_projects.len() != before
    }

    /// Clear simulated projects, sub-projects and percentage overrides.
    ///
    /// Custom projects and boosts are kept.
    pub fn reset(&mut self) {
        self.simulated_projects.clear();
        self.simulated_sub_projects.clear();
        self.percentages.clear();
    }
}

/// Lowercase name with whitespace runs replaced by `-`
fn slugify(name: &str) -> String {
    name.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}
