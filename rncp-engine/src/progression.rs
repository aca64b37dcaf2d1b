//! Projected XP from simulated, sub-simulated and custom projects.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, trace};

use crate::anchors::LevelTable;
use crate::catalog::{Catalog, SimulatorProject};
use crate::simulation::SimulationState;

/// Multiplier applied to boosted projects (+4.2 %)
pub const BOOST_FACTOR: f64 = 1.042;

/// Level treated as 100 % in `progress_percentage`
pub const REFERENCE_LEVEL: f64 = 21.0;

/// Outcome of adding XP on top of a current level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub total_xp: u64,
    pub projected_level: f64,
    pub progress_percentage: f64,
    /// XP still needed for the next whole level (0 when unknown)
    pub missing_xp: u64,
}

/// `round(xp × pct / 100)`, then `round(× 1.042)` when boosted.
pub fn adjusted_xp(project: &SimulatorProject, state: &SimulationState) -> u64 {
    let percentage = state.percentage(&project.id) as f64;
    let mut xp = (project.xp as f64 * percentage / 100.0).round();
    if state.is_boosted(&project.id) {
        xp = (xp * BOOST_FACTOR).round();
    }
    xp as u64
}

/// Total XP once every simulated project is added to `base_xp`.
///
/// - Leaf projects listed as simulated add their adjusted XP.
/// - Composite projects add their own adjusted XP only when all sub-projects
///   are simulated; each simulated sub-project adds its raw XP regardless.
/// - Every project is counted at most once, even if listed by both id and slug.
///
/// Custom projects in `state` are looked up after the catalog.
pub fn simulated_total_xp(base_xp: u64, state: &SimulationState, catalog: &Catalog) -> u64 {
    let find = |key: &str| {
        catalog.find_project(key).or_else(|| {
            state
                .custom_projects()
                .iter()
                .find(|p| p.is_named(key))
        })
    };

    let mut counted: HashSet<&str> = HashSet::new();
    let mut total = base_xp;

    for key in state.simulated_projects() {
        let Some(project) = find(key) else {
            trace!(key, "Simulated project not in catalog");
            continue;
        };
        if project.has_sub_projects() || !counted.insert(project.id.as_str()) {
            continue;
        }
        let added = adjusted_xp(project, state);
        trace!(project = %project.name, added, "Simulated project");
        total = total.saturating_add(added);
    }

    for (project_id, subs) in state.simulated_sub_project_parents() {
        if counted.contains(project_id) {
            continue;
        }
        let Some(project) = find(project_id).filter(|p| p.has_sub_projects()) else {
            continue;
        };

        if state.all_sub_projects_simulated(project) {
            let added = adjusted_xp(project, state);
            trace!(project = %project.name, added, "Composite project complete");
            total = total.saturating_add(added);
        }
        let sub_xp = project
            .sub_projects
            .iter()
            .filter(|sub| subs.contains(&sub.id))
            .map(|sub| sub.xp)
            .fold(0, u64::saturating_add);
        total = total.saturating_add(sub_xp);

        counted.insert(project.id.as_str());
    }

    debug!(base_xp, total, "Simulated total computed");
    total
}

/// Add raw XP amounts on top of a fractional level.
pub fn simulate(table: &LevelTable, current_level: f64, extra_xp: &[u64]) -> SimulationResult {
    let total_xp = table
        .xp_from_level(current_level)
        .saturating_add(extra_xp.iter().fold(0, |acc, xp| acc.saturating_add(*xp)));
    simulation_result(table, total_xp)
}

/// Describe where `total_xp` lands on the level table.
pub fn simulation_result(table: &LevelTable, total_xp: u64) -> SimulationResult {
    let projected_level = table.level_from_xp(total_xp);
    let next_whole = projected_level.ceil() as u32;
    let missing_xp = table
        .xp_for_whole_level(next_whole)
        .map(|xp| xp.saturating_sub(total_xp))
        .unwrap_or(0);

    SimulationResult {
        total_xp,
        projected_level,
        progress_percentage: projected_level / REFERENCE_LEVEL * 100.0,
        missing_xp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> LevelTable {
        LevelTable::from_json(r#"[{"lvl":0,"xp":0},{"lvl":1,"xp":1000},{"lvl":2,"xp":2200}]"#)
            .unwrap()
    }

    fn catalog() -> Catalog {
        let json = r#"[{
            "id": "rncp-a", "level": 1, "requiredEvents": 0, "requiredProfessionalExperienceMonths": 0,
            "categories": [{
                "id": "core", "requiredCount": 0, "requiredXP": 0,
                "projects": [
                    {"id": "libft", "name": "Libft", "xp": 1000, "slug": "libft"},
                    {"id": "printf", "name": "ft_printf", "xp": 500, "slug": "ft_printf"},
                    {"id": "piscine", "name": "Piscine", "xp": 300, "subProjects": [
                        {"id": "d00", "name": "Day 00", "xp": 20},
                        {"id": "d01", "name": "Day 01", "xp": 30}
                    ]}
                ]
            }]
        }, {
            "id": "rncp-b", "level": 1, "requiredEvents": 0, "requiredProfessionalExperienceMonths": 0,
            "categories": [{
                "id": "dup", "requiredCount": 0, "requiredXP": 0,
                "projects": [{"id": "libft", "name": "Libft", "xp": 1000, "slug": "libft"}]
            }]
        }]"#;
        Catalog::from_json(json, &table()).unwrap()
    }

    #[test]
    fn test_leaf_percentage_and_boost() {
        let catalog = catalog();
        let mut state = SimulationState::new();
        state.toggle_project("libft");
        state.set_percentage("libft", 125);
        assert_eq!(simulated_total_xp(0, &state, &catalog), 1250);

        state.toggle_boost("libft");
        // round(1250 * 1.042) = 1303 (1302.5 rounds up)
        assert_eq!(simulated_total_xp(0, &state, &catalog), 1303);
    }

    #[test]
    fn test_counted_once_by_id_and_slug() {
        let catalog = catalog();
        let mut state = SimulationState::new();
        state.toggle_project("printf");
        state.toggle_project("ft_printf");
        assert_eq!(simulated_total_xp(100, &state, &catalog), 600);
    }

    #[test]
    fn test_partial_sub_projects_add_only_sub_xp() {
        let catalog = catalog();
        let mut state = SimulationState::new();
        state.toggle_sub_project("piscine", "d00");
        assert_eq!(simulated_total_xp(0, &state, &catalog), 20);
    }

    #[test]
    fn test_complete_sub_projects_add_parent_xp() {
        let catalog = catalog();
        let mut state = SimulationState::new();
        state.toggle_sub_project("piscine", "d00");
        state.toggle_sub_project("piscine", "d01");
        state.set_percentage("piscine", 50);
        state.toggle_boost("piscine");
        // parent: round(round(150) * 1.042) = 156, subs raw: 50
        assert_eq!(simulated_total_xp(0, &state, &catalog), 206);
    }

    #[test]
    fn test_composite_listed_as_leaf_is_ignored() {
        let catalog = catalog();
        let mut state = SimulationState::new();
        state.toggle_project("piscine");
        assert_eq!(simulated_total_xp(0, &state, &catalog), 0);
    }

    #[test]
    fn test_custom_projects_count() {
        let catalog = catalog();
        let mut state = SimulationState::new();
        state.add_custom_project("Side", 400, 100, false);
        assert_eq!(simulated_total_xp(10, &state, &catalog), 410);
    }

    #[test]
    fn test_huge_custom_project_saturates() {
        let catalog = catalog();
        let mut state = SimulationState::new();
        state.add_custom_project("Side quest", u64::MAX, 100, true);
        state.toggle_project("libft");
        assert_eq!(simulated_total_xp(u64::MAX - 1, &state, &catalog), u64::MAX);

        let result = simulate(&table(), 1.5, &[u64::MAX, 10]);
        assert_eq!(result.total_xp, u64::MAX);
        assert_eq!(result.projected_level, 2.0);
    }

    #[test]
    fn test_unknown_projects_are_skipped() {
        let catalog = catalog();
        let mut state = SimulationState::new();
        state.toggle_project("does-not-exist");
        state.toggle_sub_project("nope", "x");
        assert_eq!(simulated_total_xp(7, &state, &catalog), 7);
    }

    #[test]
    fn test_simulate() {
        let table = table();
        let result = simulate(&table, 1.0, &[300, 300]);
        assert_eq!(result.total_xp, 1600);
        assert!((result.projected_level - 1.5).abs() < 1e-9);
        assert_eq!(result.missing_xp, 600);
        assert!((result.progress_percentage - 1.5 / 21.0 * 100.0).abs() < 1e-9);

        let capped = simulate(&table, 2.0, &[5000]);
        assert_eq!(capped.projected_level, 2.0);
        assert_eq!(capped.missing_xp, 0);
    }
}
