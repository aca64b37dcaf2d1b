//! Identifier reconciliation between the local catalog and upstream names
//!
//! The catalog and the campus API are maintained independently: the API
//! reports decorated project names (`"aa.ft_printf.v2"`, `"Libft - Paris"`)
//! while the catalog uses short slugs (`"ft_printf"`, `"libft"`). Matching is
//! therefore done on a normalized form with substring containment.
//!
//! Containment can produce false positives for very short local ids that
//! happen to appear inside an unrelated upstream name. This is accepted.

use std::collections::BTreeMap;
use tracing::trace;
use unicode_normalization::UnicodeNormalization;

use crate::catalog::SimulatorProject;

/// Upstream-reported percentages keyed by upstream project name
pub type GradeMap = BTreeMap<String, u32>;

/// Percentage used when no grade or override is known
pub const DEFAULT_PERCENTAGE: u32 = 100;

/// Lowercase, strip diacritics, keep only `[a-z0-9]`.
///
/// `"Épreuve-Finale_2"` → `"epreuvefinale2"`
pub fn normalize(s: &str) -> String {
    s.to_lowercase()
        .nfd()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

/// Whether the upstream identifier contains the local one once both are normalized.
pub fn matches(local_id: &str, external_id: &str) -> bool {
    let local = normalize(local_id);
    !local.is_empty() && normalize(external_id).contains(&local)
}

/// Whether a local project id/slug appears among the upstream identifiers.
///
/// A case-insensitive exact match is tried first over all identifiers, then
/// normalized containment.
pub fn is_completed<S: AsRef<str>>(local_id: &str, external_ids: &[S]) -> bool {
    let exact = external_ids
        .iter()
        .any(|ext| ext.as_ref().to_lowercase() == local_id.to_lowercase());
    if exact {
        trace!(local_id, "Exact match");
        return true;
    }

    external_ids.iter().any(|ext| matches(local_id, ext.as_ref()))
}

/// Find the percentage recorded for `project` in a map keyed by upstream names.
///
/// Lookup order: exact name, exact slug, exact id, then a normalized scan of
/// every key (in key order) accepting the first key that equals or contains the
/// normalized name or slug. Falls back to `default`.
pub fn find_percentage(project: &SimulatorProject, percentages: &GradeMap, default: u32) -> u32 {
    if let Some(&pct) = percentages.get(&project.name) {
        return pct;
    }
    if let Some(slug) = &project.slug {
        if let Some(&pct) = percentages.get(slug) {
            return pct;
        }
    }
    if let Some(&pct) = percentages.get(&project.id) {
        return pct;
    }

    let name = normalize(&project.name);
    let slug = project.slug.as_deref().map(normalize).unwrap_or_default();

    for (key, &pct) in percentages {
        let key_norm = normalize(key);
        if !name.is_empty() && key_norm.contains(&name) {
            trace!(project = %project.name, key = %key, "Percentage matched by name");
            return pct;
        }
        if !slug.is_empty() && key_norm.contains(&slug) {
            trace!(project = %project.name, key = %key, "Percentage matched by slug");
            return pct;
        }
    }

    default
}
