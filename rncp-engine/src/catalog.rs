//! Certification catalog - RNCP definitions and their project categories
//!
//! Reference data loaded once at startup. The catalog is never mutated at
//! runtime; user-defined projects are layered on top with
//! [`Catalog::with_custom_projects`], which returns a new catalog.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};

use crate::anchors::LevelTable;
use crate::error::CatalogError;

/// Certification that receives user-defined projects
pub const CUSTOM_PROJECTS_CERTIFICATION: &str = "rncp-global";

/// Category (inside [`CUSTOM_PROJECTS_CERTIFICATION`]) that holds user-defined projects
pub const CUSTOM_PROJECTS_CATEGORY: &str = "other-projects";

/// A project that can be completed upstream or simulated locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulatorProject {
    /// Local catalog id
    pub id: String,
    /// Display name
    pub name: String,
    /// XP awarded at 100 %
    pub xp: u64,
    /// Optional slug, preferred over the id when matching upstream names
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    /// Parts of a composite project (e.g. piscine days)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_projects: Vec<SimulatorProject>,
}

impl SimulatorProject {
    /// Create a leaf project
    pub fn new(id: impl Into<String>, name: impl Into<String>, xp: u64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            xp,
            slug: None,
            sub_projects: Vec::new(),
        }
    }

    /// Set the slug
    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    /// Add sub-projects
    pub fn with_sub_projects(mut self, subs: Vec<SimulatorProject>) -> Self {
        self.sub_projects = subs;
        self
    }

    /// Identifier used against upstream names: the slug if set, else the id
    pub fn local_key(&self) -> &str {
        self.slug.as_deref().unwrap_or(&self.id)
    }

    /// Whether this project is made of sub-projects
    pub fn has_sub_projects(&self) -> bool {
        !self.sub_projects.is_empty()
    }

    /// Whether `key` names this project by id or slug
    pub fn is_named(&self, key: &str) -> bool {
        self.id == key || self.slug.as_deref() == Some(key)
    }
}

/// A group of projects with count and XP requirements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectCategory {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub required_count: u32,
    #[serde(rename = "requiredXP")]
    pub required_xp: u64,
    #[serde(default)]
    pub projects: Vec<SimulatorProject>,
}

/// One RNCP certification and its requirements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificationDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Minimum (projected) level
    pub level: f64,
    pub required_events: u32,
    #[serde(alias = "requiredProfessionalExperience")]
    pub required_professional_experience_months: u32,
    #[serde(default)]
    pub categories: Vec<ProjectCategory>,
}

/// Ordered, validated list of certifications.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Catalog {
    certifications: Vec<CertificationDefinition>,
}

impl Catalog {
    /// Validate certifications against the anchor table.
    pub fn new(
        certifications: Vec<CertificationDefinition>,
        table: &LevelTable,
    ) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();

        for cert in &certifications {
            if !seen.insert(cert.id.as_str()) {
                return Err(CatalogError::DuplicateCertification(cert.id.clone()));
            }
            if !cert.level.is_finite() || cert.level < 0.0 {
                return Err(CatalogError::NegativeValue {
                    owner: cert.id.clone(),
                    field: "level",
                    value: cert.level,
                });
            }
            if cert.level > table.max_level() as f64 {
                return Err(CatalogError::UnknownLevel {
                    certification: cert.id.clone(),
                    level: cert.level,
                    max: table.max_level(),
                });
            }
        }

        info!(certifications = certifications.len(), "Certification catalog loaded");
        Ok(Self { certifications })
    }

    /// Parse a JSON array of certifications and validate it.
    pub fn from_json(json: &str, table: &LevelTable) -> Result<Self, CatalogError> {
        let certifications: Vec<CertificationDefinition> = serde_json::from_str(json)?;
        Self::new(certifications, table)
    }

    pub fn certifications(&self) -> &[CertificationDefinition] {
        &self.certifications
    }

    /// Look up a certification by id
    pub fn get(&self, id: &str) -> Option<&CertificationDefinition> {
        self.certifications.iter().find(|c| c.id == id)
    }

    /// Every project in catalog order (certification, category, project).
    ///
    /// The same project may appear under several certifications.
    pub fn projects(&self) -> impl Iterator<Item = &SimulatorProject> {
        self.certifications
            .iter()
            .flat_map(|c| c.categories.iter())
            .flat_map(|cat| cat.projects.iter())
    }

    /// First project named `key` by slug or id
    pub fn find_project(&self, key: &str) -> Option<&SimulatorProject> {
        self.projects().find(|p| p.is_named(key))
    }

    /// Copy of the catalog where the custom-project category holds `custom`.
    ///
    /// Catalogs without that certification/category are returned unchanged.
    pub fn with_custom_projects(&self, custom: &[SimulatorProject]) -> Catalog {
        let mut catalog = self.clone();
        let target = catalog
            .certifications
            .iter_mut()
            .filter(|c| c.id == CUSTOM_PROJECTS_CERTIFICATION)
            .flat_map(|c| c.categories.iter_mut())
            .find(|cat| cat.id == CUSTOM_PROJECTS_CATEGORY);

        if let Some(category) = target {
            debug!(count = custom.len(), "Injecting custom projects");
            category.projects = custom.to_vec();
        }
        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> LevelTable {
        LevelTable::from_json(
            r#"[{"lvl":0,"xp":0},{"lvl":1,"xp":1000},{"lvl":2,"xp":2200},{"lvl":3,"xp":3600}]"#,
        )
        .unwrap()
    }

    const CATALOG: &str = r#"[
        {
            "id": "rncp-web",
            "name": "Web",
            "level": 2.5,
            "requiredEvents": 10,
            "requiredProfessionalExperience": 2,
            "categories": [
                {
                    "id": "web",
                    "name": "Web",
                    "requiredCount": 1,
                    "requiredXP": 1000,
                    "projects": [
                        {"id": "transcendence", "name": "ft_transcendence", "xp": 24360, "slug": "ft_transcendence"},
                        {"id": "piscine", "name": "Piscine", "xp": 300,
                         "subProjects": [{"id": "d00", "name": "Day 00", "xp": 0}]}
                    ]
                }
            ]
        },
        {
            "id": "rncp-global",
            "level": 1,
            "requiredEvents": 0,
            "requiredProfessionalExperienceMonths": 0,
            "categories": [
                {"id": "other-projects", "requiredCount": 0, "requiredXP": 0}
            ]
        }
    ]"#;

    #[test]
    fn test_parse_catalog() {
        let catalog = Catalog::from_json(CATALOG, &table()).unwrap();
        assert_eq!(catalog.certifications().len(), 2);

        let web = catalog.get("rncp-web").unwrap();
        assert_eq!(web.required_professional_experience_months, 2);
        assert_eq!(web.categories[0].required_xp, 1000);

        let piscine = catalog.find_project("piscine").unwrap();
        assert!(piscine.has_sub_projects());
        assert_eq!(piscine.local_key(), "piscine");

        let t = catalog.find_project("ft_transcendence").unwrap();
        assert_eq!(t.id, "transcendence");
        assert_eq!(t.local_key(), "ft_transcendence");
    }

    #[test]
    fn test_rejects_level_beyond_table() {
        let json = r#"[{"id":"x","level":7,"requiredEvents":0,"requiredProfessionalExperienceMonths":0}]"#;
        let err = Catalog::from_json(json, &table()).unwrap_err();
        assert!(matches!(err, CatalogError::UnknownLevel { max: 3, .. }));
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let json = r#"[
            {"id":"x","level":1,"requiredEvents":0,"requiredProfessionalExperienceMonths":0},
            {"id":"x","level":1,"requiredEvents":0,"requiredProfessionalExperienceMonths":0}
        ]"#;
        assert!(matches!(
            Catalog::from_json(json, &table()),
            Err(CatalogError::DuplicateCertification(id)) if id == "x"
        ));
    }

    #[test]
    fn test_rejects_negative_xp() {
        let json = r#"[{"id":"x","level":1,"requiredEvents":0,"requiredProfessionalExperienceMonths":0,
            "categories":[{"id":"c","requiredCount":0,"requiredXP":0,
            "projects":[{"id":"p","name":"p","xp":-5}]}]}]"#;
        assert!(matches!(
            Catalog::from_json(json, &table()),
            Err(CatalogError::Parse(_))
        ));
    }

    #[test]
    fn test_with_custom_projects() {
        let catalog = Catalog::from_json(CATALOG, &table()).unwrap();
        let custom = vec![SimulatorProject::new("custom-1", "Side project", 4200)];

        let merged = catalog.with_custom_projects(&custom);
        let global = merged.get("rncp-global").unwrap();
        assert_eq!(global.categories[0].projects, custom);

        // base catalog untouched
        assert!(catalog.find_project("custom-1").is_none());
        assert!(merged.find_project("custom-1").is_some());
    }
}
