//! Professional experience (internships and work-study contracts)
//!
//! Real experiences are already inside the upstream level, so they only
//! contribute the coalition boost on top. Simulated experiences contribute
//! their full, percentage-adjusted XP.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ExperienceError;
use crate::simulation::{MAX_PERCENTAGE, MIN_PERCENTAGE};

/// XP per month of internship at 100 %
pub const INTERNSHIP_XP_PER_MONTH: u64 = 10_500;

/// XP per year of work-study at 100 %
pub const WORK_STUDY_XP_PER_YEAR: u64 = 90_000;

/// Coalition boost rate on experiences
pub const EXPERIENCE_BOOST_RATE: f64 = 0.042;

/// Kind of professional experience.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceKind {
    /// Duration counted in months
    #[serde(alias = "stage")]
    Internship,
    /// Duration counted in years
    #[serde(alias = "alternance")]
    WorkStudy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfessionalExperience {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ExperienceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    /// Months for internships, years for work-study
    pub duration: u32,
    #[serde(default = "default_percentage")]
    pub validation_percentage: u32,
    /// Accepts a bool or the boost rate in percent (`4.2`, `0`)
    #[serde(default, deserialize_with = "boost_flag")]
    pub coalition_boost: bool,
    #[serde(default)]
    pub is_simulation: bool,
}

fn default_percentage() -> u32 {
    100
}

fn boost_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Rate(f64),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Rate(rate) => rate > 0.0,
    })
}

impl ProfessionalExperience {
    /// XP at 100 % before any boost
    pub fn base_xp(&self) -> u64 {
        match self.kind {
            ExperienceKind::Internship => INTERNSHIP_XP_PER_MONTH.saturating_mul(self.duration as u64),
            ExperienceKind::WorkStudy => WORK_STUDY_XP_PER_YEAR.saturating_mul(self.duration as u64),
        }
    }

    /// XP this experience adds on top of the upstream level
    pub fn xp_earned(&self) -> u64 {
        let base = self.base_xp() as f64;
        let boost = if self.coalition_boost { EXPERIENCE_BOOST_RATE } else { 0.0 };

        let xp = if self.is_simulation {
            base * self.validation_percentage as f64 / 100.0 * (1.0 + boost)
        } else {
            base * boost
        };
        xp.round() as u64
    }

    /// Duration in months
    pub fn months(&self) -> u32 {
        match self.kind {
            ExperienceKind::Internship => self.duration,
            ExperienceKind::WorkStudy => self.duration.saturating_mul(12),
        }
    }

    fn check(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("missing id".into());
        }
        if self.duration == 0 {
            return Err("duration must be at least 1".into());
        }
        if !(MIN_PERCENTAGE..=MAX_PERCENTAGE).contains(&self.validation_percentage) {
            return Err(format!(
                "validation percentage {} outside {}-{}",
                self.validation_percentage, MIN_PERCENTAGE, MAX_PERCENTAGE
            ));
        }
        if !self.is_simulation && self.start_date.is_none() {
            return Err("real experience needs a start date".into());
        }
        Ok(())
    }
}

/// Parse and validate a JSON array of experiences.
pub fn import_json(json: &str) -> Result<Vec<ProfessionalExperience>, ExperienceError> {
    let experiences: Vec<ProfessionalExperience> = serde_json::from_str(json)?;
    for (index, exp) in experiences.iter().enumerate() {
        exp.check()
            .map_err(|reason| ExperienceError::Invalid { index, reason })?;
    }
    Ok(experiences)
}

/// Sum of `xp_earned` over all experiences
pub fn total_xp(experiences: &[ProfessionalExperience]) -> u64 {
    experiences.iter().map(|e| e.xp_earned()).fold(0, u64::saturating_add)
}

/// Sum of `xp_earned` over real experiences
pub fn real_xp(experiences: &[ProfessionalExperience]) -> u64 {
    experiences
        .iter()
        .filter(|e| !e.is_simulation)
        .map(|e| e.xp_earned())
        .fold(0, u64::saturating_add)
}

/// Sum of `xp_earned` over simulated experiences
pub fn simulated_xp(experiences: &[ProfessionalExperience]) -> u64 {
    experiences
        .iter()
        .filter(|e| e.is_simulation)
        .map(|e| e.xp_earned())
        .fold(0, u64::saturating_add)
}

/// Months of real experience
pub fn real_months(experiences: &[ProfessionalExperience]) -> u32 {
    experiences
        .iter()
        .filter(|e| !e.is_simulation)
        .map(|e| e.months())
        .fold(0, u32::saturating_add)
}

/// Number of real experiences
pub fn real_count(experiences: &[ProfessionalExperience]) -> usize {
    experiences.iter().filter(|e| !e.is_simulation).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn internship(months: u32, pct: u32, boost: bool, simulated: bool) -> ProfessionalExperience {
        ProfessionalExperience {
            id: "i".into(),
            kind: ExperienceKind::Internship,
            start_date: NaiveDate::from_ymd_opt(2024, 9, 1),
            duration: months,
            validation_percentage: pct,
            coalition_boost: boost,
            is_simulation: simulated,
        }
    }

    #[test]
    fn test_simulated_internship_xp() {
        assert_eq!(internship(6, 100, false, true).xp_earned(), 63_000);
        // 4 * 10500 * 1.25 * 1.042
        assert_eq!(internship(4, 125, true, true).xp_earned(), 54_705);
    }

    #[test]
    fn test_real_experience_only_counts_boost() {
        assert_eq!(internship(6, 100, false, false).xp_earned(), 0);
        assert_eq!(internship(6, 125, true, false).xp_earned(), 2_646);
    }

    #[test]
    fn test_work_study_months() {
        let exp = ProfessionalExperience {
            id: "w".into(),
            kind: ExperienceKind::WorkStudy,
            start_date: None,
            duration: 2,
            validation_percentage: 100,
            coalition_boost: false,
            is_simulation: true,
        };
        assert_eq!(exp.months(), 24);
        assert_eq!(exp.xp_earned(), 180_000);
    }

    #[test]
    fn test_aggregates() {
        let list = vec![
            internship(6, 100, true, false),
            internship(4, 100, false, true),
        ];
        assert_eq!(real_months(&list), 6);
        assert_eq!(real_count(&list), 1);
        assert_eq!(real_xp(&list), 2_646);
        assert_eq!(simulated_xp(&list), 42_000);
        assert_eq!(total_xp(&list), 44_646);
    }

    #[test]
    fn test_huge_durations_saturate() {
        let json = r#"[
            {"id":"1","type":"work_study","startDate":"2024-01-15","duration":4000000000,"coalitionBoost":true},
            {"id":"2","type":"internship","startDate":"2024-01-15","duration":4000000000},
            {"id":"3","type":"internship","startDate":"2024-01-15","duration":4000000000}
        ]"#;
        let list = import_json(json).unwrap();
        assert_eq!(list[0].months(), u32::MAX);
        assert_eq!(real_months(&list), u32::MAX);
        assert_eq!(list[0].base_xp(), WORK_STUDY_XP_PER_YEAR * 4_000_000_000);
        // only the boosted work-study contributes on top of the level
        assert_eq!(total_xp(&list), list[0].xp_earned());
    }

    #[test]
    fn test_import_accepts_french_kind_names() {
        let json = r#"[
            {"id":"1","type":"stage","startDate":"2024-01-15","duration":6,"validationPercentage":100,"coalitionBoost":4.2,"isSimulation":false},
            {"id":"2","type":"alternance","duration":1,"isSimulation":true}
        ]"#;
        let list = import_json(json).unwrap();
        assert_eq!(list[0].kind, ExperienceKind::Internship);
        assert_eq!(list[1].kind, ExperienceKind::WorkStudy);
        assert_eq!(list[1].validation_percentage, 100);
        assert!(list[0].coalition_boost);
        assert!(!list[1].coalition_boost);
    }

    #[test]
    fn test_import_rejects_invalid_entries() {
        let json = r#"[{"id":"1","type":"stage","duration":0,"isSimulation":true}]"#;
        assert!(matches!(
            import_json(json),
            Err(ExperienceError::Invalid { index: 0, .. })
        ));

        let json = r#"[{"id":"1","type":"internship","duration":3}]"#;
        assert!(matches!(
            import_json(json),
            Err(ExperienceError::Invalid { index: 0, .. })
        ));
    }
}
