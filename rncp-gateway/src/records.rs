//! Typed upstream records
//!
//! Wire-format quirks are resolved here, at the fetcher boundary. In
//! particular `projects_users` entries report their validation flag as
//! `"validated?"`; everything past this module only sees `validated`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event kinds that count toward the events requirement
pub const TRACKED_EVENT_KINDS: &[&str] = &[
    "meet_up",
    "conference",
    "exam",
    "challenge",
    "hackathon",
    "pedago",
    "event",
    "rush",
    "workshop",
    "partnership",
    "speed_working",
    "meet",
    "other",
];

/// Cursus whose level is the user's main level
pub const MAIN_CURSUS_ID: u64 = 21;

/// Highest grade percentage accepted from upstream
pub const MAX_GRADE: u32 = 125;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRef {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

/// One `projects_users` entry, with `validated` normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawProjectUser")]
pub struct ProjectUser {
    pub id: u64,
    pub final_mark: Option<i64>,
    pub status: String,
    pub validated: bool,
    pub project: ProjectRef,
    pub cursus_ids: Vec<u64>,
    pub marked_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct RawProjectUser {
    id: u64,
    #[serde(default)]
    final_mark: Option<i64>,
    #[serde(default)]
    status: String,
    #[serde(default)]
    validated: Option<bool>,
    /// `Some(None)` when the key is present but null
    #[serde(rename = "validated?", default, deserialize_with = "present")]
    validated_quirk: Option<Option<bool>>,
    project: ProjectRef,
    #[serde(default)]
    cursus_ids: Vec<u64>,
    #[serde(default)]
    marked_at: Option<DateTime<Utc>>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Option<bool>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<bool>::deserialize(deserializer).map(Some)
}

impl From<RawProjectUser> for ProjectUser {
    fn from(raw: RawProjectUser) -> Self {
        Self {
            id: raw.id,
            final_mark: raw.final_mark,
            status: raw.status,
            // the quirky name wins whenever the key is present, even as null
            validated: match raw.validated_quirk {
                Some(quirk) => quirk.unwrap_or(false),
                None => raw.validated.unwrap_or(false),
            },
            project: raw.project,
            cursus_ids: raw.cursus_ids,
            marked_at: raw.marked_at,
        }
    }
}

impl ProjectUser {
    /// Grade as a percentage: `final_mark` clamped to 0–125, missing or zero counts as 100.
    pub fn grade_percentage(&self) -> u32 {
        match self.final_mark {
            None | Some(0) => 100,
            Some(mark) => mark.clamp(0, MAX_GRADE as i64) as u32,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CursusUser {
    pub id: u64,
    pub cursus_id: u64,
    #[serde(default)]
    pub level: f64,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub begin_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub blackholed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub begin_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_at: Option<DateTime<Utc>>,
}

impl Event {
    /// Whether this event counts toward certification requirements
    pub fn is_tracked(&self) -> bool {
        TRACKED_EVENT_KINDS.contains(&self.kind.as_str())
    }
}

/// One `events_users` entry; only the nested event is kept.
#[derive(Debug, Clone, Deserialize)]
pub struct EventUser {
    pub event: Event,
}

/// The `/me` profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Me {
    pub id: u64,
    pub login: String,
    #[serde(default)]
    pub displayname: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project_user(json: &str) -> ProjectUser {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_validated_quirk_is_normalized() {
        let pu = project_user(
            r#"{"id":1,"final_mark":110,"status":"finished","validated?":true,
                "project":{"id":1314,"name":"Libft","slug":"42cursus-libft"},"cursus_ids":[21],
                "marked_at":"2023-11-02T10:12:44.000Z"}"#,
        );
        assert!(pu.validated);
        assert_eq!(pu.project.name, "Libft");
        assert!(pu.marked_at.is_some());

        // re-serialized form only carries the normalized name
        let json = serde_json::to_value(&pu).unwrap();
        assert_eq!(json["validated"], true);
        assert!(json.get("validated?").is_none());
        assert_eq!(serde_json::from_value::<ProjectUser>(json).unwrap(), pu);
    }

    #[test]
    fn test_quirk_preferred_over_plain_name() {
        let pu = project_user(
            r#"{"id":1,"validated":true,"validated?":false,"project":{"id":1,"name":"x"}}"#,
        );
        assert!(!pu.validated);

        let pu = project_user(r#"{"id":1,"validated?":null,"project":{"id":1,"name":"x"}}"#);
        assert!(!pu.validated);

        // a null quirk still shadows the plain flag
        let pu = project_user(
            r#"{"id":1,"validated":true,"validated?":null,"project":{"id":1,"name":"x"}}"#,
        );
        assert!(!pu.validated);

        let pu = project_user(r#"{"id":1,"validated":true,"project":{"id":1,"name":"x"}}"#);
        assert!(pu.validated);
    }

    #[test]
    fn test_grade_percentage() {
        let mut pu = project_user(r#"{"id":1,"project":{"id":1,"name":"x"}}"#);
        assert_eq!(pu.grade_percentage(), 100);
        pu.final_mark = Some(0);
        assert_eq!(pu.grade_percentage(), 100);
        pu.final_mark = Some(87);
        assert_eq!(pu.grade_percentage(), 87);
        pu.final_mark = Some(150);
        assert_eq!(pu.grade_percentage(), 125);
        pu.final_mark = Some(-42);
        assert_eq!(pu.grade_percentage(), 0);
    }

    #[test]
    fn test_event_kinds() {
        let event: Event = serde_json::from_str(r#"{"id":3,"name":"Hack","kind":"hackathon"}"#).unwrap();
        assert!(event.is_tracked());

        let event: Event = serde_json::from_str(r#"{"id":4,"name":"Party","kind":"association"}"#).unwrap();
        assert!(!event.is_tracked());
    }
}
