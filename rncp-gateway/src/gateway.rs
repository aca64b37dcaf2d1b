//! Intra gateway - cache policy in front of the fetcher
//!
//! Read path for a user:
//! 1. entry younger than the cooldown: serve it, even on a forced refresh
//! 2. entry younger than the TTL and no forced refresh: serve it
//! 3. otherwise fetch projects, cursus and events, then overwrite the entry
//!
//! Concurrent misses for the same user are not collapsed; the last fetch to
//! finish wins the cache slot.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use rncp_engine::experience::{self, ProfessionalExperience};
use rncp_engine::{GradeMap, LevelTable, UserProgress};

use crate::cache::{CacheConfig, LayeredCache};
use crate::dispatch::{Dispatcher, DispatcherConfig};
use crate::error::GatewayError;
use crate::fetcher::{Fetcher, FetcherConfig};
use crate::keys::CacheKey;
use crate::records::{CursusUser, Event, EventUser, Me, ProjectUser, MAIN_CURSUS_ID};
use crate::transport::{HttpTransport, Transport, TransportConfig};

/// Everything the gateway needs to build its parts
#[derive(Debug, Clone, Default)]
pub struct GatewayConfig {
    pub transport: TransportConfig,
    pub dispatcher: DispatcherConfig,
    pub fetcher: FetcherConfig,
    pub cache: CacheConfig,
}

/// Merged upstream snapshot of one user, as cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    /// Level in the main cursus, 0 when absent
    pub level: f64,
    /// `project.name` of every validated project
    pub completed_project_names: Vec<String>,
    /// Number of tracked events attended
    pub events_count: u32,
    pub all_projects: Vec<ProjectUser>,
    pub all_cursus: Vec<CursusUser>,
    pub all_events: Vec<Event>,
}

impl UserData {
    /// Assemble the snapshot from the three upstream listings.
    pub fn from_records(projects: Vec<ProjectUser>, cursus: Vec<CursusUser>, events: Vec<EventUser>) -> Self {
        let level = cursus
            .iter()
            .find(|c| c.cursus_id == MAIN_CURSUS_ID)
            .map(|c| c.level)
            .unwrap_or(0.0);

        let completed_project_names = projects
            .iter()
            .filter(|p| p.validated)
            .map(|p| p.project.name.clone())
            .collect();

        let all_events: Vec<Event> = events
            .into_iter()
            .map(|eu| eu.event)
            .filter(Event::is_tracked)
            .collect();

        Self {
            level,
            completed_project_names,
            events_count: all_events.len() as u32,
            all_projects: projects,
            all_cursus: cursus,
            all_events,
        }
    }

    /// Grade percentage per validated project name
    pub fn grade_map(&self) -> GradeMap {
        self.all_projects
            .iter()
            .filter(|p| p.validated)
            .map(|p| (p.project.name.clone(), p.grade_percentage()))
            .collect()
    }

    /// Engine view of this snapshot plus locally entered experiences.
    pub fn to_progress(&self, table: &LevelTable, experiences: &[ProfessionalExperience]) -> UserProgress {
        UserProgress {
            current_level: self.level,
            current_xp: table.xp_from_level(self.level),
            events: self.events_count,
            professional_experience_months: experience::real_months(experiences),
            completed_project_identifiers: self.completed_project_names.clone(),
            completed_grades: self.grade_map(),
        }
    }
}

/// Rate-limited, cached access to the campus API.
///
/// One instance owns its queue and cache; independent instances share nothing.
pub struct IntraGateway {
    fetcher: Fetcher,
    cache: LayeredCache,
}

impl IntraGateway {
    /// Build a gateway over the real HTTP transport.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let transport = HttpTransport::new(config.transport.clone())?;
        Ok(Self::with_transport(Arc::new(transport), config))
    }

    /// Build a gateway over any transport.
    pub fn with_transport(transport: Arc<dyn Transport>, config: GatewayConfig) -> Self {
        let dispatcher = Dispatcher::new(config.dispatcher);
        Self {
            fetcher: Fetcher::new(transport, dispatcher, config.fetcher),
            cache: LayeredCache::new(config.cache),
        }
    }

    pub fn cache(&self) -> &LayeredCache {
        &self.cache
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        self.fetcher.dispatcher()
    }

    /// Merged projects, cursus and events of `user_id`.
    ///
    /// `force_refresh` is honored only once the cached entry is older than
    /// the cooldown.
    pub async fn get_user_data(
        &self,
        user_id: u64,
        token: &str,
        force_refresh: bool,
    ) -> Result<UserData, GatewayError> {
        let key = CacheKey::user_data(user_id);

        if let Some(hit) = self.cache.get::<UserData>(&key) {
            if hit.age < self.cache.config().cooldown {
                if force_refresh {
                    info!(
                        user_id,
                        age_secs = hit.age.as_secs(),
                        "Cache too fresh, refresh refused"
                    );
                }
                return Ok(hit.payload);
            }
            if !force_refresh {
                return Ok(hit.payload);
            }
            info!(user_id, age_secs = hit.age.as_secs(), "Cache bypass requested");
        }

        info!(user_id, "Fetching user data from upstream");
        let data = self.fetch_user_data(user_id, token).await?;
        self.cache.set(&key, &data);

        info!(
            user_id,
            level = data.level,
            completed = data.completed_project_names.len(),
            events = data.events_count,
            "User data refreshed"
        );
        Ok(data)
    }

    /// Profile of the credential's owner. Not cached.
    pub async fn get_me(&self, token: &str) -> Result<Me, GatewayError> {
        self.fetcher.fetch_one("/me", token).await
    }

    async fn fetch_user_data(&self, user_id: u64, token: &str) -> Result<UserData, GatewayError> {
        let projects_path = format!("/users/{user_id}/projects_users");
        let cursus_path = format!("/users/{user_id}/cursus_users");
        let events_path = format!("/users/{user_id}/events_users");

        let (projects, cursus, events) = tokio::try_join!(
            self.fetcher.fetch_paged::<ProjectUser>(&projects_path, token),
            self.fetcher.fetch_one::<Vec<CursusUser>>(&cursus_path, token),
            self.fetcher.fetch_one::<Vec<EventUser>>(&events_path, token),
        )?;

        Ok(UserData::from_records(projects, cursus, events))
    }
}
