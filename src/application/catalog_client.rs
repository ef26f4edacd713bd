// Catalog client trait for imagery search backends
use crate::domain::region::Region;
use crate::domain::scene::Scene;
use crate::error::AnimatorResult;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Credential held for the duration of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    /// Cloud project billed for the requests, when the backend has one
    pub project: Option<String>,
}

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            project: None,
        }
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneQuery {
    pub region: Region,
    pub start: NaiveDate,
    /// Exclusive
    pub end: NaiveDate,
    /// Scenes must be strictly below this percentage
    pub max_cloud_cover: f64,
}

#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Human-readable dataset identifier, for the console report
    fn dataset(&self) -> &str;

    async fn authenticate(&self) -> AnimatorResult<Session>;

    /// All scenes intersecting the region in the date window below the cloud ceiling.
    async fn search(&self, session: &Session, query: &SceneQuery) -> AnimatorResult<Vec<Scene>>;

    async fn logout(&self, session: Session) -> AnimatorResult<()>;
}
