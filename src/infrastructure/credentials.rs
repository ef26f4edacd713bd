// Credentials read from the process environment
use crate::error::{AnimatorError, AnimatorResult};
use std::path::PathBuf;

pub const EE_SERVICE_ACCOUNT_VAR: &str = "EE_SERVICE_ACCOUNT";
pub const EE_PRIVATE_KEY_VAR: &str = "EE_PRIVATE_KEY";
pub const GOOGLE_CREDENTIALS_VAR: &str = "GOOGLE_APPLICATION_CREDENTIALS";
pub const USGS_USERNAME_VAR: &str = "USGS_USERNAME";
pub const USGS_PASSWORD_VAR: &str = "USGS_PASSWORD";

pub const EARTH_ENGINE_REMEDIATION: &str = "Authentication options:
1. Default: Run 'gcloud auth application-default login' to set up user credentials
2. Service Account: Set EE_SERVICE_ACCOUNT and EE_PRIVATE_KEY environment variables
3. Credentials File: Set GOOGLE_APPLICATION_CREDENTIALS environment variable";

pub const USGS_REMEDIATION: &str =
    "Set USGS_USERNAME and USGS_PASSWORD to an account with M2M API access (https://ers.cr.usgs.gov)";

#[derive(Debug, Clone, PartialEq)]
pub enum EarthEngineCredentials {
    /// Service account email plus its JSON key, both from the environment
    ServiceAccount { email: String, key_json: String },
    /// Path to a service account JSON key file
    CredentialsFile(PathBuf),
    /// Whatever ambient Google credentials the machine has
    ApplicationDefault,
}

impl EarthEngineCredentials {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        match (get(EE_SERVICE_ACCOUNT_VAR), get(EE_PRIVATE_KEY_VAR)) {
            (Some(email), Some(key_json)) => EarthEngineCredentials::ServiceAccount { email, key_json },
            _ => match get(GOOGLE_CREDENTIALS_VAR) {
                Some(path) => EarthEngineCredentials::CredentialsFile(PathBuf::from(path)),
                None => EarthEngineCredentials::ApplicationDefault,
            },
        }
    }
}

#[derive(Clone, PartialEq)]
pub struct UsgsCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for UsgsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsgsCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl UsgsCredentials {
    pub fn from_env() -> AnimatorResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AnimatorResult<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        match (get(USGS_USERNAME_VAR), get(USGS_PASSWORD_VAR)) {
            (Some(username), Some(password)) => Ok(Self { username, password }),
            _ => Err(AnimatorError::auth(
                "USGS credentials are not configured",
                USGS_REMEDIATION,
            )),
        }
    }
}
