// Error taxonomy shared by every layer
use thiserror::Error;

pub type AnimatorResult<T> = Result<T, AnimatorError>;

#[derive(Debug, Error)]
pub enum AnimatorError {
    #[error("Invalid location: {0}")]
    InvalidLocation(String),

    #[error("Unknown visualization mode '{mode}' (available: {available})")]
    UnknownMode { mode: String, available: String },

    #[error("Band '{band}' required by mode '{mode}' is not present in scene {scene_id}")]
    MissingBand {
        band: String,
        mode: String,
        scene_id: String,
    },

    #[error("Invalid region: {0}")]
    InvalidRegion(String),

    #[error("Invalid scene metadata: {0}")]
    InvalidScene(String),

    #[error("Authentication failed: {message}\n{remediation}")]
    Auth { message: String, remediation: String },

    #[error("No images found matching criteria")]
    NoScenes,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{service} request failed: {message}")]
    Service { service: &'static str, message: String },

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AnimatorError {
    pub fn auth(message: impl Into<String>, remediation: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
            remediation: remediation.into(),
        }
    }

    pub fn service(service: &'static str, message: impl Into<String>) -> Self {
        Self::Service {
            service,
            message: message.into(),
        }
    }

    /// Connection, timeout and body-transfer failures. Undecodable payloads
    /// and malformed requests are not transient.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(e)
            if e.is_connect() || e.is_timeout() || e.is_request() || e.is_body())
    }
}

impl From<config::ConfigError> for AnimatorError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
