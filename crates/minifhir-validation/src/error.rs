//! Error types for profile loading and validation.

use minifhir_core::CoreError;
use thiserror::Error;

/// Errors raised while fetching, parsing or caching profile documents.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("profile fetch failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("profile fetch failed: {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("profile decode failed: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid profile: {0}")]
    InvalidProfile(String),

    #[error("profile cache write failed: {0}")]
    Cache(#[from] std::io::Error),

    #[error("load profile {url}: {source}")]
    Load {
        url: String,
        #[source]
        source: Box<ProfileError>,
    },
}

impl ProfileError {
    /// Creates a new `InvalidProfile` error.
    #[must_use]
    pub fn invalid_profile(message: impl Into<String>) -> Self {
        Self::InvalidProfile(message.into())
    }

    /// Attaches the profile location to an error.
    #[must_use]
    pub fn for_url(self, url: impl Into<String>) -> Self {
        Self::Load {
            url: url.into(),
            source: Box::new(self),
        }
    }
}

/// Reasons a resource fails validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("unsupported resource type: {0}")]
    UnsupportedType(String),

    #[error("meta.profile contains empty value")]
    InvalidMeta,

    #[error("profile not loaded: {0}")]
    ProfileNotLoaded(String),

    /// Qualified paths (`Type.path`) of every missing field and choice group.
    #[error("missing required fields: {}", .0.join(", "))]
    MissingRequired(Vec<String>),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ValidationError {
    /// Missing qualified paths, empty for other failures.
    pub fn missing_paths(&self) -> &[String] {
        match self {
            Self::MissingRequired(paths) => paths,
            _ => &[],
        }
    }
}
