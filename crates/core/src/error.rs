//! Error taxonomy shared by the fetcher, refresher and curation store.

use thiserror::Error;

/// Failure while pulling the catalog from its backing store.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Service credentials are missing or malformed.
    #[error("invalid credentials: {0}")]
    Credential(String),
    /// The spreadsheet, worksheet or snapshot does not exist.
    #[error("catalog source not found: {0}")]
    NotFound(String),
    /// Network or authorization failure; a cached catalog may stand in.
    #[error("fetch failed: {0}")]
    Transient(String),
    /// The payload arrived but could not be decoded.
    #[error("could not decode catalog payload: {0}")]
    Decode(String),
}

impl FetchError {
    /// Whether a previously cached catalog may be served in place of this fetch.
    pub fn allows_fallback(&self) -> bool {
        !matches!(self, Self::NotFound(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transient(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Rejected favorites/list operation. State is left untouched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CurationError {
    /// A list with this name already exists.
    #[error("list '{0}' already exists")]
    AlreadyExists(String),
    /// The list name is empty after trimming.
    #[error("list name must not be empty")]
    InvalidName,
    /// The named list does not exist.
    #[error("list '{0}' does not exist")]
    UnknownList(String),
}
