//! Error taxonomy for roster reconstruction and feed publication.
//!
//! Per-entry errors (one trip, one day, one sector) are caught by the schedule walk,
//! logged and the entry is dropped. Run-level errors abort the run.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RosterError>;

/// Structural mismatch in scraped text. Every variant carries the offending raw fragment.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("bad roster entry: {0}")]
    BadRoster(String),

    #[error("bad trip details: {0}")]
    BadTrip(String),

    #[error("bad crew list: {0}")]
    BadCrew(String),

    #[error("bad sector record: {0}")]
    BadSector(String),

    #[error("bad duty record: {0}")]
    BadDuty(String),

    #[error("bad calendar feed: {0}")]
    BadFeed(String),
}

#[derive(Error, Debug)]
pub enum RosterError {
    /// The portal explicitly reported that the requested item does not exist.
    #[error("source has no data for {what}")]
    SourceUnavailable { what: String },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("cache file {path}: {source}")]
    CacheIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Network, timeout or HTTP status failure talking to the portal.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The portal holds roster changes that have not been acknowledged yet.
    #[error("roster changes are awaiting acknowledgement on the portal")]
    PendingChanges,
}

impl RosterError {
    pub fn source_unavailable(what: impl Into<String>) -> Self {
        Self::SourceUnavailable { what: what.into() }
    }

    pub fn cache_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::CacheIo {
            path: path.into(),
            source,
        }
    }

    /// Run-level errors abort the whole run; everything else is scoped to one entry.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::PendingChanges)
    }
}

impl From<reqwest::Error> for RosterError {
    fn from(e: reqwest::Error) -> Self {
        let what = match e.url() {
            Some(url) => format!("{} ({})", e, url.path()),
            None => e.to_string(),
        };
        Self::Transport(what)
    }
}
