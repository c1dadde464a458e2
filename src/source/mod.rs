// src/source/mod.rs
//! External collaborators: where roster tokens, trip sheets and crew lists come from.
pub mod portal;
pub mod recorded;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{CrewMember, RawSector};

/// Per-day roster tokens, addressed by epoch day.
#[async_trait]
pub trait RosterProvider: Send + Sync {
    /// Epoch days covered by the currently published roster, ascending.
    async fn roster_days(&self) -> Result<Vec<i64>>;
    async fn day_tokens(&self, epoch_day: i64) -> Result<Vec<String>>;

    /// True while the portal holds roster changes nobody has acknowledged. The roster it
    /// serves until then is not the one that will be flown.
    async fn pending_changes(&self) -> Result<bool> {
        Ok(false)
    }
}

#[async_trait]
pub trait TripDetailProvider: Send + Sync {
    /// Sector records of a trip, grouped per duty.
    /// Returns `SourceUnavailable` when the portal has no such trip.
    async fn trip(&self, epoch_day: i64, trip_id: &str) -> Result<Vec<Vec<RawSector>>>;
}

#[async_trait]
pub trait CrewListProvider: Send + Sync {
    async fn crew(&self, leg_id: &str) -> Result<Vec<CrewMember>>;
}

/// Normalize one scraped token: decode entities, drop non-breaking spaces, trim.
pub fn normalize_token(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s);
    decoded.replace('\u{00A0}', " ").trim().to_string()
}

/// Normalize a whole day's tokens, dropping the ones that end up empty.
pub fn normalize_tokens<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    raw.iter()
        .map(|t| normalize_token(t.as_ref()))
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_decodes_entities_and_nbsp() {
        assert_eq!(normalize_token("==&gt;"), "==>");
        assert_eq!(normalize_token("\u{00A0}6"), "6");
        assert_eq!(normalize_token("&nbsp;"), "");
    }

    #[test]
    fn empty_tokens_are_dropped() {
        let out = normalize_tokens(&["B001T", "&nbsp;", " 5:00 "]);
        assert_eq!(out, vec!["B001T".to_string(), "5:00".to_string()]);
    }
}
