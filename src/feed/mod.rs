// src/feed/mod.rs
//! Versioned calendar feed: duties → events → reconciled against the previous feed → iCal.
pub mod event;
pub mod ical;
pub mod tracker;

pub use event::{events_from_duties, route, Event, EventStatus};
pub use ical::{parse_feed, render_feed};
pub use tracker::reconcile;

use chrono::{NaiveDateTime, Timelike, Utc};
use metrics::counter;

use crate::config::RosterConfig;
use crate::error::Result;
use crate::metrics::ensure_metrics_described;
use crate::model::Duty;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Publication {
    Feed(String),
    /// Nothing scheduled now and nothing ever published.
    NoChanges,
}

/// Current instant at the feed's seconds precision.
pub fn feed_now() -> NaiveDateTime {
    let now = Utc::now().naive_utc();
    now.with_nanosecond(0).unwrap_or(now)
}

/// Build the next feed for `duties`, reconciled against the previously published text.
///
/// A previous feed that does not parse aborts publication; silently starting over would
/// reset every sequence number subscribers have seen.
pub fn publish(
    duties: &[Duty],
    previous: Option<&str>,
    now: NaiveDateTime,
    cfg: &RosterConfig,
) -> Result<Publication> {
    ensure_metrics_described();
    let old = match previous {
        Some(text) => parse_feed(text)?,
        None => Default::default(),
    };
    let fresh = events_from_duties(duties, now, &cfg.uid_domain);
    let events = reconcile(fresh, &old, now)?;

    if events.is_empty() {
        tracing::info!(target: "feed", "no events to publish");
        return Ok(Publication::NoChanges);
    }

    let changed = events.values().filter(|e| e.modified == now).count();
    counter!("feed_events_published_total").increment(events.len() as u64);
    tracing::info!(
        target: "feed",
        events = events.len(),
        changed,
        previous = old.len(),
        "feed reconciled"
    );
    Ok(Publication::Feed(render_feed(&events, &cfg.prodid)))
}
