// src/feed/tracker.rs
//! Reconciles freshly built events against the last published feed.
//!
//! Events are never dropped once published: an event that disappears from the roster
//! stays in the feed as CANCELLED so subscribed calendars remove it. A present event is
//! bumped only when its end or description changes; an absent one on every run.

use chrono::NaiveDateTime;
use std::collections::BTreeMap;

use crate::error::ParseError;
use crate::feed::event::{Event, EventStatus};

/// Start and route are part of the uid, so only end and description can differ.
fn unchanged(new: &Event, old: &Event) -> bool {
    new.end == old.end && new.description == old.description
}

fn next_sequence(prev: &Event) -> Result<u32, ParseError> {
    prev.sequence.checked_add(1).ok_or_else(|| {
        ParseError::BadFeed(format!("{}: SEQUENCE:{} cannot be raised", prev.uid, prev.sequence))
    })
}

/// Merge `new` (fresh events, sequence 0) with `old` (as last published).
///
/// Fails only when an old sequence number is already at its maximum.
pub fn reconcile(
    new: BTreeMap<String, Event>,
    old: &BTreeMap<String, Event>,
    now: NaiveDateTime,
) -> Result<BTreeMap<String, Event>, ParseError> {
    let mut out = BTreeMap::new();

    for (uid, mut ev) in new {
        match old.get(&uid) {
            Some(prev) if unchanged(&ev, prev) => {
                ev.sequence = prev.sequence;
                ev.modified = prev.modified;
            }
            Some(prev) => {
                ev.sequence = next_sequence(prev)?;
                ev.modified = now;
                ev.status = EventStatus::Tentative;
                tracing::debug!(target: "feed", uid = %uid, seq = ev.sequence, "event changed");
            }
            None => {
                ev.sequence = 0;
                ev.modified = now;
                ev.status = EventStatus::Tentative;
            }
        }
        out.insert(uid, ev);
    }

    for (uid, prev) in old {
        if out.contains_key(uid) {
            continue;
        }
        let mut ev = prev.clone();
        ev.status = EventStatus::Cancelled;
        ev.sequence = next_sequence(prev)?;
        ev.modified = now;
        tracing::debug!(target: "feed", uid = %uid, seq = ev.sequence, "event cancelled");
        out.insert(uid.clone(), ev);
    }

    Ok(out)
}
