// src/schedule.rs
//! Roster walk: per-day tokens → duty list.
//!
//! Each day is read last token first. Off-duty codes and the continuation marker produce
//! nothing, a trailing pair of clock times closes an inline standby/training duty, and
//! anything else names a trip whose duties come from the cache or the portal.
//!
//! Per-entry failures are logged and the entry is dropped. A transport failure stops the
//! walk, but the cache is saved first so trips fetched so far are not lost.

use chrono::{NaiveDate, NaiveDateTime, Utc};
use metrics::counter;

use crate::cache::{needs_refresh, TripCache};
use crate::dedup::deduplicate;
use crate::error::{ParseError, Result, RosterError};
use crate::metrics::ensure_metrics_described;
use crate::model::{add_days, Duty, RosterDay};
use crate::reconstruct::{is_clock_token, parse_clock, reconstruct_duty};
use crate::source::{CrewListProvider, RosterProvider, TripDetailProvider};

/// Day off, leave and rest codes. None of them is a duty.
pub const OFF_DUTY_CODES: &[&str] = &["D/O", "D/OR", "WD/O", "P/T", "LVE", "FTGD", "REST", "SICK"];

/// "This day is the tail of yesterday's trip."
pub const CONTINUATION_MARKER: &str = "==>";

fn is_off_duty(token: &str) -> bool {
    token == CONTINUATION_MARKER || OFF_DUTY_CODES.contains(&token)
}

/// Lone digit the portal prints next to long duties.
fn is_long_duty_marker(token: &str) -> bool {
    token.len() == 1 && token.as_bytes()[0].is_ascii_digit()
}

pub struct ScheduleBuilder<'a> {
    trips: &'a dyn TripDetailProvider,
    crew: &'a dyn CrewListProvider,
    cache: &'a mut TripCache,
    force: bool,
    now: NaiveDateTime,
}

impl<'a> ScheduleBuilder<'a> {
    pub fn new(
        trips: &'a dyn TripDetailProvider,
        crew: &'a dyn CrewListProvider,
        cache: &'a mut TripCache,
    ) -> Self {
        ensure_metrics_described();
        Self {
            trips,
            crew,
            cache,
            force: false,
            now: Utc::now().naive_utc(),
        }
    }

    /// Refetch every trip regardless of what the cache holds. Results are still cached.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Reference instant for staleness checks.
    pub fn at(mut self, now: NaiveDateTime) -> Self {
        self.now = now;
        self
    }

    /// Walk `days` in the given order and return the deduplicated duty list.
    pub async fn build(&mut self, days: &[RosterDay]) -> Result<Vec<Duty>> {
        let mut duties = Vec::new();
        let walked = self.walk(days, &mut duties).await;

        if let Err(e) = self.cache.save() {
            tracing::warn!(target: "schedule", error = %e, "trip cache not saved");
        }
        walked?;

        let duties = deduplicate(duties);
        tracing::info!(target: "schedule", days = days.len(), duties = duties.len(), "schedule built");
        Ok(duties)
    }

    /// Ask the roster provider for its current window, then build it.
    ///
    /// Refuses with `PendingChanges` while the portal has unacknowledged roster changes;
    /// nothing is fetched and the cache is left alone.
    pub async fn build_window(&mut self, roster: &dyn RosterProvider) -> Result<Vec<Duty>> {
        if roster.pending_changes().await? {
            tracing::warn!(target: "schedule", "roster changes await acknowledgement, not building");
            return Err(RosterError::PendingChanges);
        }
        let mut days = Vec::new();
        for epoch_day in roster.roster_days().await? {
            let tokens = roster.day_tokens(epoch_day).await?;
            days.push(RosterDay { epoch_day, tokens });
        }
        self.build(&days).await
    }

    async fn walk(&mut self, days: &[RosterDay], out: &mut Vec<Duty>) -> Result<()> {
        for day in days {
            self.walk_day(day, out).await?;
        }
        Ok(())
    }

    async fn walk_day(&mut self, day: &RosterDay, out: &mut Vec<Duty>) -> Result<()> {
        let date = match day.date() {
            Ok(date) => date,
            Err(e) => {
                counter!("roster_entry_errors_total").increment(1);
                tracing::warn!(target: "schedule", day = day.epoch_day, error = %e, "skipping roster day");
                return Ok(());
            }
        };
        let mut rest = day.tokens.as_slice();

        while let Some((token, before)) = rest.split_last() {
            rest = before;
            let token = token.as_str();

            if is_off_duty(token) {
                continue;
            }
            if is_long_duty_marker(token) {
                tracing::debug!(target: "schedule", day = day.epoch_day, token, "ignoring long duty marker");
                continue;
            }
            if is_clock_token(token) {
                match inline_duty(token, &mut rest, date) {
                    Ok(duty) => out.push(duty),
                    Err(e) => {
                        counter!("roster_entry_errors_total").increment(1);
                        tracing::warn!(
                            target: "schedule",
                            day = day.epoch_day,
                            error = %e,
                            tokens = ?day.tokens,
                            "skipping rest of roster day"
                        );
                        return Ok(());
                    }
                }
                continue;
            }

            match self.trip_duties(day.epoch_day, date, token).await {
                Ok(duties) => out.extend(duties),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e @ RosterError::SourceUnavailable { .. }) => {
                    tracing::info!(target: "schedule", day = day.epoch_day, trip = token, reason = %e, "no trip details");
                }
                Err(e) => {
                    counter!("roster_entry_errors_total").increment(1);
                    tracing::warn!(target: "schedule", day = day.epoch_day, trip = token, error = %e, "skipping trip");
                }
            }
        }
        Ok(())
    }

    async fn trip_duties(
        &mut self,
        epoch_day: i64,
        date: NaiveDate,
        trip_id: &str,
    ) -> Result<Vec<Duty>> {
        if !self.force {
            let cached = self.cache.get(date, trip_id);
            if !needs_refresh(cached, self.now) {
                counter!("roster_cache_hits_total").increment(1);
                return Ok(cached.map(<[Duty]>::to_vec).unwrap_or_default());
            }
        }

        counter!("roster_trips_fetched_total").increment(1);
        tracing::debug!(target: "schedule", day = epoch_day, trip = trip_id, "fetching trip");
        let groups = self.trips.trip(epoch_day, trip_id).await?;

        let mut duties = Vec::with_capacity(groups.len());
        for records in &groups {
            duties.push(reconstruct_duty(records, date, trip_id, self.crew).await?);
        }
        self.cache.put(date, trip_id, duties.clone());
        Ok(duties)
    }
}

/// Read `label start end` backwards from an end time token already taken off the day.
fn inline_duty<'t>(
    end_token: &str,
    rest: &mut &'t [String],
    date: NaiveDate,
) -> std::result::Result<Duty, ParseError> {
    let mut take = || -> Option<&'t str> {
        let tokens: &'t [String] = *rest;
        let (last, before) = tokens.split_last()?;
        *rest = before;
        Some(last.as_str())
    };
    let start_token = take();
    let label = take();

    let bad = || {
        ParseError::BadRoster(format!(
            "{date}: {} {} {end_token}",
            label.unwrap_or("?"),
            start_token.unwrap_or("?")
        ))
    };

    let end_time = parse_clock(end_token).ok_or_else(bad)?;
    let start_time = start_token.and_then(parse_clock).ok_or_else(bad)?;
    let label = label.filter(|l| !is_clock_token(l)).ok_or_else(bad)?;

    let start = date.and_time(start_time);
    let mut end = date.and_time(end_time);
    if end < start {
        end = add_days(date, 1).ok_or_else(bad)?.and_time(end_time);
    }
    Ok(Duty {
        start,
        end,
        label: label.to_string(),
        sectors: None,
    })
}
