//! Core roster types shared by reconstruction, caching and publishing.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// The portal addresses calendar days as days elapsed since 1980-01-01.
/// `None` when the count falls outside chrono's calendar.
pub fn epoch_day_to_date(epoch_day: i64) -> Option<NaiveDate> {
    let base = NaiveDate::from_ymd_opt(1980, 1, 1)?;
    add_days(base, epoch_day)
}

/// Shift a date by a day count that came from scraped text.
pub fn add_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    date.checked_add_signed(Duration::try_days(days)?)
}

pub fn date_to_epoch_day(date: NaiveDate) -> i64 {
    let base = NaiveDate::from_ymd_opt(1980, 1, 1).unwrap_or_default();
    (date - base).num_days()
}

/// Raw tokens the portal published for one calendar day, in reading order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterDay {
    pub epoch_day: i64,
    pub tokens: Vec<String>,
}

impl RosterDay {
    pub fn new<S: Into<String>>(epoch_day: i64, tokens: impl IntoIterator<Item = S>) -> Self {
        Self {
            epoch_day,
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    pub fn date(&self) -> Result<NaiveDate, ParseError> {
        epoch_day_to_date(self.epoch_day).ok_or_else(|| {
            ParseError::BadRoster(format!("epoch day {} is out of range", self.epoch_day))
        })
    }
}

/// One sector row of a trip sheet, split into whitespace-separated fields.
///
/// `fields[0..5]` are flight code, origin, destination, scheduled off and scheduled on.
/// The first row of a duty also carries the departure date text at `fields[5]` and the
/// trip day number at `fields[6]`. The last field of every row is an `H:MM` time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSector {
    /// Leg identifier used for crew lookups; absent for quasi-sectors.
    pub leg_id: Option<String>,
    pub fields: Vec<String>,
}

impl RawSector {
    pub fn new<S: Into<String>>(leg_id: Option<&str>, fields: impl IntoIterator<Item = S>) -> Self {
        Self {
            leg_id: leg_id.map(str::to_string),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Compact rendering used in error messages and logs.
    pub fn describe(&self) -> String {
        format!(
            "{} [{}]",
            self.leg_id.as_deref().unwrap_or("-"),
            self.fields.join(" ")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrewMember {
    pub name: String,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sector {
    /// Flight number, or the bracketed code of a quasi-sector (e.g. `[LSBY]`).
    pub flight: String,
    pub origin: String,
    pub destination: String,
    pub sched_off: NaiveDateTime,
    pub sched_on: NaiveDateTime,
    pub actual_off: Option<NaiveDateTime>,
    pub actual_on: Option<NaiveDateTime>,
    pub registration: Option<String>,
    pub positioning: bool,
    #[serde(default)]
    pub crew: Vec<CrewMember>,
}

impl Sector {
    pub fn is_quasi(&self) -> bool {
        self.flight.starts_with('[')
    }

    pub fn has_actuals(&self) -> bool {
        self.actual_off.is_some() && self.actual_on.is_some()
    }

    /// Ground positioning: travelling as a passenger without an aircraft registration.
    pub fn is_ground_positioning(&self) -> bool {
        self.positioning && self.registration.is_none()
    }

    /// The source will never add anything more to a final sector.
    pub fn is_final(&self) -> bool {
        self.has_actuals() || self.is_ground_positioning() || self.is_quasi()
    }

    /// Actual off/on when both were reported, otherwise the schedule.
    pub fn block_times(&self) -> (NaiveDateTime, NaiveDateTime) {
        match (self.actual_off, self.actual_on) {
            (Some(off), Some(on)) => (off, on),
            _ => (self.sched_off, self.sched_on),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Duty {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Free-text code for standby/training, or the trip identifier.
    pub label: String,
    /// Absent for non-flying duties.
    pub sectors: Option<Vec<Sector>>,
}

impl Duty {
    pub fn is_flying(&self) -> bool {
        self.sectors.as_ref().is_some_and(|s| !s.is_empty())
    }

    /// True if `other` lies entirely within this duty's interval.
    pub fn contains(&self, other: &Duty) -> bool {
        other.start >= self.start && other.end <= self.end
    }
}
