// src/reconstruct/sector.rs
//! One trip-sheet row → `Sector`.
//!
//! The first five fields are positional. Everything after them is classified field by
//! field, in any order, into actual times, a registration and the positioning marker.
//! Standby and training periods reported inside a trip have no leg id; they become
//! quasi-sectors labelled `[CODE]` and never carry actual times or crew.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{ParseError, Result, RosterError};
use crate::model::{add_days, RawSector, Sector};
use crate::reconstruct::parse_hhmm;
use crate::source::CrewListProvider;

pub const POSITIONING_MARKER: &str = "PAX";

static RE_ACTUAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^A(\d{4})$").expect("actual regex"));
static RE_REGISTRATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9]{1,2}-[A-Z0-9]{3,5}$").expect("registration regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectorField {
    ActualTime(NaiveTime),
    Registration(String),
    PositioningMarker,
    Unclassified,
}

/// Classify one free-position field. A field shaped like an actual time that does not
/// hold a valid time is an error, not `Unclassified`.
pub fn classify_field(field: &str) -> std::result::Result<SectorField, ParseError> {
    if let Some(caps) = RE_ACTUAL.captures(field) {
        return parse_hhmm(&caps[1])
            .map(SectorField::ActualTime)
            .ok_or_else(|| ParseError::BadSector(format!("invalid actual time {field}")));
    }
    if RE_REGISTRATION.is_match(field) {
        return Ok(SectorField::Registration(field.to_string()));
    }
    if field == POSITIONING_MARKER {
        return Ok(SectorField::PositioningMarker);
    }
    Ok(SectorField::Unclassified)
}

/// Scheduled times are `HHMM`, optionally followed by a day offset (`HHMM1`, `HHMM+1`).
fn parse_scheduled(s: &str) -> Option<(NaiveTime, i64)> {
    let time = parse_hhmm(s.get(..4)?)?;
    let offset = match &s[4..] {
        "" => 0,
        rest => {
            let digit = rest.strip_prefix('+').unwrap_or(rest);
            if digit.len() != 1 {
                return None;
            }
            digit.parse().ok()?
        }
    };
    Some((time, offset))
}

/// Actual times carry no day marker; place them next to the scheduled time of the leg.
fn place_actual(date: NaiveDate, actual: NaiveTime, scheduled: NaiveDateTime) -> Option<NaiveDateTime> {
    let dt = date.and_time(actual);
    if scheduled - dt > Duration::hours(12) {
        Some(add_days(date, 1)?.and_time(actual))
    } else {
        Some(dt)
    }
}

#[derive(Default)]
struct FreeFields {
    actuals: Vec<NaiveTime>,
    registration: Option<String>,
    positioning: bool,
}

fn scan_free_fields(fields: &[String]) -> std::result::Result<FreeFields, ParseError> {
    let mut out = FreeFields::default();
    for field in fields {
        match classify_field(field)? {
            SectorField::ActualTime(t) => {
                if out.actuals.len() == 2 {
                    return Err(ParseError::BadSector(format!("third actual time {field}")));
                }
                out.actuals.push(t);
            }
            SectorField::Registration(reg) => match &out.registration {
                Some(prev) if *prev != reg => {
                    return Err(ParseError::BadSector(format!(
                        "conflicting registrations {prev} and {reg}"
                    )));
                }
                _ => out.registration = Some(reg),
            },
            SectorField::PositioningMarker => out.positioning = true,
            SectorField::Unclassified => {}
        }
    }
    Ok(out)
}

/// Build a `Sector` from one raw record dated `date`.
///
/// The crew list is looked up only for legs that were flown as operating crew, i.e. both
/// actual times are known and the leg is not positioning.
pub async fn reconstruct_sector(
    raw: &RawSector,
    date: NaiveDate,
    crew_provider: &dyn CrewListProvider,
) -> Result<Sector> {
    let bad = |why: &str| {
        RosterError::from(ParseError::BadSector(format!(
            "{why}: {date} {}",
            raw.describe()
        )))
    };

    let [flight, origin, destination, sched_off_raw, sched_on_raw] = match raw.fields.get(..5) {
        Some([a, b, c, d, e]) => [a, b, c, d, e],
        _ => return Err(bad("missing fixed fields")),
    };
    if [flight, origin, destination].iter().any(|f| f.is_empty()) {
        return Err(bad("empty fixed field"));
    }

    let (off_t, off_days) = parse_scheduled(sched_off_raw).ok_or_else(|| bad("scheduled off"))?;
    let (on_t, on_days) = parse_scheduled(sched_on_raw).ok_or_else(|| bad("scheduled on"))?;
    let shifted = |days: i64| add_days(date, days).ok_or_else(|| bad("date out of range"));
    let sched_off = shifted(off_days)?.and_time(off_t);
    let mut sched_on = shifted(on_days)?.and_time(on_t);
    if sched_on < sched_off {
        tracing::debug!(target: "reconstruct", record = %raw.describe(), "scheduled on rolled past midnight");
        sched_on = shifted(on_days + 1)?.and_time(on_t);
    }

    let free = scan_free_fields(&raw.fields[5..]).map_err(|e| bad(&e.to_string()))?;

    let Some(leg_id) = raw.leg_id.as_deref() else {
        return Ok(Sector {
            flight: format!("[{flight}]"),
            origin: origin.clone(),
            destination: destination.clone(),
            sched_off,
            sched_on,
            actual_off: None,
            actual_on: None,
            registration: free.registration,
            positioning: free.positioning,
            crew: Vec::new(),
        });
    };

    let (actual_off, actual_on) = match free.actuals.as_slice() {
        [off, on] => {
            let place = |t: NaiveTime, sched: NaiveDateTime| {
                place_actual(date, t, sched).ok_or_else(|| bad("actual time out of range"))
            };
            (Some(place(*off, sched_off)?), Some(place(*on, sched_on)?))
        }
        _ => (None, None),
    };

    let mut crew = Vec::new();
    if actual_on.is_some() && !free.positioning {
        counter!("roster_crew_lookups_total").increment(1);
        crew = crew_provider.crew(leg_id).await?;
    }

    Ok(Sector {
        flight: flight.clone(),
        origin: origin.clone(),
        destination: destination.clone(),
        sched_off,
        sched_on,
        actual_off,
        actual_on,
        registration: free.registration,
        positioning: free.positioning,
        crew,
    })
}
