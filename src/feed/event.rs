// src/feed/event.rs
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;
use crate::model::{Duty, Sector};

/// Marker placed in the route for a leg flown as a passenger.
pub const POSITIONING_ROUTE_MARK: &str = "[psn]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    Tentative,
    Cancelled,
}

impl EventStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tentative => "TENTATIVE",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TENTATIVE" => Ok(Self::Tentative),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(ParseError::BadFeed(format!("unknown status {other}"))),
        }
    }
}

/// One published calendar entry. Start and route are baked into `uid`; `end` and
/// `description` are what may change between publications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub uid: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub summary: String,
    pub description: Vec<String>,
    pub modified: NaiveDateTime,
    pub sequence: u32,
    pub status: EventStatus,
}

/// Airports visited by a flying duty, with quasi-sector codes and positioning marks
/// interleaved. Empty for duties without sectors.
pub fn route_stops(duty: &Duty) -> Vec<String> {
    let sectors = match duty.sectors.as_deref() {
        Some(sectors) if duty.is_flying() => sectors,
        _ => return Vec::new(),
    };
    let mut stops = vec![sectors[0].origin.clone()];
    for sector in sectors {
        if sector.is_quasi() {
            stops.push(sector.flight.clone());
        }
        if sector.positioning {
            stops.push(POSITIONING_ROUTE_MARK.to_string());
        }
        stops.push(sector.destination.clone());
    }
    stops
}

/// `BRS-GLA-BRS` for flying duties, the duty label otherwise.
pub fn route(duty: &Duty) -> String {
    let stops = route_stops(duty);
    if stops.is_empty() {
        duty.label.clone()
    } else {
        stops.join("-")
    }
}

pub fn event_uid(duty: &Duty, uid_domain: &str) -> String {
    let stops = route_stops(duty);
    let key = if stops.is_empty() {
        duty.label.clone()
    } else {
        stops.concat()
    };
    format!("{}{key}@{uid_domain}", duty.start.format("%Y-%m-%dT%H:%M:%S"))
}

/// `08:55-10:10 401 BRS/GLA G-EZDL`, using actual times when both were reported.
pub fn sector_line(sector: &Sector) -> String {
    let (off, on) = sector.block_times();
    let mut line = format!(
        "{}-{} {} {}/{}",
        off.format("%H:%M"),
        on.format("%H:%M"),
        sector.flight,
        sector.origin,
        sector.destination
    );
    // No trailing space without a registration. Feeds from the earlier publisher always
    // had one, so their sector lines read as changed once on the first run.
    if let Some(reg) = &sector.registration {
        line.push(' ');
        line.push_str(reg);
    }
    line
}

/// Fresh events for a duty list, keyed by uid. Every event starts at sequence 0.
/// Two duties mapping to the same uid collapse into the later one.
pub fn events_from_duties(
    duties: &[Duty],
    now: NaiveDateTime,
    uid_domain: &str,
) -> BTreeMap<String, Event> {
    let mut events = BTreeMap::new();
    for duty in duties {
        let description = duty
            .sectors
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(sector_line)
            .collect();
        let event = Event {
            uid: event_uid(duty, uid_domain),
            start: duty.start,
            end: duty.end,
            summary: route(duty),
            description,
            modified: now,
            sequence: 0,
            status: EventStatus::Tentative,
        };
        events.insert(event.uid.clone(), event);
    }
    events
}
