// src/source/recorded.rs
//! A portal replayed from a JSON recording. Serves all three collaborator traits and
//! remembers which trips and crew lists were requested.

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use crate::error::{Result, RosterError};
use crate::model::{CrewMember, RawSector, RosterDay};
use crate::source::{normalize_tokens, CrewListProvider, RosterProvider, TripDetailProvider};

#[derive(Debug, Deserialize)]
struct Recording {
    days: Vec<RosterDay>,
    #[serde(default)]
    trips: Vec<RecordedTrip>,
    #[serde(default)]
    crews: HashMap<String, Vec<CrewMember>>,
    /// Trips whose fetch timed out when the recording was made.
    #[serde(default)]
    transport_failures: Vec<String>,
    /// The index page showed unacknowledged roster changes.
    #[serde(default)]
    pending_changes: bool,
}

#[derive(Debug, Deserialize)]
struct RecordedTrip {
    epoch_day: i64,
    trip: String,
    duties: Vec<Vec<RawSector>>,
}

#[derive(Debug)]
pub struct RecordedPortal {
    days: Vec<RosterDay>,
    trips: HashMap<(i64, String), Vec<Vec<RawSector>>>,
    crews: HashMap<String, Vec<CrewMember>>,
    /// Replays captured timeouts: fetching one of these trips fails with `Transport`,
    /// so a run that died mid-walk can be reproduced offline.
    transport_failures: Vec<String>,
    pending_changes: bool,
    trip_requests: Mutex<Vec<(i64, String)>>,
    crew_requests: Mutex<Vec<String>>,
}

impl RecordedPortal {
    pub fn from_json_str(s: &str) -> anyhow::Result<Self> {
        let rec: Recording = serde_json::from_str(s).context("parsing portal recording")?;
        Ok(Self::from_recording(rec))
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading portal recording from {}", path.display()))?;
        Self::from_json_str(&content)
    }

    fn from_recording(rec: Recording) -> Self {
        let days = rec
            .days
            .into_iter()
            .map(|d| RosterDay {
                epoch_day: d.epoch_day,
                tokens: normalize_tokens(&d.tokens),
            })
            .collect();
        let trips = rec
            .trips
            .into_iter()
            .map(|t| ((t.epoch_day, t.trip), t.duties))
            .collect();
        Self {
            days,
            trips,
            crews: rec.crews,
            transport_failures: rec.transport_failures,
            pending_changes: rec.pending_changes,
            trip_requests: Mutex::new(Vec::new()),
            crew_requests: Mutex::new(Vec::new()),
        }
    }

    /// All recorded days in published order.
    pub fn days(&self) -> &[RosterDay] {
        &self.days
    }

    pub fn trip_requests(&self) -> Vec<(i64, String)> {
        self.trip_requests
            .lock()
            .map(|v| v.clone())
            .unwrap_or_default()
    }

    pub fn crew_requests(&self) -> Vec<String> {
        self.crew_requests
            .lock()
            .map(|v| v.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl RosterProvider for RecordedPortal {
    async fn roster_days(&self) -> Result<Vec<i64>> {
        let mut days: Vec<i64> = self.days.iter().map(|d| d.epoch_day).collect();
        days.sort_unstable();
        days.dedup();
        Ok(days)
    }

    async fn day_tokens(&self, epoch_day: i64) -> Result<Vec<String>> {
        Ok(self
            .days
            .iter()
            .find(|d| d.epoch_day == epoch_day)
            .map(|d| d.tokens.clone())
            .unwrap_or_default())
    }

    async fn pending_changes(&self) -> Result<bool> {
        Ok(self.pending_changes)
    }
}

#[async_trait]
impl TripDetailProvider for RecordedPortal {
    async fn trip(&self, epoch_day: i64, trip_id: &str) -> Result<Vec<Vec<RawSector>>> {
        if let Ok(mut reqs) = self.trip_requests.lock() {
            reqs.push((epoch_day, trip_id.to_string()));
        }
        if self.transport_failures.iter().any(|t| t == trip_id) {
            return Err(RosterError::Transport(format!(
                "timed out fetching trip {epoch_day}/{trip_id}"
            )));
        }
        self.trips
            .get(&(epoch_day, trip_id.to_string()))
            .cloned()
            .ok_or_else(|| RosterError::source_unavailable(format!("trip {epoch_day}/{trip_id}")))
    }
}

#[async_trait]
impl CrewListProvider for RecordedPortal {
    async fn crew(&self, leg_id: &str) -> Result<Vec<CrewMember>> {
        if let Ok(mut reqs) = self.crew_requests.lock() {
            reqs.push(leg_id.to_string());
        }
        Ok(self.crews.get(leg_id).cloned().unwrap_or_default())
    }
}
