//! Trip cache: reconstructed duties keyed by (listing date, trip id), persisted between runs.
//!
//! Fetching a trip costs one page plus one crew page per flown sector, so trips are only
//! refetched when the cached copy is stale: a duty that has already started still has a
//! sector the portal would have finalized by now.
//!
//! The on-disk document is versioned. A file with an unknown version is ignored (cold
//! start) rather than half-read. Storage failures never abort a run; they are logged and
//! the cache behaves as empty.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, RosterError};
use crate::model::Duty;

pub const CACHE_FORMAT_VERSION: u32 = 1;

type TripKey = (NaiveDate, String);

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    trips: Vec<CacheRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheRecord {
    date: NaiveDate,
    trip: String,
    duties: Vec<Duty>,
}

#[derive(Debug, Default)]
pub struct TripCache {
    path: Option<PathBuf>,
    trips: BTreeMap<TripKey, Vec<Duty>>,
}

impl TripCache {
    /// A cache that is never persisted.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the cache at `path`. Missing, unreadable or foreign files yield an empty cache.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let trips = match read_cache_file(&path) {
            Ok(trips) => trips,
            Err(e) => {
                tracing::warn!(target: "cache", error = %e, "trip cache unreadable, starting empty");
                BTreeMap::new()
            }
        };
        tracing::debug!(target: "cache", path = %path.display(), trips = trips.len(), "trip cache loaded");
        Self {
            path: Some(path),
            trips,
        }
    }

    pub fn get(&self, date: NaiveDate, trip_id: &str) -> Option<&[Duty]> {
        self.trips
            .get(&(date, trip_id.to_string()))
            .map(Vec::as_slice)
    }

    pub fn put(&mut self, date: NaiveDate, trip_id: &str, duties: Vec<Duty>) {
        self.trips.insert((date, trip_id.to_string()), duties);
    }

    pub fn len(&self) -> usize {
        self.trips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trips.is_empty()
    }

    /// Write the cache back to disk (temp file + rename). No-op for in-memory caches.
    pub fn save(&self) -> Result<()> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };
        let doc = CacheFile {
            version: CACHE_FORMAT_VERSION,
            trips: self
                .trips
                .iter()
                .map(|((date, trip), duties)| CacheRecord {
                    date: *date,
                    trip: trip.clone(),
                    duties: duties.clone(),
                })
                .collect(),
        };
        write_cache_file(path, &doc).map_err(|e| RosterError::cache_io(path, e))
    }
}

/// A cached duty list is stale when a duty that has already started still contains a
/// sector that is not final. Future duties are never stale; their plans change anyway.
pub fn is_stale(duties: &[Duty], now: NaiveDateTime) -> bool {
    duties.iter().any(|duty| {
        duty.start < now
            && duty
                .sectors
                .as_deref()
                .unwrap_or_default()
                .iter()
                .any(|s| !s.is_final())
    })
}

/// Whether a trip must be fetched again given what the cache holds for it.
pub fn needs_refresh(cached: Option<&[Duty]>, now: NaiveDateTime) -> bool {
    match cached {
        None => true,
        Some([]) => true,
        Some(duties) => is_stale(duties, now),
    }
}

fn read_cache_file(path: &Path) -> Result<BTreeMap<TripKey, Vec<Duty>>> {
    let content = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => return Err(RosterError::cache_io(path, e)),
    };
    let doc: CacheFile = serde_json::from_str(&content)
        .map_err(|e| RosterError::cache_io(path, io::Error::new(io::ErrorKind::InvalidData, e)))?;
    if doc.version != CACHE_FORMAT_VERSION {
        tracing::warn!(
            target: "cache",
            found = doc.version,
            expected = CACHE_FORMAT_VERSION,
            "trip cache has a different format version, ignoring it"
        );
        return Ok(BTreeMap::new());
    }
    Ok(doc
        .trips
        .into_iter()
        .map(|r| ((r.date, r.trip), r.duties))
        .collect())
}

fn write_cache_file(path: &Path, doc: &CacheFile) -> io::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let json =
        serde_json::to_vec(doc).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let tmp = path.with_extension("tmp");
    let mut f = fs::File::create(&tmp)?;
    f.write_all(&json)?;
    f.sync_all()?;
    fs::rename(tmp, path)?;
    Ok(())
}
