// src/reconstruct/mod.rs
//! Turning raw trip-sheet records into typed sectors and duties.

pub mod duty;
pub mod sector;

pub use duty::reconstruct_duty;
pub use sector::{classify_field, reconstruct_sector, SectorField};

use chrono::NaiveTime;
use once_cell::sync::Lazy;
use regex::Regex;

static RE_CLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2}):(\d{2})$").expect("clock regex"));

/// Parse a roster clock time such as `5:00` or `16:33`.
pub fn parse_clock(s: &str) -> Option<NaiveTime> {
    let caps = RE_CLOCK.captures(s.trim())?;
    let h: u32 = caps[1].parse().ok()?;
    let m: u32 = caps[2].parse().ok()?;
    NaiveTime::from_hms_opt(h, m, 0)
}

/// True for tokens shaped like a roster clock time (`..:MM`), valid or not.
pub fn is_clock_token(s: &str) -> bool {
    let b = s.trim().as_bytes();
    b.len() >= 4 && b[b.len() - 3] == b':'
}

/// Parse a four digit `HHMM` time.
pub(crate) fn parse_hhmm(s: &str) -> Option<NaiveTime> {
    if s.len() != 4 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let h: u32 = s[..2].parse().ok()?;
    let m: u32 = s[2..].parse().ok()?;
    NaiveTime::from_hms_opt(h, m, 0)
}
