// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod cache;
pub mod config;
pub mod dedup;
pub mod error;
pub mod feed;
pub mod metrics;
pub mod model;
pub mod reconstruct;
pub mod schedule;
pub mod source;

// ---- Re-exports for stable public API ----
pub use crate::cache::TripCache;
pub use crate::config::RosterConfig;
pub use crate::dedup::deduplicate;
pub use crate::error::{ParseError, RosterError};
pub use crate::feed::{publish, Publication};
pub use crate::model::{CrewMember, Duty, RawSector, RosterDay, Sector};
pub use crate::schedule::ScheduleBuilder;
