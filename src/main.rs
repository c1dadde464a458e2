//! crew-roster: rebuild the duty roster and print it as JSON or as a versioned iCal feed.
//!
//! Usage: `crew-roster [json|ical|changes]` (default `ical`). `changes` only reports whether
//! the portal holds unacknowledged roster changes; the other formats refuse to build while
//! it does. The portal is replayed from the recording named by `ROSTER_FIXTURE`; paths and
//! feed identity come from `RosterConfig`.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use std::path::Path;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crew_roster::feed::{feed_now, publish, Publication};
use crew_roster::metrics::install_prometheus;
use crew_roster::source::recorded::RecordedPortal;
use crew_roster::source::RosterProvider;
use crew_roster::{RosterConfig, RosterError, ScheduleBuilder, TripCache};

const ENV_FIXTURE: &str = "ROSTER_FIXTURE";
const ENV_METRICS: &str = "ROSTER_METRICS";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("crew_roster=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

fn read_previous_feed(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("reading previous feed {}", path.display())),
    }
}

fn write_feed(path: &Path, text: &str) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, text).with_context(|| format!("writing {}", tmp.display()))?;
    std::fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let format = std::env::args().nth(1).unwrap_or_else(|| "ical".to_string());
    if !matches!(format.as_str(), "json" | "ical" | "changes") {
        bail!("unknown output format {format:?}, expected json, ical or changes");
    }

    let cfg = RosterConfig::load_default()?;
    let prometheus = match std::env::var(ENV_METRICS).ok().as_deref() {
        Some("1") => Some(install_prometheus()?),
        _ => None,
    };

    let fixture = std::env::var(ENV_FIXTURE)
        .with_context(|| format!("{ENV_FIXTURE} must name a portal recording"))?;
    let portal = RecordedPortal::from_path(Path::new(&fixture))?;

    if format == "changes" {
        let pending = portal.pending_changes().await.context("checking for changes")?;
        println!("{}", if pending { "You have changes." } else { "No changes" });
        return Ok(());
    }

    let mut cache = TripCache::load(&cfg.cache_path);
    let built = ScheduleBuilder::new(&portal, &portal, &mut cache)
        .force(cfg.force)
        .build_window(&portal)
        .await;
    let duties = match built {
        Err(RosterError::PendingChanges) => {
            eprintln!("You have changes.");
            return Ok(());
        }
        other => other.context("building roster")?,
    };
    metrics::gauge!("roster_last_run_ts").set(Utc::now().timestamp() as f64);

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&duties)?);
    } else {
        let previous = match &cfg.feed_path {
            Some(path) => read_previous_feed(path)?,
            None => None,
        };
        match publish(&duties, previous.as_deref(), feed_now(), &cfg)
            .context("publishing feed")?
        {
            Publication::Feed(text) => match &cfg.feed_path {
                Some(path) => {
                    write_feed(path, &text)?;
                    tracing::info!(path = %path.display(), "feed written");
                }
                None => print!("{text}"),
            },
            Publication::NoChanges => println!("No changes"),
        }
    }

    if let Some(handle) = prometheus {
        eprintln!("{}", handle.render());
    }
    Ok(())
}
