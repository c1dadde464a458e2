// src/metrics.rs
use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series carry descriptions when rendered).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "roster_trips_fetched_total",
            "Trips fetched from the portal instead of the cache."
        );
        describe_counter!(
            "roster_cache_hits_total",
            "Trips served from the cache without refetching."
        );
        describe_counter!(
            "roster_entry_errors_total",
            "Roster days or trips dropped because of a parse error."
        );
        describe_counter!(
            "roster_crew_lookups_total",
            "Crew list requests for flown sectors."
        );
        describe_counter!(
            "roster_duties_deduped_total",
            "Duties dropped as contained in the previous kept duty."
        );
        describe_counter!(
            "feed_events_published_total",
            "Events written to a published calendar feed."
        );
        describe_gauge!(
            "roster_last_run_ts",
            "Unix ts when the roster was last rebuilt."
        );
    });
}

/// Install the process-wide Prometheus recorder.
pub fn install_prometheus() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("prometheus: install recorder")?;
    ensure_metrics_described();
    Ok(handle)
}
