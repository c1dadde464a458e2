// src/source/portal.rs
//! HTTP access to the scheduling portal.
//!
//! `PortalClient` is the single session handle: it owns the cookie-carrying HTTP client and
//! the base URL the login handshake resolved to. It is built once and lent to
//! `PortalSource`, which turns portal pages into raw roster data through a `PageExtractor`.

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::OnceCell;

use crate::config::RosterConfig;
use crate::error::{ParseError, Result, RosterError};
use crate::model::{CrewMember, RawSector, RosterDay};
use crate::source::{normalize_tokens, CrewListProvider, RosterProvider, TripDetailProvider};

const SCHEDULE_PATH: &str = "perinfo.exe/schedule";
const CREW_PATH: &str = "perinfo.exe/getlegmem";
const INDEX_PATH: &str = "perinfo.exe/index";

/// Opens the current brief roster.
const ROSTER_FORM: &[(&str, &str)] = &[
    ("_flagy", "2"),
    ("DoVac", "0"),
    ("Oper", "1"),
    ("eCrewIsLockedDuetoPendingNotifs", "0"),
];
const DIREC_FORWARD: &str = "2";
const DIREC_BACK: &str = "1";

/// Body text of the page served for a trip the portal does not know.
pub const NO_TRIP_MARKER: &str = "Unable to find the trip details";

/// The index page carries an empty notification script when no roster changes await
/// acknowledgement.
pub const NO_CHANGES_MARKER: &str = "var notification = Trim(\"\");";

/// Tag-level extraction of portal pages.
pub trait PageExtractor: Send + Sync {
    fn roster_days(&self, html: &str) -> std::result::Result<Vec<RosterDay>, ParseError>;
    fn trip_sectors(&self, html: &str) -> std::result::Result<Vec<Vec<RawSector>>, ParseError>;
    fn crew_list(&self, html: &str) -> std::result::Result<Vec<CrewMember>, ParseError>;
}

pub struct PortalClient {
    http: reqwest::Client,
    base_url: String,
}

impl PortalClient {
    pub fn new(base_url: &str, connect_timeout: Duration, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("crew-roster/", env!("CARGO_PKG_VERSION")))
            .cookie_store(true)
            .connect_timeout(connect_timeout)
            .timeout(timeout)
            .build()?;
        let mut base_url = base_url.trim().to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Ok(Self { http, base_url })
    }

    pub fn from_config(cfg: &RosterConfig) -> Result<Self> {
        let base = cfg
            .portal_base_url
            .as_deref()
            .ok_or_else(|| RosterError::Transport("portal_base_url is not configured".into()))?;
        Self::new(
            base,
            Duration::from_secs(cfg.connect_timeout_secs),
            Duration::from_secs(cfg.request_timeout_secs),
        )
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn get_page(&self, path: &str, query: &[(&str, &str)]) -> Result<String> {
        let url = self.endpoint(path);
        tracing::debug!(target: "portal", %url, "GET");
        let resp = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.text().await?)
    }

    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Result<String> {
        let url = self.endpoint(path);
        tracing::debug!(target: "portal", %url, "POST");
        let resp = self
            .http
            .post(&url)
            .form(form)
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.text().await?)
    }

    /// True if the portal is holding roster changes the crew member has not acknowledged.
    pub async fn pending_notifications(&self) -> Result<bool> {
        let page = self.get_page(INDEX_PATH, &[]).await?;
        Ok(has_pending_notifications(&page))
    }
}

pub fn has_pending_notifications(index_page: &str) -> bool {
    !index_page.contains(NO_CHANGES_MARKER)
}

/// Form posts that land on the brief roster `offset` rosters away from the current one.
/// The portal only moves one roster per post, so every roster in between is fetched too.
fn roster_posts(offset: i32) -> Vec<Vec<(&'static str, &'static str)>> {
    let direc = if offset > 0 { DIREC_FORWARD } else { DIREC_BACK };
    let step = vec![
        ("Direc", direc),
        ("FltInf", "0"),
        ("_flagy", "2"),
        ("OtherId", "0"),
        ("_NotOne", "0"),
        ("ORGDAY", "0"),
        ("DISPLAY_DAY", "0"),
        ("CROUTE", "0"),
        ("ground_code", "0"),
        ("trip_switch", "0"),
        ("rightClickArray", "0"),
    ];
    std::iter::once(ROSTER_FORM.to_vec())
        .chain(std::iter::repeat(step).take(offset.unsigned_abs() as usize))
        .collect()
}

/// Provider implementation on top of a live portal session.
pub struct PortalSource<'a, X: PageExtractor> {
    client: &'a PortalClient,
    extractor: X,
    offset: i32,
    roster: OnceCell<Vec<RosterDay>>,
}

impl<'a, X: PageExtractor> PortalSource<'a, X> {
    pub fn new(client: &'a PortalClient, extractor: X) -> Self {
        Self {
            client,
            extractor,
            offset: 0,
            roster: OnceCell::new(),
        }
    }

    pub fn from_config(client: &'a PortalClient, extractor: X, cfg: &RosterConfig) -> Self {
        Self::new(client, extractor).roster_offset(cfg.roster_offset)
    }

    /// Read the brief roster `offset` rosters before (negative) or after the current one.
    pub fn roster_offset(mut self, offset: i32) -> Self {
        self.offset = offset;
        self
    }

    /// The brief roster page is fetched once per run and shared by all day lookups.
    async fn roster(&self) -> Result<&Vec<RosterDay>> {
        self.roster
            .get_or_try_init(|| async {
                let mut page = String::new();
                for form in roster_posts(self.offset) {
                    page = self.client.post_form(SCHEDULE_PATH, &form).await?;
                }
                tracing::debug!(target: "portal", offset = self.offset, "brief roster fetched");
                let days = self.extractor.roster_days(&page)?;
                if days.is_empty() {
                    return Err(RosterError::from(ParseError::BadRoster(
                        "roster page lists no days".into(),
                    )));
                }
                Ok::<_, RosterError>(days)
            })
            .await
    }
}

#[async_trait]
impl<'a, X: PageExtractor> RosterProvider for PortalSource<'a, X> {
    async fn roster_days(&self) -> Result<Vec<i64>> {
        let mut days: Vec<i64> = self.roster().await?.iter().map(|d| d.epoch_day).collect();
        days.sort_unstable();
        Ok(days)
    }

    async fn day_tokens(&self, epoch_day: i64) -> Result<Vec<String>> {
        Ok(self
            .roster()
            .await?
            .iter()
            .find(|d| d.epoch_day == epoch_day)
            .map(|d| normalize_tokens(&d.tokens))
            .unwrap_or_default())
    }

    async fn pending_changes(&self) -> Result<bool> {
        self.client.pending_notifications().await
    }
}

#[async_trait]
impl<'a, X: PageExtractor> TripDetailProvider for PortalSource<'a, X> {
    async fn trip(&self, epoch_day: i64, trip_id: &str) -> Result<Vec<Vec<RawSector>>> {
        let day = epoch_day.to_string();
        let page = self
            .client
            .get_page(
                SCHEDULE_PATH,
                &[("FltInf", "1"), ("ORGDAY", day.as_str()), ("CROUTE", trip_id)],
            )
            .await?;
        trip_from_page(&self.extractor, &page, epoch_day, trip_id)
    }
}

fn trip_from_page<X: PageExtractor>(
    extractor: &X,
    page: &str,
    epoch_day: i64,
    trip_id: &str,
) -> Result<Vec<Vec<RawSector>>> {
    if page.contains(NO_TRIP_MARKER) {
        return Err(RosterError::source_unavailable(format!("trip {epoch_day}/{trip_id}")));
    }
    let duties = extractor.trip_sectors(page)?;
    if duties.is_empty() {
        return Err(ParseError::BadTrip(format!("{epoch_day}/{trip_id}: no sector rows")).into());
    }
    Ok(duties)
}

#[async_trait]
impl<'a, X: PageExtractor> CrewListProvider for PortalSource<'a, X> {
    async fn crew(&self, leg_id: &str) -> Result<Vec<CrewMember>> {
        let page = self.client.get_page(CREW_PATH, &[("LegInfo", leg_id)]).await?;
        Ok(self.extractor.crew_list(&page)?)
    }
}
