// src/reconstruct/duty.rs
use chrono::NaiveDate;

use crate::error::{ParseError, Result, RosterError};
use crate::model::{add_days, Duty, RawSector};
use crate::reconstruct::{parse_clock, reconstruct_sector};
use crate::source::CrewListProvider;

/// Index of the trip day number on the first record of a duty.
const TRIP_DAY_FIELD: usize = 6;

/// Build one `Duty` from the sector records the portal grouped together.
///
/// The last field of the last record is the duty end. The duty start is the last field of
/// the first record, except for single-record duties where the last field is already the
/// end and the start sits just before it. `nominal_date` is the day the trip was listed
/// on; the first record's trip day number shifts it to the day this duty actually falls on.
pub async fn reconstruct_duty(
    records: &[RawSector],
    nominal_date: NaiveDate,
    trip_id: &str,
    crew_provider: &dyn CrewListProvider,
) -> Result<Duty> {
    let bad = || {
        let raw: Vec<String> = records.iter().map(RawSector::describe).collect();
        RosterError::from(ParseError::BadDuty(format!(
            "{trip_id} on {nominal_date}: {}",
            raw.join(" | ")
        )))
    };

    let (Some(first), Some(last)) = (records.first(), records.last()) else {
        return Err(bad());
    };

    let trip_day: i64 = first
        .fields
        .get(TRIP_DAY_FIELD)
        .and_then(|s| s.trim().parse().ok())
        .ok_or_else(bad)?;
    let date = trip_day
        .checked_sub(1)
        .and_then(|shift| add_days(nominal_date, shift))
        .ok_or_else(bad)?;

    let end_time = last
        .fields
        .last()
        .and_then(|s| parse_clock(s))
        .ok_or_else(bad)?;
    let start_back = if records.len() == 1 { 2 } else { 1 };
    let start_time = first
        .fields
        .len()
        .checked_sub(start_back)
        .and_then(|i| first.fields.get(i))
        .and_then(|s| parse_clock(s))
        .ok_or_else(bad)?;

    let start = date.and_time(start_time);
    let mut end = date.and_time(end_time);
    if end < start {
        end = add_days(date, 1).ok_or_else(bad)?.and_time(end_time);
    }

    let mut sectors = Vec::with_capacity(records.len());
    for record in records {
        sectors.push(reconstruct_sector(record, date, crew_provider).await?);
    }

    Ok(Duty {
        start,
        end,
        label: trip_id.to_string(),
        sectors: Some(sectors),
    })
}
