// tests/schedule_builder.rs
use chrono::{NaiveDate, NaiveDateTime};
use crew_roster::source::recorded::RecordedPortal;
use crew_roster::{RosterDay, RosterError, ScheduleBuilder, TripCache};
use std::path::Path;

const FIXTURE: &str = "tests/fixtures/recorded_portal.json";

fn portal() -> RecordedPortal {
    RecordedPortal::from_path(Path::new(FIXTURE)).expect("fixture")
}

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
}

/// Between the last flown trip and the future ones.
fn now() -> NaiveDateTime {
    at(2018, 9, 28, 12, 0)
}

fn trips(requests: &[(i64, String)]) -> Vec<&str> {
    requests.iter().map(|(_, t)| t.as_str()).collect()
}

#[tokio::test]
async fn recorded_roster_builds_expected_duties() {
    let p = portal();
    let mut cache = TripCache::in_memory();
    let duties = ScheduleBuilder::new(&p, &p, &mut cache)
        .at(now())
        .build_window(&p)
        .await
        .unwrap();

    let summary: Vec<(&str, NaiveDateTime, NaiveDateTime)> = duties
        .iter()
        .map(|d| (d.label.as_str(), d.start, d.end))
        .collect();
    assert_eq!(
        summary,
        vec![
            // each day is read back to front
            ("B006D", at(2018, 9, 24, 8, 45), at(2018, 9, 24, 13, 20)),
            ("CSBE", at(2018, 9, 24, 3, 0), at(2018, 9, 24, 5, 0)),
            ("B086", at(2018, 9, 26, 22, 0), at(2018, 9, 27, 1, 5)),
            ("B086", at(2018, 9, 27, 11, 35), at(2018, 9, 27, 15, 20)),
            ("B001T", at(2018, 9, 29, 6, 0), at(2018, 9, 29, 11, 45)),
            // the inline ESBY on the 30th is contained in S100 and dropped
            ("S100", at(2018, 9, 30, 5, 0), at(2018, 9, 30, 15, 0)),
        ]
    );

    // late arrival placed on the next day
    let b086 = duties[2].sectors.as_ref().unwrap();
    assert_eq!(b086[0].actual_on, Some(at(2018, 9, 27, 0, 35)));
    assert_eq!(b086[0].crew.len(), 1);

    let b001t = duties[4].sectors.as_ref().unwrap();
    assert_eq!(b001t[0].flight, "[LSBY]");
    assert!(!b001t[1].has_actuals());

    // unknown and malformed trips are skipped, everything else is asked for once
    assert_eq!(
        trips(&p.trip_requests()),
        vec!["B006D", "B086", "B001T", "S100", "Z999", "BAD1"]
    );
    // only flown, non-positioning legs
    assert_eq!(p.crew_requests(), vec!["111", "112", "201"]);
}

#[tokio::test]
async fn second_run_is_served_from_cache() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roster.v1.json");

    let first = portal();
    let mut cache = TripCache::load(&path);
    let expected = ScheduleBuilder::new(&first, &first, &mut cache)
        .at(now())
        .build_window(&first)
        .await
        .unwrap();

    let second = portal();
    let mut cache = TripCache::load(&path);
    assert_eq!(cache.len(), 4);
    let again = ScheduleBuilder::new(&second, &second, &mut cache)
        .at(now())
        .build_window(&second)
        .await
        .unwrap();

    assert_eq!(again, expected);
    // only trips that never made it into the cache are asked for again
    assert_eq!(trips(&second.trip_requests()), vec!["Z999", "BAD1"]);
    assert!(second.crew_requests().is_empty());
}

#[tokio::test]
async fn stale_trip_is_refetched_once_it_has_started() {
    let mut cache = TripCache::in_memory();
    let first = portal();
    ScheduleBuilder::new(&first, &first, &mut cache)
        .at(now())
        .build_window(&first)
        .await
        .unwrap();

    // B001T has flown by now but the cached copy has no actual times
    let later = portal();
    ScheduleBuilder::new(&later, &later, &mut cache)
        .at(at(2018, 10, 5, 0, 0))
        .build_window(&later)
        .await
        .unwrap();
    assert_eq!(trips(&later.trip_requests()), vec!["B001T", "Z999", "BAD1"]);
}

#[tokio::test]
async fn force_refetches_everything() {
    let mut cache = TripCache::in_memory();
    let first = portal();
    ScheduleBuilder::new(&first, &first, &mut cache)
        .at(now())
        .build_window(&first)
        .await
        .unwrap();

    let forced = portal();
    ScheduleBuilder::new(&forced, &forced, &mut cache)
        .at(now())
        .force(true)
        .build_window(&forced)
        .await
        .unwrap();
    assert_eq!(trips(&forced.trip_requests()).len(), 6);
    assert_eq!(forced.crew_requests().len(), 3);
}

#[tokio::test]
async fn transport_failure_aborts_but_keeps_fetched_trips() {
    let recording = r#"{
        "days": [
            {"epoch_day": 14146, "tokens": ["B006D"]},
            {"epoch_day": 14148, "tokens": ["B086"]}
        ],
        "trips": [
            {"epoch_day": 14146, "trip": "B006D", "duties": [[
                {"leg_id": "L1", "fields": ["401", "BRS", "GLA", "0855", "1010", "Mon24Sep", "1", "A0900", "A1005", "G-EZDL", "07:55", "10:40"]}
            ]]}
        ],
        "transport_failures": ["B086"]
    }"#;
    let p = RecordedPortal::from_json_str(recording).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roster.v1.json");

    let mut cache = TripCache::load(&path);
    let err = ScheduleBuilder::new(&p, &p, &mut cache)
        .at(now())
        .build_window(&p)
        .await
        .unwrap_err();
    assert!(matches!(err, RosterError::Transport(_)));
    assert!(err.is_fatal());

    let saved = TripCache::load(&path);
    let date = NaiveDate::from_ymd_opt(2018, 9, 24).unwrap();
    assert_eq!(saved.get(date, "B006D").map(|d| d.len()), Some(1));
}

#[tokio::test]
async fn malformed_clock_group_skips_the_rest_of_the_day() {
    let p = portal();
    let days = vec![
        RosterDay::new(14146, ["B006D", "ESBY", "25:00", "5:00"]),
        RosterDay::new(14147, ["ESBY", "6:00", "14:00"]),
    ];
    let mut cache = TripCache::in_memory();
    let duties = ScheduleBuilder::new(&p, &p, &mut cache)
        .at(now())
        .build(&days)
        .await
        .unwrap();

    assert_eq!(duties.len(), 1);
    assert_eq!(duties[0].label, "ESBY");
    assert!(p.trip_requests().is_empty());
}

#[tokio::test]
async fn explicit_days_are_walked_in_given_order() {
    let p = portal();
    let days: Vec<RosterDay> = p.days().iter().rev().cloned().collect();
    let mut cache = TripCache::in_memory();
    let duties = ScheduleBuilder::new(&p, &p, &mut cache)
        .at(now())
        .build(&days)
        .await
        .unwrap();
    assert_eq!(duties.first().map(|d| d.label.as_str()), Some("S100"));
    assert_eq!(duties.last().map(|d| d.label.as_str()), Some("CSBE"));
}

#[tokio::test]
async fn day_outside_the_calendar_is_skipped() {
    let p = portal();
    let days = vec![
        RosterDay::new(i64::MAX, ["B006D"]),
        RosterDay::new(14147, ["ESBY", "6:00", "14:00"]),
    ];
    let mut cache = TripCache::in_memory();
    let duties = ScheduleBuilder::new(&p, &p, &mut cache)
        .at(now())
        .build(&days)
        .await
        .unwrap();

    assert_eq!(duties.len(), 1);
    assert_eq!(duties[0].label, "ESBY");
    assert!(p.trip_requests().is_empty());
}

#[tokio::test]
async fn pending_roster_changes_block_the_build() {
    let p = RecordedPortal::from_json_str(
        r#"{
            "pending_changes": true,
            "days": [{"epoch_day": 14146, "tokens": ["B006D"]}]
        }"#,
    )
    .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trips.json");
    let mut cache = TripCache::load(&path);

    let err = ScheduleBuilder::new(&p, &p, &mut cache)
        .at(now())
        .build_window(&p)
        .await
        .unwrap_err();

    assert!(matches!(err, RosterError::PendingChanges));
    assert!(err.is_fatal());
    assert!(p.trip_requests().is_empty());
    assert!(!path.exists(), "cache must be left alone");
}
