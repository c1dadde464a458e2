// tests/duty_reconstruct.rs
use chrono::{NaiveDate, NaiveDateTime};
use crew_roster::reconstruct::reconstruct_duty;
use crew_roster::source::recorded::RecordedPortal;
use crew_roster::{ParseError, RawSector, RosterError};

fn portal() -> RecordedPortal {
    RecordedPortal::from_json_str(r#"{"days": []}"#).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn at(day: NaiveDate, h: u32, m: u32) -> NaiveDateTime {
    day.and_hms_opt(h, m, 0).unwrap()
}

#[tokio::test]
async fn two_sector_duty_spans_report_to_off_duty() {
    let p = portal();
    let records = vec![
        RawSector::new(
            Some("111"),
            ["401", "BRS", "GLA", "0945", "1100", "Fri18Jan", "1", "08:45"],
        ),
        RawSector::new(Some("112"), ["402", "GLA", "BRS", "1140", "1245", "12:15"]),
    ];
    let day = date(2019, 1, 18);
    let duty = reconstruct_duty(&records, day, "B401", &p).await.unwrap();

    assert_eq!(duty.start, at(day, 8, 45));
    assert_eq!(duty.end, at(day, 12, 15));
    assert_eq!(duty.label, "B401");
    let sectors = duty.sectors.as_ref().unwrap();
    assert_eq!(sectors.len(), 2);
    assert_eq!(sectors[1].flight, "402");
    assert_eq!(sectors[1].sched_off, at(day, 11, 40));
}

#[tokio::test]
async fn single_record_duty_reads_last_two_fields() {
    let p = portal();
    let records = vec![RawSector::new(
        Some("L1"),
        ["401", "BRS", "GLA", "0855", "1010", "Fri18Jan", "1", "07:55", "10:40"],
    )];
    let day = date(2019, 1, 18);
    let duty = reconstruct_duty(&records, day, "B001", &p).await.unwrap();
    assert_eq!(duty.start, at(day, 7, 55));
    assert_eq!(duty.end, at(day, 10, 40));
}

#[tokio::test]
async fn trip_day_moves_the_duty_date() {
    let p = portal();
    let records = vec![RawSector::new(
        Some("L2"),
        ["8496", "OPO", "LGW", "1235", "1450", "Sat19Jan", "2", "11:35", "15:20"],
    )];
    let listed = date(2019, 1, 18);
    let duty = reconstruct_duty(&records, listed, "B086", &p).await.unwrap();
    let actual = date(2019, 1, 19);
    assert_eq!(duty.start, at(actual, 11, 35));
    assert_eq!(duty.sectors.unwrap()[0].sched_off, at(actual, 12, 35));
}

#[tokio::test]
async fn duty_ending_after_midnight_rolls_over() {
    let p = portal();
    let records = vec![RawSector::new(
        Some("L3"),
        ["8495", "LGW", "OPO", "2300", "0030+1", "Fri18Jan", "1", "22:00", "01:05"],
    )];
    let day = date(2019, 1, 18);
    let duty = reconstruct_duty(&records, day, "B086", &p).await.unwrap();
    assert_eq!(duty.start, at(day, 22, 0));
    assert_eq!(duty.end, at(date(2019, 1, 19), 1, 5));
    assert!(duty.end >= duty.start);
}

#[tokio::test]
async fn malformed_groups_are_bad_duties() {
    let p = portal();
    let day = date(2019, 1, 18);
    let cases: Vec<Vec<RawSector>> = vec![
        vec![],
        vec![RawSector::new(
            Some("L1"),
            ["401", "BRS", "GLA", "0855", "1010", "Fri18Jan", "x", "07:55", "10:40"],
        )],
        vec![RawSector::new(
            Some("L1"),
            ["401", "BRS", "GLA", "0855", "1010", "Fri18Jan", "1", "07:55", "late"],
        )],
    ];
    for records in &cases {
        let err = reconstruct_duty(records, day, "B001", &p).await.unwrap_err();
        assert!(
            matches!(err, RosterError::Parse(ParseError::BadDuty(_))),
            "{records:?}: {err:?}"
        );
    }
}

#[tokio::test]
async fn bad_sector_inside_a_duty_propagates() {
    let p = portal();
    let records = vec![RawSector::new(
        Some("L1"),
        ["401", "BRS", "GLA", "9999", "1010", "Fri18Jan", "1", "07:55", "10:40"],
    )];
    let err = reconstruct_duty(&records, date(2019, 1, 18), "B001", &p)
        .await
        .unwrap_err();
    assert!(matches!(err, RosterError::Parse(ParseError::BadSector(_))));
}

#[tokio::test]
async fn trip_day_beyond_the_calendar_is_a_bad_duty() {
    let p = portal();
    for trip_day in ["99999999999999", "-9223372036854775808", "9223372036854775807"] {
        let records = vec![RawSector::new(
            Some("L1"),
            ["401", "BRS", "GLA", "0855", "1010", "Fri18Jan", trip_day, "07:55", "10:40"],
        )];
        let err = reconstruct_duty(&records, date(2019, 1, 18), "B001", &p)
            .await
            .unwrap_err();
        assert!(
            matches!(err, RosterError::Parse(ParseError::BadDuty(_))),
            "{trip_day}: {err:?}"
        );
    }
    assert!(p.crew_requests().is_empty());
}

#[tokio::test]
async fn sector_at_the_end_of_the_calendar_is_a_bad_sector() {
    let p = portal();
    // scheduled on carries a day offset past the last representable date
    let records = vec![RawSector::new(
        Some("L1"),
        ["401", "BRS", "GLA", "0855", "10101", "Fri18Jan", "1", "07:55", "10:40"],
    )];
    let err = reconstruct_duty(&records, NaiveDate::MAX, "B001", &p)
        .await
        .unwrap_err();
    assert!(matches!(err, RosterError::Parse(ParseError::BadSector(_))));
}
