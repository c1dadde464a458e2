// tests/dedup.rs
use chrono::{Duration, NaiveDate, NaiveDateTime};
use crew_roster::{deduplicate, Duty};

fn at(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2019, 1, 18)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

fn duty(label: &str, start: NaiveDateTime, end: NaiveDateTime) -> Duty {
    Duty {
        start,
        end,
        label: label.into(),
        sectors: None,
    }
}

fn labels(duties: &[Duty]) -> Vec<&str> {
    duties.iter().map(|d| d.label.as_str()).collect()
}

#[test]
fn contained_duty_is_dropped() {
    let out = deduplicate(vec![
        duty("A", at(9, 0), at(13, 0)),
        duty("B", at(10, 0), at(11, 0)),
    ]);
    assert_eq!(labels(&out), ["A"]);
}

#[test]
fn overlap_that_sticks_out_is_kept() {
    let out = deduplicate(vec![
        duty("A", at(9, 0), at(13, 0)),
        duty("B", at(12, 0), at(14, 0)),
        duty("C", at(8, 0), at(10, 0)),
    ]);
    assert_eq!(labels(&out), ["A", "B", "C"]);
}

#[test]
fn emission_order_is_preserved_not_sorted() {
    let out = deduplicate(vec![
        duty("late", at(18, 0), at(20, 0)),
        duty("early", at(6, 0), at(7, 0)),
    ]);
    assert_eq!(labels(&out), ["late", "early"]);
}

#[test]
fn deduplicate_is_idempotent() {
    let base = at(0, 0);
    let lists: Vec<Vec<Duty>> = vec![
        vec![],
        vec![duty("A", at(9, 0), at(13, 0)), duty("B", at(10, 0), at(11, 0))],
        // a spread of nested, overlapping and disjoint intervals
        (0..24)
            .map(|i: i64| {
                let start = base + Duration::minutes((i * 37) % 600);
                let end = start + Duration::minutes(30 + (i * 53) % 300);
                duty(&format!("D{i}"), start, end)
            })
            .collect(),
    ];
    for list in lists {
        let once = deduplicate(list);
        let twice = deduplicate(once.clone());
        assert_eq!(once, twice);
    }
}
