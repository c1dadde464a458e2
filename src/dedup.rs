// src/dedup.rs
//! The portal sometimes lists a period inline on the roster and again inside a trip.
//! Because days are walked back to front, the copy to drop always follows the one to keep.

use metrics::counter;

use crate::model::Duty;

/// Drop every duty wholly contained in the last kept duty. Order is preserved, never sorted.
pub fn deduplicate(duties: Vec<Duty>) -> Vec<Duty> {
    let before = duties.len();
    let mut kept: Vec<Duty> = Vec::with_capacity(before);
    for duty in duties {
        match kept.last() {
            Some(last) if last.contains(&duty) => {
                tracing::debug!(
                    target: "dedup",
                    label = %duty.label,
                    start = %duty.start,
                    kept = %last.label,
                    "dropping contained duty"
                );
            }
            _ => kept.push(duty),
        }
    }
    let dropped = before - kept.len();
    if dropped > 0 {
        counter!("roster_duties_deduped_total").increment(dropped as u64);
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn duty(label: &str, from: (u32, u32), to: (u32, u32)) -> Duty {
        let d = NaiveDate::from_ymd_opt(2019, 1, 18).unwrap();
        Duty {
            start: d.and_hms_opt(from.0, from.1, 0).unwrap(),
            end: d.and_hms_opt(to.0, to.1, 0).unwrap(),
            label: label.into(),
            sectors: None,
        }
    }

    #[test]
    fn identical_interval_is_dropped() {
        let out = deduplicate(vec![duty("A", (9, 0), (13, 0)), duty("B", (9, 0), (13, 0))]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].label, "A");
    }

    #[test]
    fn containment_is_checked_against_last_kept_only() {
        // C sits inside A, but B was kept in between.
        let out = deduplicate(vec![
            duty("A", (9, 0), (13, 0)),
            duty("B", (14, 0), (15, 0)),
            duty("C", (10, 0), (11, 0)),
        ]);
        let labels: Vec<_> = out.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, ["A", "B", "C"]);
    }

    #[test]
    fn empty_in_empty_out() {
        assert!(deduplicate(Vec::new()).is_empty());
    }
}
