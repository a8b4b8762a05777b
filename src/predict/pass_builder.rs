use crate::predict::types::{EventKind, Pass, PassFailure, RawEvent, SatelliteRef};

/// Pair every culmination in `events` with its surrounding rise and set and
/// return the assembled passes plus the culminations that could not be
/// completed.
///
/// The event stream is not assumed to alternate rise/culminate/set. Some
/// satellites culminate several times between rising and setting, so the
/// nearest preceding rise and nearest following set are searched for
/// independently, and several passes may share one rise/set pair. A
/// culmination whose rise or set fell outside the queried window becomes a
/// failure entry; it never aborts the remaining events.
pub fn build_passes(
    events: &[RawEvent],
    satellite: &SatelliteRef,
) -> (Vec<Pass>, Vec<PassFailure>) {
    let mut passes = Vec::new();
    let mut failures = Vec::new();

    for (ndx, event) in events.iter().enumerate() {
        if event.kind != EventKind::Culminate {
            continue;
        }

        let rise = events[..ndx]
            .iter()
            .rev()
            .find(|e| e.kind == EventKind::Rise);
        let set = events[ndx + 1..]
            .iter()
            .find(|e| e.kind == EventKind::Set);

        let (rise, set) = match (rise, set) {
            (Some(rise), Some(set)) => (rise, set),
            (None, _) => {
                failures.push(PassFailure {
                    time: event.time,
                    reason: "no rise found in window".to_string(),
                });
                continue;
            }
            (_, None) => {
                failures.push(PassFailure {
                    time: event.time,
                    reason: "no set found in window".to_string(),
                });
                continue;
            }
        };

        // The input slice is time-ordered, so a pairing that comes out
        // inverted means the builder itself is broken.
        assert!(
            rise.time < event.time && event.time < set.time,
            "pass events out of order for {}",
            satellite.name
        );

        passes.push(Pass {
            satellite: satellite.clone(),
            ascend_time: rise.time,
            peak_time: event.time,
            descend_time: set.time,
        });
    }

    passes.sort_by_key(|p| p.ascend_time);
    (passes, failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn sat() -> SatelliteRef {
        SatelliteRef {
            name: "YUBILEINY (RS-30)".to_string(),
            norad_id: 32953,
        }
    }

    fn t(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, 11, 11, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn evt(minutes: i64, kind: EventKind) -> RawEvent {
        RawEvent {
            time: t(minutes),
            kind,
        }
    }

    #[test]
    fn simple_pass() {
        let events = [
            evt(0, EventKind::Rise),
            evt(3, EventKind::Culminate),
            evt(6, EventKind::Set),
        ];
        let (passes, failures) = build_passes(&events, &sat());
        assert_eq!(passes.len(), 1);
        assert!(failures.is_empty());
        assert_eq!(passes[0].ascend_time, t(0));
        assert_eq!(passes[0].peak_time, t(3));
        assert_eq!(passes[0].descend_time, t(6));
    }

    #[test]
    fn double_culmination_shares_rise_and_set() {
        let events = [
            evt(0, EventKind::Rise),
            evt(2, EventKind::Culminate),
            evt(5, EventKind::Culminate),
            evt(8, EventKind::Set),
        ];
        let (passes, failures) = build_passes(&events, &sat());
        assert!(failures.is_empty());
        assert_eq!(passes.len(), 2);
        assert_eq!(passes[0].ascend_time, passes[1].ascend_time);
        assert_eq!(passes[0].descend_time, passes[1].descend_time);
        // Stable sort keeps the earlier culmination first.
        assert!(passes[0].peak_time < passes[1].peak_time);
    }

    #[test]
    fn two_distinct_passes_stay_ordered() {
        let events = [
            evt(0, EventKind::Rise),
            evt(3, EventKind::Culminate),
            evt(6, EventKind::Set),
            evt(116, EventKind::Rise),
            evt(120, EventKind::Culminate),
            evt(124, EventKind::Set),
        ];
        let (passes, failures) = build_passes(&events, &sat());
        assert!(failures.is_empty());
        assert_eq!(passes.len(), 2);
        assert!(passes[0].ascend_time < passes[1].ascend_time);
    }

    #[test]
    fn clipped_rise_is_reported_and_skipped() {
        // Window opened mid-pass: the first culmination has no rise, but the
        // later complete pass must still come through.
        let events = [
            evt(1, EventKind::Culminate),
            evt(4, EventKind::Set),
            evt(110, EventKind::Rise),
            evt(114, EventKind::Culminate),
            evt(118, EventKind::Set),
        ];
        let (passes, failures) = build_passes(&events, &sat());
        assert_eq!(passes.len(), 1);
        assert_eq!(passes[0].peak_time, t(114));
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].time, t(1));
        assert_eq!(failures[0].reason, "no rise found in window");
    }

    #[test]
    fn clipped_set_is_reported() {
        let events = [evt(0, EventKind::Rise), evt(3, EventKind::Culminate)];
        let (passes, failures) = build_passes(&events, &sat());
        assert!(passes.is_empty());
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].reason, "no set found in window");
    }

    #[test]
    fn empty_window_is_empty_result() {
        let (passes, failures) = build_passes(&[], &sat());
        assert!(passes.is_empty());
        assert!(failures.is_empty());
    }

    #[test]
    fn set_pairing_takes_nearest_following() {
        // Two complete passes: the first culmination must pair with the
        // first set, not a later one.
        let events = [
            evt(0, EventKind::Rise),
            evt(3, EventKind::Culminate),
            evt(6, EventKind::Set),
            evt(100, EventKind::Rise),
            evt(103, EventKind::Culminate),
            evt(106, EventKind::Set),
        ];
        let (passes, _) = build_passes(&events, &sat());
        assert_eq!(passes[0].descend_time, t(6));
    }
}
