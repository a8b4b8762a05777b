use chrono::{DateTime, Duration, Utc};
use sgp4::{Constants, Elements};

use crate::ephemeris::error::EphemerisError;
use crate::ephemeris::ground_station::GroundStation;
use crate::ephemeris::propagate::topocentric_at;
use crate::predict::{EventKind, RawEvent};

const COARSE_STEP_SECONDS: i64 = 60; // initial scan
const FINE_STEP_SECONDS: i64 = 1; // crossing refinement

/// Find every rise, culmination, and set of the satellite relative to
/// `min_elevation_deg` within `[t0, t1]`, in ascending time order.
///
/// Culminations are reported at every local elevation maximum while the
/// satellite is above the threshold, so a single rise/set pair may contain
/// several of them. A pass clipped by the window edge produces the partial
/// events that fall inside it; pairing them up (or reporting the failure) is
/// the pass builder's job.
pub fn find_events(
    station: &GroundStation,
    elements: &Elements,
    constants: &Constants,
    t0: DateTime<Utc>,
    t1: DateTime<Utc>,
    min_elevation_deg: f64,
) -> Result<Vec<RawEvent>, EphemerisError> {
    scan_events(
        |t| topocentric_at(station, elements, constants, t).map(|topo| topo.el_deg),
        t0,
        t1,
        min_elevation_deg,
    )
}

fn scan_events<F>(
    mut elevation_at: F,
    t0: DateTime<Utc>,
    t1: DateTime<Utc>,
    min_el: f64,
) -> Result<Vec<RawEvent>, EphemerisError>
where
    F: FnMut(DateTime<Utc>) -> Result<f64, EphemerisError>,
{
    let coarse = Duration::seconds(COARSE_STEP_SECONDS);
    let mut events = Vec::new();

    let mut prev: Option<(DateTime<Utc>, f64)> = None;
    // True while the elevation has been increasing since the last rise or
    // local minimum; a downturn while climbing marks a culmination.
    let mut climbing = false;

    let mut cursor = t0;
    while cursor <= t1 {
        let el = elevation_at(cursor)?;
        let visible = el >= min_el;

        match prev {
            None => {
                // Window may open mid-pass; leave `climbing` unset so a
                // descent from a peak outside the window is not mistaken
                // for a culmination.
                climbing = false;
            }
            Some((prev_time, prev_el)) => {
                let was_visible = prev_el >= min_el;
                if visible && !was_visible {
                    let rise =
                        refine_crossing(&mut elevation_at, prev_time, cursor, min_el, true)?;
                    events.push(RawEvent {
                        time: rise,
                        kind: EventKind::Rise,
                    });
                    climbing = true;
                } else if visible && was_visible {
                    if climbing && el < prev_el {
                        events.push(RawEvent {
                            time: prev_time,
                            kind: EventKind::Culminate,
                        });
                        climbing = false;
                    } else if !climbing && el > prev_el {
                        climbing = true;
                    }
                } else if !visible && was_visible {
                    if climbing {
                        // Peak and set crossing fell inside one coarse step.
                        events.push(RawEvent {
                            time: prev_time,
                            kind: EventKind::Culminate,
                        });
                        climbing = false;
                    }
                    let set =
                        refine_crossing(&mut elevation_at, prev_time, cursor, min_el, false)?;
                    events.push(RawEvent {
                        time: set,
                        kind: EventKind::Set,
                    });
                }
            }
        }

        prev = Some((cursor, el));
        cursor += coarse;
    }

    Ok(events)
}

/// Bisect the threshold crossing down to one second.
fn refine_crossing<F>(
    elevation_at: &mut F,
    before: DateTime<Utc>,
    after: DateTime<Utc>,
    min_el: f64,
    rising: bool,
) -> Result<DateTime<Utc>, EphemerisError>
where
    F: FnMut(DateTime<Utc>) -> Result<f64, EphemerisError>,
{
    let mut low = before;
    let mut high = after;

    while (high - low).num_seconds() > FINE_STEP_SECONDS {
        let mid = low + (high - low) / 2;
        let above = elevation_at(mid)? >= min_el;
        if above == rising {
            high = mid;
        } else {
            low = mid;
        }
    }

    Ok(high)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 11, 2, 15, 0, 0).unwrap()
    }

    fn t(minutes: i64) -> DateTime<Utc> {
        epoch() + Duration::minutes(minutes)
    }

    /// Piecewise-linear elevation profile through `(minute, elevation)`
    /// knots, evaluated at sub-second resolution.
    fn profile(knots: &'static [(f64, f64)]) -> impl FnMut(DateTime<Utc>) -> Result<f64, EphemerisError>
    {
        move |time: DateTime<Utc>| {
            let m = (time - epoch()).num_milliseconds() as f64 / 60_000.0;
            let mut value = knots[0].1;
            for pair in knots.windows(2) {
                let ((m0, e0), (m1, e1)) = (pair[0], pair[1]);
                if m >= m0 && m <= m1 {
                    value = e0 + (e1 - e0) * (m - m0) / (m1 - m0);
                    break;
                }
                value = e1;
            }
            Ok(value)
        }
    }

    fn kinds(events: &[RawEvent]) -> Vec<EventKind> {
        events.iter().map(|e| e.kind).collect()
    }

    #[test]
    fn single_pass_in_order() {
        // Up between minutes ~80 and ~160, peaking at 120.
        let el = profile(&[(0.0, -20.0), (80.5, 0.0), (120.0, 40.0), (159.5, 0.0), (240.0, -40.0)]);
        let events = scan_events(el, t(0), t(240), 0.0).unwrap();
        assert_eq!(
            kinds(&events),
            [EventKind::Rise, EventKind::Culminate, EventKind::Set]
        );
        // Crossings refined to within a second, peak to within a coarse step.
        assert!((events[0].time - t(80)).num_seconds().abs() <= 31);
        assert!((events[1].time - t(120)).num_seconds().abs() <= 60);
        assert!((events[2].time - t(159)).num_seconds().abs() <= 61);
        assert!(events.windows(2).all(|w| w[0].time < w[1].time));
    }

    #[test]
    fn double_culmination_single_pass() {
        // Two humps above the horizon with a dip between them.
        let el = profile(&[
            (0.0, -20.0),
            (80.0, -1.0),
            (81.0, 1.0),
            (100.0, 10.0),
            (120.0, 5.0),
            (140.0, 10.0),
            (159.0, 1.0),
            (160.0, -1.0),
            (240.0, -30.0),
        ]);
        let events = scan_events(el, t(0), t(240), 0.0).unwrap();
        assert_eq!(
            kinds(&events),
            [
                EventKind::Rise,
                EventKind::Culminate,
                EventKind::Culminate,
                EventKind::Set
            ]
        );
        assert_eq!(events[1].time, t(100));
        assert_eq!(events[2].time, t(140));
    }

    #[test]
    fn window_clipped_after_peak_yields_set_only() {
        // Already descending when the window opens; the peak is unseen, so
        // no culmination may be invented.
        let el = profile(&[(0.0, 30.0), (40.0, 1.0), (41.0, -1.0), (120.0, -40.0)]);
        let events = scan_events(el, t(0), t(120), 0.0).unwrap();
        assert_eq!(kinds(&events), [EventKind::Set]);
    }

    #[test]
    fn window_clipped_before_set_yields_unpaired_culmination() {
        let el = profile(&[(0.0, -20.0), (59.0, -1.0), (60.0, 1.0), (100.0, 30.0), (200.0, 25.0)]);
        let events = scan_events(el, t(0), t(180), 0.0).unwrap();
        assert_eq!(kinds(&events), [EventKind::Rise, EventKind::Culminate]);
    }

    #[test]
    fn nothing_visible_is_no_events() {
        let el = profile(&[(0.0, -20.0), (240.0, -10.0)]);
        let events = scan_events(el, t(0), t(240), 0.0).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn respects_minimum_elevation_threshold() {
        // Peaks at 20 degrees; invisible for a 30-degree mask.
        let el = profile(&[(0.0, -20.0), (120.0, 20.0), (240.0, -20.0)]);
        let events = scan_events(el, t(0), t(240), 30.0).unwrap();
        assert!(events.is_empty());
    }
}
