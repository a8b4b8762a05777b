use chrono::{DateTime, Duration, Utc};

use crate::predict::error::PredictError;
use crate::predict::types::{LookPlan, Pass, PointingSample, Topocentric};

/// Build the time-ordered pointing sequence for one pass.
///
/// Samples start at `ascend_time` and advance by `time_step` for as long as
/// the sample time is `<= descend_time`, so the plan always covers the whole
/// pass even when the duration is not a multiple of the step. A pass shorter
/// than one step still yields its first sample. Pure function of its inputs;
/// the plan can be regenerated at any point.
pub fn generate_look_plan<F>(
    pass: &Pass,
    mut topocentric_fn: F,
    time_step: Duration,
) -> Result<LookPlan, PredictError>
where
    F: FnMut(DateTime<Utc>) -> Result<Topocentric, PredictError>,
{
    if time_step <= Duration::zero() {
        return Err(PredictError::InvalidTimeStep);
    }

    let mut samples = Vec::new();
    let mut look_time = pass.ascend_time;
    while look_time <= pass.descend_time {
        let topo = topocentric_fn(look_time)?;
        samples.push(PointingSample {
            time: look_time,
            az_deg: topo.az_deg,
            el_deg: topo.el_deg,
        });
        look_time += time_step;
    }

    Ok(LookPlan {
        satellite: pass.satellite.clone(),
        samples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::types::SatelliteRef;
    use chrono::TimeZone;

    fn test_pass(duration_s: i64) -> Pass {
        let rise = Utc.with_ymd_and_hms(2024, 11, 2, 15, 29, 0).unwrap();
        Pass {
            satellite: SatelliteRef {
                name: "FUNCUBE-1 (AO-73)".to_string(),
                norad_id: 39444,
            },
            ascend_time: rise,
            peak_time: rise + Duration::seconds(duration_s / 2),
            descend_time: rise + Duration::seconds(duration_s),
        }
    }

    fn flat_sky(_t: DateTime<Utc>) -> Result<Topocentric, PredictError> {
        Ok(Topocentric {
            az_deg: 180.0,
            el_deg: 45.0,
            range_km: 900.0,
        })
    }

    #[test]
    fn covers_pass_with_partial_last_step() {
        let pass = test_pass(500);
        let step = Duration::seconds(60);
        let plan = generate_look_plan(&pass, flat_sky, step).unwrap();

        assert_eq!(plan.samples.first().unwrap().time, pass.ascend_time);
        let last = plan.samples.last().unwrap().time;
        assert!(last <= pass.descend_time);
        assert!(last > pass.descend_time - step);
        assert_eq!(plan.samples.len(), 9); // 0..480s inclusive
    }

    #[test]
    fn exact_multiple_includes_descend_time() {
        let pass = test_pass(180);
        let plan = generate_look_plan(&pass, flat_sky, Duration::seconds(60)).unwrap();
        assert_eq!(plan.samples.len(), 4);
        assert_eq!(plan.samples.last().unwrap().time, pass.descend_time);
    }

    #[test]
    fn degenerate_pass_yields_first_sample() {
        let pass = test_pass(30);
        let plan = generate_look_plan(&pass, flat_sky, Duration::seconds(60)).unwrap();
        assert_eq!(plan.samples.len(), 1);
        assert_eq!(plan.samples[0].time, pass.ascend_time);
    }

    #[test]
    fn zero_step_rejected() {
        let pass = test_pass(300);
        let result = generate_look_plan(&pass, flat_sky, Duration::zero());
        assert!(matches!(result, Err(PredictError::InvalidTimeStep)));
    }

    #[test]
    fn ephemeris_failure_propagates() {
        use crate::ephemeris::EphemerisError;

        let pass = test_pass(300);
        let result = generate_look_plan(
            &pass,
            |_t| Err(EphemerisError::Propagation("decayed".to_string()).into()),
            Duration::seconds(60),
        );
        assert!(matches!(result, Err(PredictError::Ephemeris(_))));
    }

    #[test]
    fn samples_are_time_ascending() {
        let pass = test_pass(600);
        let plan = generate_look_plan(&pass, flat_sky, Duration::seconds(45)).unwrap();
        for pair in plan.samples.windows(2) {
            assert!(pair[0].time < pair[1].time);
        }
    }
}
