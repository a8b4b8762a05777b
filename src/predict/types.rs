use chrono::{DateTime, Utc};
use serde::Serialize;
use strum_macros::Display;

/// Horizon-crossing event kinds as reported by the ephemeris engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
pub enum EventKind {
    Rise,
    Culminate,
    Set,
}

/// One raw event from the ephemeris engine. Consumed as a borrowed,
/// time-ordered slice; never owned by this module.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RawEvent {
    pub time: DateTime<Utc>,
    pub kind: EventKind,
}

/// Identity of the satellite a pass or plan belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct SatelliteRef {
    pub name: String,
    pub norad_id: u32,
}

/// One pass of a satellite over the observer, assembled from a culmination
/// and its paired rise/set events. `ascend_time < peak_time < descend_time`
/// always holds for a constructed pass.
#[derive(Debug, Clone, Serialize)]
pub struct Pass {
    pub satellite: SatelliteRef,
    pub ascend_time: DateTime<Utc>,
    pub peak_time: DateTime<Utc>,
    pub descend_time: DateTime<Utc>,
}

/// A culmination that could not be completed into a pass. Collected and
/// reported so the caller can decide whether to widen the search window.
#[derive(Debug, Clone, Serialize)]
pub struct PassFailure {
    pub time: DateTime<Utc>,
    pub reason: String,
}

/// Topocentric position of a satellite at one instant.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Topocentric {
    pub az_deg: f64,
    pub el_deg: f64,
    pub range_km: f64,
}

/// One pointing command in a look plan.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PointingSample {
    pub time: DateTime<Utc>,
    pub az_deg: f64,
    pub el_deg: f64,
}

/// Everything needed to steer a rotator through one pass: a non-empty,
/// time-ascending sequence of pointing samples.
#[derive(Debug, Clone, Serialize)]
pub struct LookPlan {
    pub satellite: SatelliteRef,
    pub samples: Vec<PointingSample>,
}
