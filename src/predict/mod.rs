mod error;
mod look_plan;
mod pass_builder;
mod types;

pub use error::PredictError;
pub use look_plan::generate_look_plan;
pub use pass_builder::build_passes;
pub use types::{
    EventKind, LookPlan, Pass, PassFailure, PointingSample, RawEvent, SatelliteRef, Topocentric,
};
