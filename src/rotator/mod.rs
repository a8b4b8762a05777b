mod backend;
mod controller;
mod error;

pub use backend::{
    Drive, InputChannel, OutputChannel, RotatorBackend, SimulatedBackend, ALL_OUTPUTS,
};
pub use controller::{
    at_target, CancelToken, Direction, MotionController, RotatorState, DEADBAND_DEG,
    DEFAULT_MAX_SEEK_TICKS,
};
pub use error::{BackendError, RotatorError};
