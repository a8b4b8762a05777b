use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("sensor read failed: {0}")]
    Read(String),
    #[error("actuator write failed: {0}")]
    Write(String),
}

#[derive(Debug, Error)]
pub enum RotatorError {
    #[error("rotator power is off, cannot move")]
    PowerOff,
    #[error("{axis} target {target:.2}° is out of range ({min:.2}° to {max:.2}°)")]
    OutOfRange {
        axis: &'static str,
        target: f64,
        min: f64,
        max: f64,
    },
    #[error("sensor read: {0}")]
    SensorRead(#[source] BackendError),
    #[error("actuator write: {0}")]
    ActuatorWrite(#[source] BackendError),
    #[error("seek did not converge within {0} ticks")]
    SeekTimeout(u32),
    #[error("seek cancelled")]
    Cancelled,
}
