use thiserror::Error;

use crate::ephemeris::EphemerisError;

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("look plan time step must be positive")]
    InvalidTimeStep,
    #[error("ephemeris error: {0}")]
    Ephemeris(#[from] EphemerisError),
}
