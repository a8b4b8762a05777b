mod error;
mod events;
mod ground_station;
mod propagate;
mod tle;

pub use error::EphemerisError;
pub use events::find_events;
pub use ground_station::GroundStation;
pub use propagate::topocentric_at;
pub use tle::{TleEntry, TleSet};
