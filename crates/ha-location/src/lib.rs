//! Location math for zone proximity
//!
//! Provides the haversine great-circle distance used by zone membership,
//! proximity and polling calculations, plus conversion of meters into the
//! display units a proximity configuration can ask for.

mod distance;
mod rounding;
mod units;

pub use distance::{distance, distance_between, EARTH_RADIUS_METERS};
pub use rounding::{round_half_even, round_to};
pub use units::{UnitOfLength, UnknownUnit};

use thiserror::Error;

/// Result type for location math
pub type LocationResult<T> = Result<T, LocationError>;

/// Errors raised by distance calculations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LocationError {
    /// A coordinate was NaN or infinite
    #[error("invalid coordinate {name}: {value}")]
    InvalidInput { name: &'static str, value: f64 },
}
