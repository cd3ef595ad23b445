//! Haversine distance on a spherical earth

use ha_core::Coordinates;

use crate::{LocationError, LocationResult};

/// Mean earth radius used by the haversine formula
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Great-circle distance in meters between two points given in degrees
///
/// Returns [`LocationError::InvalidInput`] if any coordinate is NaN or
/// infinite. Latitudes outside [-90, 90] are not rejected; zones configured
/// with such values still get a (geometrically meaningless) distance.
pub fn distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> LocationResult<f64> {
    check("lat1", lat1)?;
    check("lon1", lon1)?;
    check("lat2", lat2)?;
    check("lon2", lon2)?;

    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let lat1 = lat1.to_radians();
    let lat2 = lat2.to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);

    // Rounding can push the inner term past 1.0 for antipodal points
    let c = 2.0 * a.sqrt().clamp(-1.0, 1.0).asin();

    Ok(EARTH_RADIUS_METERS * c)
}

/// Distance in meters between two coordinate pairs
pub fn distance_between(from: Coordinates, to: Coordinates) -> LocationResult<f64> {
    distance(from.latitude, from.longitude, to.latitude, to.longitude)
}

fn check(name: &'static str, value: f64) -> LocationResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(LocationError::InvalidInput { name, value })
    }
}
