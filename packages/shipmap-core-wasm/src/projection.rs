//! Spherical (Web) Mercator projection, EPSG:4326 -> EPSG:3857.
//!
//! Matches what browser base maps use for their tile grid, so projected
//! coordinates can be compared directly with the base map's view state.

use geo_types::Coord;
use std::f64::consts::PI;

/// Sphere radius used by EPSG:3857, in metres.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Half the width (and height) of the projected world square.
pub const HALF_WORLD: f64 = PI * EARTH_RADIUS;

/// Latitude at which the Mercator square ends.
pub const MAX_MERCATOR_LATITUDE: f64 = 85.051_128_779_806_59;

/// Resolution of zoom level 0 for 256 px tiles, in metres per pixel.
pub const ZOOM0_RESOLUTION: f64 = 2.0 * HALF_WORLD / 256.0;

/// Deepest zoom a view may use, well under a millimetre per pixel.
pub const MAX_ZOOM: f64 = 30.0;

/// Checks that a lon/lat pair is finite and inside the geographic ranges.
pub fn is_valid_lon_lat(longitude: f64, latitude: f64) -> bool {
    longitude.is_finite()
        && latitude.is_finite()
        && (-180.0..=180.0).contains(&longitude)
        && (-90.0..=90.0).contains(&latitude)
}

/// Project a longitude/latitude pair in degrees to Web Mercator metres.
///
/// Callers validate with [`is_valid_lon_lat`] first. Latitudes past the
/// Mercator limit land on the edge of the world square instead of at infinity.
pub fn project(longitude: f64, latitude: f64) -> Coord<f64> {
    let x = EARTH_RADIUS * longitude.to_radians();
    let y = if latitude >= MAX_MERCATOR_LATITUDE {
        HALF_WORLD
    } else if latitude <= -MAX_MERCATOR_LATITUDE {
        -HALF_WORLD
    } else {
        EARTH_RADIUS * (PI / 4.0 + latitude.to_radians() / 2.0).tan().ln()
    };
    Coord { x, y }
}

/// Inverse of [`project`], returns `(longitude, latitude)` in degrees.
pub fn unproject(coord: Coord<f64>) -> (f64, f64) {
    let longitude = (coord.x / EARTH_RADIUS).to_degrees();
    let latitude = (2.0 * (coord.y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees();
    (longitude, latitude)
}

/// Metres per pixel at a zoom level of the standard 256 px tile pyramid.
pub fn resolution_for_zoom(zoom: f64) -> f64 {
    ZOOM0_RESOLUTION / 2f64.powf(zoom)
}
