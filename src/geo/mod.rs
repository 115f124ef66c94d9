use bevy::math::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Mean Earth radius, used to turn physical distances into angles on the globe.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatLon {
    pub latitude: f64,
    pub longitude: f64,
}

/// Geographic coordinates (degrees) to a unit vector, Y-up.
/// Longitude 0 lies on +X and longitude 90E on -Z, matching Bevy's right-handed frame.
pub fn latlon_to_unit(coord: LatLon) -> Vec3 {
    let lat = coord.latitude.to_radians();
    let lon = coord.longitude.to_radians();
    Vec3::new(
        (lat.cos() * lon.cos()) as f32,
        lat.sin() as f32,
        (-lat.cos() * lon.sin()) as f32,
    )
}

pub fn unit_to_latlon(v: Vec3) -> LatLon {
    let v = v.normalize_or_zero();
    let latitude = (v.y.clamp(-1.0, 1.0) as f64).asin().to_degrees();
    let longitude = (-(v.z as f64)).atan2(v.x as f64).to_degrees();
    LatLon { latitude, longitude }
}

/// Angular distance in radians between two directions on the unit sphere.
///
/// The dot product is clamped before `acos`: normalization drift routinely
/// lands just above 1 for identical points, and an unclamped `acos` turns that
/// into NaN. The dot is taken in f64 so identical points come out at ~1e-8
/// rather than the ~3e-4 that f32 rounding near `acos(1)` produces.
#[inline]
pub fn great_circle_distance(a: Vec3, b: Vec3) -> f32 {
    let dot = a.as_dvec3().normalize_or_zero().dot(b.as_dvec3().normalize_or_zero());
    if !dot.is_finite() {
        return 0.0;
    }
    dot.clamp(-1.0, 1.0).acos() as f32
}

/// Rotation taking the local up axis (+Y) onto the surface normal at `position`.
pub fn surface_orientation(position: Vec3) -> Quat {
    let normal = position.normalize_or_zero();
    if normal == Vec3::ZERO {
        return Quat::IDENTITY;
    }
    Quat::from_rotation_arc(Vec3::Y, normal)
}
