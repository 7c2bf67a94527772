//! Distance and containment over WGS84 coordinates.
//!
//! Inputs come straight from a hardware sensor, so nothing here panics or
//! returns an error: malformed coordinates produce NaN distances, and NaN
//! never compares as "within" a radius.

use serde::{Deserialize, Serialize};

/// Mean earth radius in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A (latitude, longitude) pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Both components are finite and inside their valid ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Great-circle distance between two points using the haversine formula.
pub fn distance_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    if !a.is_valid() || !b.is_valid() {
        return f64::NAN;
    }
    if a == b {
        return 0.0;
    }

    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_METERS * c
}

/// Whether `point` lies inside (or exactly on) the circle around `center`.
pub fn is_within_radius(point: GeoPoint, center: GeoPoint, radius_meters: f64) -> bool {
    distance_meters(point, center) <= radius_meters
}

/// A circular region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geofence {
    pub center: GeoPoint,
    pub radius_meters: f64,
}

impl Geofence {
    pub fn new(center: GeoPoint, radius_meters: f64) -> Self {
        Self {
            center,
            radius_meters,
        }
    }

    pub fn contains(&self, point: GeoPoint) -> bool {
        is_within_radius(point, self.center, self.radius_meters)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeofenceTransition {
    Enter,
    Exit,
}

/// Turns a stream of position samples into edge-triggered Enter/Exit events.
///
/// A consumer that is already inside never sees a second Enter. The first
/// sample only produces an event when it is inside the fence.
#[derive(Debug, Clone)]
pub struct GeofenceTracker {
    fence: Geofence,
    inside: Option<bool>,
}

impl GeofenceTracker {
    pub fn new(fence: Geofence) -> Self {
        Self {
            fence,
            inside: None,
        }
    }

    /// `None` until the first usable sample.
    pub fn is_inside(&self) -> Option<bool> {
        self.inside
    }

    pub fn observe(&mut self, point: GeoPoint) -> Option<GeofenceTransition> {
        let distance = distance_meters(point, self.fence.center);
        if distance.is_nan() {
            return None;
        }
        let now_inside = distance <= self.fence.radius_meters;
        let previous = self.inside.replace(now_inside);
        match (previous, now_inside) {
            (None, true) | (Some(false), true) => Some(GeofenceTransition::Enter),
            (Some(true), false) => Some(GeofenceTransition::Exit),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Point `meters` due north of `origin`.
    fn north_of(origin: GeoPoint, meters: f64) -> GeoPoint {
        let d_lat = (meters / EARTH_RADIUS_METERS).to_degrees();
        GeoPoint::new(origin.latitude + d_lat, origin.longitude)
    }

    #[test]
    fn zero_distance_for_same_point() {
        let p = GeoPoint::new(52.52, 13.405);
        assert_eq!(distance_meters(p, p), 0.0);
    }

    #[test]
    fn known_distance_berlin_paris() {
        let berlin = GeoPoint::new(52.5200, 13.4050);
        let paris = GeoPoint::new(48.8566, 2.3522);
        let d = distance_meters(berlin, paris);
        assert!((d - 877_500.0).abs() < 2_000.0, "got {d}");
    }

    #[test]
    fn radius_boundary_is_inclusive() {
        let center = GeoPoint::new(0.0, 0.0);
        let point = north_of(center, 150.0);
        let d = distance_meters(point, center);

        assert!(is_within_radius(point, center, d));
        assert!(!is_within_radius(point, center, d - 1e-6));
    }

    #[test]
    fn office_radius_199_vs_201() {
        let center = GeoPoint::new(0.0, 0.0);
        assert!(is_within_radius(north_of(center, 199.0), center, 200.0));
        assert!(!is_within_radius(north_of(center, 201.0), center, 200.0));
    }

    #[test]
    fn malformed_coordinates_are_never_inside() {
        let center = GeoPoint::new(0.0, 0.0);
        let nan = GeoPoint::new(f64::NAN, 0.0);
        let out_of_range = GeoPoint::new(91.0, 0.0);

        assert!(distance_meters(nan, center).is_nan());
        assert!(!is_within_radius(nan, center, 1e9));
        assert!(!is_within_radius(out_of_range, center, 1e9));
    }

    #[test]
    fn tracker_is_edge_triggered() {
        let center = GeoPoint::new(10.0, 10.0);
        let mut tracker = GeofenceTracker::new(Geofence::new(center, 100.0));
        let inside = north_of(center, 20.0);
        let outside = north_of(center, 500.0);

        assert_eq!(tracker.observe(outside), None);
        assert_eq!(tracker.observe(inside), Some(GeofenceTransition::Enter));
        assert_eq!(tracker.observe(inside), None);
        assert_eq!(tracker.observe(outside), Some(GeofenceTransition::Exit));
        assert_eq!(tracker.observe(outside), None);
    }

    #[test]
    fn tracker_first_inside_sample_enters() {
        let center = GeoPoint::new(10.0, 10.0);
        let mut tracker = GeofenceTracker::new(Geofence::new(center, 100.0));
        assert_eq!(tracker.observe(center), Some(GeofenceTransition::Enter));
        assert_eq!(tracker.is_inside(), Some(true));
    }

    #[test]
    fn tracker_drops_nan_samples() {
        let center = GeoPoint::new(10.0, 10.0);
        let mut tracker = GeofenceTracker::new(Geofence::new(center, 100.0));
        tracker.observe(center);
        assert_eq!(tracker.observe(GeoPoint::new(f64::NAN, f64::NAN)), None);
        assert_eq!(tracker.is_inside(), Some(true));
    }

    fn coord() -> impl Strategy<Value = GeoPoint> {
        (-89.9f64..89.9, -179.9f64..179.9).prop_map(|(lat, lon)| GeoPoint::new(lat, lon))
    }

    proptest! {
        #[test]
        fn distance_is_symmetric_and_non_negative(a in coord(), b in coord()) {
            let ab = distance_meters(a, b);
            let ba = distance_meters(b, a);
            prop_assert!(ab >= 0.0);
            prop_assert!((ab - ba).abs() < 1e-6);
        }
    }
}
