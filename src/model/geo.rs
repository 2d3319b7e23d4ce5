use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

pub const DEFAULT_RADIUS_METERS: f64 = 100.0;

#[derive(Debug, Error, PartialEq)]
pub enum GeoError {
    #[error("latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),

    #[error("radius {0} must be a finite, non-negative number of meters")]
    InvalidRadius(f64),
}

#[derive(Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

/// A WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema, Display)]
#[serde(try_from = "RawCoordinate")]
#[display(fmt = "{:.6}, {:.6}", latitude, longitude)]
#[schema(example = json!({ "latitude": 23.810331, "longitude": 90.412521 }))]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeoError> {
        // NaN fails both range checks
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(GeoError::LatitudeOutOfRange(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(GeoError::LongitudeOutOfRange(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Browser geolocation order: `[latitude, longitude]`.
    pub fn from_lat_lon(pair: [f64; 2]) -> Result<Self, GeoError> {
        Self::new(pair[0], pair[1])
    }

    /// GeoJSON `Point` order: `[longitude, latitude]`.
    pub fn from_lon_lat(pair: [f64; 2]) -> Result<Self, GeoError> {
        Self::new(pair[1], pair[0])
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = GeoError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Coordinate::new(raw.latitude, raw.longitude)
    }
}

/// Great-circle distance in meters (haversine).
pub fn distance_meters(a: &Coordinate, b: &Coordinate) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let d_phi = (b.latitude - a.latitude).to_radians();
    let d_lambda = (b.longitude - a.longitude).to_radians();

    let h = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_METERS * c
}

/// True iff `user` is at most `radius_meters` away from `target`.
pub fn within_radius(user: &Coordinate, target: &Coordinate, radius_meters: f64) -> bool {
    distance_meters(user, target) <= radius_meters
}

#[derive(Deserialize)]
struct RawGeoFence {
    center: Coordinate,
    #[serde(default = "default_radius")]
    radius_meters: f64,
}

fn default_radius() -> f64 {
    DEFAULT_RADIUS_METERS
}

/// Circular area around a branch that a check-in must fall into.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "RawGeoFence")]
pub struct GeoFence {
    center: Coordinate,
    #[schema(example = 100.0)]
    radius_meters: f64,
}

impl GeoFence {
    pub fn new(center: Coordinate, radius_meters: f64) -> Result<Self, GeoError> {
        if !radius_meters.is_finite() || radius_meters < 0.0 {
            return Err(GeoError::InvalidRadius(radius_meters));
        }
        Ok(Self {
            center,
            radius_meters,
        })
    }

    pub fn center(&self) -> &Coordinate {
        &self.center
    }

    pub fn radius_meters(&self) -> f64 {
        self.radius_meters
    }

    pub fn distance_to(&self, point: &Coordinate) -> f64 {
        distance_meters(point, &self.center)
    }

    pub fn contains(&self, point: &Coordinate) -> bool {
        within_radius(point, &self.center, self.radius_meters)
    }
}

impl TryFrom<RawGeoFence> for GeoFence {
    type Error = GeoError;

    fn try_from(raw: RawGeoFence) -> Result<Self, Self::Error> {
        GeoFence::new(raw.center, raw.radius_meters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).expect("valid coordinate")
    }

    #[test]
    fn distance_to_self_is_zero() {
        for (lat, lon) in [(0.0, 0.0), (23.8103, 90.4125), (-89.9, 179.9), (51.5, -0.12)] {
            let a = coord(lat, lon);
            assert_eq!(distance_meters(&a, &a), 0.0);
        }
    }

    #[test]
    fn distance_is_symmetric() {
        let dhaka = coord(23.8103, 90.4125);
        let london = coord(51.5074, -0.1278);
        let there = distance_meters(&dhaka, &london);
        let back = distance_meters(&london, &dhaka);
        assert!((there - back).abs() < 1e-6);
        // roughly 8,000 km apart
        assert!(there > 7_900_000.0 && there < 8_100_000.0);
    }

    #[test]
    fn tenth_of_a_kilometer_at_the_equator() {
        let origin = coord(0.0, 0.0);
        let north = coord(0.0009, 0.0);
        let d = distance_meters(&origin, &north);
        assert!((d - 100.0).abs() <= 5.0, "got {d}");
    }

    #[test]
    fn default_radius_accepts_near_and_rejects_far() {
        let origin = coord(0.0, 0.0);
        let near = coord(0.0008, 0.0); // ~89 m
        let far = coord(0.00135, 0.0); // ~150 m
        assert!(within_radius(&near, &origin, DEFAULT_RADIUS_METERS));
        assert!(!within_radius(&far, &origin, DEFAULT_RADIUS_METERS));
    }

    #[test]
    fn radius_boundary_is_inclusive() {
        let a = coord(10.0, 10.0);
        let b = coord(10.001, 10.001);
        let exact = distance_meters(&a, &b);
        assert!(within_radius(&a, &b, exact));
        assert!(!within_radius(&a, &b, exact - 0.001));
    }

    #[test]
    fn rejects_out_of_range_and_nan() {
        assert_eq!(
            Coordinate::new(90.5, 0.0),
            Err(GeoError::LatitudeOutOfRange(90.5))
        );
        assert_eq!(
            Coordinate::new(0.0, -180.5),
            Err(GeoError::LongitudeOutOfRange(-180.5))
        );
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
        assert!(Coordinate::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn tuple_order_is_explicit() {
        let browser = Coordinate::from_lat_lon([23.8, 90.4]).unwrap();
        let geojson = Coordinate::from_lon_lat([90.4, 23.8]).unwrap();
        assert_eq!(browser, geojson);
        // swapped order lands out of range instead of silently moving the point
        assert!(Coordinate::from_lat_lon([90.4, 23.8]).is_err());
    }

    #[test]
    fn deserialization_validates() {
        let ok: Coordinate =
            serde_json::from_str(r#"{"latitude": 1.5, "longitude": 2.5}"#).unwrap();
        assert_eq!(ok.latitude(), 1.5);
        let err = serde_json::from_str::<Coordinate>(r#"{"latitude": 100, "longitude": 2.5}"#);
        assert!(err.is_err());
    }

    #[test]
    fn displays_six_decimals() {
        assert_eq!(coord(1.5, -2.25).to_string(), "1.500000, -2.250000");
    }

    #[test]
    fn geofence_defaults_radius_and_rejects_negative() {
        let fence: GeoFence =
            serde_json::from_str(r#"{"center": {"latitude": 0, "longitude": 0}}"#).unwrap();
        assert_eq!(fence.radius_meters(), DEFAULT_RADIUS_METERS);
        assert!(fence.contains(&coord(0.0008, 0.0)));
        assert!(!fence.contains(&coord(0.00135, 0.0)));

        assert_eq!(
            GeoFence::new(coord(0.0, 0.0), -1.0),
            Err(GeoError::InvalidRadius(-1.0))
        );
        assert!(GeoFence::new(coord(0.0, 0.0), f64::NAN).is_err());
    }
}
