use serde::{Deserialize, Serialize};

/// Mean Earth radius in nautical miles.
pub const EARTH_RADIUS_NM: f64 = 3440.065;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Returns `None` unless both values are finite and inside the usual
    /// latitude/longitude ranges.
    pub fn checked(lat: f64, lon: f64) -> Option<Self> {
        let valid = lat.is_finite()
            && lon.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lon);
        valid.then(|| Self::new(lat, lon))
    }

    pub fn distance_nm(&self, other: &Coordinate) -> f64 {
        haversine_nm(self.lat, self.lon, other.lat, other.lon)
    }
}

/// Great-circle distance between two points, in nautical miles.
pub fn haversine_nm(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_NM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_distance() {
        let jfk = Coordinate::new(40.6398, -73.7789);
        assert!(jfk.distance_nm(&jfk).abs() < 1e-9);
    }

    #[test]
    fn test_one_degree_of_latitude_is_sixty_nm() {
        let d = haversine_nm(10.0, 20.0, 11.0, 20.0);
        assert!((d - 60.04).abs() < 0.1, "got {d}");
    }

    #[test]
    fn test_jfk_to_lax() {
        // Published great-circle distance is about 2150 nm.
        let jfk = Coordinate::new(40.6398, -73.7789);
        let lax = Coordinate::new(33.9425, -118.4081);
        let d = jfk.distance_nm(&lax);
        assert!((2130.0..2170.0).contains(&d), "got {d}");
        assert!((d - lax.distance_nm(&jfk)).abs() < 1e-9);
    }

    #[test]
    fn test_checked_rejects_out_of_range() {
        assert!(Coordinate::checked(91.0, 0.0).is_none());
        assert!(Coordinate::checked(0.0, -180.5).is_none());
        assert!(Coordinate::checked(f64::NAN, 0.0).is_none());
        assert_eq!(Coordinate::checked(-33.9, 151.2), Some(Coordinate::new(-33.9, 151.2)));
    }
}
