/// Mean Earth radius used for all great-circle distances.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in kilometres between two lat/lon pairs given in degrees.
///
/// No range checks happen here; any real input produces a value. Results are
/// kept at full precision so they can be chained (see [`round_to`] for display).
pub fn haversine_km(lat1_deg: f64, lon1_deg: f64, lat2_deg: f64, lon2_deg: f64) -> f64 {
    let lat1 = lat1_deg.to_radians();
    let lat2 = lat2_deg.to_radians();
    let dlat = (lat2_deg - lat1_deg).to_radians();
    let dlon = (lon2_deg - lon1_deg).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // a can drift a hair above 1.0 for antipodal pairs
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Round a distance for presentation.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_distance() {
        assert_eq!(haversine_km(12.5, -45.25, 12.5, -45.25), 0.0);
        assert_eq!(haversine_km(-90.0, 0.0, -90.0, 0.0), 0.0);
    }

    #[test]
    fn test_quarter_circle() {
        let d = haversine_km(0.0, 0.0, 0.0, 90.0);
        assert!((d - 10007.543).abs() < 0.01, "got {}", d);
    }

    #[test]
    fn test_symmetry() {
        let pairs = [
            ((52.52, 13.405), (48.8566, 2.3522)),
            ((-33.8688, 151.2093), (40.7128, -74.006)),
            ((89.9, 179.9), (-89.9, -179.9)),
        ];
        for ((lat1, lon1), (lat2, lon2)) in pairs {
            let ab = haversine_km(lat1, lon1, lat2, lon2);
            let ba = haversine_km(lat2, lon2, lat1, lon1);
            assert!((ab - ba).abs() <= 1e-9 * ab.max(1.0));
        }
    }

    #[test]
    fn test_antipodal_is_finite() {
        let d = haversine_km(0.0, 0.0, 0.0, 180.0);
        assert!(d.is_finite());
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
    }

    #[test]
    fn test_berlin_paris() {
        let d = haversine_km(52.52, 13.405, 48.8566, 2.3522);
        assert!((d - 878.0).abs() < 10.0);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.23456, 3), 1.235);
        assert_eq!(round_to(10007.5428, 2), 10007.54);
        assert_eq!(round_to(2.0, 0), 2.0);
    }
}
