//! Geodesic helpers.
//!
//! All coordinates use WGS84 (lat/lon in degrees), distances are meters.

use crate::route::Coordinate;

/// Earth radius in meters (WGS84 mean).
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Haversine distance between two coordinates in meters.
pub fn haversine(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Total length of a polyline in meters.
pub fn polyline_length(points: &[Coordinate]) -> f64 {
    points
        .windows(2)
        .map(|w| haversine(&w[0], &w[1]))
        .sum()
}

/// Initial bearing from `a` to `b` in degrees [0, 360).
pub fn bearing(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();

    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon)
    }

    #[test]
    fn haversine_same_point() {
        let p = pt(48.2082, 16.3738);
        assert!(haversine(&p, &p).abs() < 0.01);
    }

    #[test]
    fn haversine_known_distance() {
        // Vienna to Bratislava ~55 km
        let vienna = pt(48.2082, 16.3738);
        let bratislava = pt(48.1486, 17.1077);
        let dist = haversine(&vienna, &bratislava);
        assert!(dist > 50_000.0 && dist < 60_000.0, "Expected ~55 km, got {dist:.0} m");
    }

    #[test]
    fn polyline_length_sums_segments() {
        let line = vec![pt(0.0, 0.0), pt(0.0, 1.0), pt(0.0, 2.0)];
        let len = polyline_length(&line);
        assert!(len > 200_000.0 && len < 230_000.0, "Expected ~222 km, got {len:.0} m");
        assert_eq!(polyline_length(&line[..1]), 0.0);
    }

    #[test]
    fn bearing_cardinal_directions() {
        assert!((bearing(&pt(0.0, 0.0), &pt(0.0, 1.0)) - 90.0).abs() < 0.1);
        assert!(bearing(&pt(0.0, 0.0), &pt(1.0, 0.0)).abs() < 0.1);
        assert!((bearing(&pt(1.0, 0.0), &pt(0.0, 0.0)) - 180.0).abs() < 0.1);
    }
}
