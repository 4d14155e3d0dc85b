//! GPX 1.1 input.
//!
//! Wraps the `gpx` crate and extracts planned routes and recorded tracks
//! as plain coordinate lists for [`crate::route_builder`].

use std::io::Read;

use crate::error::RouteError;
use crate::route::Coordinate;

/// A named coordinate list read from a `<rte>` or `<trk>` element.
#[derive(Debug, Clone, PartialEq)]
pub struct GpxPath {
    pub name: Option<String>,
    pub points: Vec<Coordinate>,
}

/// Paths extracted from a GPX document.
#[derive(Debug, Clone, Default)]
pub struct GpxPaths {
    /// Sparse planned routes.
    pub routes: Vec<GpxPath>,
    /// Dense recorded tracks, segments flattened.
    pub tracks: Vec<GpxPath>,
}

/// Parse a GPX document from any reader.
pub fn parse<R: Read>(reader: R) -> Result<GpxPaths, RouteError> {
    let gpx = gpx::read(reader).map_err(|e| RouteError::Gpx(e.to_string()))?;

    let routes = gpx
        .routes
        .iter()
        .map(|r| GpxPath {
            name: r.name.clone(),
            points: r.points.iter().map(to_coordinate).collect(),
        })
        .collect();

    let tracks = gpx
        .tracks
        .iter()
        .map(|t| GpxPath {
            name: t.name.clone(),
            points: t
                .segments
                .iter()
                .flat_map(|seg| seg.points.iter())
                .map(to_coordinate)
                .collect(),
        })
        .collect();

    Ok(GpxPaths { routes, tracks })
}

fn to_coordinate(wp: &gpx::Waypoint) -> Coordinate {
    Coordinate::new(wp.point().y(), wp.point().x())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub const MINIMAL_GPX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test"
     xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <name>Test Track</name>
    <trkseg>
      <trkpt lat="48.0" lon="16.0"></trkpt>
      <trkpt lat="48.1" lon="16.0"></trkpt>
    </trkseg>
    <trkseg>
      <trkpt lat="48.2" lon="16.0"></trkpt>
    </trkseg>
  </trk>
  <rte>
    <name>Test Route</name>
    <rtept lat="48.0" lon="16.0"></rtept>
    <rtept lat="48.1" lon="16.0"></rtept>
    <rtept lat="48.1" lon="16.2"></rtept>
  </rte>
</gpx>"#;

    #[test]
    fn parse_route_points() {
        let paths = parse(MINIMAL_GPX.as_bytes()).unwrap();

        assert_eq!(paths.routes.len(), 1);
        assert_eq!(paths.routes[0].name.as_deref(), Some("Test Route"));
        assert_eq!(paths.routes[0].points.len(), 3);
        let p = paths.routes[0].points[2];
        assert!((p.lat - 48.1).abs() < 1e-9);
        assert!((p.lon - 16.2).abs() < 1e-9);
    }

    #[test]
    fn parse_flattens_track_segments() {
        let paths = parse(MINIMAL_GPX.as_bytes()).unwrap();
        assert_eq!(paths.tracks[0].name.as_deref(), Some("Test Track"));
        assert_eq!(paths.tracks[0].points.len(), 3);
    }

    #[test]
    fn parse_invalid_xml_returns_error() {
        assert!(matches!(parse(&b"not xml at all"[..]), Err(RouteError::Gpx(_))));
    }
}
