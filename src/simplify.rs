//! Polyline simplification for dense recorded tracks.
//!
//! Ramer-Douglas-Peucker, iterative over a stack of spans. Offsets are
//! measured on a local equirectangular plane.
//!
//! Every kept point becomes a maneuver point of the built route, so
//! [`crate::route_builder::BuildOptions`] defaults to 25 m rather than the
//! 50 m usually used for sparse waypoints; junction turns survive.

use crate::route::Coordinate;

const METERS_PER_DEGREE: f64 = 111_320.0;

/// Simplify `points`, always keeping both endpoints.
pub fn rdp_simplify(points: &[Coordinate], tolerance_m: f64) -> Vec<Coordinate> {
    if points.len() <= 2 {
        return points.to_vec();
    }

    let last = points.len() - 1;
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[last] = true;

    let mut spans = vec![(0, last)];
    while let Some((from, to)) = spans.pop() {
        let farthest = (from + 1..to)
            .map(|i| (i, offset_m(&points[i], &points[from], &points[to])))
            .max_by(|a, b| a.1.total_cmp(&b.1));
        if let Some((i, offset)) = farthest {
            if offset > tolerance_m {
                keep[i] = true;
                spans.push((from, i));
                spans.push((i, to));
            }
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(p, kept)| kept.then_some(*p))
        .collect()
}

/// Distance in meters from `p` to the line through `a` and `b`.
fn offset_m(p: &Coordinate, a: &Coordinate, b: &Coordinate) -> f64 {
    let lon_scale = ((a.lat + b.lat) / 2.0).to_radians().cos();
    let plane = |c: &Coordinate| {
        (
            c.lon * lon_scale * METERS_PER_DEGREE,
            c.lat * METERS_PER_DEGREE,
        )
    };
    let (ax, ay) = plane(a);
    let (bx, by) = plane(b);
    let (px, py) = plane(p);

    let (dx, dy) = (bx - ax, by - ay);
    let base = dx.hypot(dy);
    if base < 1e-5 {
        // degenerate span: distance to the shared endpoint
        return (px - ax).hypot(py - ay);
    }
    ((px - ax) * dy - (py - ay) * dx).abs() / base
}
