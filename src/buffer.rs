//! Influence buffers around planar points.

use geo::{Coord, LineString, Point, Polygon};
use std::f64::consts::PI;

/// Vertex count of a buffer ring, 16 segments per quarter circle.
pub const DEFAULT_SEGMENTS: usize = 64;

/// Regular polygon approximating a disk of `radius_m` metres around `center`.
///
/// `center` must be in a metric CRS. Fewer than 3 segments are raised to 3.
pub fn disk(center: Point<f64>, radius_m: f64, segments: usize) -> Polygon<f64> {
    let segments = segments.max(3);
    let step = 2.0 * PI / segments as f64;

    let ring: Vec<Coord<f64>> = (0..segments)
        .map(|i| {
            let theta = step * i as f64;
            Coord {
                x: center.x() + radius_m * theta.cos(),
                y: center.y() + radius_m * theta.sin(),
            }
        })
        .collect();

    // Polygon::new closes the ring.
    Polygon::new(LineString::from(ring), vec![])
}
