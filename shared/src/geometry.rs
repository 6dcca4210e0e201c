//! Polygon helpers used by the territory engine.
//!
//! Every function is total: degenerate input (fewer than three vertices)
//! yields a defined default instead of an error.

use crate::{Coord, AREA_SCALE};
use std::cmp::Ordering;

/// Euclidean distance between two points.
pub fn distance(a: Coord, b: Coord) -> f64 {
    let dx = b[0] - a[0];
    let dy = b[1] - a[1];
    (dx * dx + dy * dy).sqrt()
}

/// Axis-aligned square of four vertices around `center`, counter-clockwise.
pub fn seed_polygon(center: Coord, half_size: f64) -> Vec<Coord> {
    let [x, y] = center;
    vec![
        [x - half_size, y - half_size],
        [x + half_size, y - half_size],
        [x + half_size, y + half_size],
        [x - half_size, y + half_size],
    ]
}

/// Ray-casting parity test. Points exactly on an edge may land on either side.
pub fn point_in_polygon(point: Coord, polygon: &[Coord]) -> bool {
    if polygon.len() < 3 {
        return false;
    }

    let [x, y] = point;
    let mut inside = false;
    let mut j = polygon.len() - 1;

    for i in 0..polygon.len() {
        let [xi, yi] = polygon[i];
        let [xj, yj] = polygon[j];

        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }

    inside
}

/// Unscaled shoelace area.
pub fn shoelace_area(polygon: &[Coord]) -> f64 {
    if polygon.len() < 3 {
        return 0.0;
    }

    let twice_area: f64 = polygon
        .iter()
        .zip(polygon.iter().cycle().skip(1))
        .map(|(a, b)| a[0] * b[1] - b[0] * a[1])
        .sum();

    twice_area.abs() / 2.0
}

/// Area in score units.
pub fn polygon_area(polygon: &[Coord]) -> f64 {
    shoelace_area(polygon) * AREA_SCALE
}

/// z-component of (b - a) x (c - a). Positive for a left turn.
fn cross(a: Coord, b: Coord, c: Coord) -> f64 {
    (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])
}

fn squared_distance(a: Coord, b: Coord) -> f64 {
    let dx = b[0] - a[0];
    let dy = b[1] - a[1];
    dx * dx + dy * dy
}

/// Angle of `point` around `pivot`. The pivot is the lowest point, so a zero
/// rise is folded to +0.0 to keep atan2 from returning -PI for -0.0.
fn polar_angle(pivot: Coord, point: Coord) -> f64 {
    let dy = point[1] - pivot[1];
    let dy = if dy == 0.0 { 0.0 } else { dy };
    dy.atan2(point[0] - pivot[0])
}

/// Convex hull of `points` by Graham scan.
///
/// Sets of three or fewer points are returned untouched. The hull only ever
/// contains input points, in counter-clockwise order starting at the lowest one.
/// Fully collinear input collapses to its two extremes.
pub fn merge_polygon(points: &[Coord]) -> Vec<Coord> {
    if points.len() <= 3 {
        return points.to_vec();
    }

    let Some(pivot) = points
        .iter()
        .copied()
        .min_by(|a, b| a[1].total_cmp(&b[1]).then(a[0].total_cmp(&b[0])))
    else {
        return points.to_vec();
    };

    let mut rest: Vec<Coord> = points.iter().copied().filter(|p| *p != pivot).collect();
    rest.sort_by(|a, b| {
        match polar_angle(pivot, *a).total_cmp(&polar_angle(pivot, *b)) {
            Ordering::Equal => {
                squared_distance(pivot, *a).total_cmp(&squared_distance(pivot, *b))
            }
            other => other,
        }
    });

    let mut hull: Vec<Coord> = Vec::with_capacity(rest.len() + 1);
    hull.push(pivot);

    for point in rest {
        while hull.len() > 1 && cross(hull[hull.len() - 2], hull[hull.len() - 1], point) <= 0.0 {
            hull.pop();
        }
        hull.push(point);
    }

    hull
}

/// Cheap overlap check: some vertex of one polygon lies inside the other.
pub fn polygons_overlap(a: &[Coord], b: &[Coord]) -> bool {
    a.iter().any(|p| point_in_polygon(*p, b)) || b.iter().any(|p| point_in_polygon(*p, a))
}

/// Vertices of `polygon` that are not inside `clip`.
pub fn points_outside(polygon: &[Coord], clip: &[Coord]) -> Vec<Coord> {
    polygon
        .iter()
        .copied()
        .filter(|p| !point_in_polygon(*p, clip))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn unit_square() -> Vec<Coord> {
        vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]
    }

    /// Winding number against an axis-aligned rectangle, for cross-checking.
    fn inside_rect(point: Coord, min: Coord, max: Coord) -> bool {
        point[0] > min[0] && point[0] < max[0] && point[1] > min[1] && point[1] < max[1]
    }

    /// Every point lies on or to the left of every hull edge.
    fn hull_contains(hull: &[Coord], point: Coord) -> bool {
        (0..hull.len()).all(|i| {
            let a = hull[i];
            let b = hull[(i + 1) % hull.len()];
            cross(a, b, point) >= -1e-12
        })
    }

    #[test]
    fn test_distance() {
        assert_approx_eq!(distance([0.0, 0.0], [3.0, 4.0]), 5.0, 1e-12);
        assert_eq!(distance([1.0, 1.0], [1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_seed_polygon_surrounds_center() {
        let seed = seed_polygon([2.0, 3.0], 0.5);
        assert_eq!(seed.len(), 4);
        assert!(point_in_polygon([2.0, 3.0], &seed));
        assert_approx_eq!(shoelace_area(&seed), 1.0, 1e-12);
    }

    #[test]
    fn test_point_in_polygon_basic() {
        let square = unit_square();
        assert!(point_in_polygon([0.5, 0.5], &square));
        assert!(!point_in_polygon([1.5, 0.5], &square));
        assert!(!point_in_polygon([-0.1, 0.5], &square));
        assert!(!point_in_polygon([0.5, 2.0], &square));
    }

    #[test]
    fn test_point_in_polygon_degenerate() {
        assert!(!point_in_polygon([0.0, 0.0], &[]));
        assert!(!point_in_polygon([0.5, 0.0], &[[0.0, 0.0], [1.0, 0.0]]));
    }

    #[test]
    fn test_point_in_polygon_matches_rectangle_check() {
        let min = [-2.0, -1.0];
        let max = [3.0, 4.0];
        let rect = vec![min, [max[0], min[1]], max, [min[0], max[1]]];

        // Sample off-boundary points on a grid that straddles the rectangle.
        for i in 0..40 {
            for j in 0..40 {
                let point = [-4.05 + i as f64 * 0.2, -3.05 + j as f64 * 0.2];
                let first = point_in_polygon(point, &rect);
                assert_eq!(first, point_in_polygon(point, &rect));
                assert_eq!(first, inside_rect(point, min, max), "at {:?}", point);
            }
        }
    }

    #[test]
    fn test_area_unit_square_and_scaling() {
        let d = 0.25;
        let square = vec![[0.0, 0.0], [d, 0.0], [d, d], [0.0, d]];
        assert_approx_eq!(shoelace_area(&square), d * d, 1e-12);
        assert_approx_eq!(polygon_area(&square), d * d * AREA_SCALE, 1e-6);
    }

    #[test]
    fn test_area_orientation_independent() {
        let mut square = unit_square();
        let ccw = shoelace_area(&square);
        square.reverse();
        assert_eq!(ccw, shoelace_area(&square));
        assert!(ccw >= 0.0);
    }

    #[test]
    fn test_area_degenerate_is_zero() {
        assert_eq!(polygon_area(&[]), 0.0);
        assert_eq!(polygon_area(&[[0.0, 0.0], [1.0, 1.0]]), 0.0);
    }

    #[test]
    fn test_merge_small_input_unchanged() {
        let triangle = vec![[0.0, 0.0], [5.0, 1.0], [2.0, 3.0]];
        assert_eq!(merge_polygon(&triangle), triangle);
        assert!(merge_polygon(&[]).is_empty());
    }

    #[test]
    fn test_merge_drops_interior_points() {
        let mut points = unit_square();
        points.push([0.5, 0.5]);
        points.push([0.2, 0.7]);

        let hull = merge_polygon(&points);
        assert_eq!(hull.len(), 4);
        for corner in unit_square() {
            assert!(hull.contains(&corner));
        }
        assert_eq!(hull[0], [0.0, 0.0]);
    }

    #[test]
    fn test_merge_collinear_edge_points() {
        let points = vec![
            [0.0, 0.0],
            [1.0, 0.0],
            [2.0, 0.0],
            [2.0, 2.0],
            [0.0, 2.0],
            [0.0, 1.0],
        ];
        let hull = merge_polygon(&points);
        assert_eq!(hull.len(), 4);
        assert_approx_eq!(shoelace_area(&hull), 4.0, 1e-12);
    }

    #[test]
    fn test_merge_hull_is_subset_and_contains_input() {
        // Deterministic pseudo-random cloud.
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state % 10_000) as f64 / 1_000.0
        };
        let points: Vec<Coord> = (0..200).map(|_| [next(), next()]).collect();

        let hull = merge_polygon(&points);
        assert!(hull.len() >= 3);
        for vertex in &hull {
            assert!(points.contains(vertex));
        }
        for point in &points {
            assert!(hull_contains(&hull, *point), "{:?} outside hull", point);
        }
    }

    #[test]
    fn test_merge_trail_loop_grows_territory() {
        let territory = unit_square();
        let trail = vec![[1.5, 0.5], [2.0, 1.0], [1.5, 1.5], [0.5, 1.5]];
        let points: Vec<Coord> = territory.iter().chain(trail.iter()).copied().collect();

        let merged = merge_polygon(&points);
        assert!(shoelace_area(&merged) > shoelace_area(&territory));
        assert!(point_in_polygon([1.4, 0.9], &merged));
    }

    #[test]
    fn test_polygons_overlap() {
        let a = unit_square();
        let b = seed_polygon([1.0, 1.0], 0.5);
        let c = seed_polygon([5.0, 5.0], 0.5);
        assert!(polygons_overlap(&a, &b));
        assert!(polygons_overlap(&b, &a));
        assert!(!polygons_overlap(&a, &c));
        assert!(!polygons_overlap(&a, &[]));
    }

    #[test]
    fn test_polygons_overlap_containment() {
        let outer = seed_polygon([0.0, 0.0], 10.0);
        let inner = seed_polygon([0.0, 0.0], 1.0);
        assert!(polygons_overlap(&outer, &inner));
    }

    #[test]
    fn test_points_outside() {
        let victim = seed_polygon([1.0, 1.0], 0.5);
        let clip = unit_square();
        let keep = points_outside(&victim, &clip);
        assert_eq!(keep.len(), 3);
        assert!(!keep.contains(&[0.5, 0.5]));
    }
}
