//! Hit-testing for polygons, vertices and edge add-buttons.
//!
//! Containment is tested in image space. Vertex and add-button picking is
//! done in canvas space so the pick radius stays the same at every zoom.

use crate::model::{MIN_POLYGON_VERTICES, Point, PolygonAnnotation};
use crate::viewport::Viewport;

/// Even-odd ray casting.
///
/// An edge participates when it straddles the horizontal line through the
/// point (half-open in y), and counts when the point lies strictly left of
/// the crossing. Points on the left/top edges of an axis-aligned rectangle are
/// therefore inside, points on the right/bottom edges outside.
pub fn point_in_polygon(point: Point, vertices: &[Point]) -> bool {
    if vertices.len() < MIN_POLYGON_VERTICES {
        return false;
    }
    let (x, y) = (point.x, point.y);
    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let (xi, yi) = (vertices[i].x, vertices[i].y);
        let (xj, yj) = (vertices[j].x, vertices[j].y);
        if ((yi > y) != (yj > y)) && (x < (xj - xi) * (y - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Index of the first vertex within `radius` (strictly) of `canvas_point`.
pub fn pick_vertex(
    polygon: &PolygonAnnotation,
    canvas_point: Point,
    viewport: &Viewport,
    radius: f32,
) -> Option<usize> {
    polygon
        .points
        .iter()
        .position(|p| viewport.image_to_canvas(*p).distance_to(&canvas_point) < radius)
}

/// Edge index of the first add-button within `radius` (inclusive) of `canvas_point`.
pub fn pick_add_button(
    polygon: &PolygonAnnotation,
    canvas_point: Point,
    viewport: &Viewport,
    radius: f32,
) -> Option<usize> {
    polygon
        .edge_midpoints()
        .find(|(_, mid)| viewport.image_to_canvas(*mid).distance_to(&canvas_point) <= radius)
        .map(|(edge, _)| edge)
}

/// Topmost (last drawn) complete polygon containing `image_point`.
pub fn topmost_polygon_at(
    polygons: &[PolygonAnnotation],
    image_point: Point,
) -> Option<&PolygonAnnotation> {
    polygons
        .iter()
        .rev()
        .filter(|p| p.is_complete)
        .find(|p| point_in_polygon(image_point, &p.points))
}

#[cfg(test)]
mod tests {
    use super::*;
    use weldmark_canvas::Color;

    fn polygon(id: u64, points: &[(f32, f32)]) -> PolygonAnnotation {
        PolygonAnnotation {
            id,
            points: points.iter().copied().map(Point::from).collect(),
            label: format!("p{id}"),
            color: Color::WHITE,
            is_complete: true,
        }
    }

    fn unit_square() -> Vec<Point> {
        [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]
            .into_iter()
            .map(Point::from)
            .collect()
    }

    #[test]
    fn test_unit_square_interior_and_exterior() {
        let square = unit_square();
        assert!(point_in_polygon(Point::new(0.5, 0.5), &square));
        assert!(!point_in_polygon(Point::new(1.5, 0.5), &square));
        assert!(!point_in_polygon(Point::new(-0.5, 0.5), &square));
        assert!(!point_in_polygon(Point::new(0.5, -0.5), &square));
    }

    #[test]
    fn test_unit_square_edge_rule() {
        let square = unit_square();
        // Left and top edges are inside
        assert!(point_in_polygon(Point::new(0.0, 0.5), &square));
        assert!(point_in_polygon(Point::new(0.5, 0.0), &square));
        // Right and bottom edges are outside
        assert!(!point_in_polygon(Point::new(1.0, 0.5), &square));
        assert!(!point_in_polygon(Point::new(0.5, 1.0), &square));
    }

    #[test]
    fn test_degenerate_polygon_contains_nothing() {
        let line = vec![Point::new(0.0, 0.0), Point::new(10.0, 10.0)];
        assert!(!point_in_polygon(Point::new(5.0, 5.0), &line));
        assert!(!point_in_polygon(Point::new(0.0, 0.0), &[]));
    }

    #[test]
    fn test_concave_polygon() {
        // U shape opening upward
        let u: Vec<Point> = [
            (0.0, 0.0),
            (3.0, 0.0),
            (3.0, 3.0),
            (2.0, 3.0),
            (2.0, 1.0),
            (1.0, 1.0),
            (1.0, 3.0),
            (0.0, 3.0),
        ]
        .into_iter()
        .map(Point::from)
        .collect();
        assert!(point_in_polygon(Point::new(0.5, 2.0), &u));
        assert!(!point_in_polygon(Point::new(1.5, 2.0), &u));
        assert!(point_in_polygon(Point::new(1.5, 0.5), &u));
    }

    #[test]
    fn test_pick_vertex_strict_radius() {
        let poly = polygon(1, &[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]);
        let viewport = Viewport::identity();
        assert_eq!(pick_vertex(&poly, Point::new(13.0, 0.0), &viewport, 8.0), Some(1));
        // Exactly on the radius does not count
        assert_eq!(pick_vertex(&poly, Point::new(18.0, 0.0), &viewport, 8.0), None);
    }

    #[test]
    fn test_pick_vertex_is_zoom_independent() {
        let poly = polygon(1, &[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]);
        let viewport = Viewport::new(4.0, 100.0, 100.0);
        // Vertex (10, 10) sits at canvas (140, 140)
        assert_eq!(pick_vertex(&poly, Point::new(145.0, 140.0), &viewport, 8.0), Some(2));
        // 2 image pixels away is 8 canvas pixels at 4x
        assert_eq!(pick_vertex(&poly, Point::new(148.0, 140.0), &viewport, 8.0), None);
    }

    #[test]
    fn test_pick_vertex_first_match_wins() {
        let poly = polygon(1, &[(0.0, 0.0), (2.0, 0.0), (2.0, 2.0)]);
        let viewport = Viewport::identity();
        assert_eq!(pick_vertex(&poly, Point::new(1.0, 0.0), &viewport, 8.0), Some(0));
    }

    #[test]
    fn test_pick_add_button_inclusive_radius() {
        let poly = polygon(1, &[(0.0, 0.0), (100.0, 0.0), (100.0, 100.0)]);
        let viewport = Viewport::identity();
        // Midpoint of edge 0 is (50, 0)
        assert_eq!(pick_add_button(&poly, Point::new(58.0, 0.0), &viewport, 8.0), Some(0));
        assert_eq!(pick_add_button(&poly, Point::new(58.5, 0.0), &viewport, 8.0), None);
        // Closing edge midpoint is (50, 50)
        assert_eq!(pick_add_button(&poly, Point::new(50.0, 52.0), &viewport, 8.0), Some(2));
    }

    #[test]
    fn test_topmost_polygon_prefers_last() {
        let polygons = vec![
            polygon(1, &[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]),
            polygon(2, &[(5.0, 5.0), (15.0, 5.0), (15.0, 15.0), (5.0, 15.0)]),
        ];
        assert_eq!(topmost_polygon_at(&polygons, Point::new(7.0, 7.0)).map(|p| p.id), Some(2));
        assert_eq!(topmost_polygon_at(&polygons, Point::new(2.0, 2.0)).map(|p| p.id), Some(1));
        assert!(topmost_polygon_at(&polygons, Point::new(20.0, 20.0)).is_none());
    }
}
