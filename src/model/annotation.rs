//! Annotation types and tool definitions.

use serde::{Deserialize, Serialize};
use weldmark_canvas::Color;

/// Unique identifier for an annotation.
pub type AnnotationId = u64;

/// Minimum number of vertices required for a valid polygon.
pub const MIN_POLYGON_VERTICES: usize = 3;

/// A 2D point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Arithmetic mean of two points.
    pub fn midpoint(&self, other: &Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self::new(x, y)
    }
}

impl From<Point> for (f32, f32) {
    fn from(p: Point) -> Self {
        (p.x, p.y)
    }
}

/// A labeled polygon marking a defect region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonAnnotation {
    /// Unique identifier, stable for the annotation's lifetime.
    pub id: AnnotationId,
    /// Vertices in order; edge `i` runs from `points[i]` to `points[(i + 1) % n]`.
    pub points: Vec<Point>,
    /// Defect type name.
    pub label: String,
    /// Display color.
    pub color: Color,
    /// `false` only while the polygon is being drawn.
    pub is_complete: bool,
}

impl PolygonAnnotation {
    /// Endpoints of edge `index`, wrapping at the end.
    pub fn edge(&self, index: usize) -> Option<(Point, Point)> {
        let n = self.points.len();
        if n < 2 || index >= n {
            return None;
        }
        Some((self.points[index], self.points[(index + 1) % n]))
    }

    /// Midpoint of every edge, in edge order.
    pub fn edge_midpoints(&self) -> impl Iterator<Item = (usize, Point)> + '_ {
        (0..self.points.len()).filter_map(move |i| self.edge(i).map(|(a, b)| (i, a.midpoint(&b))))
    }

    /// Smallest y among the vertices (the visually top-most one).
    pub fn top(&self) -> Option<f32> {
        self.points.iter().map(|p| p.y).reduce(f32::min)
    }

    /// Mean of the vertex positions.
    pub fn vertex_centroid(&self) -> Option<Point> {
        if self.points.is_empty() {
            return None;
        }
        let n = self.points.len() as f32;
        let (sx, sy) = self
            .points
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        Some(Point::new(sx / n, sy / n))
    }

    /// Axis-aligned bounds as `(min, max)`.
    pub fn bounds(&self) -> Option<(Point, Point)> {
        let first = *self.points.first()?;
        Some(self.points.iter().fold((first, first), |(min, max), p| {
            (
                Point::new(min.x.min(p.x), min.y.min(p.y)),
                Point::new(max.x.max(p.x), max.y.max(p.y)),
            )
        }))
    }
}

/// Annotation tools available to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Tool {
    /// Drag the view
    #[default]
    Pan,
    /// Click to add polygon vertices
    DrawPolygon,
    /// Select polygons and edit their vertices
    EditPolygon,
}

impl Tool {
    /// Get the display name for this tool.
    pub fn name(&self) -> &'static str {
        match self {
            Tool::Pan => "Pan",
            Tool::DrawPolygon => "Polygon",
            Tool::EditPolygon => "Edit",
        }
    }

    /// Get all available tools.
    pub fn all() -> &'static [Tool] {
        &[Tool::Pan, Tool::DrawPolygon, Tool::EditPolygon]
    }
}
