//! Polygon annotation storage for a single loaded image.
//!
//! The store holds the completed polygons in creation order, the single
//! polygon currently being drawn and the selection. Every mutation returns
//! `true` when it changed something; rejected mutations are silent no-ops.

use weldmark_canvas::Color;

use super::annotation::{AnnotationId, MIN_POLYGON_VERTICES, Point, PolygonAnnotation};

#[derive(Debug, Clone)]
pub struct PolygonStore {
    /// Completed polygons, bottom-most first.
    polygons: Vec<PolygonAnnotation>,
    /// The polygon being drawn, if any.
    in_progress: Option<PolygonAnnotation>,
    /// Currently selected polygon.
    selected: Option<AnnotationId>,
    /// Next id to hand out. Never reset, so ids stay unique across `reset`.
    next_id: AnnotationId,
    /// Number of polygons ever completed since the last reset; drives colors.
    completed_count: usize,
    palette: Vec<Color>,
    /// Set when annotations or selection change.
    dirty: bool,
}

impl PolygonStore {
    pub fn new(palette: Vec<Color>) -> Self {
        let palette = if palette.is_empty() {
            vec![Color::rgb(255, 107, 107)]
        } else {
            palette
        };
        Self {
            polygons: Vec::new(),
            in_progress: None,
            selected: None,
            next_id: 1,
            completed_count: 0,
            palette,
            dirty: true,
        }
    }

    /// Check if the store has been modified since last clear_dirty().
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[inline]
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    #[inline]
    fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Drop everything except the id counter.
    pub fn reset(&mut self) {
        self.polygons.clear();
        self.in_progress = None;
        self.selected = None;
        self.completed_count = 0;
        self.mark_dirty();
    }

    pub fn palette(&self) -> &[Color] {
        &self.palette
    }

    /// Color the next completed polygon will receive. Polygons being drawn
    /// preview it and take the current value on completion.
    pub fn next_color(&self) -> Color {
        self.palette[self.completed_count % self.palette.len()]
    }

    fn allocate_id(&mut self) -> AnnotationId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Completed polygons in creation order.
    pub fn polygons(&self) -> &[PolygonAnnotation] {
        &self.polygons
    }

    pub fn in_progress(&self) -> Option<&PolygonAnnotation> {
        self.in_progress.as_ref()
    }

    pub fn get(&self, id: AnnotationId) -> Option<&PolygonAnnotation> {
        self.polygons.iter().find(|p| p.id == id)
    }

    fn get_mut(&mut self, id: AnnotationId) -> Option<&mut PolygonAnnotation> {
        self.polygons.iter_mut().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    pub fn selected(&self) -> Option<AnnotationId> {
        self.selected
    }

    pub fn selected_polygon(&self) -> Option<&PolygonAnnotation> {
        self.selected.and_then(|id| self.get(id))
    }

    /// Select a completed polygon, or clear the selection with `None`.
    /// Unknown ids clear the selection.
    pub fn select(&mut self, id: Option<AnnotationId>) -> bool {
        let id = id.filter(|id| self.get(*id).is_some());
        if self.selected == id {
            return false;
        }
        self.selected = id;
        self.mark_dirty();
        true
    }

    // ========================================================================
    // Drawing
    // ========================================================================

    /// Begin a new polygon. Ignored if one is already in progress.
    pub fn start_polygon(&mut self, first: Point) -> bool {
        if self.in_progress.is_some() {
            log::debug!("start_polygon ignored: a polygon is already in progress");
            return false;
        }
        let id = self.allocate_id();
        self.in_progress = Some(PolygonAnnotation {
            id,
            points: vec![first],
            label: String::new(),
            color: self.next_color(),
            is_complete: false,
        });
        self.mark_dirty();
        true
    }

    /// Add a vertex to the polygon being drawn.
    pub fn append_point(&mut self, point: Point) -> bool {
        let Some(current) = self.in_progress.as_mut() else {
            return false;
        };
        current.points.push(point);
        self.mark_dirty();
        true
    }

    /// Whether the in-progress polygon has enough vertices to complete.
    pub fn can_complete(&self) -> bool {
        self.in_progress
            .as_ref()
            .is_some_and(|p| p.points.len() >= MIN_POLYGON_VERTICES)
    }

    /// Finish the in-progress polygon. A blank label becomes `"Polygon N"`.
    pub fn complete_polygon(&mut self, label: &str) -> Option<AnnotationId> {
        if !self.can_complete() {
            log::debug!("complete_polygon ignored: fewer than {MIN_POLYGON_VERTICES} points");
            return None;
        }
        let mut polygon = self.in_progress.take()?;
        polygon.label = self.label_or_default(label);
        polygon.color = self.next_color();
        polygon.is_complete = true;
        let id = polygon.id;
        self.polygons.push(polygon);
        self.completed_count += 1;
        self.mark_dirty();
        Some(id)
    }

    /// Discard the in-progress polygon.
    pub fn cancel_polygon(&mut self) -> bool {
        if self.in_progress.take().is_some() {
            self.mark_dirty();
            true
        } else {
            false
        }
    }

    /// Add an already complete polygon (e.g. from inference results).
    pub fn add_completed(&mut self, points: Vec<Point>, label: &str) -> Option<AnnotationId> {
        if points.len() < MIN_POLYGON_VERTICES {
            return None;
        }
        let id = self.allocate_id();
        let polygon = PolygonAnnotation {
            id,
            points,
            label: self.label_or_default(label),
            color: self.next_color(),
            is_complete: true,
        };
        self.polygons.push(polygon);
        self.completed_count += 1;
        self.mark_dirty();
        Some(id)
    }

    fn label_or_default(&self, label: &str) -> String {
        let label = label.trim();
        if label.is_empty() {
            format!("Polygon {}", self.polygons.len() + 1)
        } else {
            label.to_string()
        }
    }

    // ========================================================================
    // Editing
    // ========================================================================

    /// Remove a completed polygon.
    pub fn delete_polygon(&mut self, id: AnnotationId) -> Option<PolygonAnnotation> {
        let index = self.polygons.iter().position(|p| p.id == id)?;
        let removed = self.polygons.remove(index);
        if self.selected == Some(id) {
            self.selected = None;
        }
        self.mark_dirty();
        Some(removed)
    }

    /// Insert the midpoint of edge `edge_index` right after vertex `edge_index`.
    pub fn insert_vertex(&mut self, id: AnnotationId, edge_index: usize) -> bool {
        let Some(polygon) = self.get_mut(id) else {
            return false;
        };
        let Some((a, b)) = polygon.edge(edge_index) else {
            return false;
        };
        polygon.points.insert(edge_index + 1, a.midpoint(&b));
        self.mark_dirty();
        true
    }

    /// Remove a vertex, keeping at least three.
    pub fn remove_vertex(&mut self, id: AnnotationId, vertex_index: usize) -> bool {
        let Some(polygon) = self.get_mut(id) else {
            return false;
        };
        if polygon.points.len() <= MIN_POLYGON_VERTICES || vertex_index >= polygon.points.len() {
            log::debug!(
                "remove_vertex ignored on {}: index {} of {} points",
                id,
                vertex_index,
                polygon.points.len()
            );
            return false;
        }
        polygon.points.remove(vertex_index);
        self.mark_dirty();
        true
    }

    /// Overwrite a vertex position.
    pub fn move_vertex(&mut self, id: AnnotationId, vertex_index: usize, point: Point) -> bool {
        let Some(vertex) = self
            .get_mut(id)
            .and_then(|p| p.points.get_mut(vertex_index))
        else {
            return false;
        };
        if *vertex == point {
            return false;
        }
        *vertex = point;
        self.mark_dirty();
        true
    }

    /// Replace a label; blank labels are ignored.
    pub fn relabel(&mut self, id: AnnotationId, label: &str) -> bool {
        let label = label.trim();
        if label.is_empty() {
            return false;
        }
        let Some(polygon) = self.get_mut(id) else {
            return false;
        };
        if polygon.label == label {
            return false;
        }
        polygon.label = label.to_string();
        self.mark_dirty();
        true
    }
}

impl Default for PolygonStore {
    fn default() -> Self {
        let palette = crate::constants::DEFAULT_PALETTE
            .iter()
            .filter_map(|hex| Color::from_hex(hex))
            .collect();
        Self::new(palette)
    }
}
