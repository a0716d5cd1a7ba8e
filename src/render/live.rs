//! The interactive frame.

use web_time::Instant;
use weldmark_canvas::{
    CanvasTransform, Color, DrawCommand, ImageHandle, LabelFont, StrokeStyle, Surface, TextAlign,
};

use super::{LabelStyle, polygon_body, polygon_label};
use crate::constants::overlay;
use crate::model::{AnnotationId, PolygonAnnotation, PolygonStore, Tool};
use crate::viewport::Viewport;

const ADD_BUTTON: Color = Color::rgb(0x00, 0xaa, 0x00);
const ADD_BUTTON_HOVERED: Color = Color::rgb(0x00, 0xdd, 0x00);

/// Everything a live frame depends on.
pub struct FrameInput<'a> {
    pub image: Option<&'a ImageHandle>,
    pub viewport: &'a Viewport,
    pub store: &'a PolygonStore,
    pub tool: Tool,
    pub edit_mode: bool,
    pub dragged_vertex: Option<(AnnotationId, usize)>,
    pub hovered_edge: Option<usize>,
    pub label_style: &'a LabelStyle,
    pub font: &'a LabelFont,
}

/// Build the display list for one frame.
pub fn build_frame(input: &FrameInput<'_>) -> Vec<DrawCommand> {
    let transform = input.viewport.canvas_transform();
    let zoom = input.viewport.zoom;
    let mut commands = vec![DrawCommand::Clear {
        color: Color::TRANSPARENT,
    }];

    if let Some(handle) = input.image {
        commands.push(DrawCommand::Image {
            handle: handle.clone(),
            transform,
        });
    }

    let selected = input.store.selected();
    for polygon in input.store.polygons() {
        if polygon.points.is_empty() {
            continue;
        }
        commands.push(polygon_body(polygon, zoom, transform));

        if selected == Some(polygon.id) {
            let dragged = input
                .dragged_vertex
                .filter(|(id, _)| *id == polygon.id)
                .map(|(_, vertex)| vertex);
            let editing = input.tool == Tool::EditPolygon;
            push_vertex_markers(&mut commands, polygon, zoom, transform, dragged, editing);

            if editing && input.edit_mode && input.dragged_vertex.is_none() {
                push_add_buttons(&mut commands, polygon, zoom, transform, input.hovered_edge);
            }
        }

        if let Some(label) = polygon_label(polygon, input.font, input.label_style, zoom, transform)
        {
            commands.extend(label);
        }
    }

    if let Some(current) = input.store.in_progress() {
        push_in_progress(&mut commands, current, zoom, transform);
    }

    commands
}

fn push_vertex_markers(
    commands: &mut Vec<DrawCommand>,
    polygon: &PolygonAnnotation,
    zoom: f32,
    transform: CanvasTransform,
    dragged: Option<usize>,
    numbered: bool,
) {
    let radius = overlay::VERTEX_RADIUS / zoom;
    for (index, point) in polygon.points.iter().enumerate() {
        let (fill, stroke) = if dragged == Some(index) {
            (
                Color::WHITE,
                StrokeStyle::new(polygon.color, overlay::DRAGGED_VERTEX_RING / zoom),
            )
        } else {
            (polygon.color, StrokeStyle::new(Color::WHITE, 1.0 / zoom))
        };
        commands.push(DrawCommand::Circle {
            center: (point.x, point.y),
            radius,
            fill: Some(fill),
            stroke: Some(stroke),
            transform,
        });

        if numbered {
            commands.push(DrawCommand::Text {
                text: (index + 1).to_string(),
                position: (point.x, point.y + 2.0 / zoom),
                size: overlay::VERTEX_NUMBER_SIZE / zoom,
                color: Color::WHITE,
                align: TextAlign::Center,
                transform,
            });
        }
    }
}

fn push_add_buttons(
    commands: &mut Vec<DrawCommand>,
    polygon: &PolygonAnnotation,
    zoom: f32,
    transform: CanvasTransform,
    hovered_edge: Option<usize>,
) {
    let radius = overlay::ADD_BUTTON_RADIUS / zoom;
    let arm = overlay::ADD_BUTTON_PLUS / zoom;
    let plus = StrokeStyle::new(Color::WHITE, 2.0 / zoom);

    for (edge, mid) in polygon.edge_midpoints() {
        let (fill, ring) = if hovered_edge == Some(edge) {
            (ADD_BUTTON_HOVERED, 3.0 / zoom)
        } else {
            (ADD_BUTTON, 2.0 / zoom)
        };
        commands.push(DrawCommand::Circle {
            center: (mid.x, mid.y),
            radius,
            fill: Some(fill),
            stroke: Some(StrokeStyle::new(Color::WHITE, ring)),
            transform,
        });
        commands.push(DrawCommand::Line {
            from: (mid.x - arm, mid.y),
            to: (mid.x + arm, mid.y),
            stroke: plus,
            transform,
        });
        commands.push(DrawCommand::Line {
            from: (mid.x, mid.y - arm),
            to: (mid.x, mid.y + arm),
            stroke: plus,
            transform,
        });
    }
}

fn push_in_progress(
    commands: &mut Vec<DrawCommand>,
    polygon: &PolygonAnnotation,
    zoom: f32,
    transform: CanvasTransform,
) {
    if polygon.points.is_empty() {
        return;
    }
    commands.push(DrawCommand::Path {
        points: polygon.points.iter().map(|p| (p.x, p.y)).collect(),
        closed: false,
        fill: None,
        stroke: Some(StrokeStyle::new(polygon.color, overlay::STROKE_WIDTH / zoom)),
        transform,
    });
    let radius = overlay::VERTEX_RADIUS / zoom;
    for point in &polygon.points {
        commands.push(DrawCommand::Circle {
            center: (point.x, point.y),
            radius,
            fill: Some(polygon.color),
            stroke: Some(StrokeStyle::new(Color::WHITE, 1.0 / zoom)),
            transform,
        });
    }
}

/// Owns the live drawing surface.
#[derive(Debug)]
pub struct LiveRenderer {
    surface: Surface,
}

impl LiveRenderer {
    pub fn new(surface: Surface) -> Self {
        Self { surface }
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut Surface {
        &mut self.surface
    }

    /// Redraw the whole frame.
    pub fn render(&mut self, input: &FrameInput<'_>) {
        let start = Instant::now();
        let commands = build_frame(input);
        self.surface.execute(&commands, input.font);
        log::trace!(
            "Rendered {} commands in {:.2}ms",
            commands.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Point;

    fn store_with_square() -> (PolygonStore, AnnotationId) {
        let mut store = PolygonStore::default();
        let id = store
            .add_completed(
                vec![
                    Point::new(10.0, 30.0),
                    Point::new(50.0, 30.0),
                    Point::new(50.0, 70.0),
                    Point::new(10.0, 70.0),
                ],
                "crack",
            )
            .unwrap();
        (store, id)
    }

    fn frame(store: &PolygonStore, tool: Tool, dragged: Option<(AnnotationId, usize)>) -> Vec<DrawCommand> {
        let viewport = Viewport::new(2.0, 5.0, 5.0);
        let style = LabelStyle::default();
        let font = LabelFont::bundled().unwrap();
        build_frame(&FrameInput {
            image: None,
            viewport: &viewport,
            store,
            tool,
            edit_mode: true,
            dragged_vertex: dragged,
            hovered_edge: None,
            label_style: &style,
            font: &font,
        })
    }

    fn count(commands: &[DrawCommand], f: impl Fn(&DrawCommand) -> bool) -> usize {
        commands.iter().filter(|c| f(c)).count()
    }

    #[test]
    fn test_unselected_polygon_draws_body_and_label() {
        let (store, _) = store_with_square();
        let commands = frame(&store, Tool::EditPolygon, None);
        assert!(matches!(commands[0], DrawCommand::Clear { .. }));
        assert_eq!(count(&commands, |c| matches!(c, DrawCommand::Path { closed: true, .. })), 1);
        assert_eq!(count(&commands, |c| matches!(c, DrawCommand::Circle { .. })), 0);
        assert_eq!(count(&commands, |c| matches!(c, DrawCommand::FillRect { .. })), 1);
    }

    #[test]
    fn test_selected_in_edit_mode_draws_handles() {
        let (mut store, id) = store_with_square();
        store.select(Some(id));
        let commands = frame(&store, Tool::EditPolygon, None);
        // 4 vertex markers + 4 add-buttons
        assert_eq!(count(&commands, |c| matches!(c, DrawCommand::Circle { .. })), 8);
        // 4 vertex numbers + the label
        assert_eq!(count(&commands, |c| matches!(c, DrawCommand::Text { .. })), 5);
        // Plus signs
        assert_eq!(count(&commands, |c| matches!(c, DrawCommand::Line { .. })), 8);
    }

    #[test]
    fn test_dragging_hides_add_buttons() {
        let (mut store, id) = store_with_square();
        store.select(Some(id));
        let commands = frame(&store, Tool::EditPolygon, Some((id, 2)));
        assert_eq!(count(&commands, |c| matches!(c, DrawCommand::Circle { .. })), 4);
        let white_markers = count(&commands, |c| {
            matches!(c, DrawCommand::Circle { fill: Some(Color::WHITE), .. })
        });
        assert_eq!(white_markers, 1);
    }

    #[test]
    fn test_selected_with_pan_tool_has_no_numbers() {
        let (mut store, id) = store_with_square();
        store.select(Some(id));
        let commands = frame(&store, Tool::Pan, None);
        assert_eq!(count(&commands, |c| matches!(c, DrawCommand::Circle { .. })), 4);
        assert_eq!(count(&commands, |c| matches!(c, DrawCommand::Text { .. })), 1);
    }

    #[test]
    fn test_in_progress_is_open_polyline() {
        let mut store = PolygonStore::default();
        store.start_polygon(Point::new(0.0, 0.0));
        store.append_point(Point::new(10.0, 0.0));
        let commands = frame(&store, Tool::DrawPolygon, None);
        assert_eq!(
            count(&commands, |c| matches!(c, DrawCommand::Path { closed: false, fill: None, .. })),
            1
        );
        assert_eq!(count(&commands, |c| matches!(c, DrawCommand::Circle { .. })), 2);
    }

    #[test]
    fn test_render_draws_on_surface() {
        let (store, _) = store_with_square();
        let viewport = Viewport::identity();
        let style = LabelStyle::default();
        let font = LabelFont::bundled().unwrap();
        let mut renderer = LiveRenderer::new(Surface::new(100.0, 100.0, 1.0).unwrap());
        renderer.render(&FrameInput {
            image: None,
            viewport: &viewport,
            store: &store,
            tool: Tool::Pan,
            edit_mode: true,
            dragged_vertex: None,
            hovered_edge: None,
            label_style: &style,
            font: &font,
        });
        // Inside the square the fill is translucent
        let inside = renderer.surface().pixel(30, 50).unwrap();
        assert!(inside.a > 0 && inside.a < 255);
        // Far outside nothing is drawn
        assert_eq!(renderer.surface().pixel(90, 95).unwrap().a, 0);
    }
}
