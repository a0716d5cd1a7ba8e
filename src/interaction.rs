//! Pointer and keyboard handling for the annotation tools.
//!
//! Events arrive in screen coordinates together with the canvas's on-screen
//! rectangle. The state machine turns them into viewport and store mutations
//! and reports what the host needs to do next through [`Response`].

use serde::{Deserialize, Serialize};

use crate::geometry::{pick_add_button, pick_vertex, topmost_polygon_at};
use crate::model::{AnnotationId, Point, PolygonStore, Tool};
use crate::viewport::{ScreenRect, Viewport, ZoomLimits};

/// Pointer buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Other,
}

/// Keyboard keys the engine reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Escape,
    Delete,
    Backspace,
    Enter,
}

/// Input events forwarded by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerDown {
        button: PointerButton,
        x: f32,
        y: f32,
    },
    PointerUp {
        button: PointerButton,
        x: f32,
        y: f32,
    },
    PointerMove {
        x: f32,
        y: f32,
    },
    /// A press and release on the canvas, delivered after `PointerUp`.
    Click {
        button: PointerButton,
        x: f32,
        y: f32,
    },
    PointerLeave,
    /// Negative delta zooms in.
    Wheel {
        delta: f32,
        x: f32,
        y: f32,
    },
    KeyPressed {
        key: Key,
    },
}

/// Hotkeys for tool selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBindings {
    pub tool_pan: char,
    pub tool_draw: char,
    pub tool_edit: char,
}

impl KeyBindings {
    /// Tool bound to a character, case-insensitively.
    pub fn tool_for(&self, c: char) -> Option<Tool> {
        let c = c.to_ascii_lowercase();
        if c == self.tool_pan.to_ascii_lowercase() {
            Some(Tool::Pan)
        } else if c == self.tool_draw.to_ascii_lowercase() {
            Some(Tool::DrawPolygon)
        } else if c == self.tool_edit.to_ascii_lowercase() {
            Some(Tool::EditPolygon)
        } else {
            None
        }
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            tool_pan: 'h',
            tool_draw: 'p',
            tool_edit: 'e',
        }
    }
}

/// Ongoing pointer gesture.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DragState {
    #[default]
    None,
    /// `offset = pointer - pan` at gesture start, in canvas space.
    Panning { offset_x: f32, offset_y: f32 },
    DraggingVertex {
        polygon: AnnotationId,
        vertex: usize,
    },
}

impl DragState {
    pub fn is_active(&self) -> bool {
        !matches!(self, DragState::None)
    }
}

/// What an event changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Response {
    /// The frame must be redrawn.
    pub redraw: bool,
    /// The completed annotation list changed; listeners must be notified.
    pub annotations_changed: bool,
}

impl Response {
    pub const NONE: Response = Response {
        redraw: false,
        annotations_changed: false,
    };

    pub fn redraw() -> Self {
        Self {
            redraw: true,
            annotations_changed: false,
        }
    }

    pub fn changed() -> Self {
        Self {
            redraw: true,
            annotations_changed: true,
        }
    }

    pub fn redraw_if(flag: bool) -> Self {
        if flag { Self::redraw() } else { Self::NONE }
    }

    pub fn changed_if(flag: bool) -> Self {
        if flag { Self::changed() } else { Self::NONE }
    }

    pub fn merge(self, other: Response) -> Response {
        Response {
            redraw: self.redraw || other.redraw,
            annotations_changed: self.annotations_changed || other.annotations_changed,
        }
    }
}

/// Everything an event may read or mutate.
pub struct InteractionContext<'a> {
    pub store: &'a mut PolygonStore,
    pub viewport: &'a mut Viewport,
    pub tool: &'a mut Tool,
    pub bounds: ScreenRect,
    /// When false, annotations are read-only; pan, zoom and selection still work.
    pub edit_mode: bool,
    pub hit_radius: f32,
    pub limits: ZoomLimits,
    pub keybindings: KeyBindings,
}

/// Gesture and hover state.
#[derive(Debug, Clone, Default)]
pub struct Interaction {
    drag: DragState,
    hovered_edge: Option<usize>,
    /// Set by a pointer-down that started a gesture; swallows the following click.
    suppress_click: bool,
}

impl Interaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drag(&self) -> DragState {
        self.drag
    }

    pub fn hovered_edge(&self) -> Option<usize> {
        self.hovered_edge
    }

    /// Vertex being dragged, if any.
    pub fn dragged_vertex(&self) -> Option<(AnnotationId, usize)> {
        match self.drag {
            DragState::DraggingVertex { polygon, vertex } => Some((polygon, vertex)),
            _ => None,
        }
    }

    /// Drop every gesture and hover state.
    pub fn reset(&mut self) -> bool {
        let was_active = self.drag.is_active() || self.hovered_edge.is_some();
        self.drag = DragState::None;
        self.hovered_edge = None;
        self.suppress_click = false;
        was_active
    }

    pub fn handle(&mut self, event: InputEvent, ctx: &mut InteractionContext<'_>) -> Response {
        log::trace!("Input event: {:?}", event);
        match event {
            InputEvent::PointerDown { button, x, y } => self.pointer_down(button, x, y, ctx),
            InputEvent::PointerUp { button, .. } => self.pointer_up(button),
            InputEvent::PointerMove { x, y } => self.pointer_move(x, y, ctx),
            InputEvent::Click { button, x, y } => self.click(button, x, y, ctx),
            InputEvent::PointerLeave => Response::redraw_if(self.reset()),
            InputEvent::Wheel { delta, x, y } => Self::wheel(delta, x, y, ctx),
            InputEvent::KeyPressed { key } => self.key(key, ctx),
        }
    }

    fn pointer_down(
        &mut self,
        button: PointerButton,
        x: f32,
        y: f32,
        ctx: &mut InteractionContext<'_>,
    ) -> Response {
        self.suppress_click = false;
        if button != PointerButton::Primary {
            return Response::NONE;
        }
        let canvas = Viewport::screen_to_canvas(x, y, &ctx.bounds);

        match *ctx.tool {
            Tool::Pan => {
                self.drag = DragState::Panning {
                    offset_x: canvas.x - ctx.viewport.pan_x,
                    offset_y: canvas.y - ctx.viewport.pan_y,
                };
                self.suppress_click = true;
                Response::NONE
            }
            Tool::EditPolygon if ctx.edit_mode => {
                let Some(selected) = ctx.store.selected_polygon() else {
                    return Response::NONE;
                };
                match pick_vertex(selected, canvas, ctx.viewport, ctx.hit_radius) {
                    Some(vertex) => {
                        log::debug!("Start dragging vertex {} of polygon {}", vertex, selected.id);
                        self.drag = DragState::DraggingVertex {
                            polygon: selected.id,
                            vertex,
                        };
                        self.hovered_edge = None;
                        self.suppress_click = true;
                        Response::redraw()
                    }
                    None => Response::NONE,
                }
            }
            _ => Response::NONE,
        }
    }

    fn pointer_up(&mut self, button: PointerButton) -> Response {
        if button != PointerButton::Primary {
            return Response::NONE;
        }
        let was_dragging_vertex = matches!(self.drag, DragState::DraggingVertex { .. });
        self.drag = DragState::None;
        Response::redraw_if(was_dragging_vertex)
    }

    fn pointer_move(&mut self, x: f32, y: f32, ctx: &mut InteractionContext<'_>) -> Response {
        let canvas = Viewport::screen_to_canvas(x, y, &ctx.bounds);
        match self.drag {
            DragState::Panning { offset_x, offset_y } => {
                *ctx.viewport = ctx
                    .viewport
                    .with_pan(canvas.x - offset_x, canvas.y - offset_y);
                Response::redraw()
            }
            DragState::DraggingVertex { polygon, vertex } => {
                let image = ctx.viewport.canvas_to_image(canvas);
                Response::changed_if(ctx.store.move_vertex(polygon, vertex, image))
            }
            DragState::None => {
                let hovered = match (*ctx.tool, ctx.store.selected_polygon()) {
                    (Tool::EditPolygon, Some(selected)) if ctx.edit_mode => {
                        pick_add_button(selected, canvas, ctx.viewport, ctx.hit_radius)
                    }
                    _ => None,
                };
                let changed = hovered != self.hovered_edge;
                self.hovered_edge = hovered;
                Response::redraw_if(changed)
            }
        }
    }

    fn click(
        &mut self,
        button: PointerButton,
        x: f32,
        y: f32,
        ctx: &mut InteractionContext<'_>,
    ) -> Response {
        if std::mem::take(&mut self.suppress_click) || self.drag.is_active() {
            log::trace!("Click swallowed by gesture");
            return Response::NONE;
        }
        let canvas = Viewport::screen_to_canvas(x, y, &ctx.bounds);
        let image = ctx.viewport.canvas_to_image(canvas);

        match (button, *ctx.tool) {
            (PointerButton::Primary, Tool::DrawPolygon) => {
                if !ctx.edit_mode {
                    return Response::NONE;
                }
                let changed = if ctx.store.in_progress().is_some() {
                    ctx.store.append_point(image)
                } else {
                    ctx.store.start_polygon(image)
                };
                Response::redraw_if(changed)
            }
            (PointerButton::Primary, Tool::EditPolygon) => {
                let add_button = ctx
                    .store
                    .selected_polygon()
                    .filter(|_| ctx.edit_mode)
                    .and_then(|selected| {
                        pick_add_button(selected, canvas, ctx.viewport, ctx.hit_radius)
                            .map(|edge| (selected.id, edge))
                    });
                if let Some((id, edge)) = add_button {
                    log::debug!("Insert vertex on edge {} of polygon {}", edge, id);
                    self.hovered_edge = None;
                    return Response::changed_if(ctx.store.insert_vertex(id, edge));
                }
                let hit = topmost_polygon_at(ctx.store.polygons(), image).map(|p| p.id);
                if ctx.store.select(hit) {
                    log::debug!("Selection changed to {:?}", hit);
                    self.hovered_edge = None;
                    Response::redraw()
                } else {
                    Response::NONE
                }
            }
            (PointerButton::Secondary, Tool::EditPolygon) if ctx.edit_mode => {
                let Some(selected) = ctx.store.selected_polygon() else {
                    return Response::NONE;
                };
                let id = selected.id;
                match pick_vertex(selected, canvas, ctx.viewport, ctx.hit_radius) {
                    Some(vertex) => {
                        self.hovered_edge = None;
                        Response::changed_if(ctx.store.remove_vertex(id, vertex))
                    }
                    None => Response::NONE,
                }
            }
            _ => Response::NONE,
        }
    }

    fn wheel(delta: f32, x: f32, y: f32, ctx: &mut InteractionContext<'_>) -> Response {
        if delta == 0.0 || !delta.is_finite() {
            return Response::NONE;
        }
        let anchor = Viewport::screen_to_canvas(x, y, &ctx.bounds);
        let zoomed = if delta < 0.0 {
            ctx.viewport.zoom_in(anchor, &ctx.limits)
        } else {
            ctx.viewport.zoom_out(anchor, &ctx.limits)
        };
        let changed = zoomed != *ctx.viewport;
        *ctx.viewport = zoomed;
        Response::redraw_if(changed)
    }

    fn key(&mut self, key: Key, ctx: &mut InteractionContext<'_>) -> Response {
        match key {
            Key::Escape => {
                let cancelled = ctx.store.cancel_polygon();
                let ended = self.reset();
                Response::redraw_if(cancelled || ended)
            }
            Key::Delete | Key::Backspace => {
                if !ctx.edit_mode || self.drag.is_active() {
                    return Response::NONE;
                }
                match ctx.store.selected() {
                    Some(id) => {
                        self.hovered_edge = None;
                        Response::changed_if(ctx.store.delete_polygon(id).is_some())
                    }
                    None => Response::NONE,
                }
            }
            Key::Char(c) => match ctx.keybindings.tool_for(c) {
                Some(tool) if tool != *ctx.tool => {
                    log::debug!("Tool changed to {}", tool.name());
                    *ctx.tool = tool;
                    self.reset();
                    Response::redraw()
                }
                _ => Response::NONE,
            },
            Key::Enter => Response::NONE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        store: PolygonStore,
        viewport: Viewport,
        tool: Tool,
        edit_mode: bool,
        interaction: Interaction,
    }

    impl Fixture {
        fn new(tool: Tool) -> Self {
            Self {
                store: PolygonStore::default(),
                viewport: Viewport::identity(),
                tool,
                edit_mode: true,
                interaction: Interaction::new(),
            }
        }

        fn send(&mut self, event: InputEvent) -> Response {
            let mut ctx = InteractionContext {
                store: &mut self.store,
                viewport: &mut self.viewport,
                tool: &mut self.tool,
                bounds: ScreenRect::new(0.0, 0.0, 800.0, 600.0),
                edit_mode: self.edit_mode,
                hit_radius: 8.0,
                limits: ZoomLimits::default(),
                keybindings: KeyBindings::default(),
            };
            self.interaction.handle(event, &mut ctx)
        }

        fn click(&mut self, x: f32, y: f32) -> Response {
            self.send(InputEvent::PointerDown {
                button: PointerButton::Primary,
                x,
                y,
            });
            self.send(InputEvent::PointerUp {
                button: PointerButton::Primary,
                x,
                y,
            });
            self.send(InputEvent::Click {
                button: PointerButton::Primary,
                x,
                y,
            })
        }

        fn square(&mut self) -> AnnotationId {
            self.store
                .add_completed(
                    vec![
                        Point::new(100.0, 100.0),
                        Point::new(200.0, 100.0),
                        Point::new(200.0, 200.0),
                        Point::new(100.0, 200.0),
                    ],
                    "crack",
                )
                .unwrap()
        }
    }

    #[test]
    fn test_draw_tool_clicks_build_polygon() {
        let mut f = Fixture::new(Tool::DrawPolygon);
        assert!(f.click(10.0, 10.0).redraw);
        f.click(50.0, 10.0);
        f.click(50.0, 50.0);
        let poly = f.store.in_progress().unwrap();
        assert_eq!(poly.points.len(), 3);
        assert_eq!(poly.points[1], Point::new(50.0, 10.0));
        assert!(f.store.complete_polygon("crack").is_some());
    }

    #[test]
    fn test_draw_tool_uses_viewport() {
        let mut f = Fixture::new(Tool::DrawPolygon);
        f.viewport = Viewport::new(2.0, 20.0, 40.0);
        f.click(60.0, 80.0);
        assert_eq!(f.store.in_progress().unwrap().points[0], Point::new(20.0, 20.0));
    }

    #[test]
    fn test_read_only_blocks_drawing() {
        let mut f = Fixture::new(Tool::DrawPolygon);
        f.edit_mode = false;
        f.click(10.0, 10.0);
        assert!(f.store.in_progress().is_none());
    }

    #[test]
    fn test_pan_gesture() {
        let mut f = Fixture::new(Tool::Pan);
        f.viewport = Viewport::new(1.0, 10.0, 10.0);
        f.send(InputEvent::PointerDown {
            button: PointerButton::Primary,
            x: 100.0,
            y: 100.0,
        });
        assert!(matches!(f.interaction.drag(), DragState::Panning { .. }));
        let r = f.send(InputEvent::PointerMove { x: 130.0, y: 80.0 });
        assert!(r.redraw);
        assert_eq!((f.viewport.pan_x, f.viewport.pan_y), (40.0, -10.0));
        f.send(InputEvent::PointerUp {
            button: PointerButton::Primary,
            x: 130.0,
            y: 80.0,
        });
        assert_eq!(f.interaction.drag(), DragState::None);
        // Moving after release does nothing
        f.send(InputEvent::PointerMove { x: 300.0, y: 300.0 });
        assert_eq!((f.viewport.pan_x, f.viewport.pan_y), (40.0, -10.0));
    }

    #[test]
    fn test_pointer_leave_ends_pan() {
        let mut f = Fixture::new(Tool::Pan);
        f.send(InputEvent::PointerDown {
            button: PointerButton::Primary,
            x: 0.0,
            y: 0.0,
        });
        f.send(InputEvent::PointerLeave);
        assert_eq!(f.interaction.drag(), DragState::None);
    }

    #[test]
    fn test_pointer_leave_ends_vertex_drag() {
        let mut f = Fixture::new(Tool::EditPolygon);
        let id = f.square();
        f.store.select(Some(id));
        f.send(InputEvent::PointerDown {
            button: PointerButton::Primary,
            x: 200.0,
            y: 200.0,
        });
        f.send(InputEvent::PointerMove { x: 220.0, y: 230.0 });
        assert_eq!(f.store.get(id).unwrap().points[2], Point::new(220.0, 230.0));

        assert!(f.send(InputEvent::PointerLeave).redraw);
        assert_eq!(f.interaction.dragged_vertex(), None);

        // Movement after leaving must not drag the vertex further
        let r = f.send(InputEvent::PointerMove { x: 300.0, y: 300.0 });
        assert!(!r.annotations_changed);
        assert_eq!(f.store.get(id).unwrap().points[2], Point::new(220.0, 230.0));
    }

    #[test]
    fn test_edit_click_selects_and_clears() {
        let mut f = Fixture::new(Tool::EditPolygon);
        let id = f.square();
        f.click(150.0, 150.0);
        assert_eq!(f.store.selected(), Some(id));
        f.click(500.0, 500.0);
        assert_eq!(f.store.selected(), None);
    }

    #[test]
    fn test_read_only_still_selects() {
        let mut f = Fixture::new(Tool::EditPolygon);
        let id = f.square();
        f.edit_mode = false;
        f.click(150.0, 150.0);
        assert_eq!(f.store.selected(), Some(id));
        // Add-button click does not insert
        f.click(150.0, 100.0);
        assert_eq!(f.store.get(id).unwrap().points.len(), 4);
    }

    #[test]
    fn test_add_button_inserts_vertex() {
        let mut f = Fixture::new(Tool::EditPolygon);
        let id = f.square();
        f.store.select(Some(id));
        let r = f.click(152.0, 102.0);
        assert!(r.annotations_changed);
        let points = &f.store.get(id).unwrap().points;
        assert_eq!(points.len(), 5);
        assert_eq!(points[1], Point::new(150.0, 100.0));
        assert_eq!(f.store.selected(), Some(id));
    }

    #[test]
    fn test_hover_sets_edge() {
        let mut f = Fixture::new(Tool::EditPolygon);
        let id = f.square();
        f.store.select(Some(id));
        assert!(f.send(InputEvent::PointerMove { x: 200.0, y: 151.0 }).redraw);
        assert_eq!(f.interaction.hovered_edge(), Some(1));
        f.send(InputEvent::PointerMove { x: 400.0, y: 400.0 });
        assert_eq!(f.interaction.hovered_edge(), None);
    }

    #[test]
    fn test_vertex_drag_and_click_suppression() {
        let mut f = Fixture::new(Tool::EditPolygon);
        let id = f.square();
        f.store.select(Some(id));
        f.send(InputEvent::PointerDown {
            button: PointerButton::Primary,
            x: 102.0,
            y: 101.0,
        });
        assert_eq!(f.interaction.dragged_vertex(), Some((id, 0)));
        let r = f.send(InputEvent::PointerMove { x: 60.0, y: 70.0 });
        assert!(r.annotations_changed);
        assert_eq!(f.store.get(id).unwrap().points[0], Point::new(60.0, 70.0));
        f.send(InputEvent::PointerUp {
            button: PointerButton::Primary,
            x: 60.0,
            y: 70.0,
        });
        // The click ending the drag must not clear the selection
        f.send(InputEvent::Click {
            button: PointerButton::Primary,
            x: 60.0,
            y: 70.0,
        });
        assert_eq!(f.store.selected(), Some(id));
        assert_eq!(f.interaction.drag(), DragState::None);
    }

    #[test]
    fn test_vertex_takes_priority_over_add_button() {
        let mut f = Fixture::new(Tool::EditPolygon);
        // Tiny triangle: vertex 0 and the midpoint of edge 0 are both within range
        let id = f
            .store
            .add_completed(
                vec![
                    Point::new(10.0, 10.0),
                    Point::new(16.0, 10.0),
                    Point::new(16.0, 60.0),
                ],
                "x",
            )
            .unwrap();
        f.store.select(Some(id));
        f.click(12.0, 10.0);
        assert_eq!(f.store.get(id).unwrap().points.len(), 3);
    }

    #[test]
    fn test_secondary_click_removes_vertex() {
        let mut f = Fixture::new(Tool::EditPolygon);
        let id = f.square();
        f.store.select(Some(id));
        let r = f.send(InputEvent::Click {
            button: PointerButton::Secondary,
            x: 200.0,
            y: 200.0,
        });
        assert!(r.annotations_changed);
        assert_eq!(f.store.get(id).unwrap().points.len(), 3);
        // Floor of three
        f.send(InputEvent::Click {
            button: PointerButton::Secondary,
            x: 100.0,
            y: 100.0,
        });
        assert_eq!(f.store.get(id).unwrap().points.len(), 3);
    }

    #[test]
    fn test_wheel_zooms_about_pointer() {
        let mut f = Fixture::new(Tool::Pan);
        let before = f.viewport.canvas_to_image(Point::new(300.0, 200.0));
        assert!(f.send(InputEvent::Wheel { delta: -1.0, x: 300.0, y: 200.0 }).redraw);
        assert!(f.viewport.zoom > 1.0);
        let after = f.viewport.canvas_to_image(Point::new(300.0, 200.0));
        assert!((before.x - after.x).abs() < 0.001);
        assert!((before.y - after.y).abs() < 0.001);
    }

    #[test]
    fn test_escape_cancels_drawing() {
        let mut f = Fixture::new(Tool::DrawPolygon);
        f.click(10.0, 10.0);
        assert!(f.send(InputEvent::KeyPressed { key: Key::Escape }).redraw);
        assert!(f.store.in_progress().is_none());
    }

    #[test]
    fn test_delete_key_removes_selected() {
        let mut f = Fixture::new(Tool::EditPolygon);
        let id = f.square();
        f.store.select(Some(id));
        let r = f.send(InputEvent::KeyPressed { key: Key::Delete });
        assert!(r.annotations_changed);
        assert!(f.store.get(id).is_none());
    }

    #[test]
    fn test_tool_hotkeys() {
        let mut f = Fixture::new(Tool::Pan);
        f.send(InputEvent::KeyPressed { key: Key::Char('P') });
        assert_eq!(f.tool, Tool::DrawPolygon);
        f.send(InputEvent::KeyPressed { key: Key::Char('e') });
        assert_eq!(f.tool, Tool::EditPolygon);
        assert_eq!(f.send(InputEvent::KeyPressed { key: Key::Char('z') }), Response::NONE);
    }

    #[test]
    fn test_response_merge() {
        let r = Response::redraw().merge(Response::changed_if(true));
        assert_eq!(r, Response::changed());
        assert_eq!(Response::NONE.merge(Response::NONE), Response::NONE);
    }
}
