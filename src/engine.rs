//! The annotation engine: one loaded image, its polygons and the live view.
//!
//! The host forwards input events and explicit actions; every state change
//! is followed by a full redraw of the owned surface and, when the polygon
//! list changed, a call to the registered listener.

use std::fmt::Write as _;

use image::DynamicImage;
use web_time::Instant;
use weldmark_canvas::{ImageHandle, LabelFont, Surface};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::ingest::{self, Segment};
use crate::interaction::{InputEvent, Interaction, InteractionContext, Response};
use crate::model::{AnnotationId, PolygonAnnotation, PolygonStore, Tool};
use crate::render::LabelStyle;
use crate::render::export::render_annotated_png;
use crate::render::live::{FrameInput, LiveRenderer};
use crate::render::report::RegionReport;
use crate::resize::{CanvasSize, ResizeController};
use crate::viewport::{ScreenRect, Viewport, parse_zoom_percent};

/// Callback receiving the ordered list of completed polygons.
pub type AnnotationListener = Box<dyn FnMut(&[PolygonAnnotation])>;

/// Identifies one image load request. Only the most recent ticket is honored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadTicket(u64);

/// The decoded image currently shown.
#[derive(Debug, Clone)]
struct LoadedImage {
    handle: ImageHandle,
    width: u32,
    height: u32,
}

/// A label being edited from the polygon list.
#[derive(Debug, Clone, PartialEq)]
struct LabelEdit {
    id: AnnotationId,
    value: String,
}

pub struct AnnotationEngine {
    config: EngineConfig,
    store: PolygonStore,
    viewport: Viewport,
    tool: Tool,
    edit_mode: bool,
    interaction: Interaction,
    bounds: ScreenRect,
    image: Option<LoadedImage>,
    load_generation: u64,
    renderer: LiveRenderer,
    resize: ResizeController,
    font: LabelFont,
    label_style: LabelStyle,
    label_edit: Option<LabelEdit>,
    listener: Option<AnnotationListener>,
}

impl std::fmt::Debug for AnnotationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnnotationEngine")
            .field("polygons", &self.store.len())
            .field("viewport", &self.viewport)
            .field("tool", &self.tool)
            .field("edit_mode", &self.edit_mode)
            .field("has_image", &self.image.is_some())
            .finish_non_exhaustive()
    }
}

impl AnnotationEngine {
    /// Create an engine with a surface for `size`. Labels use the first
    /// configured font override that parses, else the bundled font.
    pub fn new(config: EngineConfig, size: CanvasSize) -> Result<Self> {
        let font = LabelFont::load(&config.overlay.font_paths)?;
        Self::with_font(config, size, font)
    }

    /// Create an engine with an explicit label font.
    pub fn with_font(config: EngineConfig, size: CanvasSize, font: LabelFont) -> Result<Self> {
        let surface = Surface::new(size.width, size.height, size.device_pixel_ratio)?;
        let store = PolygonStore::new(config.effective_palette());
        let label_style = config.overlay.label_style();
        let resize = ResizeController::new(size, config.viewport.fit_margin());
        let bounds = ScreenRect::new(0.0, 0.0, size.width, size.height);

        Ok(Self {
            config,
            store,
            viewport: Viewport::identity(),
            tool: Tool::default(),
            edit_mode: true,
            interaction: Interaction::new(),
            bounds,
            image: None,
            load_generation: 0,
            renderer: LiveRenderer::new(surface),
            resize,
            font,
            label_style,
            label_edit: None,
            listener: None,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Defect vocabulary for the label picker.
    pub fn labels(&self) -> &[String] {
        &self.config.labels
    }

    // ========================================================================
    // Listener and lifecycle
    // ========================================================================

    /// Register the change listener, replacing any previous one.
    pub fn on_annotations_changed(&mut self, listener: AnnotationListener) {
        self.listener = Some(listener);
    }

    /// Drop the listener and end every gesture.
    pub fn teardown(&mut self) {
        self.listener = None;
        self.interaction.reset();
        self.label_edit = None;
        log::debug!("Engine torn down");
    }

    fn notify(&mut self) {
        if let Some(listener) = self.listener.as_mut() {
            listener(self.store.polygons());
        }
    }

    fn apply(&mut self, response: Response) -> Response {
        if response.redraw {
            self.render();
        }
        if response.annotations_changed {
            self.notify();
        }
        response
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Completed polygons in creation order.
    pub fn annotations(&self) -> &[PolygonAnnotation] {
        self.store.polygons()
    }

    pub fn in_progress(&self) -> Option<&PolygonAnnotation> {
        self.store.in_progress()
    }

    pub fn selected(&self) -> Option<AnnotationId> {
        self.store.selected()
    }

    pub fn hovered_edge(&self) -> Option<usize> {
        self.interaction.hovered_edge()
    }

    pub fn dragged_vertex(&self) -> Option<(AnnotationId, usize)> {
        self.interaction.dragged_vertex()
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn edit_mode(&self) -> bool {
        self.edit_mode
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    /// Natural size of the loaded image.
    pub fn image_size(&self) -> Option<(u32, u32)> {
        self.image.as_ref().map(|img| (img.width, img.height))
    }

    pub fn surface(&self) -> &Surface {
        self.renderer.surface()
    }

    pub fn canvas_size(&self) -> CanvasSize {
        self.resize.size()
    }

    /// Whether the completion control should be enabled.
    pub fn can_complete(&self, label: &str) -> bool {
        self.edit_mode && self.store.can_complete() && !label.trim().is_empty()
    }

    // ========================================================================
    // Tools and modes
    // ========================================================================

    pub fn set_tool(&mut self, tool: Tool) {
        if self.tool == tool {
            return;
        }
        log::debug!("Tool changed to {}", tool.name());
        self.tool = tool;
        self.interaction.reset();
        self.render();
    }

    /// Toggle read-only mode. Gestures in progress are ended.
    pub fn set_edit_mode(&mut self, edit_mode: bool) {
        if self.edit_mode == edit_mode {
            return;
        }
        self.edit_mode = edit_mode;
        self.interaction.reset();
        self.render();
    }

    /// On-screen rectangle of the canvas, used to map pointer events.
    pub fn set_screen_bounds(&mut self, bounds: ScreenRect) {
        self.bounds = bounds;
    }

    // ========================================================================
    // Viewport
    // ========================================================================

    /// Zoom rounded to an integer percentage, for numeric entry.
    pub fn zoom_percent(&self) -> u32 {
        self.viewport.zoom_percent()
    }

    fn canvas_center(&self) -> crate::model::Point {
        let (w, h) = self.resize.size().logical();
        crate::model::Point::new(w / 2.0, h / 2.0)
    }

    fn set_viewport(&mut self, viewport: Viewport) -> bool {
        if viewport == self.viewport {
            return false;
        }
        self.viewport = viewport;
        self.render();
        true
    }

    pub fn zoom_in(&mut self) -> bool {
        let limits = self.config.viewport.limits();
        let zoomed = self.viewport.zoom_in(self.canvas_center(), &limits);
        self.set_viewport(zoomed)
    }

    pub fn zoom_out(&mut self) -> bool {
        let limits = self.config.viewport.limits();
        let zoomed = self.viewport.zoom_out(self.canvas_center(), &limits);
        self.set_viewport(zoomed)
    }

    /// Apply a typed zoom percentage about the canvas center. Invalid input
    /// is ignored and returns `false`.
    pub fn set_zoom_percent(&mut self, text: &str) -> bool {
        let Some(zoom) = parse_zoom_percent(text) else {
            log::debug!("Ignoring zoom input {:?}", text);
            return false;
        };
        let limits = self.config.viewport.limits();
        let zoomed = self.viewport.zoom_about(self.canvas_center(), zoom, &limits);
        self.set_viewport(zoomed)
    }

    /// Fit the loaded image into the canvas.
    pub fn fit_to_view(&mut self) -> bool {
        let Some(size) = self.image_size() else {
            return false;
        };
        let fitted = self.resize.fit(&self.viewport, size);
        self.set_viewport(fitted)
    }

    /// Container resize. Re-allocates the surface and re-fits when an image
    /// is loaded.
    pub fn resize(&mut self, width: f32, height: f32, device_pixel_ratio: f32) -> Result<()> {
        let size = CanvasSize::new(width, height, device_pixel_ratio);
        if !self.resize.resize(size, self.renderer.surface_mut())? {
            return Ok(());
        }
        self.bounds.width = size.width;
        self.bounds.height = size.height;
        if !self.fit_to_view() {
            self.render();
        }
        Ok(())
    }

    // ========================================================================
    // Image loading
    // ========================================================================

    /// Start an image load. Results for older tickets are discarded.
    pub fn begin_image_load(&mut self) -> LoadTicket {
        self.load_generation += 1;
        log::debug!("Image load {} started", self.load_generation);
        LoadTicket(self.load_generation)
    }

    /// Complete an image load started with [`Self::begin_image_load`].
    ///
    /// Returns `Ok(false)` for a stale ticket. A decode error clears the
    /// image and the annotations.
    pub fn finish_image_load(
        &mut self,
        ticket: LoadTicket,
        result: std::result::Result<DynamicImage, image::ImageError>,
    ) -> Result<bool> {
        if ticket.0 != self.load_generation {
            log::debug!(
                "Discarding stale image load {} (current {})",
                ticket.0,
                self.load_generation
            );
            return Ok(false);
        }

        match result {
            Ok(image) => {
                self.install_image(image)?;
                Ok(true)
            }
            Err(e) => {
                log::warn!("Image load failed: {}", e);
                self.image = None;
                self.reset_annotations();
                self.render();
                self.notify();
                Err(e.into())
            }
        }
    }

    /// Load an already decoded image.
    pub fn load_image(&mut self, image: DynamicImage) -> Result<()> {
        let ticket = self.begin_image_load();
        self.finish_image_load(ticket, Ok(image)).map(|_| ())
    }

    /// Decode and load encoded image bytes (PNG, JPEG, ...).
    pub fn load_image_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let ticket = self.begin_image_load();
        let decoded = image::load_from_memory(bytes);
        self.finish_image_load(ticket, decoded).map(|_| ())
    }

    /// Read and load an image file.
    pub fn load_image_file(&mut self, path: &std::path::Path) -> Result<()> {
        let bytes = std::fs::read(path)?;
        self.load_image_bytes(&bytes)
    }

    fn install_image(&mut self, image: DynamicImage) -> Result<()> {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        let handle = ImageHandle::from_rgba8(rgba.into_raw(), width, height)?;

        self.image = Some(LoadedImage {
            handle,
            width,
            height,
        });
        self.reset_annotations();
        self.viewport = self.resize.fit(&self.viewport, (width, height));
        log::info!(
            "Loaded image {}x{}, zoom {}%",
            width,
            height,
            self.zoom_percent()
        );
        self.render();
        self.notify();
        Ok(())
    }

    fn reset_annotations(&mut self) {
        self.store.reset();
        self.interaction.reset();
        self.label_edit = None;
    }

    // ========================================================================
    // Input
    // ========================================================================

    /// Feed a pointer or keyboard event.
    pub fn handle_event(&mut self, event: InputEvent) -> Response {
        let mut ctx = InteractionContext {
            store: &mut self.store,
            viewport: &mut self.viewport,
            tool: &mut self.tool,
            bounds: self.bounds,
            edit_mode: self.edit_mode,
            hit_radius: self.config.overlay.hit_radius,
            limits: self.config.viewport.limits(),
            keybindings: self.config.keybindings,
        };
        let response = self.interaction.handle(event, &mut ctx);
        self.apply(response)
    }

    // ========================================================================
    // Explicit actions
    // ========================================================================

    /// Finish the polygon being drawn.
    pub fn complete_polygon(&mut self, label: &str) -> Option<AnnotationId> {
        if !self.edit_mode {
            return None;
        }
        let id = self.store.complete_polygon(label)?;
        log::debug!("Completed polygon {}", id);
        self.apply(Response::changed());
        Some(id)
    }

    pub fn cancel_polygon(&mut self) -> bool {
        let cancelled = self.store.cancel_polygon();
        self.apply(Response::redraw_if(cancelled));
        cancelled
    }

    pub fn delete_polygon(&mut self, id: AnnotationId) -> bool {
        if !self.edit_mode {
            return false;
        }
        let deleted = self.store.delete_polygon(id).is_some();
        if deleted {
            self.interaction.reset();
            if self.label_edit.as_ref().is_some_and(|e| e.id == id) {
                self.label_edit = None;
            }
        }
        self.apply(Response::changed_if(deleted));
        deleted
    }

    pub fn select(&mut self, id: Option<AnnotationId>) -> bool {
        let changed = self.store.select(id);
        if changed {
            self.interaction.reset();
        }
        self.apply(Response::redraw_if(changed));
        changed
    }

    /// List-click behavior: select, or clear if already selected.
    pub fn toggle_selection(&mut self, id: AnnotationId) -> bool {
        if self.store.selected() == Some(id) {
            self.select(None)
        } else {
            self.select(Some(id))
        }
    }

    pub fn relabel(&mut self, id: AnnotationId, label: &str) -> bool {
        if !self.edit_mode {
            return false;
        }
        let changed = self.store.relabel(id, label);
        self.apply(Response::changed_if(changed));
        changed
    }

    // ========================================================================
    // Label editing
    // ========================================================================

    /// Start editing the label of `id`, replacing any edit in progress.
    pub fn begin_label_edit(&mut self, id: AnnotationId) -> bool {
        if !self.edit_mode {
            return false;
        }
        let Some(polygon) = self.store.get(id) else {
            return false;
        };
        self.label_edit = Some(LabelEdit {
            id,
            value: polygon.label.clone(),
        });
        true
    }

    pub fn label_edit(&self) -> Option<(AnnotationId, &str)> {
        self.label_edit.as_ref().map(|e| (e.id, e.value.as_str()))
    }

    pub fn set_label_edit_value(&mut self, value: &str) {
        if let Some(edit) = self.label_edit.as_mut() {
            edit.value = value.to_string();
        }
    }

    /// Apply the edited label. Blank values leave the label unchanged.
    pub fn commit_label_edit(&mut self) -> bool {
        match self.label_edit.take() {
            Some(edit) => self.relabel(edit.id, &edit.value),
            None => false,
        }
    }

    pub fn cancel_label_edit(&mut self) {
        self.label_edit = None;
    }

    // ========================================================================
    // Ingestion
    // ========================================================================

    /// Add inference results as completed polygons. Returns how many were added.
    pub fn ingest_segments(&mut self, segments: &[Segment]) -> usize {
        let polygons = ingest::normalize(segments, &self.config.labels);
        let added = polygons
            .into_iter()
            .filter_map(|p| self.store.add_completed(p.points, &p.label))
            .count();
        log::info!("Ingested {} of {} segments", added, segments.len());
        self.apply(Response::changed_if(added > 0));
        added
    }

    /// Ingest a JSON or plain-text prediction payload.
    pub fn ingest_payload(&mut self, payload: &str) -> Result<usize> {
        let segments = ingest::parse_any(payload)?;
        Ok(self.ingest_segments(&segments))
    }

    // ========================================================================
    // Rendering and export
    // ========================================================================

    /// Redraw the live frame.
    pub fn render(&mut self) {
        let input = FrameInput {
            image: self.image.as_ref().map(|img| &img.handle),
            viewport: &self.viewport,
            store: &self.store,
            tool: self.tool,
            edit_mode: self.edit_mode,
            dragged_vertex: self.interaction.dragged_vertex(),
            hovered_edge: self.interaction.hovered_edge(),
            label_style: &self.label_style,
            font: &self.font,
        };
        self.renderer.render(&input);
    }

    /// PNG of the image with all completed polygons, at image resolution.
    /// `Ok(None)` when no image is loaded.
    pub fn export_annotated_png(&self) -> Result<Option<Vec<u8>>> {
        let Some(image) = self.image.as_ref() else {
            log::debug!("Export skipped: no image loaded");
            return Ok(None);
        };
        let png = render_annotated_png(
            &image.handle,
            self.store.polygons(),
            &self.font,
            &self.label_style,
            &self.config.export.style(),
        )?;
        Ok(Some(png))
    }

    /// Region report for the loaded image. `None` when no image is loaded.
    pub fn region_report(&self) -> Option<RegionReport> {
        let image = self.image.as_ref()?;
        Some(RegionReport::build(
            image.width,
            self.store.polygons(),
            &self.config.report,
        ))
    }

    /// Region report as a workbook. `Ok(None)` when no image is loaded.
    pub fn export_report_xlsx(&self) -> Result<Option<Vec<u8>>> {
        let Some(report) = self.region_report() else {
            log::debug!("Report skipped: no image loaded");
            return Ok(None);
        };
        let start = Instant::now();
        let bytes = report.to_xlsx()?;
        log::info!(
            "Report workbook written ({} bytes) in {:.2}ms",
            bytes.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(Some(bytes))
    }

    /// Human-readable listing of every polygon and its vertices.
    pub fn debug_dump(&self) -> String {
        let mut out = String::from("Current Polygon Selections:\n");
        for (index, polygon) in self.store.polygons().iter().enumerate() {
            let points: Vec<String> = polygon
                .points
                .iter()
                .map(|p| format!("({:.2}, {:.2})", p.x, p.y))
                .collect();
            let _ = write!(
                out,
                "\nPolygon {} ({}):\nPoints: {}\n",
                index + 1,
                polygon.label,
                points.join(", ")
            );
        }
        log::debug!("{}", out);
        out
    }
}
