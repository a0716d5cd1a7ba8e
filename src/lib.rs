//! Weldmark - polygon annotation engine for weld X-ray images
//!
//! Hosts one decoded image with a pan/zoom viewport, lets the inspector draw,
//! select and reshape labeled defect polygons, ingests inference results and
//! produces an annotated PNG and a per-region defect report.

pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod ingest;
pub mod interaction;
pub mod model;
pub mod render;
pub mod resize;
pub mod viewport;

pub use config::EngineConfig;
pub use engine::{AnnotationEngine, AnnotationListener, LoadTicket};
pub use error::{EngineError, Result};
pub use interaction::{InputEvent, Key, KeyBindings, PointerButton, Response};
pub use model::{AnnotationId, Point, PolygonAnnotation, PolygonStore, Tool};
pub use render::report::{RegionReport, ReportConfig, ReportError};
pub use resize::CanvasSize;
pub use viewport::{ScreenRect, Viewport};

pub use weldmark_canvas as canvas;
