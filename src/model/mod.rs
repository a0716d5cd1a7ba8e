//! Data models for the annotation engine.

mod annotation;
mod store;

pub use annotation::{AnnotationId, MIN_POLYGON_VERTICES, Point, PolygonAnnotation, Tool};
pub use store::PolygonStore;
