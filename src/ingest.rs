//! Inference result ingestion.
//!
//! Segmentation results arrive either as JSON (a bare list of segments, or an
//! object with a `predictions` / `segments` list) or as the plain-text
//! prediction format, one segment per line: `<class> x1 y1 x2 y2 ...`.
//! Segments are normalized to polygons with a resolved label.

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::model::{MIN_POLYGON_VERTICES, Point};

/// Errors that can occur while decoding inference results.
#[derive(Error, Debug)]
pub enum IngestError {
    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload is valid JSON but not a segment list
    #[error("Unexpected payload: expected a list of segments, found {found}")]
    UnexpectedPayload { found: &'static str },
}

/// Geometry of an inference result.
///
/// Decoded untagged; variants are tried in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SegmentShape {
    /// Contour polygon. Points may be `{"x": .., "y": ..}` objects or `[x, y]` pairs.
    Polygon {
        #[serde(deserialize_with = "deserialize_points")]
        points: Vec<Point>,
    },
    /// Two opposite corners.
    Corners { x1: f32, y1: f32, x2: f32, y2: f32 },
    /// Two opposite corners, zero-based naming.
    ZeroCorners { x0: f32, y0: f32, x1: f32, y1: f32 },
    /// Top-left corner and size.
    Box {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
}

impl SegmentShape {
    /// Normalize to polygon vertices.
    ///
    /// Boxes become four corners clockwise from the top-left. Returns `None`
    /// for non-finite coordinates or polygons with fewer than three vertices.
    pub fn to_polygon(&self) -> Option<Vec<Point>> {
        let points = match *self {
            SegmentShape::Polygon { ref points } => points.clone(),
            SegmentShape::Corners { x1, y1, x2, y2 } => box_corners(x1, y1, x2, y2),
            SegmentShape::ZeroCorners { x0, y0, x1, y1 } => box_corners(x0, y0, x1, y1),
            SegmentShape::Box {
                x,
                y,
                width,
                height,
            } => box_corners(x, y, x + width, y + height),
        };
        if points.len() < MIN_POLYGON_VERTICES || !points.iter().all(Point::is_finite) {
            return None;
        }
        Some(points)
    }
}

fn box_corners(ax: f32, ay: f32, bx: f32, by: f32) -> Vec<Point> {
    let (left, right) = (ax.min(bx), ax.max(bx));
    let (top, bottom) = (ay.min(by), ay.max(by));
    vec![
        Point::new(left, top),
        Point::new(right, top),
        Point::new(right, bottom),
        Point::new(left, bottom),
    ]
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPoint {
    Object { x: f32, y: f32 },
    Pair([f32; 2]),
}

fn deserialize_points<'de, D>(deserializer: D) -> Result<Vec<Point>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<RawPoint>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|p| match p {
            RawPoint::Object { x, y } => Point::new(x, y),
            RawPoint::Pair([x, y]) => Point::new(x, y),
        })
        .collect())
}

/// A single inference result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    #[serde(flatten)]
    pub shape: SegmentShape,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, alias = "conf", skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    /// Class index into the label vocabulary.
    #[serde(default, alias = "class", skip_serializing_if = "Option::is_none")]
    pub cls: Option<f64>,
}

impl Segment {
    /// Class index if `cls` is a non-negative integer.
    pub fn class_index(&self) -> Option<usize> {
        let cls = self.cls?;
        (cls.is_finite() && cls >= 0.0 && cls.fract() == 0.0).then_some(cls as usize)
    }

    /// Explicit label, else the class name from `vocabulary`, else `"Defect N"`
    /// where `N` is the 1-based position of the segment in its batch.
    pub fn resolve_label(&self, vocabulary: &[String], ordinal: usize) -> String {
        if let Some(label) = self.label.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
            return label.to_string();
        }
        self.class_index()
            .and_then(|i| vocabulary.get(i))
            .cloned()
            .unwrap_or_else(|| format!("Defect {}", ordinal + 1))
    }
}

/// A normalized inference result ready to become a completed polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestedPolygon {
    pub points: Vec<Point>,
    pub label: String,
    pub confidence: Option<f32>,
}

/// Normalize segments, skipping unusable ones.
pub fn normalize(segments: &[Segment], vocabulary: &[String]) -> Vec<IngestedPolygon> {
    segments
        .iter()
        .enumerate()
        .filter_map(|(ordinal, segment)| {
            let Some(points) = segment.shape.to_polygon() else {
                log::warn!("Skipping segment {}: degenerate or non-finite geometry", ordinal + 1);
                return None;
            };
            Some(IngestedPolygon {
                points,
                label: segment.resolve_label(vocabulary, ordinal),
                confidence: segment.confidence,
            })
        })
        .collect()
}

/// Decode a JSON payload. Elements that do not decode as segments are
/// skipped with a warning.
pub fn parse_json(json: &str) -> Result<Vec<Segment>, IngestError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let items = match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut map) => {
            let list = map
                .remove("predictions")
                .or_else(|| map.remove("segments"))
                .ok_or(IngestError::UnexpectedPayload {
                    found: "object without predictions or segments",
                })?;
            match list {
                serde_json::Value::Array(items) => items,
                other => {
                    return Err(IngestError::UnexpectedPayload {
                        found: json_kind(&other),
                    });
                }
            }
        }
        other => {
            return Err(IngestError::UnexpectedPayload {
                found: json_kind(&other),
            });
        }
    };

    let total = items.len();
    let segments: Vec<Segment> = items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| match serde_json::from_value::<Segment>(item) {
            Ok(segment) => Some(segment),
            Err(e) => {
                log::warn!("Skipping malformed segment {}: {}", i + 1, e);
                None
            }
        })
        .collect();
    log::debug!("Decoded {} of {} segments", segments.len(), total);
    Ok(segments)
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Decode the plain-text prediction format. Malformed lines are skipped.
pub fn parse_text(text: &str) -> Vec<Segment> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(n, line)| {
            let segment = parse_text_line(line);
            if segment.is_none() {
                log::warn!("Skipping malformed prediction line {}: {:?}", n + 1, line);
            }
            segment
        })
        .collect()
}

fn parse_text_line(line: &str) -> Option<Segment> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let (class, coords) = parts.split_first()?;
    let cls: f64 = class.parse().ok()?;
    if coords.len() % 2 != 0 || coords.len() < MIN_POLYGON_VERTICES * 2 {
        return None;
    }
    let values: Vec<f32> = coords
        .iter()
        .map(|c| c.parse::<f32>().ok())
        .collect::<Option<_>>()?;
    let points = values
        .chunks_exact(2)
        .map(|pair| Point::new(pair[0], pair[1]))
        .collect();
    Some(Segment {
        shape: SegmentShape::Polygon { points },
        label: None,
        confidence: None,
        cls: Some(cls),
    })
}

/// Decode either format: JSON when the payload starts like JSON, text otherwise.
pub fn parse_any(payload: &str) -> Result<Vec<Segment>, IngestError> {
    match payload.trim_start().chars().next() {
        Some('[') | Some('{') => parse_json(payload),
        _ => Ok(parse_text(payload)),
    }
}
