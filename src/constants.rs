//! Global constants for the weldmark engine.
//!
//! Values here are the defaults; most of them can be overridden through
//! [`crate::config::EngineConfig`].

/// Default polygon palette, cycled by creation order.
pub const DEFAULT_PALETTE: [&str; 8] = [
    "#ff6b6b", "#4ecdc4", "#45b7d1", "#96ceb4", "#feca57", "#ff9ff3", "#54a0ff", "#5f27cd",
];

/// Default defect vocabulary for X-ray weld inspection.
pub const DEFAULT_LABELS: [&str; 13] = [
    "пора",
    "включение",
    "подрез",
    "прожог",
    "трещина",
    "наплыв",
    "эталон1",
    "эталон2",
    "эталон3",
    "пора-скрытая",
    "утяжина",
    "несплавление",
    "непровар корня",
];

/// Viewport limits and steps.
pub mod zoom {
    /// Smallest allowed zoom factor
    pub const MIN: f32 = 0.1;
    /// Largest allowed zoom factor
    pub const MAX: f32 = 10.0;
    /// Multiplier for zoom in/out buttons
    pub const STEP: f32 = 1.2;
    /// Fraction of the canvas the image occupies after fit
    pub const FIT_MARGIN: f32 = 0.9;
    /// Upper bound for numeric zoom entry, in percent
    pub const MAX_PERCENT_INPUT: f32 = 1000.0;
}

/// Sizes of interactive overlays, in screen pixels.
pub mod overlay {
    /// Pointer distance for picking vertices and add-buttons
    pub const HIT_RADIUS: f32 = 8.0;
    /// Polygon outline width
    pub const STROKE_WIDTH: f32 = 2.0;
    /// Vertex marker radius
    pub const VERTEX_RADIUS: f32 = 4.0;
    /// Ring width of the vertex being dragged
    pub const DRAGGED_VERTEX_RING: f32 = 3.0;
    /// Add-button radius at edge midpoints
    pub const ADD_BUTTON_RADIUS: f32 = 8.0;
    /// Half-length of the plus sign inside an add-button
    pub const ADD_BUTTON_PLUS: f32 = 4.0;
    /// Font size of vertex ordinals in edit mode
    pub const VERTEX_NUMBER_SIZE: f32 = 8.0;
    /// Alpha of polygon fill
    pub const FILL_ALPHA: u8 = 0x20;
}

/// Label box geometry, in screen pixels (image pixels on export).
pub mod label {
    /// Font size
    pub const FONT_SIZE: f32 = 12.0;
    /// Padding around the text
    pub const PADDING: f32 = 4.0;
    /// Gap between the top-most vertex and the label baseline area
    pub const OFFSET: f32 = 20.0;
}

/// Export and report defaults.
pub mod export {
    /// Margin added around the annotated raster
    pub const MARGIN: f32 = 16.0;
    /// Number of longitudinal regions in the report
    pub const REGION_COUNT: usize = 10;
    /// Region length in millimeters for the millimeter label scheme
    pub const REGION_MM: u32 = 300;
    /// Control sensitivity written to every report row, in millimeters
    pub const SENSITIVITY_MM: f32 = 0.5;
    /// Default file name of the annotated raster
    pub const IMAGE_FILENAME: &str = "segmented-image.png";
    /// Default file name of the report workbook
    pub const REPORT_FILENAME: &str = "report.xlsx";
    /// Name of the single report sheet
    pub const REPORT_SHEET: &str = "Отчет";
}
