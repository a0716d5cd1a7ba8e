//! Configuration file support for weldmark.
//!
//! Settings are stored as JSON. Every section has defaults, so partial files
//! are valid and older files keep loading after new settings are added.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use weldmark_canvas::Color;

use crate::constants;
use crate::interaction::KeyBindings;
use crate::render::LabelStyle;
use crate::render::export::ExportStyle;
use crate::render::report::ReportConfig;
use crate::viewport::ZoomLimits;

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Get the display name for this log level.
    pub fn name(&self) -> &'static str {
        match self {
            LogLevel::Error => "Error",
            LogLevel::Warn => "Warn",
            LogLevel::Info => "Info",
            LogLevel::Debug => "Debug",
            LogLevel::Trace => "Trace",
        }
    }

    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Version of the configuration file format
    pub version: u32,

    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Defect vocabulary offered for labels, indexed by inference class
    #[serde(default = "default_labels")]
    pub labels: Vec<String>,

    /// Polygon colors, cycled by creation order
    #[serde(default = "default_palette")]
    pub palette: Vec<Color>,

    #[serde(default)]
    pub viewport: ViewportConfig,

    #[serde(default)]
    pub overlay: OverlayConfig,

    #[serde(default)]
    pub export: ExportConfig,

    #[serde(default)]
    pub report: ReportConfig,

    #[serde(default)]
    pub keybindings: KeyBindings,
}

fn default_labels() -> Vec<String> {
    constants::DEFAULT_LABELS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_palette() -> Vec<Color> {
    constants::DEFAULT_PALETTE
        .iter()
        .filter_map(|hex| Color::from_hex(hex))
        .collect()
}

/// Zoom limits and fit behavior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub min_zoom: f32,
    pub max_zoom: f32,
    /// Multiplier for zoom in/out and wheel steps
    pub zoom_step: f32,
    /// Fraction of the canvas the image occupies after fit
    pub fit_margin: f32,
}

impl ViewportConfig {
    /// Zoom limits, repaired if the file holds nonsense.
    pub fn limits(&self) -> ZoomLimits {
        let defaults = ZoomLimits::default();
        let valid = |v: f32| v.is_finite() && v > 0.0;
        let min = if valid(self.min_zoom) { self.min_zoom } else { defaults.min };
        let max = if valid(self.max_zoom) && self.max_zoom >= min {
            self.max_zoom
        } else {
            defaults.max.max(min)
        };
        let step = if valid(self.zoom_step) && self.zoom_step > 1.0 {
            self.zoom_step
        } else {
            defaults.step
        };
        ZoomLimits { min, max, step }
    }

    pub fn fit_margin(&self) -> f32 {
        if self.fit_margin.is_finite() && self.fit_margin > 0.0 {
            self.fit_margin
        } else {
            constants::zoom::FIT_MARGIN
        }
    }
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_zoom: constants::zoom::MIN,
            max_zoom: constants::zoom::MAX,
            zoom_step: constants::zoom::STEP,
            fit_margin: constants::zoom::FIT_MARGIN,
        }
    }
}

/// Picking and label settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Pick radius for vertices and add-buttons, in screen pixels
    pub hit_radius: f32,
    pub label_font_size: f32,
    pub label_padding: f32,
    pub label_offset: f32,
    /// Font files tried before the bundled font
    pub font_paths: Vec<PathBuf>,
}

impl OverlayConfig {
    pub fn label_style(&self) -> LabelStyle {
        LabelStyle {
            font_size: self.label_font_size,
            padding: self.label_padding,
            offset: self.label_offset,
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            hit_radius: constants::overlay::HIT_RADIUS,
            label_font_size: constants::label::FONT_SIZE,
            label_padding: constants::label::PADDING,
            label_offset: constants::label::OFFSET,
            font_paths: Vec::new(),
        }
    }
}

/// Annotated raster export settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Margin around the content, in image pixels
    pub margin: f32,
    pub background: Color,
}

impl ExportConfig {
    pub fn style(&self) -> ExportStyle {
        ExportStyle {
            margin: self.margin.max(0.0),
            background: self.background,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            margin: constants::export::MARGIN,
            background: Color::WHITE,
        }
    }
}

impl EngineConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            log_level: LogLevel::default(),
            labels: default_labels(),
            palette: default_palette(),
            viewport: ViewportConfig::default(),
            overlay: OverlayConfig::default(),
            export: ExportConfig::default(),
            report: ReportConfig::default(),
            keybindings: KeyBindings::default(),
        }
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        // Validate version compatibility
        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        Ok(config)
    }

    /// Read a configuration file.
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Write the configuration file, creating parent directories if needed.
    pub fn save(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get the default filename for the config file.
    pub fn default_filename() -> &'static str {
        "weldmark-config.json"
    }

    /// Get the default config file path for auto-load/save.
    pub fn default_path() -> Option<PathBuf> {
        // Try to use XDG config directory, fall back to home directory
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("weldmark").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home_dir| {
                home_dir
                    .join(".config")
                    .join("weldmark")
                    .join(Self::default_filename())
            })
        }
    }

    /// Try to load configuration from the default path.
    /// Returns None if the file doesn't exist or can't be read.
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return None;
        }

        match Self::load(&path) {
            Ok(config) => Some(config),
            Err(e) => {
                log::warn!("Failed to load config file {:?}: {}", path, e);
                None
            }
        }
    }

    /// Save configuration to the default path.
    pub fn save_to_default_path(&self) -> Result<(), ConfigError> {
        let path = Self::default_path().ok_or_else(|| {
            ConfigError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine config directory",
            ))
        })?;
        self.save(&path)
    }

    /// Palette to use; falls back to the defaults when the configured one is empty.
    pub fn effective_palette(&self) -> Vec<Color> {
        if self.palette.is_empty() {
            default_palette()
        } else {
            self.palette.clone()
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_round_trip() {
        let config = EngineConfig::default();
        let json = config.to_json().unwrap();
        let back = EngineConfig::from_json(&json).unwrap();
        assert_eq!(back, config);
        assert_eq!(back.labels.len(), 13);
        assert_eq!(back.palette.len(), 8);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let json = r##"{"version": 1, "palette": ["#112233"], "viewport": {"max_zoom": 4.0}}"##;
        let config = EngineConfig::from_json(json).unwrap();
        assert_eq!(config.palette, vec![Color::rgb(0x11, 0x22, 0x33)]);
        assert_eq!(config.viewport.max_zoom, 4.0);
        assert_eq!(config.viewport.min_zoom, 0.1);
        assert_eq!(config.labels[0], "пора");
        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn test_version_too_new() {
        let json = r#"{"version": 99}"#;
        assert!(matches!(
            EngineConfig::from_json(json),
            Err(ConfigError::VersionTooNew { file_version: 99, .. })
        ));
    }

    #[test]
    fn test_invalid_color_rejected() {
        let json = r#"{"version": 1, "palette": ["nope"]}"#;
        assert!(matches!(
            EngineConfig::from_json(json),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_limits_repaired() {
        let viewport = ViewportConfig {
            min_zoom: -1.0,
            max_zoom: f32::NAN,
            zoom_step: 0.5,
            fit_margin: 0.0,
        };
        let limits = viewport.limits();
        assert_eq!(limits, ZoomLimits::default());
        assert_eq!(viewport.fit_margin(), 0.9);
    }

    #[test]
    fn test_log_level_mapping() {
        assert_eq!(LogLevel::Debug.to_level_filter(), log::LevelFilter::Debug);
        assert_eq!(LogLevel::default().name(), "Info");
        let level: LogLevel = serde_json::from_str("\"trace\"").unwrap();
        assert_eq!(level, LogLevel::Trace);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let mut config = EngineConfig::default();
        config.report.region_count = 4;
        config.keybindings.tool_draw = 'd';
        config.save(&path).unwrap();

        let loaded = EngineConfig::load(&path).unwrap();
        assert_eq!(loaded.report.region_count, 4);
        assert_eq!(loaded.keybindings.tool_draw, 'd');
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = EngineConfig::load(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(ConfigError::IoError(_))));
    }

    #[test]
    fn test_no_font_overrides_by_default() {
        assert!(EngineConfig::default().overlay.font_paths.is_empty());
    }

    #[test]
    fn test_effective_palette_never_empty() {
        let config = EngineConfig {
            palette: vec![],
            ..EngineConfig::default()
        };
        assert_eq!(config.effective_palette().len(), 8);
    }
}
