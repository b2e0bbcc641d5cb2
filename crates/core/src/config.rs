use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FunnelError, FunnelResult};
use crate::labels::LabelTable;

/// Root application configuration. Loaded from an optional TOML file and
/// environment variables with the prefix `FUNNEL_REPORT__`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub labels: LabelTable,
}

/// Sizing knobs for the funnel diagram. Everything is in canvas units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizingConfig {
    #[serde(default = "default_bar_height")]
    pub bar_height: u32,
    #[serde(default = "default_vertical_gap")]
    pub vertical_gap: u32,
    #[serde(default = "default_top_padding")]
    pub top_padding: u32,
    #[serde(default = "default_bottom_padding")]
    pub bottom_padding: u32,
    /// Width of the last (narrowest) bar.
    #[serde(default = "default_base_width")]
    pub base_width: u32,
    /// Width added per stage above the last one. Negative inverts the funnel.
    #[serde(default = "default_width_decrement")]
    pub width_decrement: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default)]
    pub sizing: SizingConfig,
    #[serde(default = "default_canvas_width")]
    pub canvas_width: f64,
    #[serde(default = "default_guide_inset")]
    pub guide_inset: f64,
    #[serde(default = "default_palette")]
    pub palette: Vec<String>,
    #[serde(default = "default_fallback_color")]
    pub fallback_color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_recommendation_threshold")]
    pub recommendation_threshold: f64,
    #[serde(default = "default_thousands_separator")]
    pub thousands_separator: String,
    #[serde(default = "default_date_format")]
    pub date_format: String,
}

// Default functions
fn default_bar_height() -> u32 {
    50
}
fn default_vertical_gap() -> u32 {
    25
}
fn default_top_padding() -> u32 {
    30
}
fn default_bottom_padding() -> u32 {
    20
}
fn default_base_width() -> u32 {
    250
}
fn default_width_decrement() -> i32 {
    40
}
fn default_canvas_width() -> f64 {
    800.0
}
fn default_guide_inset() -> f64 {
    100.0
}
fn default_palette() -> Vec<String> {
    ["#a78bfa", "#a78bfa", "#a78bfa", "#22c55e", "#22c55e", "#a78bfa"]
        .iter()
        .map(|c| c.to_string())
        .collect()
}
fn default_fallback_color() -> String {
    "#a78bfa".to_string()
}
fn default_recommendation_threshold() -> f64 {
    60.0
}
fn default_thousands_separator() -> String {
    ".".to_string()
}
fn default_date_format() -> String {
    "%d/%m/%Y, %H:%M".to_string()
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            bar_height: default_bar_height(),
            vertical_gap: default_vertical_gap(),
            top_padding: default_top_padding(),
            bottom_padding: default_bottom_padding(),
            base_width: default_base_width(),
            width_decrement: default_width_decrement(),
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            sizing: SizingConfig::default(),
            canvas_width: default_canvas_width(),
            guide_inset: default_guide_inset(),
            palette: default_palette(),
            fallback_color: default_fallback_color(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            recommendation_threshold: default_recommendation_threshold(),
            thousands_separator: default_thousands_separator(),
            date_format: default_date_format(),
        }
    }
}

impl SizingConfig {
    /// Vertical room one stage takes: its bar plus the gap below it.
    pub fn stage_space(&self) -> u64 {
        u64::from(self.bar_height) + u64::from(self.vertical_gap)
    }

    pub fn validate(&self) -> FunnelResult<()> {
        let positive = [
            ("bar_height", self.bar_height),
            ("vertical_gap", self.vertical_gap),
            ("top_padding", self.top_padding),
            ("bottom_padding", self.bottom_padding),
            ("base_width", self.base_width),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(FunnelError::Validation(format!(
                    "layout.sizing.{name} must be positive"
                )));
            }
        }
        Ok(())
    }
}

impl AppConfig {
    /// Load configuration from an optional TOML file, then environment
    /// variables (which take precedence).
    pub fn load(path: Option<&str>) -> FunnelResult<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("FUNNEL_REPORT")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("layout.palette"),
        );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        debug!(
            file = path.unwrap_or("<none>"),
            canvas_width = config.layout.canvas_width,
            "Configuration loaded"
        );
        Ok(config)
    }

    pub fn validate(&self) -> FunnelResult<()> {
        self.layout.sizing.validate()?;
        if !self.layout.canvas_width.is_finite() || self.layout.canvas_width <= 0.0 {
            return Err(FunnelError::Validation(
                "layout.canvas_width must be positive".into(),
            ));
        }
        if !self.report.recommendation_threshold.is_finite() {
            return Err(FunnelError::Validation(
                "report.recommendation_threshold must be a finite percentage".into(),
            ));
        }
        if StrftimeItems::new(&self.report.date_format).any(|item| matches!(item, Item::Error)) {
            return Err(FunnelError::Validation(format!(
                "report.date_format is not a valid strftime pattern: {}",
                self.report.date_format
            )));
        }
        Ok(())
    }
}
