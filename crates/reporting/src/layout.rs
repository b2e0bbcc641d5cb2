//! Funnel diagram geometry — one centered bar per stage, stacked top to
//! bottom, widening by a fixed step for every stage above the last.
//!
//! The engine knows nothing about hover or selection; those overlays belong
//! to whatever draws the segments.

use funnel_core::config::{LayoutConfig, SizingConfig};
use funnel_core::types::StageCount;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::metrics::step_percentages;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub index: usize,
    pub stage_id: String,
    pub label: String,
    pub value: u64,
    pub step_percentage: u32,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub color: String,
}

/// Dashed horizontal rule through the vertical center of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GuideLine {
    pub x1: f64,
    pub x2: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelLayout {
    pub canvas_width: f64,
    pub total_height: f64,
    pub segments: Vec<Segment>,
    pub guides: Vec<GuideLine>,
}

#[derive(Debug, Clone)]
pub struct FunnelLayoutEngine {
    sizing: SizingConfig,
    canvas_width: f64,
    guide_inset: f64,
    palette: Vec<String>,
    fallback_color: String,
}

impl FunnelLayoutEngine {
    /// Engine with the default palette and guide inset.
    pub fn new(sizing: SizingConfig, canvas_width: f64) -> Self {
        let defaults = LayoutConfig::default();
        Self {
            sizing,
            canvas_width,
            guide_inset: defaults.guide_inset,
            palette: defaults.palette,
            fallback_color: defaults.fallback_color,
        }
    }

    pub fn from_config(config: &LayoutConfig) -> Self {
        Self {
            sizing: config.sizing,
            canvas_width: config.canvas_width,
            guide_inset: config.guide_inset,
            palette: config.palette.clone(),
            fallback_color: config.fallback_color.clone(),
        }
    }

    pub fn with_canvas_width(mut self, canvas_width: f64) -> Self {
        self.canvas_width = canvas_width;
        self
    }

    pub fn with_palette(mut self, palette: Vec<String>, fallback_color: impl Into<String>) -> Self {
        self.palette = palette;
        self.fallback_color = fallback_color.into();
        self
    }

    pub fn sizing(&self) -> &SizingConfig {
        &self.sizing
    }

    pub fn canvas_width(&self) -> f64 {
        self.canvas_width
    }

    pub fn total_height(&self, stage_count: usize) -> f64 {
        let s = &self.sizing;
        s.top_padding as f64
            + stage_count as f64 * s.stage_space() as f64
            + s.bottom_padding as f64
    }

    /// Width of the bar at `index` in a funnel of `stage_count` stages,
    /// clamped so a negative decrement never yields negative geometry.
    pub fn segment_width(&self, index: usize, stage_count: usize) -> f64 {
        let steps_above_last = stage_count.saturating_sub(index + 1) as i64;
        let width = self.sizing.base_width as i64
            + steps_above_last * self.sizing.width_decrement as i64;
        width.max(0) as f64
    }

    /// Positional colour, independent of the stage's value.
    pub fn color_for(&self, index: usize) -> &str {
        self.palette
            .get(index)
            .map(String::as_str)
            .unwrap_or(self.fallback_color.as_str())
    }

    pub fn layout(&self, stages: &[StageCount]) -> FunnelLayout {
        let n = stages.len();
        let stage_space = self.sizing.stage_space() as f64;
        let top = self.sizing.top_padding as f64;
        let height = self.sizing.bar_height as f64;

        let segments: Vec<Segment> = stages
            .iter()
            .zip(step_percentages(stages))
            .enumerate()
            .map(|(i, (stage, step_percentage))| {
                let width = self.segment_width(i, n);
                Segment {
                    index: i,
                    stage_id: stage.id.clone(),
                    label: stage.label.clone(),
                    value: stage.value,
                    step_percentage,
                    x: (self.canvas_width - width) / 2.0,
                    y: top + i as f64 * stage_space,
                    width,
                    height,
                    color: self.color_for(i).to_string(),
                }
            })
            .collect();

        let guides = (0..n)
            .map(|i| GuideLine {
                x1: self.guide_inset,
                x2: self.canvas_width - self.guide_inset,
                y: top + height / 2.0 + i as f64 * stage_space,
            })
            .collect();

        let layout = FunnelLayout {
            canvas_width: self.canvas_width,
            total_height: self.total_height(n),
            segments,
            guides,
        };
        debug!(
            segments = n,
            total_height = layout.total_height,
            canvas_width = self.canvas_width,
            "Funnel layout computed"
        );
        layout
    }
}

impl Default for FunnelLayoutEngine {
    fn default() -> Self {
        Self::from_config(&LayoutConfig::default())
    }
}
