//! Funnel metrics — pairwise conversion rates, end-to-end conversion, volume,
//! and best/worst transition insights over an ordered list of stage counts.

use funnel_core::config::ReportConfig;
use funnel_core::labels::LabelTable;
use funnel_core::types::{FunnelMetrics, StageCount};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Rates below this are classified `Low`.
pub const MEDIUM_CONVERSION_FLOOR: f64 = 50.0;
/// Rates at or above this are classified `High`.
pub const HIGH_CONVERSION_FLOOR: f64 = 80.0;
/// Edges converting below this are flagged for action.
pub const DEFAULT_RECOMMENDATION_THRESHOLD: f64 = 60.0;

/// Qualitative band of a conversion rate. Shared by every surface that
/// colours a rate. Serializes as the bare `low` / `medium` / `high`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateClass {
    Low,
    Medium,
    High,
}

impl RateClass {
    /// Style class for report templates, carrying a `conversion-` prefix:
    /// `conversion-low`, `conversion-medium` or `conversion-high`.
    pub fn css_class(&self) -> &'static str {
        match self {
            RateClass::Low => "conversion-low",
            RateClass::Medium => "conversion-medium",
            RateClass::High => "conversion-high",
        }
    }
}

pub fn classify(rate: f64) -> RateClass {
    if rate < MEDIUM_CONVERSION_FLOOR {
        RateClass::Low
    } else if rate < HIGH_CONVERSION_FLOOR {
        RateClass::Medium
    } else {
        RateClass::High
    }
}

/// Conversion between two adjacent stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionEdge {
    pub from_id: String,
    pub from_label: String,
    pub from_value: u64,
    pub to_id: String,
    pub to_label: String,
    pub to_value: u64,
    /// Percentage of `from` that reached `to`; 0 when `from` is empty.
    pub rate: f64,
}

impl ConversionEdge {
    pub fn between(from: &StageCount, to: &StageCount) -> Self {
        Self {
            from_id: from.id.clone(),
            from_label: from.label.clone(),
            from_value: from.value,
            to_id: to.id.clone(),
            to_label: to.label.clone(),
            to_value: to.value,
            rate: conversion_rate(from.value, to.value),
        }
    }

    pub fn loss(&self) -> f64 {
        100.0 - self.rate
    }

    pub fn class(&self) -> RateClass {
        classify(self.rate)
    }

    pub fn label(&self) -> String {
        format!("{} → {}", self.from_label, self.to_label)
    }
}

/// The transition with the highest attrition, with its loss percentage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossInsight {
    pub edge: ConversionEdge,
    pub loss: f64,
}

impl From<&ConversionEdge> for LossInsight {
    fn from(edge: &ConversionEdge) -> Self {
        Self {
            edge: edge.clone(),
            loss: edge.loss(),
        }
    }
}

pub fn conversion_rate(from: u64, to: u64) -> f64 {
    if from > 0 {
        to as f64 / from as f64 * 100.0
    } else {
        0.0
    }
}

pub fn compute_edges(stages: &[StageCount]) -> Vec<ConversionEdge> {
    stages
        .windows(2)
        .map(|pair| ConversionEdge::between(&pair[0], &pair[1]))
        .collect()
}

/// Last stage against first stage, ignoring everything in between.
pub fn overall_conversion(stages: &[StageCount]) -> f64 {
    match (stages.first(), stages.last()) {
        (Some(first), Some(last)) => conversion_rate(first.value, last.value),
        _ => 0.0,
    }
}

/// Raw activity summed across stages (not a unique-user count). Summed as
/// `u128` so any number of `u64` counts adds up without wrapping.
pub fn total_volume(stages: &[StageCount]) -> u128 {
    stages.iter().map(|s| u128::from(s.value)).sum()
}

/// Highest-rate edge; the earliest one wins ties.
pub fn best_edge(edges: &[ConversionEdge]) -> Option<&ConversionEdge> {
    edges
        .iter()
        .reduce(|best, edge| if edge.rate > best.rate { edge } else { best })
}

/// Lowest-rate edge, i.e. the biggest loss; the earliest one wins ties.
pub fn worst_edge(edges: &[ConversionEdge]) -> Option<&ConversionEdge> {
    edges
        .iter()
        .reduce(|worst, edge| if edge.rate < worst.rate { edge } else { worst })
}

pub fn recommended_actions(edges: &[ConversionEdge], threshold: f64) -> Vec<&ConversionEdge> {
    edges.iter().filter(|e| e.rate < threshold).collect()
}

/// Integer share of each stage relative to the one before it. The first
/// stage is measured against itself.
pub fn step_percentages(stages: &[StageCount]) -> Vec<u32> {
    stages
        .iter()
        .enumerate()
        .map(|(i, stage)| {
            let base = if i > 0 { stages[i - 1].value } else { stage.value };
            conversion_rate(base, stage.value).round() as u32
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunnelHealth {
    Healthy,
    NeedsAttention,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSummary {
    pub id: String,
    pub label: String,
    pub value: u64,
    pub step_percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelAnalysis {
    pub stages: Vec<StageSummary>,
    pub edges: Vec<ConversionEdge>,
    pub overall_conversion: f64,
    pub total_volume: u128,
    pub best: Option<ConversionEdge>,
    pub worst: Option<LossInsight>,
    pub recommendations: Vec<ConversionEdge>,
    pub health: FunnelHealth,
}

/// Runs every metric over one snapshot of stage counts.
#[derive(Debug, Clone)]
pub struct FunnelAnalyzer {
    recommendation_threshold: f64,
}

impl FunnelAnalyzer {
    pub fn new() -> Self {
        Self {
            recommendation_threshold: DEFAULT_RECOMMENDATION_THRESHOLD,
        }
    }

    pub fn with_threshold(recommendation_threshold: f64) -> Self {
        Self {
            recommendation_threshold,
        }
    }

    pub fn from_config(config: &ReportConfig) -> Self {
        Self::with_threshold(config.recommendation_threshold)
    }

    pub fn recommendation_threshold(&self) -> f64 {
        self.recommendation_threshold
    }

    pub fn analyze(&self, stages: &[StageCount]) -> FunnelAnalysis {
        let edges = compute_edges(stages);
        let recommendations: Vec<ConversionEdge> =
            recommended_actions(&edges, self.recommendation_threshold)
                .into_iter()
                .cloned()
                .collect();
        let health = if recommendations.is_empty() {
            FunnelHealth::Healthy
        } else {
            FunnelHealth::NeedsAttention
        };

        let summaries = stages
            .iter()
            .zip(step_percentages(stages))
            .map(|(stage, step_percentage)| StageSummary {
                id: stage.id.clone(),
                label: stage.label.clone(),
                value: stage.value,
                step_percentage,
            })
            .collect();

        let analysis = FunnelAnalysis {
            stages: summaries,
            best: best_edge(&edges).cloned(),
            worst: worst_edge(&edges).map(LossInsight::from),
            overall_conversion: overall_conversion(stages),
            total_volume: total_volume(stages),
            recommendations,
            health,
            edges,
        };

        debug!(
            stages = stages.len(),
            overall = analysis.overall_conversion,
            total = %analysis.total_volume,
            flagged = analysis.recommendations.len(),
            "Funnel analyzed"
        );
        analysis
    }

    /// Analyzes the six reported stages; `schedulingConfirmations` never
    /// enters the funnel.
    pub fn analyze_metrics(&self, metrics: &FunnelMetrics, labels: &LabelTable) -> FunnelAnalysis {
        self.analyze(&metrics.stages(labels))
    }
}

impl Default for FunnelAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
