//! Funnel analytics and reporting — conversion metrics, diagram layout, and
//! the field projection consumed by printable reports.

pub mod layout;
pub mod metrics;
pub mod projection;

pub use layout::{FunnelLayout, FunnelLayoutEngine, GuideLine, Segment};
pub use metrics::{
    classify, ConversionEdge, FunnelAnalysis, FunnelAnalyzer, FunnelHealth, LossInsight,
    RateClass,
};
pub use projection::{ReportContext, ReportDocument, ReportFields, ReportProjector, ReportTemplate};
