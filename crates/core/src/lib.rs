pub mod config;
pub mod error;
pub mod labels;
pub mod period;
pub mod types;

pub use config::{AppConfig, LayoutConfig, ReportConfig, SizingConfig};
pub use error::{FunnelError, FunnelResult};
pub use labels::LabelTable;
pub use period::ReportPeriod;
pub use types::{FunnelMetrics, FunnelStage, StageCount};
