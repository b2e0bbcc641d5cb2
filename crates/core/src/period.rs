use serde::{Deserialize, Serialize};

/// Reporting window selected in the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportPeriod {
    Today,
    Week,
    #[default]
    Month,
    Quarter,
    Year,
}

impl ReportPeriod {
    /// Resolves a period key. Anything unrecognized falls back to `Month`.
    pub fn from_key(key: &str) -> Self {
        match key {
            "today" => ReportPeriod::Today,
            "week" => ReportPeriod::Week,
            "month" => ReportPeriod::Month,
            "quarter" => ReportPeriod::Quarter,
            "year" => ReportPeriod::Year,
            _ => ReportPeriod::default(),
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            ReportPeriod::Today => "today",
            ReportPeriod::Week => "week",
            ReportPeriod::Month => "month",
            ReportPeriod::Quarter => "quarter",
            ReportPeriod::Year => "year",
        }
    }
}
