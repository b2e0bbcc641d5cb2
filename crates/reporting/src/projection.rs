//! Report projection — flattens a funnel analysis into the named, formatted
//! fields a static report template binds to. Formatting only: every number
//! here was already computed by the metrics engine.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;
use std::path::Path;

use chrono::{Local, NaiveDateTime};
use funnel_core::config::ReportConfig;
use funnel_core::error::FunnelResult;
use funnel_core::labels::LabelTable;
use funnel_core::period::ReportPeriod;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::metrics::FunnelAnalysis;

const FALLBACK_DATE_FORMAT: &str = "%d/%m/%Y, %H:%M";

// ─── Types ──────────────────────────────────────────────────────────────────

/// Flat `key → display string` map handed to the external renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportFields(BTreeMap<String, String>);

impl ReportFields {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Keeps only the fields the template declares. Template keys this
    /// report cannot fill are skipped rather than treated as errors.
    pub fn bind(&self, template: &ReportTemplate) -> ReportFields {
        let mut bound = BTreeMap::new();
        for key in &template.fields {
            match self.0.get(key) {
                Some(value) => {
                    bound.insert(key.clone(), value.clone());
                }
                None => debug!(field = %key, "Template field has no value, omitting"),
            }
        }
        ReportFields(bound)
    }

    fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }
}

/// The set of field keys an external template knows how to display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportTemplate {
    fields: BTreeSet<String>,
}

impl ReportTemplate {
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Parses a JSON array of field keys.
    pub fn from_json(input: &str) -> FunnelResult<Self> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> FunnelResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Every key the projector emits for a funnel of `stage_count` stages.
    pub fn standard(stage_count: usize) -> Self {
        let mut keys: Vec<String> = Vec::new();
        for i in 1..=stage_count {
            keys.push(format!("stage{i}"));
            keys.push(format!("vol{i}"));
        }
        for i in 1..stage_count {
            keys.push(format!("conv{i}"));
            keys.push(format!("conv{i}Class"));
        }
        keys.extend(
            [
                "overallRate",
                "finalizationRate",
                "totalVolume",
                "bestStage",
                "bestRate",
                "worstStage",
                "worstRate",
                "generatedDate",
                "periodLabel",
            ]
            .map(String::from),
        );
        Self::from_keys(keys)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportContext {
    pub period: ReportPeriod,
    pub generated_at: NaiveDateTime,
}

impl ReportContext {
    pub fn new(period: ReportPeriod, generated_at: NaiveDateTime) -> Self {
        Self {
            period,
            generated_at,
        }
    }

    /// Context stamped with the local wall-clock time.
    pub fn now(period: ReportPeriod) -> Self {
        Self::new(period, Local::now().naive_local())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDocument {
    pub report_id: Uuid,
    pub period: ReportPeriod,
    pub generated_at: NaiveDateTime,
    pub fields: ReportFields,
}

impl ReportDocument {
    pub fn bind(mut self, template: &ReportTemplate) -> Self {
        self.fields = self.fields.bind(template);
        self
    }

    pub fn export_json(&self) -> FunnelResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// ─── Formatting ─────────────────────────────────────────────────────────────

pub fn format_percentage(value: f64) -> String {
    format!("{value:.1}%")
}

/// Groups digits in threes, e.g. `3208` → `3.208` with a `.` separator.
pub fn group_thousands(value: u128, separator: &str) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 * separator.len());
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push_str(separator);
        }
        out.push(ch);
    }
    out
}

// ─── Projector ──────────────────────────────────────────────────────────────

pub struct ReportProjector<'a> {
    config: &'a ReportConfig,
    labels: &'a LabelTable,
}

impl<'a> ReportProjector<'a> {
    pub fn new(config: &'a ReportConfig, labels: &'a LabelTable) -> Self {
        Self { config, labels }
    }

    pub fn project(&self, analysis: &FunnelAnalysis, context: &ReportContext) -> ReportFields {
        let mut fields = ReportFields::default();
        let sep = self.config.thousands_separator.as_str();

        for (i, stage) in analysis.stages.iter().enumerate() {
            let value = group_thousands(u128::from(stage.value), sep);
            fields.insert(format!("stage{}", i + 1), value.clone());
            fields.insert(format!("vol{}", i + 1), value);
        }

        for (i, edge) in analysis.edges.iter().enumerate() {
            fields.insert(format!("conv{}", i + 1), format_percentage(edge.rate));
            fields.insert(format!("conv{}Class", i + 1), edge.class().css_class());
        }

        let overall = format_percentage(analysis.overall_conversion);
        fields.insert("overallRate", overall.clone());
        fields.insert("finalizationRate", overall);
        fields.insert("totalVolume", group_thousands(analysis.total_volume, sep));

        match &analysis.best {
            Some(best) => {
                fields.insert("bestStage", best.label());
                fields.insert("bestRate", format_percentage(best.rate));
            }
            None => {
                fields.insert("bestStage", self.labels.no_data.clone());
                fields.insert("bestRate", format_percentage(0.0));
            }
        }

        let (worst_stage, worst_loss) = match &analysis.worst {
            Some(worst) => (worst.edge.label(), worst.loss),
            None => (self.labels.no_data.clone(), 0.0),
        };
        fields.insert("worstStage", worst_stage);
        fields.insert(
            "worstRate",
            format!("{} {}", format_percentage(worst_loss), self.labels.loss_suffix),
        );

        fields.insert("generatedDate", self.format_timestamp(&context.generated_at));
        fields.insert("periodLabel", self.labels.period(context.period));

        debug!(fields = fields.len(), period = context.period.key(), "Report projected");
        fields
    }

    pub fn document(&self, analysis: &FunnelAnalysis, context: &ReportContext) -> ReportDocument {
        ReportDocument {
            report_id: Uuid::new_v4(),
            period: context.period,
            generated_at: context.generated_at,
            fields: self.project(analysis, context),
        }
    }

    fn format_timestamp(&self, timestamp: &NaiveDateTime) -> String {
        let mut out = String::new();
        if write!(out, "{}", timestamp.format(&self.config.date_format)).is_err() {
            warn!(format = %self.config.date_format, "Invalid date format, using default");
            out = timestamp.format(FALLBACK_DATE_FORMAT).to_string();
        }
        out
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::FunnelAnalyzer;
    use chrono::NaiveDate;
    use funnel_core::types::FunnelMetrics;

    fn reference_metrics() -> FunnelMetrics {
        FunnelMetrics {
            started: 1000,
            questions_resolved: 800,
            procedures_offered: 560,
            scheduling_completed: 320,
            scheduling_confirmations: Some(7777),
            attendance_confirmed: 288,
            procedures_completed: 240,
        }
    }

    fn context() -> ReportContext {
        let at = NaiveDate::from_ymd_opt(2025, 6, 9)
            .unwrap()
            .and_hms_opt(23, 40, 0)
            .unwrap();
        ReportContext::new(ReportPeriod::Week, at)
    }

    fn project(metrics: &FunnelMetrics) -> ReportFields {
        let config = ReportConfig::default();
        let labels = LabelTable::default();
        let analysis = FunnelAnalyzer::new().analyze_metrics(metrics, &labels);
        ReportProjector::new(&config, &labels).project(&analysis, &context())
    }

    #[test]
    fn test_reference_report_fields() {
        let fields = project(&reference_metrics());
        assert_eq!(fields.get("stage1"), Some("1.000"));
        assert_eq!(fields.get("vol6"), Some("240"));
        assert_eq!(fields.get("conv1"), Some("80.0%"));
        assert_eq!(fields.get("conv1Class"), Some("conversion-high"));
        assert_eq!(fields.get("conv3"), Some("57.1%"));
        assert_eq!(fields.get("conv3Class"), Some("conversion-medium"));
        assert_eq!(fields.get("conv5"), Some("83.3%"));
        assert_eq!(fields.get("overallRate"), Some("24.0%"));
        assert_eq!(fields.get("finalizationRate"), Some("24.0%"));
        assert_eq!(fields.get("totalVolume"), Some("3.208"));
        assert_eq!(
            fields.get("worstStage"),
            Some("Procedimentos Oferecidos → Agendamentos Realizados")
        );
        assert_eq!(fields.get("worstRate"), Some("42.9% de perda"));
        assert_eq!(
            fields.get("bestStage"),
            Some("Agendamentos Realizados → Comparecimentos")
        );
        assert_eq!(fields.get("bestRate"), Some("90.0%"));
        assert_eq!(fields.get("generatedDate"), Some("09/06/2025, 23:40"));
        assert_eq!(fields.get("periodLabel"), Some("Esta Semana"));
    }

    #[test]
    fn test_standard_template_matches_projection() {
        let fields = project(&reference_metrics());
        let template = ReportTemplate::standard(6);
        assert_eq!(fields.len(), template.len());
        assert!(fields.keys().all(|k| template.contains(k)));
    }

    #[test]
    fn test_scheduling_confirmations_never_exported() {
        let fields = project(&reference_metrics());
        assert!(fields.keys().all(|k| !k.to_lowercase().contains("confirmation")));
        assert!(fields.iter().all(|(_, v)| !v.contains("7777") && !v.contains("7.777")));
        assert!(!fields.contains("stage7"));
    }

    #[test]
    fn test_no_data_sentinels() {
        let config = ReportConfig::default();
        let labels = LabelTable::default();
        let analysis = FunnelAnalyzer::new().analyze(&[]);
        let fields = ReportProjector::new(&config, &labels).project(&analysis, &context());
        assert_eq!(fields.get("bestStage"), Some("N/A"));
        assert_eq!(fields.get("bestRate"), Some("0.0%"));
        assert_eq!(fields.get("worstStage"), Some("N/A"));
        assert_eq!(fields.get("worstRate"), Some("0.0% de perda"));
        assert_eq!(fields.get("overallRate"), Some("0.0%"));
        assert_eq!(fields.get("totalVolume"), Some("0"));
        assert!(!fields.contains("stage1"));
    }

    #[test]
    fn test_bind_omits_unknown_and_undeclared_fields() {
        let fields = project(&reference_metrics());
        let template = ReportTemplate::from_keys(["overallRate", "conv1", "churnRate"]);
        let bound = fields.bind(&template);
        assert_eq!(bound.len(), 2);
        assert_eq!(bound.get("overallRate"), Some("24.0%"));
        assert!(bound.get("churnRate").is_none());
        assert!(bound.get("totalVolume").is_none());
    }

    #[test]
    fn test_template_from_json() {
        let template = ReportTemplate::from_json(r#"["stage1", "periodLabel"]"#).unwrap();
        assert_eq!(template.len(), 2);
        assert!(template.contains("periodLabel"));
        assert!(ReportTemplate::from_json(r#"{"stage1": 1}"#).is_err());
    }

    #[test]
    fn test_missing_template_file_is_io_error() {
        let err = ReportTemplate::from_path("/nonexistent/report-template.json").unwrap_err();
        assert!(matches!(err, funnel_core::error::FunnelError::Io(_)));
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0, "."), "0");
        assert_eq!(group_thousands(999, "."), "999");
        assert_eq!(group_thousands(1000, "."), "1.000");
        assert_eq!(group_thousands(1234567, ","), "1,234,567");
        assert_eq!(group_thousands(100000, " "), "100 000");
        assert_eq!(
            group_thousands(u128::from(u64::MAX) + 1, "."),
            "18.446.744.073.709.551.616"
        );
    }

    #[test]
    fn test_format_percentage() {
        assert_eq!(format_percentage(57.142857), "57.1%");
        assert_eq!(format_percentage(42.857142), "42.9%");
        assert_eq!(format_percentage(0.0), "0.0%");
    }

    #[test]
    fn test_invalid_date_format_falls_back() {
        let config = ReportConfig {
            date_format: "%Q".into(),
            ..ReportConfig::default()
        };
        let labels = LabelTable::default();
        let analysis = FunnelAnalyzer::new().analyze(&[]);
        let fields = ReportProjector::new(&config, &labels).project(&analysis, &context());
        assert_eq!(fields.get("generatedDate"), Some("09/06/2025, 23:40"));
    }

    #[test]
    fn test_document_export_json() {
        let config = ReportConfig::default();
        let labels = LabelTable::default();
        let analysis = FunnelAnalyzer::new().analyze_metrics(&reference_metrics(), &labels);
        let doc = ReportProjector::new(&config, &labels).document(&analysis, &context());
        let json = doc.export_json().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["period"], "week");
        assert_eq!(parsed["fields"]["conv2"], "70.0%");
        assert!(!json.contains("schedulingConfirmations"));

        let bound = doc.bind(&ReportTemplate::from_keys(["conv2"]));
        assert_eq!(bound.fields.len(), 1);
    }
}
