use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::FunnelResult;
use crate::labels::LabelTable;

/// The canonical stages of the patient journey, in funnel order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FunnelStage {
    Started,
    QuestionsResolved,
    ProceduresOffered,
    SchedulingCompleted,
    AttendanceConfirmed,
    ProceduresCompleted,
}

impl FunnelStage {
    /// Every reported stage, in the order the funnel progresses.
    pub const ALL: [FunnelStage; 6] = [
        FunnelStage::Started,
        FunnelStage::QuestionsResolved,
        FunnelStage::ProceduresOffered,
        FunnelStage::SchedulingCompleted,
        FunnelStage::AttendanceConfirmed,
        FunnelStage::ProceduresCompleted,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            FunnelStage::Started => "started",
            FunnelStage::QuestionsResolved => "questionsResolved",
            FunnelStage::ProceduresOffered => "proceduresOffered",
            FunnelStage::SchedulingCompleted => "schedulingCompleted",
            FunnelStage::AttendanceConfirmed => "attendanceConfirmed",
            FunnelStage::ProceduresCompleted => "proceduresCompleted",
        }
    }
}

/// One named count in an ordered funnel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCount {
    pub id: String,
    pub label: String,
    pub value: u64,
}

impl StageCount {
    pub fn new(id: impl Into<String>, label: impl Into<String>, value: u64) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            value,
        }
    }
}

/// Raw stage counts as supplied by the data-acquisition layer.
///
/// Counts are unsigned, so a negative value fails at deserialization rather
/// than reaching the engines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelMetrics {
    pub started: u64,
    pub questions_resolved: u64,
    pub procedures_offered: u64,
    pub scheduling_completed: u64,
    /// Tracked upstream but never part of the reported funnel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduling_confirmations: Option<u64>,
    pub attendance_confirmed: u64,
    pub procedures_completed: u64,
}

impl FunnelMetrics {
    pub fn from_json(input: &str) -> FunnelResult<Self> {
        Ok(serde_json::from_str(input)?)
    }

    /// Reads the whole stream (e.g. stdin) before parsing it.
    pub fn from_reader(mut reader: impl Read) -> FunnelResult<Self> {
        let mut raw = String::new();
        reader.read_to_string(&mut raw)?;
        Self::from_json(&raw)
    }

    pub fn from_path(path: impl AsRef<Path>) -> FunnelResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn value(&self, stage: FunnelStage) -> u64 {
        match stage {
            FunnelStage::Started => self.started,
            FunnelStage::QuestionsResolved => self.questions_resolved,
            FunnelStage::ProceduresOffered => self.procedures_offered,
            FunnelStage::SchedulingCompleted => self.scheduling_completed,
            FunnelStage::AttendanceConfirmed => self.attendance_confirmed,
            FunnelStage::ProceduresCompleted => self.procedures_completed,
        }
    }

    /// Reported stages in canonical order, labelled with the long names.
    pub fn stages(&self, labels: &LabelTable) -> Vec<StageCount> {
        self.stages_with(|stage| labels.stage_name(stage))
    }

    /// Reported stages labelled with the short names used on the diagram.
    pub fn diagram_stages(&self, labels: &LabelTable) -> Vec<StageCount> {
        self.stages_with(|stage| labels.short_name(stage))
    }

    fn stages_with<'a>(&self, label: impl Fn(FunnelStage) -> &'a str) -> Vec<StageCount> {
        FunnelStage::ALL
            .iter()
            .map(|stage| StageCount::new(stage.key(), label(*stage), self.value(*stage)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FunnelError;

    struct BrokenPipe;

    impl Read for BrokenPipe {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed"))
        }
    }

    #[test]
    fn test_from_reader_parses_stream() {
        let json = br#"{
            "started": 4,
            "questionsResolved": 3,
            "proceduresOffered": 2,
            "schedulingCompleted": 1,
            "attendanceConfirmed": 1,
            "proceduresCompleted": 0
        }"#;
        let metrics = FunnelMetrics::from_reader(&json[..]).unwrap();
        assert_eq!(metrics.started, 4);
        assert_eq!(metrics.scheduling_confirmations, None);
    }

    #[test]
    fn test_read_failure_is_io_error() {
        let err = FunnelMetrics::from_reader(BrokenPipe).unwrap_err();
        assert!(matches!(err, FunnelError::Io(_)));
        assert!(err.to_string().contains("pipe closed"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = FunnelMetrics::from_path("/nonexistent/funnel-counts.json").unwrap_err();
        assert!(matches!(err, FunnelError::Io(ref e) if e.kind() == std::io::ErrorKind::NotFound));
    }

    #[test]
    fn test_malformed_stream_is_serialization_error() {
        let err = FunnelMetrics::from_reader(&b"{ not json"[..]).unwrap_err();
        assert!(matches!(err, FunnelError::Serialization(_)));
    }

    #[test]
    fn test_parse_camel_case_input() {
        let json = r#"{
            "started": 1000,
            "questionsResolved": 800,
            "proceduresOffered": 560,
            "schedulingCompleted": 320,
            "schedulingConfirmations": 300,
            "attendanceConfirmed": 288,
            "proceduresCompleted": 240
        }"#;
        let metrics = FunnelMetrics::from_json(json).unwrap();
        assert_eq!(metrics.started, 1000);
        assert_eq!(metrics.scheduling_confirmations, Some(300));
        assert_eq!(metrics.procedures_completed, 240);
    }

    #[test]
    fn test_negative_count_rejected() {
        let json = r#"{
            "started": -1,
            "questionsResolved": 0,
            "proceduresOffered": 0,
            "schedulingCompleted": 0,
            "attendanceConfirmed": 0,
            "proceduresCompleted": 0
        }"#;
        assert!(FunnelMetrics::from_json(json).is_err());
    }

    #[test]
    fn test_missing_stage_rejected() {
        let json = r#"{ "started": 10, "questionsResolved": 5 }"#;
        assert!(FunnelMetrics::from_json(json).is_err());
    }

    #[test]
    fn test_stages_exclude_scheduling_confirmations() {
        let metrics = FunnelMetrics {
            started: 10,
            questions_resolved: 9,
            procedures_offered: 8,
            scheduling_completed: 7,
            scheduling_confirmations: Some(99),
            attendance_confirmed: 6,
            procedures_completed: 5,
        };
        let stages = metrics.stages(&LabelTable::default());
        assert_eq!(stages.len(), 6);
        assert!(stages.iter().all(|s| s.value != 99));
        let ids: Vec<_> = stages.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "started",
                "questionsResolved",
                "proceduresOffered",
                "schedulingCompleted",
                "attendanceConfirmed",
                "proceduresCompleted"
            ]
        );
    }

    #[test]
    fn test_diagram_stages_use_short_names() {
        let metrics = FunnelMetrics::default();
        let labels = LabelTable::default();
        let stages = metrics.diagram_stages(&labels);
        assert_eq!(stages[0].label, "Atend. Iniciados");
        assert_eq!(metrics.stages(&labels)[0].label, "Atendimentos Iniciados");
    }
}
