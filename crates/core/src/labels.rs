//! Display label lookup table. Defaults carry the Portuguese labels of the
//! patient-journey dashboard; every entry can be overridden from config.

use serde::{Deserialize, Serialize};

use crate::period::ReportPeriod;
use crate::types::FunnelStage;

/// One display string per reported stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageLabels {
    pub started: String,
    pub questions_resolved: String,
    pub procedures_offered: String,
    pub scheduling_completed: String,
    pub attendance_confirmed: String,
    pub procedures_completed: String,
}

impl StageLabels {
    pub fn get(&self, stage: FunnelStage) -> &str {
        match stage {
            FunnelStage::Started => &self.started,
            FunnelStage::QuestionsResolved => &self.questions_resolved,
            FunnelStage::ProceduresOffered => &self.procedures_offered,
            FunnelStage::SchedulingCompleted => &self.scheduling_completed,
            FunnelStage::AttendanceConfirmed => &self.attendance_confirmed,
            FunnelStage::ProceduresCompleted => &self.procedures_completed,
        }
    }

    fn long_names() -> Self {
        Self {
            started: "Atendimentos Iniciados".into(),
            questions_resolved: "Dúvidas Sanadas".into(),
            procedures_offered: "Procedimentos Oferecidos".into(),
            scheduling_completed: "Agendamentos Realizados".into(),
            attendance_confirmed: "Comparecimentos".into(),
            procedures_completed: "Procedimentos Realizados".into(),
        }
    }

    fn short_names() -> Self {
        Self {
            started: "Atend. Iniciados".into(),
            questions_resolved: "Dúvidas Sanadas".into(),
            procedures_offered: "Proced. Oferecidos".into(),
            scheduling_completed: "Agendamentos".into(),
            attendance_confirmed: "Comparecimentos".into(),
            procedures_completed: "Proced. Realizados".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodLabels {
    pub today: String,
    pub week: String,
    pub month: String,
    pub quarter: String,
    pub year: String,
}

impl Default for PeriodLabels {
    fn default() -> Self {
        Self {
            today: "Hoje".into(),
            week: "Esta Semana".into(),
            month: "Este Mês".into(),
            quarter: "Este Trimestre".into(),
            year: "Este Ano".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelTable {
    #[serde(default = "StageLabels::long_names")]
    pub stage_names: StageLabels,
    #[serde(default = "StageLabels::short_names")]
    pub short_names: StageLabels,
    #[serde(default)]
    pub periods: PeriodLabels,
    #[serde(default = "default_loss_suffix")]
    pub loss_suffix: String,
    #[serde(default = "default_no_data")]
    pub no_data: String,
}

fn default_loss_suffix() -> String {
    "de perda".to_string()
}
fn default_no_data() -> String {
    "N/A".to_string()
}

impl LabelTable {
    pub fn stage_name(&self, stage: FunnelStage) -> &str {
        self.stage_names.get(stage)
    }

    pub fn short_name(&self, stage: FunnelStage) -> &str {
        self.short_names.get(stage)
    }

    pub fn period(&self, period: ReportPeriod) -> &str {
        match period {
            ReportPeriod::Today => &self.periods.today,
            ReportPeriod::Week => &self.periods.week,
            ReportPeriod::Month => &self.periods.month,
            ReportPeriod::Quarter => &self.periods.quarter,
            ReportPeriod::Year => &self.periods.year,
        }
    }
}

impl Default for LabelTable {
    fn default() -> Self {
        Self {
            stage_names: StageLabels::long_names(),
            short_names: StageLabels::short_names(),
            periods: PeriodLabels::default(),
            loss_suffix: default_loss_suffix(),
            no_data: default_no_data(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_labels() {
        let labels = LabelTable::default();
        assert_eq!(labels.stage_name(FunnelStage::AttendanceConfirmed), "Comparecimentos");
        assert_eq!(labels.short_name(FunnelStage::ProceduresOffered), "Proced. Oferecidos");
        assert_eq!(labels.period(ReportPeriod::Quarter), "Este Trimestre");
        assert_eq!(labels.no_data, "N/A");
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let labels: LabelTable =
            serde_json::from_str(r#"{ "loss_suffix": "lost" }"#).unwrap();
        assert_eq!(labels.loss_suffix, "lost");
        assert_eq!(labels.stage_name(FunnelStage::Started), "Atendimentos Iniciados");
        assert_eq!(labels.period(ReportPeriod::Month), "Este Mês");
    }
}
