//! Wire shapes for the analysis endpoint and their mapping onto the
//! shared data model.
//!
//! The backend's field names drifted over time: flagged records arrive
//! under `anomalies` or `spikes`, identified by `identifier`,
//! `consumer_id`, or `house_id`, with the period under `period` or
//! `month`. Everything is normalized into [`AnomalyRecord`] here so the
//! rest of the crate sees one shape.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use shared::types::{AnalysisResult, AnalysisSummary, AnomalyRecord, Severity};

/// Month-over-month increase at which an unlabeled spike counts as
/// high severity. Matches the backend's second-tier detection cutoff.
const HIGH_SEVERITY_INCREASE_PCT: f64 = 80.0;

#[derive(Debug, Deserialize)]
pub(crate) struct AnalyzeResponse {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// Free-text narrative the backend generated, if any.
    #[serde(default)]
    pub analysis: Option<String>,
    pub summary: AnalysisSummary,
    #[serde(default)]
    pub anomalies: Vec<AnomalyWire>,
    #[serde(default)]
    pub spikes: Vec<AnomalyWire>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnomalyWire {
    #[serde(alias = "consumer_id", alias = "house_id")]
    pub identifier: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(alias = "month")]
    pub period: Option<String>,
    pub bill_amount: f64,
    #[serde(default)]
    pub units_consumed: Option<f64>,
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub increase_percentage: Option<f64>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl AnomalyWire {
    pub(crate) fn into_record(self) -> AnomalyRecord {
        let severity = self.severity.unwrap_or_else(|| {
            match self.increase_percentage {
                Some(pct) if pct >= HIGH_SEVERITY_INCREASE_PCT => Severity::High,
                _ => Severity::Low,
            }
        });
        AnomalyRecord {
            identifier: self.identifier.unwrap_or_else(|| "unknown".to_string()),
            address: self.address,
            period: self.period.unwrap_or_default(),
            bill_amount: self.bill_amount,
            units_consumed: self.units_consumed.unwrap_or(0.0),
            severity,
            reason: self.reason.unwrap_or_default(),
        }
    }
}

impl AnalyzeResponse {
    /// Normalize into the shared model. `fallback_name` is the uploaded
    /// file's name, used when the backend echoes nothing back.
    pub(crate) fn into_result(self, fallback_name: &str) -> AnalysisResult {
        let mut anomalies: Vec<AnomalyRecord> =
            self.anomalies.into_iter().map(AnomalyWire::into_record).collect();
        anomalies.extend(self.spikes.into_iter().map(AnomalyWire::into_record));

        AnalysisResult {
            filename: self
                .filename
                .unwrap_or_else(|| fallback_name.to_string()),
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            summary: self.summary,
            anomalies,
            narrative: self.analysis.filter(|text| !text.trim().is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    pub answer: String,
}
