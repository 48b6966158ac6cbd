//! Core data model for the Billwatch session core.
//!
//! These types cross the crate boundaries: the session controller owns
//! them, the service clients produce/consume them, and the persistence
//! adapter serializes them. Everything here is plain data - behavior
//! lives in the `session` crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Spreadsheet formats the backend knows how to ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpreadsheetKind {
    Xlsx,
    Xls,
    Csv,
}

impl SpreadsheetKind {
    /// Parse from a bare extension (the text after the final '.'),
    /// case-insensitively. Returns `None` for anything unsupported.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "xlsx" => Some(SpreadsheetKind::Xlsx),
            "xls" => Some(SpreadsheetKind::Xls),
            "csv" => Some(SpreadsheetKind::Csv),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SpreadsheetKind::Xlsx => "xlsx",
            SpreadsheetKind::Xls => "xls",
            SpreadsheetKind::Csv => "csv",
        }
    }
}

/// A validated file waiting for analysis.
///
/// Created by the acceptance gate on user selection, dropped when
/// replaced, removed, or once an analysis completes successfully.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadCandidate {
    pub name: String,
    pub kind: SpreadsheetKind,
    pub data: Vec<u8>,
}

/// How serious a flagged record is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Low,
    High,
}

/// One record flagged by the backend's spike/anomaly detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub period: String,
    pub bill_amount: f64,
    pub units_consumed: f64,
    #[serde(default)]
    pub severity: Severity,
    pub reason: String,
}

/// Per-category aggregate statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub count: u64,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

/// Detection thresholds the backend applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub residential_min: f64,
    pub residential_max: f64,
}

/// One month's aggregate line in the categorized summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyStat {
    pub month: String,
    pub count: u64,
    pub total_amount: f64,
    pub average_amount: f64,
    pub max_amount: f64,
    pub total_units: f64,
}

/// Aggregate statistics attached to an analysis.
///
/// The backend emits one of two shapes depending on the detection path:
/// the categorized per-type breakdown, or the compact spike counters.
/// Both deserialize transparently; callers use the accessors below
/// instead of matching on the variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalysisSummary {
    Categorized {
        total_records: u64,
        residential: CategoryStats,
        commercial: CategoryStats,
        thresholds: Thresholds,
        anomalies_count: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        monthly_data: Option<Vec<MonthlyStat>>,
    },
    SpikeCounts {
        total_consumers: u64,
        spike_count: u64,
        consumers_with_spikes: u64,
        residential_count: u64,
    },
}

impl AnalysisSummary {
    /// Total records/consumers covered by the analysis.
    pub fn record_count(&self) -> u64 {
        match self {
            AnalysisSummary::Categorized { total_records, .. } => *total_records,
            AnalysisSummary::SpikeCounts {
                total_consumers, ..
            } => *total_consumers,
        }
    }

    /// Number of flagged records the backend reported.
    pub fn anomaly_count(&self) -> u64 {
        match self {
            AnalysisSummary::Categorized {
                anomalies_count, ..
            } => *anomalies_count,
            AnalysisSummary::SpikeCounts { spike_count, .. } => *spike_count,
        }
    }

    /// Plain-text summary used when the backend narrative is missing
    /// or unusable. Built only from the structured fields.
    pub fn describe(&self) -> String {
        match self {
            AnalysisSummary::Categorized {
                total_records,
                residential,
                commercial,
                anomalies_count,
                ..
            } => format!(
                "Analysis complete: {} records processed, {} anomalies flagged. \
                 Residential: {} records (mean {:.2}, median {:.2}). \
                 Commercial: {} records (mean {:.2}, median {:.2}). \
                 Ask a question to dig into the results.",
                total_records,
                anomalies_count,
                residential.count,
                residential.mean,
                residential.median,
                commercial.count,
                commercial.mean,
                commercial.median,
            ),
            AnalysisSummary::SpikeCounts {
                total_consumers,
                spike_count,
                consumers_with_spikes,
                residential_count,
            } => format!(
                "Analysis complete: {} consumers processed ({} residential), \
                 {} spikes detected across {} consumers. \
                 Ask a question to dig into the results.",
                total_consumers, residential_count, spike_count, consumers_with_spikes,
            ),
        }
    }
}

/// A completed remote analysis. Immutable once received; superseded by
/// a new result or cleared entirely, never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub filename: String,
    pub timestamp: DateTime<Utc>,
    pub summary: AnalysisSummary,
    pub anomalies: Vec<AnomalyRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,
}

impl AnalysisResult {
    /// Reduced projection handed to the chat service as grounding
    /// context. Deliberately excludes the uploaded bytes.
    pub fn context_view(&self) -> AnalysisContext {
        AnalysisContext {
            summary: self.summary.clone(),
            spikes: self.anomalies.clone(),
            analysis: self.narrative.clone().unwrap_or_default(),
        }
    }
}

/// What the chat endpoint sees of an analysis. Field names match what
/// the backend reads out of the request context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisContext {
    pub summary: AnalysisSummary,
    pub spikes: Vec<AnomalyRecord>,
    pub analysis: String,
}

/// Who authored a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry in the append-only chat transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
    pub sequence: u64,
}

/// Phase of the analysis session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    Idle,
    Validating,
    Analyzing,
    Ready,
    Errored,
}

/// The one JSON document written to durable storage: the last
/// completed analysis plus the chat log layered on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub file_name: String,
    pub result: AnalysisResult,
    pub transcript: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spike_summary() -> AnalysisSummary {
        AnalysisSummary::SpikeCounts {
            total_consumers: 50,
            spike_count: 7,
            consumers_with_spikes: 5,
            residential_count: 40,
        }
    }

    #[test]
    fn test_extension_parsing_is_case_insensitive() {
        assert_eq!(
            SpreadsheetKind::from_extension("XLSX"),
            Some(SpreadsheetKind::Xlsx)
        );
        assert_eq!(
            SpreadsheetKind::from_extension("Csv"),
            Some(SpreadsheetKind::Csv)
        );
        assert_eq!(SpreadsheetKind::from_extension("pdf"), None);
        assert_eq!(SpreadsheetKind::from_extension(""), None);
    }

    #[test]
    fn test_summary_accessors_cover_both_shapes() {
        let spikes = spike_summary();
        assert_eq!(spikes.record_count(), 50);
        assert_eq!(spikes.anomaly_count(), 7);

        let categorized = AnalysisSummary::Categorized {
            total_records: 120,
            residential: CategoryStats {
                count: 100,
                mean: 1200.0,
                median: 1100.0,
                min: 200.0,
                max: 4000.0,
            },
            commercial: CategoryStats {
                count: 20,
                mean: 5200.0,
                median: 4900.0,
                min: 900.0,
                max: 12000.0,
            },
            thresholds: Thresholds {
                residential_min: 100.0,
                residential_max: 3500.0,
            },
            anomalies_count: 7,
            monthly_data: None,
        };
        assert_eq!(categorized.record_count(), 120);
        assert_eq!(categorized.anomaly_count(), 7);
    }

    #[test]
    fn test_summary_deserializes_untagged() {
        let compact: AnalysisSummary = serde_json::from_str(
            r#"{"total_consumers": 10, "spike_count": 2, "consumers_with_spikes": 1, "residential_count": 8}"#,
        )
        .unwrap();
        assert_eq!(compact.anomaly_count(), 2);

        let categorized: AnalysisSummary = serde_json::from_str(
            r#"{
                "total_records": 3,
                "residential": {"count": 2, "mean": 1.0, "median": 1.0, "min": 0.5, "max": 1.5},
                "commercial": {"count": 1, "mean": 2.0, "median": 2.0, "min": 2.0, "max": 2.0},
                "thresholds": {"residential_min": 0.1, "residential_max": 9.0},
                "anomalies_count": 1
            }"#,
        )
        .unwrap();
        assert_eq!(categorized.record_count(), 3);
    }

    #[test]
    fn test_describe_mentions_counts() {
        let text = spike_summary().describe();
        assert!(text.contains("50 consumers"));
        assert!(text.contains("7 spikes"));
    }

    #[test]
    fn test_context_view_excludes_raw_bytes() {
        let result = AnalysisResult {
            filename: "bills.csv".into(),
            timestamp: Utc::now(),
            summary: spike_summary(),
            anomalies: vec![AnomalyRecord {
                identifier: "C001".into(),
                address: None,
                period: "July".into(),
                bill_amount: 900.0,
                units_consumed: 310.0,
                severity: Severity::High,
                reason: "Sudden 120% increase".into(),
            }],
            narrative: Some("Overall the pattern is stable.".into()),
        };

        let ctx = result.context_view();
        assert_eq!(ctx.spikes.len(), 1);
        assert_eq!(ctx.analysis, "Overall the pattern is stable.");

        // The projection is what goes over the wire; the uploaded file
        // never appears in it.
        let json = serde_json::to_value(&ctx).unwrap();
        assert!(json.get("data").is_none());
        assert!(json.get("file").is_none());
    }

    #[test]
    fn test_snapshot_uses_camel_case_keys() {
        let snapshot = SessionSnapshot {
            file_name: "bills.csv".into(),
            result: AnalysisResult {
                filename: "bills.csv".into(),
                timestamp: Utc::now(),
                summary: spike_summary(),
                anomalies: vec![],
                narrative: None,
            },
            transcript: vec![ChatMessage {
                role: Role::Assistant,
                text: "seed".into(),
                sequence: 0,
            }],
            area_name: Some("Sector 12".into()),
        };

        let json = serde_json::to_value(&snapshot).unwrap();
        assert!(json.get("fileName").is_some());
        assert!(json.get("areaName").is_some());
        assert!(json.get("file_name").is_none());

        let back: SessionSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back, snapshot);
    }
}
