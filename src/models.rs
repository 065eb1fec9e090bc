use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One prediction result fetched from the upstream PERM API.
#[derive(Debug, Clone, Deserialize)]
pub struct Snapshot {
    pub submit_date: String,
    pub estimated_completion_date: String,
    pub confidence_level: f64,
    pub remaining_days: i64,
    pub queue_analysis: QueueAnalysis,
    pub employer_first_letter: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueAnalysis {
    pub adjusted_queue_position: i64,
    pub current_backlog: i64,
    pub weekly_processing_rate: i64,
    pub estimated_queue_wait_weeks: f64,
}

/// Subset of a snapshot persisted per calendar day for next-day comparison.
/// Serialized with the camelCase keys used by the stored JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub timestamp: DateTime<Utc>,
    pub date_key: String,
    pub estimated_date: String,
    pub remaining_days: i64,
    pub position: i64,
    pub cases_ahead: i64,
    pub processing_rate: i64,
    pub estimated_wait: f64,
}

impl HistoryRecord {
    pub fn from_snapshot(snapshot: &Snapshot, timestamp: DateTime<Utc>, date_key: String) -> Self {
        HistoryRecord {
            timestamp,
            date_key,
            estimated_date: snapshot.estimated_completion_date.clone(),
            remaining_days: snapshot.remaining_days,
            position: snapshot.queue_analysis.adjusted_queue_position,
            cases_ahead: snapshot.queue_analysis.current_backlog,
            processing_rate: snapshot.queue_analysis.weekly_processing_rate,
            estimated_wait: snapshot.queue_analysis.estimated_queue_wait_weeks,
        }
    }
}

/// Trimmed row kept in the rolling `daily_reports` list for the weekly table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyReportEntry {
    pub timestamp: DateTime<Utc>,
    pub position: i64,
    pub remaining_days: i64,
}

impl DailyReportEntry {
    pub fn from_snapshot(snapshot: &Snapshot, timestamp: DateTime<Utc>) -> Self {
        DailyReportEntry {
            timestamp,
            position: snapshot.queue_analysis.adjusted_queue_position,
            remaining_days: snapshot.remaining_days,
        }
    }
}

/// Signed difference of one metric between two snapshots, with a directional
/// indicator for message rendering.
#[derive(Debug, Clone)]
pub struct Delta {
    pub arrow: &'static str,
    pub text: String,
    pub value: f64,
}

/// Deltas for every reported metric. `estimated_date` is absent when either
/// date string fails to parse.
#[derive(Debug, Clone)]
pub struct DeltaSet {
    pub estimated_date: Option<Delta>,
    pub remaining_days: Delta,
    pub position: Delta,
    pub cases_ahead: Delta,
    pub processing_rate: Delta,
    pub estimated_wait: Delta,
}

#[derive(Debug, Clone, Default)]
pub struct Analysis {
    pub alerts: Vec<String>,
    pub time_change: Option<i64>,
    pub position_improvement: Option<PositionImprovement>,
}

#[derive(Debug, Clone)]
pub struct PositionImprovement {
    pub amount: i64,
    /// One-decimal percentage, e.g. "20.0".
    pub percentage: String,
}

/// Progress through the whole submit-to-completion journey.
#[derive(Debug, Clone)]
pub struct Journey {
    pub days_passed: i64,
    pub remaining_days: i64,
    pub total_journey_days: i64,
    pub progress_percentage: i64,
}

/// Settled result of one fan-out to the configured Telegram chats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}
