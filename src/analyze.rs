use chrono::NaiveDate;
use num_format::{Locale, ToFormattedString};

use crate::models::{
    Analysis, Delta, DeltaSet, HistoryRecord, Journey, PositionImprovement, Snapshot,
};

/// Position improvement above this many places triggers a "moved up" alert.
pub const SIGNIFICANT_PROGRESS: i64 = 1000;
/// Estimate swings of at least this many days are alerted on.
pub const SIGNIFICANT_DAY_SWING: i64 = 3;
pub const FINAL_MONTH_DAYS: i64 = 30;
pub const FINAL_QUARTER_DAYS: i64 = 90;
/// Weekly insight thresholds.
pub const FINAL_THIRD_DAYS: i64 = 100;
pub const SIGNIFICANT_TIME_GAIN: i64 = 7;

/// Diff the current snapshot against the previous observation. With no prior
/// record the result is alert-free.
pub fn analyze_changes(current: &Snapshot, previous: Option<&HistoryRecord>) -> Analysis {
    let mut analysis = Analysis::default();

    let Some(previous) = previous else {
        return analysis;
    };

    let old_position = previous.position;
    let new_position = current.queue_analysis.adjusted_queue_position;
    let old_days = previous.remaining_days;
    let new_days = current.remaining_days;

    if new_position < old_position {
        let improvement = old_position - new_position;
        let percentage = improvement as f64 / old_position as f64 * 100.0;
        analysis.position_improvement = Some(PositionImprovement {
            amount: improvement,
            percentage: format!("{percentage:.1}"),
        });

        if improvement > SIGNIFICANT_PROGRESS {
            analysis.alerts.push(format!(
                "🚀 MOVED UP {} positions in queue!",
                format_thousands(improvement)
            ));
        }
    }

    let day_difference = old_days - new_days;
    if day_difference.abs() >= SIGNIFICANT_DAY_SWING {
        analysis.time_change = Some(day_difference);
        if day_difference > 0 {
            analysis
                .alerts
                .push(format!("⏱️ Gained {day_difference} days in estimate!"));
        } else {
            analysis
                .alerts
                .push(format!("⚠️ Lost {} days in estimate", day_difference.abs()));
        }
    }

    // Milestones fire exactly on the crossing, final month taking priority.
    if new_days <= FINAL_MONTH_DAYS && old_days > FINAL_MONTH_DAYS {
        analysis.alerts.push("🎯 ENTERED FINAL MONTH!".to_string());
    } else if new_days <= FINAL_QUARTER_DAYS && old_days > FINAL_QUARTER_DAYS {
        analysis.alerts.push("📌 ENTERED FINAL QUARTER!".to_string());
    }

    analysis
}

/// Per-metric deltas against the previous day's record, or `None` when no
/// prior record exists.
pub fn calculate_deltas(current: &Snapshot, previous: Option<&HistoryRecord>) -> Option<DeltaSet> {
    let previous = previous?;
    let queue = &current.queue_analysis;

    Some(DeltaSet {
        estimated_date: date_delta(&current.estimated_completion_date, &previous.estimated_date),
        remaining_days: number_delta(
            current.remaining_days as f64,
            previous.remaining_days as f64,
            "days",
        ),
        position: number_delta(
            queue.adjusted_queue_position as f64,
            previous.position as f64,
            "positions",
        ),
        cases_ahead: number_delta(
            queue.current_backlog as f64,
            previous.cases_ahead as f64,
            "cases",
        ),
        processing_rate: number_delta(
            queue.weekly_processing_rate as f64,
            previous.processing_rate as f64,
            "/week",
        ),
        estimated_wait: number_delta(
            queue.estimated_queue_wait_weeks,
            previous.estimated_wait,
            "weeks",
        ),
    })
}

/// Whole-day difference between two estimated completion dates.
pub fn date_delta(current: &str, previous: &str) -> Option<Delta> {
    let current = parse_date(current)?;
    let previous = parse_date(previous)?;
    let diff_days = (current - previous).num_days();

    Some(if diff_days == 0 {
        Delta {
            arrow: "↔️",
            text: "no change".to_string(),
            value: 0.0,
        }
    } else if diff_days > 0 {
        Delta {
            arrow: "🔴▲",
            text: format!("+{diff_days} days"),
            value: diff_days as f64,
        }
    } else {
        Delta {
            arrow: "🟢▼",
            text: format!("{diff_days} days"),
            value: diff_days as f64,
        }
    })
}

/// Signed numeric delta. Metrics currently above 1000 use thousands
/// separators; week-denominated units keep one decimal.
pub fn number_delta(current: f64, previous: f64, unit: &str) -> Delta {
    let diff = current - previous;

    if diff == 0.0 {
        return Delta {
            arrow: "↔️",
            text: "no change".to_string(),
            value: 0.0,
        };
    }

    let arrow = if diff > 0.0 { "🔴▲" } else { "🟢▼" };
    let sign = if diff > 0.0 { "+" } else { "" };
    let formatted = if current > 1000.0 {
        format_thousands(diff.round() as i64)
    } else if unit == "weeks" || unit == "/week" {
        format!("{diff:.1}")
    } else {
        format!("{diff:.0}")
    };

    Delta {
        arrow,
        text: format!("{sign}{formatted} {unit}"),
        value: diff,
    }
}

/// Progress through the submit-to-completion journey. Unparseable dates yield
/// a zero-length journey rather than an error.
pub fn journey_metrics(snapshot: &Snapshot) -> Journey {
    let total_journey_days = match (
        parse_date(&snapshot.submit_date),
        parse_date(&snapshot.estimated_completion_date),
    ) {
        (Some(submit), Some(estimated)) => (estimated - submit).num_days(),
        _ => 0,
    };

    let (days_passed, progress_percentage) = if total_journey_days > 0 {
        let passed = total_journey_days - snapshot.remaining_days;
        let percentage =
            (passed as f64 / total_journey_days as f64 * 100.0).round() as i64;
        (passed, percentage)
    } else {
        (0, 0)
    };

    Journey {
        days_passed,
        remaining_days: snapshot.remaining_days,
        total_journey_days,
        progress_percentage,
    }
}

/// 20-cell block-character bar, one filled cell per 5%.
pub fn progress_bar(progress_percentage: i64) -> String {
    let filled = (progress_percentage / 5).clamp(0, 20) as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(20 - filled))
}

pub fn format_thousands(value: i64) -> String {
    value.to_formatted_string(&Locale::en)
}

/// Accepts plain `YYYY-MM-DD` dates as well as RFC 3339 timestamps.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    chrono::DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|timestamp| timestamp.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QueueAnalysis;
    use chrono::Utc;

    fn sample_snapshot(remaining_days: i64, position: i64) -> Snapshot {
        Snapshot {
            submit_date: "2024-12-19".to_string(),
            estimated_completion_date: "2026-10-01".to_string(),
            confidence_level: 0.85,
            remaining_days,
            queue_analysis: QueueAnalysis {
                adjusted_queue_position: position,
                current_backlog: 40_000,
                weekly_processing_rate: 8_000,
                estimated_queue_wait_weeks: 12.5,
            },
            employer_first_letter: "A".to_string(),
        }
    }

    fn sample_record(remaining_days: i64, position: i64) -> HistoryRecord {
        HistoryRecord {
            timestamp: Utc::now(),
            date_key: "2026-08-27".to_string(),
            estimated_date: "2026-10-01".to_string(),
            remaining_days,
            position,
            cases_ahead: 41_000,
            processing_rate: 7_500,
            estimated_wait: 13.0,
        }
    }

    #[test]
    fn first_run_is_alert_free() {
        let analysis = analyze_changes(&sample_snapshot(120, 5000), None);
        assert!(analysis.alerts.is_empty());
        assert!(analysis.position_improvement.is_none());
        assert!(analysis.time_change.is_none());
    }

    #[test]
    fn large_position_jump_triggers_moved_up_alert() {
        let analysis =
            analyze_changes(&sample_snapshot(120, 3000), Some(&sample_record(120, 4500)));
        assert!(analysis.alerts.iter().any(|alert| alert.contains("MOVED UP")));
        let improvement = analysis.position_improvement.unwrap();
        assert_eq!(improvement.amount, 1500);
    }

    #[test]
    fn small_improvement_records_without_alert() {
        let analysis =
            analyze_changes(&sample_snapshot(120, 4200), Some(&sample_record(120, 5000)));
        assert!(!analysis.alerts.iter().any(|alert| alert.contains("MOVED UP")));
        let improvement = analysis.position_improvement.unwrap();
        assert_eq!(improvement.amount, 800);
        assert_eq!(improvement.percentage, "16.0");
    }

    #[test]
    fn day_swing_alert_fires_at_three_days() {
        let gained = analyze_changes(&sample_snapshot(117, 5000), Some(&sample_record(120, 5000)));
        assert!(gained.alerts.iter().any(|alert| alert.contains("Gained 3 days")));
        assert_eq!(gained.time_change, Some(3));

        let lost = analyze_changes(&sample_snapshot(125, 5000), Some(&sample_record(120, 5000)));
        assert!(lost.alerts.iter().any(|alert| alert.contains("Lost 5 days")));

        let quiet = analyze_changes(&sample_snapshot(118, 5000), Some(&sample_record(120, 5000)));
        assert!(quiet.time_change.is_none());
        assert!(quiet.alerts.is_empty());
    }

    #[test]
    fn final_month_milestone_fires_only_on_crossing() {
        let crossing = analyze_changes(&sample_snapshot(30, 5000), Some(&sample_record(31, 5000)));
        assert!(crossing.alerts.iter().any(|alert| alert.contains("FINAL MONTH")));

        let already_inside =
            analyze_changes(&sample_snapshot(29, 5000), Some(&sample_record(30, 5000)));
        assert!(!already_inside
            .alerts
            .iter()
            .any(|alert| alert.contains("FINAL MONTH")));
    }

    #[test]
    fn final_quarter_milestone_fires_only_on_crossing() {
        let crossing = analyze_changes(&sample_snapshot(89, 5000), Some(&sample_record(95, 5000)));
        assert!(crossing.alerts.iter().any(|alert| alert.contains("FINAL QUARTER")));

        let already_inside =
            analyze_changes(&sample_snapshot(85, 5000), Some(&sample_record(88, 5000)));
        assert!(!already_inside
            .alerts
            .iter()
            .any(|alert| alert.contains("FINAL QUARTER")));
    }

    #[test]
    fn quarter_crossing_with_position_improvement() {
        // 95 days / #5000 yesterday, 89 days / #4000 today.
        let analysis =
            analyze_changes(&sample_snapshot(89, 4000), Some(&sample_record(95, 5000)));
        assert!(analysis.alerts.iter().any(|alert| alert.contains("FINAL QUARTER")));
        assert!(analysis.alerts.iter().any(|alert| alert.contains("Gained 6 days")));
        let improvement = analysis.position_improvement.unwrap();
        assert_eq!(improvement.amount, 1000);
        assert_eq!(improvement.percentage, "20.0");
    }

    #[test]
    fn number_delta_formats_by_magnitude_and_unit() {
        let positions = number_delta(42_000.0, 43_500.0, "positions");
        assert_eq!(positions.arrow, "🟢▼");
        assert_eq!(positions.text, "-1,500 positions");

        let weeks = number_delta(12.5, 12.0, "weeks");
        assert_eq!(weeks.arrow, "🔴▲");
        assert_eq!(weeks.text, "+0.5 weeks");

        let unchanged = number_delta(100.0, 100.0, "days");
        assert_eq!(unchanged.arrow, "↔️");
        assert_eq!(unchanged.text, "no change");
    }

    #[test]
    fn date_delta_signs_match_direction() {
        let later = date_delta("2026-10-05", "2026-10-01").unwrap();
        assert_eq!(later.arrow, "🔴▲");
        assert_eq!(later.text, "+4 days");

        let earlier = date_delta("2026-09-28", "2026-10-01").unwrap();
        assert_eq!(earlier.arrow, "🟢▼");
        assert_eq!(earlier.text, "-3 days");

        assert!(date_delta("not a date", "2026-10-01").is_none());
    }

    #[test]
    fn deltas_absent_without_previous_record() {
        assert!(calculate_deltas(&sample_snapshot(120, 5000), None).is_none());
    }

    #[test]
    fn journey_metrics_add_up() {
        let mut snapshot = sample_snapshot(200, 5000);
        snapshot.submit_date = "2026-01-01".to_string();
        snapshot.estimated_completion_date = "2026-12-27".to_string();

        let journey = journey_metrics(&snapshot);
        assert_eq!(journey.total_journey_days, 360);
        assert_eq!(journey.days_passed, 160);
        assert_eq!(journey.progress_percentage, 44);
    }

    #[test]
    fn journey_handles_unparseable_dates() {
        let mut snapshot = sample_snapshot(200, 5000);
        snapshot.submit_date = "unknown".to_string();

        let journey = journey_metrics(&snapshot);
        assert_eq!(journey.total_journey_days, 0);
        assert_eq!(journey.progress_percentage, 0);
    }

    #[test]
    fn progress_bar_has_twenty_cells() {
        assert_eq!(progress_bar(0), "░".repeat(20));
        assert_eq!(progress_bar(100), "█".repeat(20));
        let half = progress_bar(50);
        assert_eq!(half.chars().filter(|c| *c == '█').count(), 10);
        assert_eq!(half.chars().count(), 20);
    }
}
