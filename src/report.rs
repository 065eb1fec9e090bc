use std::fmt::Write;

use chrono::{Datelike, NaiveDate};

use crate::analyze::{self, FINAL_THIRD_DAYS, SIGNIFICANT_PROGRESS, SIGNIFICANT_TIME_GAIN};
use crate::models::{Analysis, DailyReportEntry, DeltaSet, Snapshot};

pub const WEEKDAY_SHORT: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Render the daily Telegram message (Markdown parse mode).
pub fn daily_message(
    snapshot: &Snapshot,
    analysis: &Analysis,
    deltas: Option<&DeltaSet>,
    today: NaiveDate,
) -> String {
    let queue = &snapshot.queue_analysis;
    let confidence = (snapshot.confidence_level * 100.0).round() as i64;
    let journey = analyze::journey_metrics(snapshot);
    let bar = analyze::progress_bar(journey.progress_percentage);

    let mut message = String::new();
    let _ = writeln!(message, "*📅 DAILY REPORT - {}*", format_naive_date(today));
    let _ = writeln!(message);

    let _ = write!(
        message,
        "*Estimated Date:* 🗓️ *{}* ({confidence}% confidence)",
        format_date(&snapshot.estimated_completion_date)
    );
    if let Some(delta) = deltas.and_then(|d| d.estimated_date.as_ref()) {
        let _ = write!(message, " {} {}", delta.arrow, delta.text);
    }
    let _ = writeln!(message);

    let _ = writeln!(
        message,
        "*Submit Date:* 📋 {}",
        format_date(&snapshot.submit_date)
    );

    let _ = write!(
        message,
        "*Days Remaining:* ⏱️ {} days",
        snapshot.remaining_days
    );
    if let Some(deltas) = deltas {
        let _ = write!(
            message,
            " {} {}",
            deltas.remaining_days.arrow, deltas.remaining_days.text
        );
    }
    let _ = writeln!(message);

    let _ = writeln!(message);
    let _ = writeln!(message, "*🛤️ Journey Progress:*");
    let _ = writeln!(message, "• Days Passed: {} days", journey.days_passed);
    let _ = writeln!(message, "• Remaining: {} days", journey.remaining_days);
    let _ = writeln!(message, "• Total Journey: {} days", journey.total_journey_days);
    let _ = writeln!(message);
    let _ = writeln!(message, "Progress: {}%", journey.progress_percentage);
    let _ = writeln!(message, "{bar}");
    let _ = writeln!(message);

    let _ = writeln!(message, "*📊 Queue Position:*");
    let _ = write!(
        message,
        "• Current Position: #{}",
        analyze::format_thousands(queue.adjusted_queue_position)
    );
    if let Some(deltas) = deltas {
        let _ = write!(message, " {} {}", deltas.position.arrow, deltas.position.text);
    }
    let _ = writeln!(message);

    let _ = write!(
        message,
        "• Ahead in Queue: {} cases",
        analyze::format_thousands(queue.current_backlog)
    );
    if let Some(deltas) = deltas {
        let _ = write!(
            message,
            " {} {}",
            deltas.cases_ahead.arrow, deltas.cases_ahead.text
        );
    }
    let _ = writeln!(message);

    let _ = write!(
        message,
        "• Processing Rate: {}/week",
        analyze::format_thousands(queue.weekly_processing_rate)
    );
    if let Some(deltas) = deltas {
        let _ = write!(
            message,
            " {} {}",
            deltas.processing_rate.arrow, deltas.processing_rate.text
        );
    }
    let _ = writeln!(message);

    let _ = write!(
        message,
        "• Estimated Wait: ~{:.1} weeks",
        queue.estimated_queue_wait_weeks
    );
    if let Some(deltas) = deltas {
        let _ = write!(
            message,
            " {} {}",
            deltas.estimated_wait.arrow, deltas.estimated_wait.text
        );
    }
    let _ = writeln!(message);

    if !analysis.alerts.is_empty() {
        let _ = writeln!(message);
        let _ = writeln!(message, "*🔔 ALERTS:*");
        for alert in &analysis.alerts {
            let _ = writeln!(message, "• {alert}");
        }
    }

    if let Some(improvement) = &analysis.position_improvement {
        let _ = writeln!(message);
        let _ = writeln!(message, "*📈 VS LAST CHECK:*");
        let _ = writeln!(
            message,
            "• Position: {} less",
            analyze::format_thousands(improvement.amount)
        );
        let _ = writeln!(message, "• Improvement: {}%", improvement.percentage);
    }

    let _ = writeln!(message);
    let _ = write!(
        message,
        "#PERMDaily #{}Queue",
        snapshot.employer_first_letter
    );

    message
}

/// Render the weekly Telegram summary from the stored daily entries.
pub fn weekly_message(
    snapshot: &Snapshot,
    reports: &[DailyReportEntry],
    week_number: u32,
    today: NaiveDate,
) -> String {
    if reports.is_empty() {
        return "*📊 WEEKLY SUMMARY*\n\n_Unable to generate weekly report: No historical data \
                found in storage._\n\nPlease ensure daily reports have been sent for at least a \
                few days to generate a weekly summary."
            .to_string();
    }

    let letter = &snapshot.employer_first_letter;
    let mut message = String::new();

    let _ = writeln!(message, "*📊 WEEKLY SUMMARY - Letter {letter}*");
    let _ = writeln!(
        message,
        "_Period: {} to {}_",
        format_naive_date(reports[0].timestamp.date_naive()),
        format_naive_date(today)
    );
    let _ = writeln!(message);

    let _ = writeln!(message, "*📈 WEEKLY PROGRESS:*");
    let _ = writeln!(message, "```");
    let _ = writeln!(message, "Day      Position    Days Left");
    let _ = writeln!(message, "------------------------------");
    for entry in reports {
        let day = WEEKDAY_SHORT[entry.timestamp.weekday().num_days_from_sunday() as usize];
        let _ = writeln!(
            message,
            "{:<6} #{:<10} {:<4} days",
            day,
            analyze::format_thousands(entry.position),
            entry.remaining_days
        );
    }
    let _ = writeln!(message, "```");
    let _ = writeln!(message);

    let first = &reports[0];
    let last = &reports[reports.len() - 1];
    let position_progress = first.position - last.position;
    let days_progress = first.remaining_days - last.remaining_days;
    let daily_average = position_progress as f64 / reports.len() as f64;

    let _ = writeln!(message, "*📊 WEEKLY STATISTICS:*");
    let _ = writeln!(
        message,
        "• Queue progress: {}{} positions",
        if position_progress > 0 { "+" } else { "" },
        analyze::format_thousands(position_progress)
    );
    let _ = writeln!(
        message,
        "• Time gain/loss: {}{} days",
        if days_progress > 0 { "+" } else { "" },
        days_progress
    );
    let _ = writeln!(message, "• Daily average: {daily_average:.0} positions/day");
    let _ = writeln!(
        message,
        "• Trend: {}",
        if position_progress > 0 {
            "⏫ Accelerating"
        } else {
            "⏬ Decelerating"
        }
    );

    let insights = weekly_insights(position_progress, days_progress, last.remaining_days);
    if !insights.is_empty() {
        let _ = writeln!(message);
        let _ = writeln!(message, "*💡 INSIGHTS:*");
        for insight in &insights {
            let _ = writeln!(message, "• {insight}");
        }
    }

    let _ = writeln!(message);
    let _ = write!(message, "#PERMWeekly #{letter}Summary #Week{week_number}");

    message
}

pub fn weekly_insights(
    position_progress: i64,
    days_progress: i64,
    remaining_days: i64,
) -> Vec<&'static str> {
    let mut insights = Vec::new();
    if position_progress > SIGNIFICANT_PROGRESS {
        insights.push("🎉 Great week! Processing above average");
    }
    if remaining_days < FINAL_THIRD_DAYS {
        insights.push("🎯 You're in the final third of the process");
    }
    if days_progress > SIGNIFICANT_TIME_GAIN {
        insights.push("⚡ Significant time gain this week");
    }
    insights
}

/// "Dec 19, 2024" style, or "N/A" when the value does not parse.
pub fn format_date(value: &str) -> String {
    match analyze::parse_date(value) {
        Some(date) => format_naive_date(date),
        None => "N/A".to_string(),
    }
}

pub fn format_naive_date(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}
