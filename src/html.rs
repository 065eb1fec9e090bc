use std::fmt::Write;

use chrono::{Datelike, NaiveDate};

use crate::analyze;
use crate::config::Config;
use crate::models::{Analysis, DailyReportEntry, Delta, DeltaSet, Snapshot};
use crate::report::{format_date, format_naive_date, WEEKDAY_SHORT};

pub fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn delta_suffix(delta: Option<&Delta>) -> String {
    match delta {
        Some(delta) => format!(" {} {}", delta.arrow, escape_html(&delta.text)),
        None => String::new(),
    }
}

fn report_item(html: &mut String, label: &str, value: &str) {
    let _ = writeln!(
        html,
        "<div class=\"report-item\"><span class=\"label\">{label}</span>\
         <span class=\"value\">{value}</span></div>"
    );
}

/// Daily report rendered as an HTML fragment for the status page.
pub fn daily_fragment(
    snapshot: &Snapshot,
    analysis: &Analysis,
    deltas: Option<&DeltaSet>,
    today: NaiveDate,
) -> String {
    let queue = &snapshot.queue_analysis;
    let confidence = (snapshot.confidence_level * 100.0).round() as i64;
    let journey = analyze::journey_metrics(snapshot);

    let mut html = String::new();
    let _ = writeln!(
        html,
        "<div class=\"report-header\">📅 Daily Report - {}</div>",
        format_naive_date(today)
    );

    let _ = writeln!(html, "<div class=\"report-section\"><h4>📊 Key Information</h4>");
    report_item(
        &mut html,
        "🗓️ Estimated Completion Date:",
        &format!(
            "{}{}",
            escape_html(&format_date(&snapshot.estimated_completion_date)),
            delta_suffix(deltas.and_then(|d| d.estimated_date.as_ref()))
        ),
    );
    report_item(&mut html, "🎯 Confidence Level:", &format!("{confidence}%"));
    report_item(
        &mut html,
        "📋 Submit Date:",
        &escape_html(&format_date(&snapshot.submit_date)),
    );
    report_item(
        &mut html,
        "⏱️ Days Remaining:",
        &format!(
            "{} days{}",
            snapshot.remaining_days,
            delta_suffix(deltas.map(|d| &d.remaining_days))
        ),
    );
    let _ = writeln!(html, "</div>");

    let _ = writeln!(html, "<div class=\"report-section\"><h4>🛤️ Journey Progress</h4>");
    report_item(&mut html, "Days Passed:", &format!("{} days", journey.days_passed));
    report_item(&mut html, "Remaining:", &format!("{} days", journey.remaining_days));
    report_item(
        &mut html,
        "Total Journey:",
        &format!("{} days", journey.total_journey_days),
    );
    let _ = writeln!(
        html,
        "<div class=\"progress-container\"><div class=\"progress-bar-wrapper\">\
         <div class=\"progress-bar-fill\" style=\"width: {pct}%\"></div></div>\
         <div class=\"progress-text\">{pct}% Complete</div></div>",
        pct = journey.progress_percentage
    );
    let _ = writeln!(html, "</div>");

    let _ = writeln!(html, "<div class=\"report-section\"><h4>📈 Queue Analysis</h4>");
    report_item(
        &mut html,
        "Current Position:",
        &format!(
            "#{}{}",
            analyze::format_thousands(queue.adjusted_queue_position),
            delta_suffix(deltas.map(|d| &d.position))
        ),
    );
    report_item(
        &mut html,
        "Cases Ahead in Queue:",
        &format!(
            "{}{}",
            analyze::format_thousands(queue.current_backlog),
            delta_suffix(deltas.map(|d| &d.cases_ahead))
        ),
    );
    report_item(
        &mut html,
        "Processing Rate:",
        &format!(
            "{}/week{}",
            analyze::format_thousands(queue.weekly_processing_rate),
            delta_suffix(deltas.map(|d| &d.processing_rate))
        ),
    );
    report_item(
        &mut html,
        "Estimated Wait:",
        &format!(
            "~{:.1} weeks{}",
            queue.estimated_queue_wait_weeks,
            delta_suffix(deltas.map(|d| &d.estimated_wait))
        ),
    );
    let _ = writeln!(html, "</div>");

    if !analysis.alerts.is_empty() {
        let _ = writeln!(html, "<div class=\"report-section\"><h4>🔔 Alerts</h4>");
        for alert in &analysis.alerts {
            let _ = writeln!(
                html,
                "<div class=\"alert-box {}\">{}</div>",
                alert_class(alert),
                escape_html(alert)
            );
        }
        let _ = writeln!(html, "</div>");
    }

    if let Some(improvement) = &analysis.position_improvement {
        let _ = writeln!(
            html,
            "<div class=\"report-section\"><h4>📊 Comparison with Last Check</h4>\
             <div class=\"alert-box success\"><strong>Position Improvement:</strong> \
             {} positions better ({}% improvement)</div></div>",
            analyze::format_thousands(improvement.amount),
            escape_html(&improvement.percentage)
        );
    }

    html
}

/// Classify an alert box by its wording: gains are green, losses amber,
/// everything else informational.
pub fn alert_class(alert: &str) -> &'static str {
    let lower = alert.to_lowercase();
    if lower.contains("moved up") || lower.contains("gained") {
        "success"
    } else if lower.contains("lost") {
        ""
    } else {
        "info"
    }
}

/// Weekly summary rendered as an HTML fragment.
pub fn weekly_fragment(
    snapshot: &Snapshot,
    reports: &[DailyReportEntry],
    today: NaiveDate,
) -> String {
    if reports.is_empty() {
        return "<div class=\"report-header\">📊 Weekly Summary - Not Available</div>\
                <div class=\"report-section\"><div class=\"alert-box info\">\
                <strong>No weekly data available yet.</strong><br>\
                Weekly reports require multiple daily reports to be stored. Please check back \
                after the scheduled daily reports have run for several days.</div></div>"
            .to_string();
    }

    let letter = escape_html(&snapshot.employer_first_letter);
    let mut html = String::new();

    let _ = writeln!(
        html,
        "<div class=\"report-header\">📊 Weekly Summary - Letter {letter}</div>"
    );

    let _ = writeln!(html, "<div class=\"report-section\"><h4>📅 Period</h4>");
    report_item(
        &mut html,
        "From:",
        &format_naive_date(reports[0].timestamp.date_naive()),
    );
    report_item(&mut html, "To:", &format_naive_date(today));
    let _ = writeln!(html, "</div>");

    let _ = writeln!(html, "<div class=\"report-section\"><h4>📈 Weekly Progress</h4>");
    let _ = writeln!(
        html,
        "<table class=\"weekly-table\"><thead><tr><th>Day</th><th>Position</th>\
         <th>Days Left</th></tr></thead><tbody>"
    );
    for entry in reports {
        let day = WEEKDAY_SHORT[entry.timestamp.weekday().num_days_from_sunday() as usize];
        let _ = writeln!(
            html,
            "<tr><td>{day}</td><td>#{}</td><td>{} days</td></tr>",
            analyze::format_thousands(entry.position),
            entry.remaining_days
        );
    }
    let _ = writeln!(html, "</tbody></table></div>");

    let first = &reports[0];
    let last = &reports[reports.len() - 1];
    let position_progress = first.position - last.position;
    let days_progress = first.remaining_days - last.remaining_days;
    let daily_average = position_progress as f64 / reports.len() as f64;

    let _ = writeln!(html, "<div class=\"report-section\"><h4>📊 Weekly Statistics</h4>");
    report_item(
        &mut html,
        "Queue Progress:",
        &format!(
            "{}{} positions",
            if position_progress > 0 { "+" } else { "" },
            analyze::format_thousands(position_progress)
        ),
    );
    report_item(
        &mut html,
        "Time Gain/Loss:",
        &format!(
            "{}{} days",
            if days_progress > 0 { "+" } else { "" },
            days_progress
        ),
    );
    report_item(
        &mut html,
        "Daily Average:",
        &format!("{daily_average:.0} positions/day"),
    );
    report_item(
        &mut html,
        "Trend:",
        if position_progress > 0 {
            "⏫ Accelerating"
        } else {
            "⏬ Decelerating"
        },
    );
    let _ = writeln!(html, "</div>");

    let insights =
        crate::report::weekly_insights(position_progress, days_progress, last.remaining_days);
    if !insights.is_empty() {
        let _ = writeln!(html, "<div class=\"report-section\"><h4>💡 Insights</h4>");
        for insight in insights {
            let _ = writeln!(
                html,
                "<div class=\"alert-box info\">{}</div>",
                escape_html(insight)
            );
        }
        let _ = writeln!(html, "</div>");
    }

    html
}

/// Full status page served on `GET /`.
pub fn status_page(config: &Config, total_checks: u32) -> String {
    let chat_list = if config.chat_ids.is_empty() {
        "<p class=\"warning\">⚠️ No Telegram chat IDs configured</p>".to_string()
    } else {
        let mut list = String::from("<div class=\"chat-list\">");
        for (index, id) in config.chat_ids.iter().enumerate() {
            let _ = write!(
                list,
                "<div class=\"chat-item\">{}. {}</div>",
                index + 1,
                escape_html(id)
            );
        }
        list.push_str("</div>");
        list
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <title>PERM Tracker Pro</title>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <style>
    body {{ font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; max-width: 900px;
           margin: 40px auto; padding: 20px;
           background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); min-height: 100vh; }}
    .container {{ background: white; border-radius: 20px; padding: 30px;
                 box-shadow: 0 10px 30px rgba(0,0,0,0.2); }}
    h1 {{ color: #667eea; text-align: center; margin-bottom: 30px; }}
    .card {{ background: #f8f9fa; padding: 20px; border-radius: 10px; margin: 20px 0;
            border-left: 4px solid #667eea; }}
    button {{ background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); color: white;
             border: none; padding: 12px 24px; border-radius: 8px; cursor: pointer;
             font-size: 16px; margin: 5px; font-weight: 600; }}
    button.secondary {{ background: linear-gradient(135deg, #f093fb 0%, #f5576c 100%); }}
    .status {{ margin-top: 20px; padding: 15px; border-radius: 8px; background: #f8f9fa;
              min-height: 50px; }}
    .chat-list {{ margin-top: 10px; padding: 10px; background: #e9ecef; border-radius: 5px; }}
    .chat-item {{ padding: 5px; font-family: monospace; }}
    .warning {{ color: #dc3545; }}
    #reportResult {{ margin-top: 20px; padding: 25px; background: white; border-radius: 12px;
                    border: 2px solid #667eea; display: none; }}
    #reportResult.show {{ display: block; }}
    .report-header {{ background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
                     color: white; padding: 15px 20px; border-radius: 8px; margin-bottom: 20px;
                     font-size: 1.3em; font-weight: bold; }}
    .report-section {{ margin: 20px 0; padding: 15px; background: #f8f9fa; border-radius: 8px;
                      border-left: 4px solid #667eea; }}
    .report-section h4 {{ margin-top: 0; color: #667eea; }}
    .report-item {{ padding: 8px 0; display: flex; justify-content: space-between;
                   border-bottom: 1px solid #e0e0e0; }}
    .report-item:last-child {{ border-bottom: none; }}
    .report-item .label {{ font-weight: 600; color: #555; }}
    .report-item .value {{ color: #333; font-weight: bold; }}
    .alert-box {{ background: #fff3cd; border: 2px solid #ffc107; border-radius: 8px;
                 padding: 15px; margin: 10px 0; color: #856404; }}
    .alert-box.success {{ background: #d4edda; border-color: #28a745; color: #155724; }}
    .alert-box.info {{ background: #d1ecf1; border-color: #17a2b8; color: #0c5460; }}
    .weekly-table {{ width: 100%; border-collapse: collapse; margin: 15px 0; background: white; }}
    .weekly-table th {{ background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
                       color: white; padding: 12px; text-align: left; }}
    .weekly-table td {{ padding: 10px 12px; border-bottom: 1px solid #e0e0e0; }}
    .button-group {{ display: flex; flex-wrap: wrap; gap: 10px; }}
    .progress-bar-wrapper {{ width: 100%; height: 30px; background: #e0e0e0;
                            border-radius: 15px; overflow: hidden; }}
    .progress-bar-fill {{ height: 100%;
                         background: linear-gradient(90deg, #667eea 0%, #764ba2 100%); }}
    .progress-text {{ margin-top: 8px; text-align: center; font-weight: bold; color: #667eea; }}
  </style>
</head>
<body>
  <div class="container">
    <h1>🤖 PERM Tracker Pro</h1>

    <div class="card">
      <h3>🔔 Active Schedule</h3>
      <p><strong>Daily:</strong> Monday to Saturday, 6:00 AM UTC</p>
      <p><strong>Weekly:</strong> Sunday, 6:00 AM UTC</p>
    </div>

    <div class="card">
      <h3>⚡ Test Schedulers (Send to Telegram)</h3>
      <div class="button-group">
        <button onclick="test('daily')">Test Daily Report</button>
        <button onclick="test('weekly')">Test Weekly Report</button>
      </div>
    </div>

    <div class="card">
      <h3>📊 Generate &amp; View Reports</h3>
      <div class="button-group">
        <button class="secondary" onclick="generateReport('daily')">Generate Daily Report</button>
        <button class="secondary" onclick="generateReport('weekly')">Generate Weekly Report</button>
      </div>
    </div>

    <div class="card">
      <h3>📋 Current Status</h3>
      <p>Submit Date: <strong>{submit_date}</strong></p>
      <p>Employer Letter: <strong>{employer_letter}</strong></p>
      <p>Total Checks: <strong>{total_checks}</strong></p>
      <p>Telegram Chats: <strong>{chat_count}</strong></p>
      {chat_list}
    </div>

    <div id="status" class="status"></div>
    <div id="reportResult" role="status" aria-live="polite"></div>
  </div>

  <script>
    async function test(type) {{
      const status = document.getElementById('status');
      status.textContent = '⏳ Processing...';
      try {{
        const response = await fetch('/', {{
          method: 'POST',
          headers: {{ 'Content-Type': 'application/json' }},
          body: JSON.stringify({{ type: type }})
        }});
        const text = await response.text();
        status.textContent = response.ok ? '✅ ' + text : '❌ Error: ' + text;
      }} catch (error) {{
        status.textContent = '❌ Error: ' + error.message;
      }}
    }}

    async function generateReport(type) {{
      const status = document.getElementById('status');
      const reportResult = document.getElementById('reportResult');
      status.textContent = '⏳ Generating report...';
      reportResult.innerHTML = '';
      reportResult.classList.remove('show');
      try {{
        const response = await fetch('/', {{
          method: 'POST',
          headers: {{ 'Content-Type': 'application/json' }},
          body: JSON.stringify({{ type: type, display: true }})
        }});
        if (!response.ok) {{
          throw new Error(await response.text());
        }}
        reportResult.innerHTML = await response.text();
        reportResult.classList.add('show');
        status.textContent = '✅ Report generated successfully!';
        reportResult.scrollIntoView({{ behavior: 'smooth', block: 'nearest' }});
      }} catch (error) {{
        status.textContent = '❌ Error: ' + error.message;
      }}
    }}
  </script>
</body>
</html>
"#,
        submit_date = escape_html(&format_date(&config.submit_date)),
        employer_letter = escape_html(&config.employer_letter),
        total_checks = total_checks,
        chat_count = config.chat_ids.len(),
        chat_list = chat_list,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QueueAnalysis;

    fn sample_snapshot() -> Snapshot {
        Snapshot {
            submit_date: "2024-12-19".to_string(),
            estimated_completion_date: "2026-10-01".to_string(),
            confidence_level: 0.85,
            remaining_days: 120,
            queue_analysis: QueueAnalysis {
                adjusted_queue_position: 4000,
                current_backlog: 40_000,
                weekly_processing_rate: 8_000,
                estimated_queue_wait_weeks: 12.5,
            },
            employer_first_letter: "A".to_string(),
        }
    }

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(
            escape_html(r#"<b>&"fish"'</b>"#),
            "&lt;b&gt;&amp;&quot;fish&quot;&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn daily_fragment_escapes_upstream_text() {
        let mut snapshot = sample_snapshot();
        snapshot.estimated_completion_date = "<script>".to_string();
        let today = NaiveDate::from_ymd_opt(2026, 8, 28).unwrap();
        let html = daily_fragment(&snapshot, &Analysis::default(), None, today);

        assert!(!html.contains("<script>"));
        assert!(html.contains("N/A")); // unparseable date falls back
        assert!(html.contains("Queue Analysis"));
        assert!(html.contains("#4,000"));
    }

    #[test]
    fn alert_classes_follow_wording() {
        assert_eq!(alert_class("🚀 MOVED UP 1,200 positions in queue!"), "success");
        assert_eq!(alert_class("⏱️ Gained 4 days in estimate!"), "success");
        assert_eq!(alert_class("⚠️ Lost 3 days in estimate"), "");
        assert_eq!(alert_class("🎯 ENTERED FINAL MONTH!"), "info");
    }

    #[test]
    fn weekly_fragment_without_data_shows_notice() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
        let html = weekly_fragment(&sample_snapshot(), &[], today);
        assert!(html.contains("No weekly data available yet"));
    }

    #[test]
    fn status_page_escapes_chat_ids() {
        let config = Config {
            telegram_bot_token: "token".to_string(),
            chat_ids: vec!["<img>".to_string()],
            database_url: None,
            api_url: "http://localhost".to_string(),
            submit_date: "2024-12-19".to_string(),
            employer_letter: "A".to_string(),
            port: 8080,
        };
        let page = status_page(&config, 7);
        assert!(page.contains("&lt;img&gt;"));
        assert!(!page.contains("<img>"));
        assert!(page.contains("Total Checks: <strong>7</strong>"));
    }
}
