use anyhow::Context;
use chrono::{Datelike, NaiveDate, Weekday};
use sqlx::{PgPool, Row};
use tracing::warn;

use crate::models::{DailyReportEntry, HistoryRecord};

/// Stored `daily_reports` entries are capped at a full week.
pub const MAX_STORED_REPORTS: usize = 7;
/// The weekly summary covers Monday through Saturday.
pub const WEEKLY_WINDOW: usize = 6;

const DAILY_REPORTS_KEY: &str = "daily_reports";

/// Last-check state carried between invocations. Owned by the caller (the
/// server keeps it behind a mutex, CLI runs keep it local) so every run is a
/// function of (input, prior state) rather than a module global.
#[derive(Debug, Clone, Default)]
pub struct HistoryState {
    pub last_check: Option<HistoryRecord>,
    pub total_checks: u32,
}

impl HistoryState {
    pub fn record_check(&mut self, record: HistoryRecord) {
        self.last_check = Some(record);
    }
}

/// Key-value history store over an optional Postgres table. Without a
/// configured database every read is empty and every write is a no-op, so
/// history silently resets on restart.
#[derive(Clone)]
pub struct HistoryStore {
    pool: Option<PgPool>,
}

impl HistoryStore {
    pub fn new(pool: Option<PgPool>) -> Self {
        HistoryStore { pool }
    }

    pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS report_history (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await
        .context("failed to create report_history table")?;
        Ok(())
    }

    async fn kv_get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let Some(pool) = &self.pool else {
            return Ok(None);
        };

        let row = sqlx::query("SELECT value FROM report_history WHERE key = $1")
            .bind(key)
            .fetch_optional(pool)
            .await
            .with_context(|| format!("failed to read key {key}"))?;

        Ok(row.map(|row| row.get("value")))
    }

    async fn kv_put(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let Some(pool) = &self.pool else {
            return Ok(());
        };

        sqlx::query(
            r#"
            INSERT INTO report_history (key, value)
            VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(pool)
        .await
        .with_context(|| format!("failed to write key {key}"))?;

        Ok(())
    }

    /// The previous report day's snapshot, looked up by date key. Best-effort:
    /// lookup or decode failures are logged and read as "no prior record".
    pub async fn previous_snapshot(&self, today: NaiveDate) -> Option<HistoryRecord> {
        let key = snapshot_key(previous_report_date(today));
        match self.kv_get(&key).await {
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(record) => Some(record),
                Err(err) => {
                    warn!("storage: snapshot {key} is unreadable: {err}");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                warn!("storage: failed to fetch previous snapshot: {err:#}");
                None
            }
        }
    }

    pub async fn store_snapshot(&self, record: &HistoryRecord) -> anyhow::Result<()> {
        let key = format!("daily_snapshot_{}", record.date_key);
        let json = serde_json::to_string(record)?;
        self.kv_put(&key, &json).await
    }

    /// Append today's entry to the rolling report list, keeping the last
    /// [`MAX_STORED_REPORTS`] entries.
    pub async fn append_daily_report(&self, entry: DailyReportEntry) -> anyhow::Result<()> {
        let mut reports: Vec<DailyReportEntry> = match self.kv_get(DAILY_REPORTS_KEY).await? {
            Some(json) => serde_json::from_str(&json).unwrap_or_default(),
            None => Vec::new(),
        };

        reports.push(entry);
        let reports = trim_reports(reports);
        self.kv_put(DAILY_REPORTS_KEY, &serde_json::to_string(&reports)?)
            .await
    }

    /// The last [`WEEKLY_WINDOW`] daily entries for the weekly summary.
    /// Best-effort: failures read as an empty history.
    pub async fn recent_reports(&self) -> Vec<DailyReportEntry> {
        let reports: Vec<DailyReportEntry> = match self.kv_get(DAILY_REPORTS_KEY).await {
            Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_default(),
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!("storage: failed to fetch report history: {err:#}");
                Vec::new()
            }
        };
        weekly_window(reports)
    }
}

pub fn trim_reports(mut reports: Vec<DailyReportEntry>) -> Vec<DailyReportEntry> {
    if reports.len() > MAX_STORED_REPORTS {
        reports.drain(..reports.len() - MAX_STORED_REPORTS);
    }
    reports
}

pub fn weekly_window(mut reports: Vec<DailyReportEntry>) -> Vec<DailyReportEntry> {
    if reports.len() > WEEKLY_WINDOW {
        reports.drain(..reports.len() - WEEKLY_WINDOW);
    }
    reports
}

pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn snapshot_key(date: NaiveDate) -> String {
    format!("daily_snapshot_{}", date_key(date))
}

/// The day to compare against: Saturday when today is Monday (no Sunday
/// report), otherwise yesterday.
pub fn previous_report_date(today: NaiveDate) -> NaiveDate {
    let days_back = if today.weekday() == Weekday::Mon { 2 } else { 1 };
    today - chrono::Duration::days(days_back)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn entry(position: i64) -> DailyReportEntry {
        DailyReportEntry {
            timestamp: Utc.with_ymd_and_hms(2026, 8, 24, 6, 0, 0).unwrap(),
            position,
            remaining_days: 120,
        }
    }

    #[test]
    fn monday_compares_to_saturday() {
        let monday = NaiveDate::from_ymd_opt(2026, 8, 24).unwrap();
        let previous = previous_report_date(monday);
        assert_eq!(previous, NaiveDate::from_ymd_opt(2026, 8, 22).unwrap());
        assert_eq!(previous.weekday(), Weekday::Sat);
    }

    #[test]
    fn other_days_compare_to_yesterday() {
        let friday = NaiveDate::from_ymd_opt(2026, 8, 28).unwrap();
        assert_eq!(
            previous_report_date(friday),
            NaiveDate::from_ymd_opt(2026, 8, 27).unwrap()
        );
    }

    #[test]
    fn snapshot_keys_use_iso_dates() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        assert_eq!(snapshot_key(date), "daily_snapshot_2026-01-05");
    }

    #[test]
    fn report_list_is_trimmed_to_a_week() {
        let reports: Vec<_> = (0..10).map(entry).collect();
        let trimmed = trim_reports(reports);
        assert_eq!(trimmed.len(), MAX_STORED_REPORTS);
        assert_eq!(trimmed[0].position, 3); // oldest three dropped
        assert_eq!(trimmed.last().unwrap().position, 9);
    }

    #[test]
    fn weekly_window_returns_last_six() {
        let reports: Vec<_> = (0..7).map(entry).collect();
        let window = weekly_window(reports);
        assert_eq!(window.len(), WEEKLY_WINDOW);
        assert_eq!(window[0].position, 1);
    }

    #[test]
    fn short_lists_pass_through_unchanged() {
        let reports: Vec<_> = (0..3).map(entry).collect();
        assert_eq!(trim_reports(reports.clone()).len(), 3);
        assert_eq!(weekly_window(reports).len(), 3);
    }

    #[test]
    fn record_check_replaces_last_check() {
        let mut state = HistoryState::default();
        assert!(state.last_check.is_none());

        let record = HistoryRecord {
            timestamp: Utc::now(),
            date_key: "2026-08-28".to_string(),
            estimated_date: "2026-10-01".to_string(),
            remaining_days: 120,
            position: 4000,
            cases_ahead: 40_000,
            processing_rate: 8_000,
            estimated_wait: 12.5,
        };
        state.record_check(record);
        assert_eq!(state.last_check.as_ref().unwrap().position, 4000);
    }
}
