use chrono::{DateTime, Datelike, Utc, Weekday};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::models::{DailyReportEntry, DeliveryOutcome, HistoryRecord, Snapshot};
use crate::store::{self, HistoryState, HistoryStore};
use crate::telegram::TelegramClient;
use crate::{analyze, fetch, html, report};

/// UTC hour at which the scheduled reports go out.
pub const RUN_HOUR: u32 = 6;

/// Everything one report cycle needs, borrowed from the caller.
pub struct JobContext<'a> {
    pub config: &'a Config,
    pub client: &'a reqwest::Client,
    pub store: &'a HistoryStore,
}

impl JobContext<'_> {
    fn telegram(&self) -> TelegramClient {
        TelegramClient::new(self.client.clone(), &self.config.telegram_bot_token)
    }
}

struct DailyInputs {
    snapshot: Snapshot,
    previous: Option<HistoryRecord>,
}

async fn daily_inputs(ctx: &JobContext<'_>) -> anyhow::Result<DailyInputs> {
    let snapshot = fetch::fetch_prediction(ctx.client, ctx.config).await?;
    let previous = ctx.store.previous_snapshot(Utc::now().date_naive()).await;
    Ok(DailyInputs { snapshot, previous })
}

/// One daily cycle: fetch, diff against yesterday, deliver, then persist
/// today's observation (persistence is best-effort).
pub async fn run_daily(
    ctx: &JobContext<'_>,
    history: &mut HistoryState,
) -> anyhow::Result<DeliveryOutcome> {
    info!("sending daily report");

    let inputs = daily_inputs(ctx).await?;
    let analysis = analyze::analyze_changes(&inputs.snapshot, history.last_check.as_ref());
    let deltas = analyze::calculate_deltas(&inputs.snapshot, inputs.previous.as_ref());

    let now = Utc::now();
    let message = report::daily_message(
        &inputs.snapshot,
        &analysis,
        deltas.as_ref(),
        now.date_naive(),
    );

    let outcome = ctx.telegram().broadcast(&ctx.config.chat_ids, &message).await?;

    record_daily_check(ctx, history, &inputs.snapshot, now).await;
    Ok(outcome)
}

/// Render the daily report as an HTML fragment without delivering it. Updates
/// the in-memory last-check state but writes nothing to storage.
pub async fn render_daily_html(
    ctx: &JobContext<'_>,
    history: &mut HistoryState,
) -> anyhow::Result<String> {
    let inputs = daily_inputs(ctx).await?;
    let analysis = analyze::analyze_changes(&inputs.snapshot, history.last_check.as_ref());
    let deltas = analyze::calculate_deltas(&inputs.snapshot, inputs.previous.as_ref());

    let now = Utc::now();
    let fragment = html::daily_fragment(
        &inputs.snapshot,
        &analysis,
        deltas.as_ref(),
        now.date_naive(),
    );

    let date_key = store::date_key(now.date_naive());
    history.record_check(HistoryRecord::from_snapshot(&inputs.snapshot, now, date_key));
    Ok(fragment)
}

/// One weekly cycle: fetch the current snapshot, summarize the stored daily
/// entries, deliver, and bump the check counter.
pub async fn run_weekly(
    ctx: &JobContext<'_>,
    history: &mut HistoryState,
) -> anyhow::Result<DeliveryOutcome> {
    info!("sending weekly report");

    let snapshot = fetch::fetch_prediction(ctx.client, ctx.config).await?;
    let reports = ctx.store.recent_reports().await;
    let message = report::weekly_message(
        &snapshot,
        &reports,
        history.total_checks + 1,
        Utc::now().date_naive(),
    );

    let outcome = ctx.telegram().broadcast(&ctx.config.chat_ids, &message).await?;

    history.total_checks += 1;
    Ok(outcome)
}

pub async fn render_weekly_html(ctx: &JobContext<'_>) -> anyhow::Result<String> {
    let snapshot = fetch::fetch_prediction(ctx.client, ctx.config).await?;
    let reports = ctx.store.recent_reports().await;
    Ok(html::weekly_fragment(&snapshot, &reports, Utc::now().date_naive()))
}

async fn record_daily_check(
    ctx: &JobContext<'_>,
    history: &mut HistoryState,
    snapshot: &Snapshot,
    now: DateTime<Utc>,
) {
    let date_key = store::date_key(now.date_naive());
    let record = HistoryRecord::from_snapshot(snapshot, now, date_key);

    if let Err(err) = ctx.store.store_snapshot(&record).await {
        warn!("storage: failed to store daily snapshot: {err:#}");
    }
    if let Err(err) = ctx
        .store
        .append_daily_report(DailyReportEntry::from_snapshot(snapshot, now))
        .await
    {
        warn!("storage: failed to append daily report entry: {err:#}");
    }

    history.record_check(record);
}

/// Time-triggered entry point: Sunday runs the weekly path, every other day
/// the daily one. Failures are logged, never propagated.
pub async fn run_tick(ctx: &JobContext<'_>, history: &mut HistoryState) {
    let now = Utc::now();
    info!("scheduled trigger at {now}");

    let result = if now.weekday() == Weekday::Sun {
        run_weekly(ctx, history).await
    } else {
        run_daily(ctx, history).await
    };

    match result {
        Ok(outcome) => info!(
            successful = outcome.successful,
            failed = outcome.failed,
            "scheduled task executed successfully"
        ),
        Err(err) => error!("scheduled task failed: {err:#}"),
    }
}

/// The next 06:00 UTC strictly after `now`.
pub fn next_run_after(now: DateTime<Utc>) -> DateTime<Utc> {
    let today_run = now
        .date_naive()
        .and_hms_opt(RUN_HOUR, 0, 0)
        .map(|run| run.and_utc())
        .unwrap_or(now);
    if now < today_run {
        today_run
    } else {
        today_run + chrono::Duration::days(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn run_before_six_is_same_day() {
        let now = Utc.with_ymd_and_hms(2026, 8, 28, 4, 30, 0).unwrap();
        let next = next_run_after(now);
        assert_eq!(next.day(), 28);
        assert_eq!(next.hour(), RUN_HOUR);
    }

    #[test]
    fn run_after_six_rolls_to_tomorrow() {
        let now = Utc.with_ymd_and_hms(2026, 8, 28, 6, 0, 0).unwrap();
        let next = next_run_after(now);
        assert_eq!(next.day(), 29);
        assert_eq!(next.hour(), RUN_HOUR);
    }

    #[test]
    fn rollover_crosses_month_boundaries() {
        let now = Utc.with_ymd_and_hms(2026, 8, 31, 12, 0, 0).unwrap();
        let next = next_run_after(now);
        assert_eq!(next.month(), 9);
        assert_eq!(next.day(), 1);
    }
}
