use anyhow::{anyhow, bail, Context};
use futures::future::join_all;
use serde::Deserialize;
use tracing::info;

use crate::models::DeliveryOutcome;

#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    ok: bool,
    description: Option<String>,
}

/// Thin client over the Telegram Bot API sendMessage endpoint.
pub struct TelegramClient {
    client: reqwest::Client,
    api_url: String,
}

impl TelegramClient {
    pub fn new(client: reqwest::Client, bot_token: &str) -> Self {
        TelegramClient {
            client,
            api_url: format!("https://api.telegram.org/bot{bot_token}/sendMessage"),
        }
    }

    /// Send one Markdown message to a single chat. Success requires a 2xx
    /// response whose body carries `"ok": true`.
    pub async fn send_message(&self, chat_id: &str, text: &str) -> anyhow::Result<()> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "Markdown",
            "disable_web_page_preview": true,
        });

        let response = self
            .client
            .post(&self.api_url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("chat {chat_id}: request failed"))?;

        let status = response.status();
        let parsed = response
            .json::<SendMessageResponse>()
            .await
            .with_context(|| format!("chat {chat_id}: unparseable response ({status})"))?;

        if !parsed.ok {
            bail!(
                "chat {chat_id}: {}",
                parsed.description.unwrap_or_else(|| "unknown error".to_string())
            );
        }

        Ok(())
    }

    /// Fan the message out to every configured chat concurrently. Partial
    /// failures are tolerated; only a total failure is an error.
    pub async fn broadcast(
        &self,
        chat_ids: &[String],
        text: &str,
    ) -> anyhow::Result<DeliveryOutcome> {
        if chat_ids.is_empty() {
            bail!("no Telegram chat ids configured");
        }

        info!(chats = chat_ids.len(), "sending report to Telegram");

        let sends = chat_ids.iter().map(|chat_id| self.send_message(chat_id, text));
        let results = join_all(sends).await;
        let outcome = settle(results)?;

        info!(
            successful = outcome.successful,
            failed = outcome.failed,
            "delivery settled"
        );
        Ok(outcome)
    }
}

/// Collapse per-chat results into one outcome: at least one success wins,
/// all-failed surfaces the first failure's reason.
pub fn settle(results: Vec<anyhow::Result<()>>) -> anyhow::Result<DeliveryOutcome> {
    let total = results.len();
    let mut first_error = None;
    let mut successful = 0;

    for result in results {
        match result {
            Ok(()) => successful += 1,
            Err(err) => {
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }
    }

    let failed = total - successful;
    if failed == total {
        let reason = first_error.unwrap_or_else(|| anyhow!("unknown error"));
        return Err(reason.context("failed to send to all chats"));
    }

    Ok(DeliveryOutcome {
        total,
        successful,
        failed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_failure_among_many_still_succeeds() {
        let results = vec![Ok(()), Err(anyhow!("chat 2: blocked")), Ok(())];
        let outcome = settle(results).unwrap();
        assert_eq!(
            outcome,
            DeliveryOutcome {
                total: 3,
                successful: 2,
                failed: 1,
            }
        );
    }

    #[test]
    fn all_failures_surface_the_first_reason() {
        let results = vec![
            Err(anyhow!("chat 1: blocked")),
            Err(anyhow!("chat 2: not found")),
        ];
        let err = settle(results).unwrap_err();
        let chain = format!("{err:#}");
        assert!(chain.contains("failed to send to all chats"));
        assert!(chain.contains("chat 1: blocked"));
    }

    #[test]
    fn all_successes_settle_cleanly() {
        let outcome = settle(vec![Ok(()), Ok(())]).unwrap();
        assert_eq!(outcome.failed, 0);
        assert_eq!(outcome.successful, 2);
    }

    #[test]
    fn empty_results_are_a_total_failure() {
        assert!(settle(Vec::new()).is_err());
    }
}
