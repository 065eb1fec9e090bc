use anyhow::{bail, Context};

use crate::config::Config;
use crate::models::Snapshot;

/// Fetch a fresh prediction snapshot from the upstream PERM API.
/// One POST with the fixed request body, no retries.
pub async fn fetch_prediction(
    client: &reqwest::Client,
    config: &Config,
) -> anyhow::Result<Snapshot> {
    let body = serde_json::json!({
        "submit_date": config.submit_date,
        "employer_first_letter": config.employer_letter,
    });

    let response = client
        .post(&config.api_url)
        .json(&body)
        .send()
        .await
        .context("request to PERM API failed")?;

    if !response.status().is_success() {
        bail!("PERM API failed: {}", response.status());
    }

    response
        .json::<Snapshot>()
        .await
        .context("PERM API returned an unparseable body")
}
