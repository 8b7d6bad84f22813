//! JSON-over-HTTP calls with retry and exponential backoff.
//!
//! Retry strategy shared by the embedding and chat providers:
//! - HTTP 429 or 5xx → retry with exponential backoff (1s, 2s, 4s, … capped at 32s)
//! - HTTP 4xx (not 429) → fail immediately
//! - Network error → retry

use std::time::Duration;

use anyhow::{bail, Result};

/// Everything needed to POST one JSON body to a provider endpoint.
pub struct JsonPost<'a> {
    /// Provider label used in error messages (e.g. `"OpenAI"`).
    pub label: &'a str,
    pub url: String,
    pub bearer: Option<&'a str>,
    pub body: &'a serde_json::Value,
    pub max_retries: u32,
}

pub fn client(timeout_secs: u64) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

pub async fn post_json(client: &reqwest::Client, req: JsonPost<'_>) -> Result<serde_json::Value> {
    let mut last_err = None;

    for attempt in 0..=req.max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tracing::debug!(provider = req.label, attempt, ?delay, "retrying request");
            tokio::time::sleep(delay).await;
        }

        let mut builder = client
            .post(&req.url)
            .header("Content-Type", "application/json")
            .json(req.body);
        if let Some(key) = req.bearer {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        match builder.send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return Ok(response.json().await?);
                }

                if status.as_u16() == 429 || status.is_server_error() {
                    let body_text = response.text().await.unwrap_or_default();
                    tracing::warn!(provider = req.label, %status, "transient provider error");
                    last_err = Some(anyhow::anyhow!(
                        "{} API error {}: {}",
                        req.label,
                        status,
                        body_text
                    ));
                    continue;
                }

                let body_text = response.text().await.unwrap_or_default();
                bail!("{} API error {}: {}", req.label, status, body_text);
            }
            Err(e) => {
                last_err = Some(e.into());
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("{} request failed after retries", req.label)))
}
