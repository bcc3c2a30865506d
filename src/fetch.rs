use std::time::Duration;

use backoff::future::retry_notify;
use backoff::Error as BackoffError;
use backoff::ExponentialBackoff;
use reqwest::Client;

use crate::config::Config;
use crate::error::{AppError, AppResult};

pub fn build_client(config: &Config) -> AppResult<Client> {
    Client::builder()
        .timeout(config.request_timeout)
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(|e| AppError::ConfigError(format!("cannot build HTTP client: {}", e)))
}

fn retry_policy(max_elapsed: Duration) -> ExponentialBackoff {
    ExponentialBackoff {
        max_elapsed_time: Some(max_elapsed),
        ..ExponentialBackoff::default()
    }
}

fn retry_notify_handler<E>(err: E, duration: Duration)
where
    E: std::fmt::Display,
{
    tracing::warn!(
        "Request failed: {}. Retrying in {:.1}s...",
        err,
        duration.as_secs_f32()
    );
}

/// GET a page body, retrying on timeouts, connection errors, 429 and 5xx.
#[tracing::instrument(skip(client, max_elapsed))]
pub async fn fetch_page(client: &Client, url: &str, max_elapsed: Duration) -> anyhow::Result<String> {
    let response = retry_notify(
        retry_policy(max_elapsed),
        || async {
            match client.get(url).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        Ok(resp)
                    } else if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                        tracing::debug!("Retrying on status: {}", status);
                        Err(BackoffError::transient(anyhow::anyhow!(
                            "Server returned retryable status: {}",
                            status
                        )))
                    } else {
                        Err(BackoffError::permanent(anyhow::anyhow!(
                            "Server returned non-retryable status: {}",
                            status
                        )))
                    }
                }
                Err(err) => {
                    if err.is_timeout() || err.is_connect() || err.is_request() {
                        tracing::debug!("Retrying on reqwest error: {}", err);
                        Err(BackoffError::transient(anyhow::Error::new(err)))
                    } else {
                        Err(BackoffError::permanent(anyhow::Error::new(err)))
                    }
                }
            }
        },
        retry_notify_handler,
    )
    .await?;

    Ok(response.text().await?)
}
