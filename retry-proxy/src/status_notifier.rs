//! Best-effort build status update marking a commit's review as in progress.
//!
//! Nothing in here reports back to the relay: missing configuration is a skip,
//! and every failure is logged and dropped.

use crate::config::StatusApiConfig;
use crate::errors::NotifyError;
use crate::metrics_defs::STATUS_NOTIFY_OUTCOME;
use reqwest::StatusCode;
use reqwest::redirect::Policy;
use serde::Serialize;
use shared::counter;
use std::time::Duration;
use url::Url;
use url::form_urlencoded::byte_serialize;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Serialize)]
struct BuildStatus {
    state: &'static str,
    key: &'static str,
    name: &'static str,
    description: &'static str,
}

const IN_PROGRESS: BuildStatus = BuildStatus {
    state: "INPROGRESS",
    key: "Granite",
    name: "AI Review",
    description: "Retry requested",
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    Skipped,
    Sent(StatusCode),
    Failed,
}

impl NotifyOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotifyOutcome::Skipped => "skipped",
            NotifyOutcome::Sent(_) => "sent",
            NotifyOutcome::Failed => "failed",
        }
    }
}

pub struct StatusNotifier {
    client: reqwest::Client,
    api: StatusApiConfig,
}

impl StatusNotifier {
    pub fn new(api: StatusApiConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(READ_TIMEOUT)
            .redirect(Policy::none())
            .no_proxy()
            .build()?;

        Ok(StatusNotifier { client, api })
    }

    /// Marks `sha` as in progress on the status API. The outcome is only
    /// informational.
    pub async fn mark_in_progress(&self, sha: Option<&str>) -> NotifyOutcome {
        let outcome = self.notify(sha).await;
        counter!(STATUS_NOTIFY_OUTCOME, "outcome" => outcome.as_str()).increment(1);
        outcome
    }

    async fn notify(&self, sha: Option<&str>) -> NotifyOutcome {
        let Some(sha) = sha.filter(|s| !s.is_empty()) else {
            return NotifyOutcome::Skipped;
        };
        let Some((base_url, token)) = self.api.credentials() else {
            tracing::debug!(sha, "Skipping INPROGRESS build status, status API not configured");
            return NotifyOutcome::Skipped;
        };

        match self.post_in_progress(base_url, token, sha).await {
            Ok(StatusCode::NO_CONTENT) => {
                tracing::info!(sha, status = 204, "Build status INPROGRESS posted");
                NotifyOutcome::Sent(StatusCode::NO_CONTENT)
            }
            Ok(status) => {
                tracing::info!(
                    sha,
                    status = status.as_u16(),
                    "Build status INPROGRESS answered with unexpected status"
                );
                NotifyOutcome::Sent(status)
            }
            Err(e) => {
                tracing::warn!(sha, error = %e, cause = ?e, "Marking commit in progress failed");
                NotifyOutcome::Failed
            }
        }
    }

    async fn post_in_progress(
        &self,
        base_url: &str,
        token: &str,
        sha: &str,
    ) -> Result<StatusCode, NotifyError> {
        let url = build_status_url(base_url, sha)?;
        // The response is dropped unread, which releases the connection.
        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(&IN_PROGRESS)
            .send()
            .await?;

        Ok(response.status())
    }
}

fn build_status_url(base_url: &str, sha: &str) -> Result<Url, url::ParseError> {
    let encoded_sha: String = byte_serialize(sha.as_bytes()).collect();
    Url::parse(&format!(
        "{}/rest/build-status/1.0/commits/{}",
        base_url.trim_end_matches('/'),
        encoded_sha
    ))
}
