use crate::config::RelayConfig;
use crate::errors::RelayError;
use crate::headers::{
    JSON_UTF8, X_EVENT_KEY, X_GRANITE_SHA, X_REQUEST_ID, downstream_headers, header_str,
    header_value, lossy,
};
use crate::metrics_defs::{RELAY_FAILURES, RELAY_REQUEST_DURATION};
use crate::status_notifier::StatusNotifier;
use crate::utils::truncate;
use http::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use http::{Response, StatusCode};
use http_body_util::{BodyExt, Empty, Full};
use hyper::body::{Body, Bytes};
use reqwest::redirect::Policy;
use shared::http::{ResponseBody, make_boxed_error_response};
use shared::{counter, histogram};
use std::fmt::Display;
use std::time::{Duration, Instant};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_TIMEOUT: Duration = Duration::from_secs(30);
const LOGGED_BODY_CHARS: usize = 500;

pub const PROXY_FAILED_BODY: &str = r#"{"ok":false,"error":"proxy-failed"}"#;

/// Identifying headers of a retry trigger. The event key and request id are
/// kept as sent since they are forwarded downstream.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TriggerHeaders {
    pub commit_sha: Option<String>,
    pub event_key: Option<HeaderValue>,
    pub request_id: Option<HeaderValue>,
    pub remote_user: Option<String>,
}

impl TriggerHeaders {
    pub fn from_headers(headers: &HeaderMap, remote_user_header: &HeaderName) -> Self {
        TriggerHeaders {
            commit_sha: header_str(headers, &X_GRANITE_SHA),
            event_key: header_value(headers, &X_EVENT_KEY),
            request_id: header_value(headers, &X_REQUEST_ID),
            remote_user: header_str(headers, remote_user_header),
        }
    }
}

/// What the caller gets back. `body` is `None` when the downstream sent no
/// entity, which is distinct from an empty one.
#[derive(Debug)]
pub struct RelayResponse {
    pub status: StatusCode,
    pub content_type: HeaderValue,
    pub body: Option<Bytes>,
}

impl RelayResponse {
    pub fn proxy_failed() -> Self {
        RelayResponse {
            status: StatusCode::BAD_GATEWAY,
            content_type: HeaderValue::from_static(JSON_UTF8),
            body: Some(Bytes::from_static(PROXY_FAILED_BODY.as_bytes())),
        }
    }

    pub fn into_response(self) -> Response<ResponseBody> {
        let body = match self.body {
            Some(bytes) => Full::new(bytes).boxed(),
            None => Empty::new().boxed(),
        };

        let mut response = Response::new(body);
        *response.status_mut() = self.status;
        response.headers_mut().insert(CONTENT_TYPE, self.content_type);
        response
    }
}

/// Outcome of a retry trigger: either a relayed downstream result or an
/// inbound body that could not be read.
#[derive(Debug)]
pub enum RelayOutcome {
    Relayed(RelayResponse),
    BodyUnreadable,
}

impl RelayOutcome {
    pub fn into_response(self) -> Response<ResponseBody> {
        match self {
            RelayOutcome::Relayed(response) => response.into_response(),
            RelayOutcome::BodyUnreadable => {
                make_boxed_error_response(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

pub struct Relay {
    client: reqwest::Client,
    target_url: String,
    notifier: StatusNotifier,
}

impl Relay {
    pub fn new(config: RelayConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(READ_TIMEOUT)
            .redirect(Policy::none())
            .no_proxy()
            .build()?;

        Ok(Relay {
            client,
            target_url: config.target_url,
            notifier: StatusNotifier::new(config.status_api)?,
        })
    }

    pub fn target_url(&self) -> &str {
        &self.target_url
    }

    /// Marks the commit as in progress, then forwards `body` to the target and
    /// relays its answer.
    pub async fn handle<B>(&self, trigger: TriggerHeaders, body: B) -> RelayOutcome
    where
        B: Body,
        B::Error: Display,
    {
        let event_key = trigger.event_key.as_ref().map(lossy);
        let request_id = trigger.request_id.as_ref().map(lossy);
        tracing::debug!(
            user = trigger.remote_user.as_deref(),
            sha = trigger.commit_sha.as_deref(),
            event_key = event_key.as_deref(),
            request_id = request_id.as_deref(),
            "Retry request received"
        );

        // Best-effort; its outcome never changes the response.
        self.notifier
            .mark_in_progress(trigger.commit_sha.as_deref())
            .await;

        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read retry request body");
                return RelayOutcome::BodyUnreadable;
            }
        };
        tracing::debug!(bytes = body.len(), url = %self.target_url, "Forwarding retry request");

        let start = Instant::now();
        let response = match self.forward(&trigger, body).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(url = %self.target_url, error = %e, cause = ?e, "Proxy call failed");
                counter!(RELAY_FAILURES).increment(1);
                RelayResponse::proxy_failed()
            }
        };
        histogram!(RELAY_REQUEST_DURATION, "status" => response.status.as_u16().to_string())
            .record(start.elapsed().as_secs_f64());

        RelayOutcome::Relayed(response)
    }

    async fn forward(
        &self,
        trigger: &TriggerHeaders,
        body: Bytes,
    ) -> Result<RelayResponse, RelayError> {
        let headers =
            downstream_headers(trigger.event_key.as_ref(), trigger.request_id.as_ref())?;

        let response = self
            .client
            .post(&self.target_url)
            .headers(headers)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let content_type = response.headers().get(CONTENT_TYPE).cloned();
        let bytes = response.bytes().await?;

        // An error status without an entity means there is no body at all.
        let body = match status.as_u16() >= 400 && bytes.is_empty() {
            true => None,
            false => Some(bytes),
        };

        tracing::info!(
            status = status.as_u16(),
            content_type = ?content_type,
            body = %logged_body(body.as_ref()),
            "Upstream responded"
        );

        Ok(RelayResponse {
            status,
            content_type: content_type.unwrap_or_else(|| HeaderValue::from_static(JSON_UTF8)),
            body,
        })
    }
}

fn logged_body(body: Option<&Bytes>) -> String {
    match body {
        Some(bytes) => truncate(&String::from_utf8_lossy(bytes), LOGGED_BODY_CHARS),
        None => "<none>".to_string(),
    }
}
