use crate::relay::{Relay, RelayResponse, TriggerHeaders};
use http::header::{ALLOW, HeaderName, HeaderValue};
use hyper::body::Incoming;
use hyper::service::Service;
use hyper::{Method, Request, Response, StatusCode};
use shared::http::{ResponseBody, make_boxed_error_response};
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Serves the retry trigger endpoint. Only `POST` is accepted, on any path.
pub struct RetryProxyService {
    relay: Arc<Relay>,
    remote_user_header: HeaderName,
}

impl RetryProxyService {
    pub fn new(relay: Relay, remote_user_header: HeaderName) -> Self {
        Self {
            relay: Arc::new(relay),
            remote_user_header,
        }
    }
}

impl Service<Request<Incoming>> for RetryProxyService {
    type Response = Response<ResponseBody>;
    type Error = Infallible;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let relay = self.relay.clone();
        let trigger = TriggerHeaders::from_headers(req.headers(), &self.remote_user_header);

        Box::pin(async move {
            if req.method() != Method::POST {
                tracing::debug!(method = %req.method(), "Rejecting non-POST retry request");
                let mut response = make_boxed_error_response(StatusCode::METHOD_NOT_ALLOWED);
                response
                    .headers_mut()
                    .insert(ALLOW, HeaderValue::from_static("POST"));
                return Ok(response);
            }

            // Runs detached from the connection, so a caller hanging up does
            // not cancel the status update or the downstream call.
            let body = req.into_body();
            let relaying = tokio::spawn(async move { relay.handle(trigger, body).await });

            match relaying.await {
                Ok(outcome) => Ok(outcome.into_response()),
                Err(e) => {
                    tracing::error!(error = %e, "Relay task did not complete");
                    Ok(RelayResponse::proxy_failed().into_response())
                }
            }
        })
    }
}
