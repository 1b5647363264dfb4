// Header names read from the retry trigger, and the headers derived from them
// for the downstream call.

use http::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, InvalidHeaderValue};
use uuid::Uuid;

pub const X_GRANITE_SHA: HeaderName = HeaderName::from_static("x-granite-sha");
pub const X_EVENT_KEY: HeaderName = HeaderName::from_static("x-event-key");
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

pub const JSON_UTF8: &str = "application/json; charset=utf-8";
pub const DEFAULT_EVENT_KEY: &str = "pr:opened";

/// Returns the header as a string, treating missing, empty and non UTF-8
/// values alike.
pub fn header_str(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Returns the header value as sent, or `None` when it is missing or empty.
pub fn header_value(headers: &HeaderMap, name: &HeaderName) -> Option<HeaderValue> {
    headers.get(name).filter(|v| !v.is_empty()).cloned()
}

/// Renders a header value for logging, replacing bytes that are not UTF-8.
pub fn lossy(value: &HeaderValue) -> String {
    String::from_utf8_lossy(value.as_bytes()).into_owned()
}

pub fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}

/// Builds the headers sent with the downstream call. The event key and request
/// id are forwarded byte for byte, and only filled in when the trigger did not
/// carry them.
pub fn downstream_headers(
    event_key: Option<&HeaderValue>,
    request_id: Option<&HeaderValue>,
) -> Result<HeaderMap, InvalidHeaderValue> {
    let event_key = event_key
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_EVENT_KEY));
    let request_id = match request_id {
        Some(id) => id.clone(),
        None => HeaderValue::from_str(&generate_request_id())?,
    };

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_UTF8));
    headers.insert(X_EVENT_KEY, event_key);
    headers.insert(X_REQUEST_ID, request_id);
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_str() {
        let mut headers = HeaderMap::new();
        headers.insert(X_GRANITE_SHA, HeaderValue::from_static("abc123"));
        headers.insert(X_EVENT_KEY, HeaderValue::from_static(""));
        headers.insert(
            X_REQUEST_ID,
            HeaderValue::from_bytes(b"\xffbinary").unwrap(),
        );

        assert_eq!(header_str(&headers, &X_GRANITE_SHA), Some("abc123".into()));
        // empty and non UTF-8 values count as missing
        assert_eq!(header_str(&headers, &X_EVENT_KEY), None);
        assert_eq!(header_str(&headers, &X_REQUEST_ID), None);

        // raw values keep non UTF-8 bytes and only drop empty ones
        assert_eq!(header_value(&headers, &X_EVENT_KEY), None);
        assert_eq!(
            header_value(&headers, &X_REQUEST_ID).unwrap().as_bytes(),
            b"\xffbinary"
        );
        assert_eq!(lossy(&HeaderValue::from_bytes(b"\xffid").unwrap()), "\u{fffd}id");
        assert_eq!(
            header_str(&headers, &HeaderName::from_static("x-missing")),
            None
        );
    }

    #[test]
    fn test_downstream_headers_defaults() {
        let first = downstream_headers(None, None).unwrap();
        let second = downstream_headers(None, None).unwrap();

        assert_eq!(first.get(CONTENT_TYPE).unwrap(), JSON_UTF8);
        assert_eq!(first.get(&X_EVENT_KEY).unwrap(), DEFAULT_EVENT_KEY);

        let first_id = first.get(&X_REQUEST_ID).unwrap().to_str().unwrap();
        let second_id = second.get(&X_REQUEST_ID).unwrap().to_str().unwrap();
        assert!(!first_id.is_empty());
        assert_ne!(first_id, second_id);
        assert!(Uuid::parse_str(first_id).is_ok());
    }

    #[test]
    fn test_downstream_headers_passthrough() {
        let event_key = HeaderValue::from_static("pr:from_ref_updated");
        let request_id = HeaderValue::from_static("req-42");
        let headers = downstream_headers(Some(&event_key), Some(&request_id)).unwrap();

        assert_eq!(headers.len(), 3);
        assert_eq!(headers.get(&X_EVENT_KEY).unwrap(), "pr:from_ref_updated");
        assert_eq!(headers.get(&X_REQUEST_ID).unwrap(), "req-42");
    }

    #[test]
    fn test_downstream_headers_keep_non_utf8_values() {
        let request_id = HeaderValue::from_bytes(b"req-\xe9\xff").unwrap();
        let headers = downstream_headers(None, Some(&request_id)).unwrap();

        assert_eq!(
            headers.get(&X_REQUEST_ID).unwrap().as_bytes(),
            b"req-\xe9\xff"
        );
        assert_eq!(headers.get(&X_EVENT_KEY).unwrap(), DEFAULT_EVENT_KEY);
    }
}
