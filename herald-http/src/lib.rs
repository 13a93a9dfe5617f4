//! Minimal JSON-over-HTTP client with safe logging and per-request options.
//!
//! - Request options: headers, `Auth`, timeout
//! - Never logs secret values (bearer tokens, credential-like JSON fields)
//! - Exactly one attempt per request: callers decide how to degrade on failure
//! - Optional *raw* request/response logging via `HERALD_HTTP_RAW=1`
//!
//! Example (no_run):
//! ```rust
//! # async fn demo() -> Result<(), herald_http::HttpError> {
//! let client = herald_http::HttpClient::new("https://pub.orcid.org/v3.0/")?;
//! let got: serde_json::Value = client
//!     .get_json("0000-0002-1825-0097/person", herald_http::RequestOpts::default())
//!     .await?;
//! # Ok(()) }
//! ```
//!
//! Observability: structured `tracing` events are emitted for request start,
//! response headers, body snippets (truncated), final errors, and (optionally)
//! raw request/response lines (target `http.raw`) when `HERALD_HTTP_RAW=1`.

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

// ==============================
// Raw logging toggles
// ==============================

const RAW_ENV: &str = "HERALD_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024; // cap raw body logs (64 KiB)

/// JSON body keys whose values never reach the logs.
const SECRET_BODY_KEYS: &[&str] = &["password", "accessJwt", "refreshJwt", "token"];

fn raw_enabled() -> bool {
    matches!(
        env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

/// Render a best-effort curl command for repro/debug, with secrets redacted.
fn make_curl(method: &Method, url: &Url, headers: &HeaderMap, body: Option<&[u8]>) -> String {
    let mut parts = vec!["curl".to_string(), format!("-X{}", method)];
    for (name, val) in redact_headers(headers) {
        parts.push(format!("-H '{}: {}'", name, val.replace('\'', r"'\''")));
    }
    if let Some(bytes) = body {
        let mut s = redact_json_body(bytes);
        if s.len() > RAW_MAX_BODY {
            s = truncate_at_char_boundary(&s, RAW_MAX_BODY);
            s.push('…');
        }
        parts.push(format!("-d '{}'", s.replace('\'', r"'\''")));
    }
    parts.push(format!("'{}'", url.as_str()));
    parts.join(" ")
}

/// Redact sensitive headers for logging
fn redact_headers(h: &HeaderMap) -> Vec<(String, String)> {
    h.iter()
        .map(|(k, v)| {
            let key = k.as_str().to_string();
            let mut val = v.to_str().unwrap_or("").to_string();
            if key.eq_ignore_ascii_case("authorization") {
                val = "Bearer <redacted>".into();
            }
            (key, val)
        })
        .collect()
}

/// Replace credential-like values in a JSON body; non-JSON bodies are summarised.
fn redact_json_body(bytes: &[u8]) -> String {
    match serde_json::from_slice::<serde_json::Value>(bytes) {
        Ok(mut v) => {
            if let Some(obj) = v.as_object_mut() {
                for key in SECRET_BODY_KEYS {
                    if let Some(slot) = obj.get_mut(*key) {
                        *slot = serde_json::Value::String("<redacted>".into());
                    }
                }
            }
            v.to_string()
        }
        Err(_) => format!("<{} bytes>", bytes.len()),
    }
}

// ==============================
// Errors
// ==============================

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("decode error: {0}, body_snippet: {1}")]
    Decode(String, String),
    #[error("server returned error {status}: {message}, request_id={request_id}")]
    Api {
        status: StatusCode,
        message: String,
        request_id: String,
    },
}

// ==============================
// Auth & Request Options
// ==============================

/// Authentication strategies supported by the HTTP client helpers.
///
/// ```
/// use herald_http::Auth;
///
/// let bearer = Auth::Bearer("token");
/// match bearer {
///     Auth::Bearer(value) => assert_eq!(value, "token"),
///     Auth::None => unreachable!(),
/// }
/// ```
#[derive(Clone, Debug)]
pub enum Auth<'a> {
    /// Authorization: Bearer <token>
    Bearer(&'a str),
    None,
}

/// Per-request tuning knobs for the HTTP client.
///
/// ```
/// use herald_http::{Auth, RequestOpts};
/// use std::time::Duration;
///
/// let opts = RequestOpts {
///     timeout: Some(Duration::from_secs(30)),
///     auth: Some(Auth::Bearer("jwt")),
///     ..Default::default()
/// };
///
/// assert_eq!(opts.timeout.unwrap().as_secs(), 30);
/// assert!(opts.headers.is_none());
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts<'a> {
    pub timeout: Option<Duration>,
    pub auth: Option<Auth<'a>>,
    pub headers: Option<HeaderMap>,
}

impl RequestOpts<'_> {
    /// Options carrying a single `Accept` header.
    pub fn accept(media_type: &'static str) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static(media_type),
        );
        Self {
            headers: Some(headers),
            ..Default::default()
        }
    }
}

// ==============================
// Client
// ==============================

#[derive(Clone)]
pub struct HttpClient {
    base: Url,
    inner: Client,
    pub default_timeout: Duration,
}

impl HttpClient {
    /// Construct a client anchored to a base URL.
    ///
    /// A missing trailing slash is added so relative paths extend the base
    /// path instead of replacing its last segment.
    ///
    /// ```no_run
    /// use herald_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new("https://pub.orcid.org/v3.0")?;
    /// assert_eq!(client.base().as_str(), "https://pub.orcid.org/v3.0/");
    /// assert_eq!(client.default_timeout, Duration::from_secs(30));
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new(base: &str) -> Result<Self, HttpError> {
        let base = if base.ends_with('/') {
            base.to_string()
        } else {
            format!("{base}/")
        };
        let base = Url::parse(&base).map_err(|e| HttpError::Url(e.to_string()))?;
        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .user_agent(concat!("herald/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            base,
            inner,
            default_timeout: Duration::from_secs(30),
        })
    }

    /// Override the default timeout returned by [`HttpClient::new`].
    ///
    /// ```no_run
    /// use herald_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new("https://bsky.social")?
    ///     .with_timeout(Duration::from_secs(2));
    /// assert_eq!(client.default_timeout, Duration::from_secs(2));
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = dur;
        self
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// GET JSON with per-request options (headers/auth/timeout).
    pub async fn get_json<T>(&self, path: &str, opts: RequestOpts<'_>) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
    {
        self.request_json_internal::<(), T>(Method::GET, path, None, opts)
            .await
    }

    /// POST JSON with per-request options (headers/auth/timeout).
    pub async fn post_json<B, T>(
        &self,
        path: &str,
        body: &B,
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request_json_internal(Method::POST, path, Some(body), opts)
            .await
    }

    // ==============================
    // Core request implementation
    // ==============================

    async fn request_json_internal<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self
            .base
            .join(path)
            .map_err(|e| HttpError::Url(e.to_string()))?;

        // ----- Build request -----
        let mut rb = self.inner.request(method.clone(), url.clone());

        let timeout = opts.timeout.unwrap_or(self.default_timeout);
        rb = rb.timeout(timeout);

        // body (serialize up front so we can log exact bytes)
        let mut request_body_bytes: Option<Vec<u8>> = None;
        if let Some(b) = body {
            let bytes = serde_json::to_vec(b).map_err(|e| HttpError::Build(e.to_string()))?;
            request_body_bytes = Some(bytes.clone());
            rb = rb
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(bytes);
        }

        if let Some(hdrs) = &opts.headers {
            rb = rb.headers(hdrs.clone());
        }

        let auth_kind = match &opts.auth {
            Some(Auth::Bearer(tok)) => {
                let tok = sanitize_token(tok)?;
                rb = rb.bearer_auth(tok);
                "bearer"
            }
            Some(Auth::None) | None => "none",
        };

        // ----- Safe request logging (pre-send) -----
        let req_id = format!(
            "r{:x}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        );

        tracing::debug!(
            req_id=%req_id,
            method=%method,
            host_path=%format!("{}{}", url.host_str().unwrap_or("-"), url.path()),
            timeout_ms=timeout.as_millis() as u64,
            auth_kind,
            has_body=%body.is_some(),
            "http.request.start"
        );

        if raw_enabled() {
            let merged = opts.headers.clone().unwrap_or_default();
            let curl = make_curl(&method, &url, &merged, request_body_bytes.as_deref());
            tracing::debug!(target: "http.raw", %req_id, %curl, "request");
        }

        // ----- Send -----
        let t0 = std::time::Instant::now();
        let resp = rb.send().await.map_err(|err| {
            let message = err.to_string();
            tracing::warn!(req_id=%req_id, message=%message, "http.network_error.send");
            HttpError::Network(message)
        })?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = resp.bytes().await.map_err(|err| {
            let message = err.to_string();
            tracing::warn!(req_id=%req_id, message=%message, "http.network_error.body");
            HttpError::Network(message)
        })?;
        let dur_ms = t0.elapsed().as_millis() as u64;

        let req_hdr_id = headers
            .get("x-request-id")
            .or_else(|| headers.get("x-correlation-id"))
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");

        tracing::debug!(
            req_id=%req_id,
            %status,
            duration_ms=dur_ms,
            body_len=bytes.len(),
            x_request_id=%req_hdr_id,
            "http.response.headers"
        );

        if raw_enabled() {
            let hdrs = redact_headers(&headers);
            let text = redact_json_body(&bytes);
            let truncated = text.len() > RAW_MAX_BODY;
            let text = if truncated {
                truncate_at_char_boundary(&text, RAW_MAX_BODY)
            } else {
                text
            };
            tracing::info!(
                target:"http.raw",
                %req_id,
                status=%status,
                duration_ms=dur_ms,
                headers=?hdrs,
                body=%text,
                truncated
            );
        }

        let snippet = snip_body(&bytes);
        tracing::trace!(
            req_id=%req_id,
            body_snippet=%snippet,
            "http.response.body_snippet"
        );

        // ----- Success path -----
        if status.is_success() {
            return serde_json::from_slice::<T>(&bytes).map_err(|e| {
                tracing::warn!(
                    req_id=%req_id,
                    serde_line=%e.line(),
                    serde_col=%e.column(),
                    serde_err=%e.to_string(),
                    body_snippet=%snippet,
                    "http.response.decode_error"
                );
                HttpError::Decode(e.to_string(), snippet)
            });
        }

        // ----- Non-success -----
        let message = extract_error_message(&bytes);
        let request_id = req_hdr_id.to_string();
        tracing::warn!(
            req_id=%req_id,
            %status,
            message=%message,
            x_request_id=%request_id,
            body_snippet=%snippet,
            "http.error"
        );
        Err(HttpError::Api {
            status,
            message,
            request_id,
        })
    }
}

// ==============================
// Helpers
// ==============================

fn extract_error_message(body: &[u8]) -> String {
    // XRPC (AT Protocol): {"error":"InvalidToken","message":"..."}
    #[derive(Deserialize)]
    struct Xrpc {
        #[serde(default)]
        error: String,
        #[serde(default)]
        message: String,
    }

    // ORCID: {"developer-message":"...","user-message":"...","error-code":9016}
    #[derive(Deserialize)]
    struct Orcid {
        #[serde(rename = "developer-message", default)]
        developer_message: String,
        #[serde(rename = "user-message", default)]
        user_message: String,
        #[serde(rename = "error-desc", default)]
        error_desc: Option<OrcidDesc>,
    }
    #[derive(Deserialize)]
    struct OrcidDesc {
        #[serde(default)]
        value: String,
    }

    if let Ok(o) = serde_json::from_slice::<Orcid>(body) {
        if !o.developer_message.is_empty() {
            return o.developer_message;
        }
        if !o.user_message.is_empty() {
            return o.user_message;
        }
        if let Some(desc) = o.error_desc.filter(|d| !d.value.is_empty()) {
            return desc.value;
        }
    }
    if let Ok(x) = serde_json::from_slice::<Xrpc>(body) {
        match (x.error.is_empty(), x.message.is_empty()) {
            (false, false) => return format!("{}: {}", x.error, x.message),
            (true, false) => return x.message,
            (false, true) => return x.error,
            (true, true) => {}
        }
    }
    snip_body(body)
}

fn snip_body(body: &[u8]) -> String {
    let snip = String::from_utf8_lossy(body).to_string();
    if snip.len() > 500 {
        let mut s = truncate_at_char_boundary(&snip, 500);
        s.push_str("...");
        s
    } else {
        snip
    }
}

fn truncate_at_char_boundary(s: &str, max: usize) -> String {
    let mut end = max.min(s.len());
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

fn sanitize_token(raw: &str) -> Result<String, HttpError> {
    let mut s = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string();
    s.retain(|ch| !ch.is_ascii_whitespace());

    if !s.is_ascii() {
        return Err(HttpError::Build("token contains non-ASCII bytes".into()));
    }
    if s.bytes().any(|b| b < 0x20 || b == 0x7F) {
        return Err(HttpError::Build("token contains control characters".into()));
    }

    HeaderValue::from_str(&format!("Bearer {}", s))
        .map_err(|e| HttpError::Build(format!("invalid Authorization header: {e}")))?;
    Ok(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn base_gets_trailing_slash() {
        let client = HttpClient::new("https://pub.orcid.org/v3.0").unwrap();
        assert_eq!(client.base().as_str(), "https://pub.orcid.org/v3.0/");
        let joined = client.base().join("0000-0001/works").unwrap();
        assert_eq!(joined.as_str(), "https://pub.orcid.org/v3.0/0000-0001/works");
    }

    #[test]
    fn orcid_error_prefers_developer_message() {
        let body = br#"{"response-code":404,"developer-message":"404 Not Found: bad id","user-message":"not found","error-code":9016}"#;
        assert_eq!(extract_error_message(body), "404 Not Found: bad id");
    }

    #[test]
    fn xrpc_error_joins_code_and_message() {
        let body = br#"{"error":"AuthenticationRequired","message":"Invalid identifier or password"}"#;
        assert_eq!(
            extract_error_message(body),
            "AuthenticationRequired: Invalid identifier or password"
        );
    }

    #[test]
    fn unknown_error_body_falls_back_to_snippet() {
        assert_eq!(extract_error_message(b"upstream exploded"), "upstream exploded");
    }

    #[test]
    fn snip_body_respects_char_boundaries() {
        let body = "é".repeat(400);
        let snip = snip_body(body.as_bytes());
        assert!(snip.ends_with("..."));
        assert!(snip.len() <= 503);
    }

    #[test]
    fn secret_body_fields_are_redacted() {
        let body = serde_json::to_vec(&json!({"identifier": "me.bsky.social", "password": "hunter2"}))
            .unwrap();
        let redacted = redact_json_body(&body);
        assert!(redacted.contains("me.bsky.social"));
        assert!(!redacted.contains("hunter2"));
    }

    #[test]
    fn sanitize_token_strips_quotes_and_whitespace() {
        assert_eq!(sanitize_token(" \"abc def\" ").unwrap(), "abcdef");
        assert!(sanitize_token("tök").is_err());
    }

    #[tokio::test]
    async fn get_json_sends_accept_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v3.0/abc/person"))
            .and(header("accept", "application/vnd.orcid+json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpClient::new(&format!("{}/v3.0", server.uri())).unwrap();
        let got: serde_json::Value = client
            .get_json("abc/person", RequestOpts::accept("application/vnd.orcid+json"))
            .await
            .unwrap();
        assert_eq!(got, json!({"ok": true}));
    }

    #[tokio::test]
    async fn post_json_sends_bearer_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/xrpc/do.thing"))
            .and(header("authorization", "Bearer jwt-123"))
            .and(body_json(json!({"x": 1})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"done": 1})))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpClient::new(&server.uri()).unwrap();
        let got: serde_json::Value = client
            .post_json(
                "xrpc/do.thing",
                &json!({"x": 1}),
                RequestOpts {
                    auth: Some(Auth::Bearer("jwt-123")),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(got["done"], 1);
    }

    #[tokio::test]
    async fn server_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(
                ResponseTemplate::new(503).set_body_json(json!({"message": "try later"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpClient::new(&server.uri()).unwrap();
        let err = client
            .get_json::<serde_json::Value>("flaky", RequestOpts::default())
            .await
            .unwrap_err();
        match err {
            HttpError::Api { status, message, .. } => {
                assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
                assert_eq!(message, "try later");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn non_json_success_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/html"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;

        let client = HttpClient::new(&server.uri()).unwrap();
        let err = client
            .get_json::<serde_json::Value>("html", RequestOpts::default())
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::Decode(_, ref snip) if snip.contains("<html>")));
    }
}
