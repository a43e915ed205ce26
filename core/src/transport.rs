//! Transport seam between the client and the network.
//!
//! # Design
//! The client only builds and parses plain-data requests and responses; a
//! `Transport` performs the round-trip. `UreqTransport` is the stock
//! implementation. ureq is blocking, so each call runs on tokio's blocking
//! pool. The client enforces its own timeout around `send`; the agent's
//! global timeout is set to the same value so an abandoned blocking call
//! also ends instead of lingering on the pool.
//!
//! Cookies follow the request's `Credentials`. `SameOrigin` and `Include`
//! share one agent whose cookie jar stores `Set-Cookie` responses and sends
//! matching cookies back (the jar scopes them by domain and path). `Omit`
//! requests use a second agent whose jar is emptied after every call, so
//! they neither send nor keep cookies.

use std::future::Future;
use std::io::Read;
use std::time::Duration;

use uuid::Uuid;

use crate::config::{DEFAULT_MAX_RESPONSE_BYTES, DEFAULT_TIMEOUT};
use crate::error::TransportError;
use crate::http::{Credentials, FormData, HttpRequest, HttpResponse, RequestBody};

/// Executes one HTTP round-trip.
///
/// A non-2xx status is a normal response, not an error; `TransportError` is
/// reserved for failures to obtain a response at all.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

/// Blocking ureq agents driven from tokio's blocking pool.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    cookieless: ureq::Agent,
    max_response_bytes: u64,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: config.new_agent(),
            cookieless: config.new_agent(),
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }

    /// Cap on the response body size; larger bodies fail with
    /// `TransportError::BodyTooLarge`.
    pub fn with_max_response_bytes(mut self, limit: u64) -> Self {
        self.max_response_bytes = limit;
        self
    }

    /// Number of cookies held for `SameOrigin`/`Include` requests.
    pub fn cookie_count(&self) -> usize {
        self.agent.cookie_jar_lock().iter().count()
    }

    fn round_trip(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        match request.credentials {
            Credentials::Omit => {
                let result = execute(&self.cookieless, request, self.max_response_bytes);
                self.cookieless.cookie_jar_lock().clear();
                result
            }
            Credentials::SameOrigin | Credentials::Include => {
                execute(&self.agent, request, self.max_response_bytes)
            }
        }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl Transport for UreqTransport {
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send {
        let transport = self.clone();
        async move {
            tokio::task::spawn_blocking(move || transport.round_trip(request))
                .await
                .map_err(|e| TransportError::Task(e.to_string()))?
        }
    }
}

fn execute(
    agent: &ureq::Agent,
    request: HttpRequest,
    max_response_bytes: u64,
) -> Result<HttpResponse, TransportError> {
    let has_content_type = request.header("content-type").is_some();
    let (content_type, body) = match request.body {
        Some(body) => encode_body(body)?,
        None => (None, Vec::new()),
    };

    let mut builder = ureq::http::Request::builder()
        .method(request.method.as_str())
        .uri(request.url.as_str());
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    if let Some(content_type) = content_type.filter(|_| !has_content_type) {
        builder = builder.header("content-type", content_type.as_str());
    }
    let http_request = builder
        .body(body)
        .map_err(|e| TransportError::Network(e.to_string()))?;

    let mut response = agent
        .run(http_request)
        .map_err(|e| TransportError::Network(e.to_string()))?;

    let status = response.status();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();
    let body = response
        .body_mut()
        .with_config()
        .limit(max_response_bytes)
        .read_to_vec()
        .map_err(|e| match e {
            ureq::Error::BodyExceedsLimit(limit) => TransportError::BodyTooLarge { limit },
            e => TransportError::Network(e.to_string()),
        })?;

    Ok(HttpResponse {
        status: status.as_u16(),
        status_text: status.canonical_reason().map(str::to_string),
        headers,
        body,
    })
}

/// Serialize a wire body to bytes, with the `Content-Type` the body implies
/// when the caller did not set one.
pub(crate) fn encode_body(body: RequestBody) -> Result<(Option<String>, Vec<u8>), TransportError> {
    match body {
        RequestBody::Text(text) => Ok((None, text.into_bytes())),
        RequestBody::Bytes(bytes) => Ok((None, bytes)),
        RequestBody::Form(form) => {
            let boundary = format!("----warehouse-{}", Uuid::new_v4().simple());
            Ok((Some(FormData::content_type(&boundary)), form.encode(&boundary)))
        }
        RequestBody::UrlEncoded(pairs) => {
            let encoded = pairs
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .collect::<Vec<_>>()
                .join("&");
            Ok((
                Some("application/x-www-form-urlencoded".to_string()),
                encoded.into_bytes(),
            ))
        }
        RequestBody::Stream(stream) => {
            let mut bytes = Vec::new();
            stream.into_inner().read_to_end(&mut bytes)?;
            Ok((None, bytes))
        }
    }
}
