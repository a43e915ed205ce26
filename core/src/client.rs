//! Typed request builder, transport driver and response parser.
//!
//! # Design
//! `ApiClient` keeps the build/parse split: `build_request` turns a path, a
//! schema registry and `RequestOptions` into an `HttpRequest`, enforcing the
//! per-method payload rules before anything touches the network;
//! `parse_response` turns an `HttpResponse` into the validated `data` of the
//! response envelope. `request` runs the two around one transport call under
//! a timeout. Apart from the shared schema cache no state survives a call.
//!
//! Every failure reaches the caller as `ApiError`. Failures that are not
//! part of the taxonomy (transport errors, timeouts, envelopes that do not
//! validate) are reported as the generic error; their detail only goes to
//! the log.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{
    find_header, BodyStream, Credentials, FormData, HttpMethod, HttpRequest, HttpResponse,
    RequestBody,
};
use crate::registry::SchemaRegistry;
use crate::schema::{Envelope, SchemaCache};
use crate::transport::{Transport, UreqTransport};

const DEFAULT_HEADERS: [(&str, &str); 2] = [
    ("Content-Type", "application/json"),
    ("Accept", "application/json"),
];

/// Callback that fills a multipart form from the request body.
pub type FormEncoder = Box<dyn FnOnce(&mut FormData, &Payload) + Send>;

/// Body supplied by the caller.
///
/// `Json` values are serialized to JSON text; every other variant is a raw
/// kind and is sent unchanged.
#[derive(Debug)]
pub enum Payload {
    Json(Value),
    Text(String),
    Bytes(Vec<u8>),
    Form(FormData),
    UrlEncoded(Vec<(String, String)>),
    Stream(BodyStream),
}

impl Payload {
    pub fn json<T: Serialize>(value: &T) -> Result<Self, ApiError> {
        serde_json::to_value(value)
            .map(Payload::Json)
            .map_err(|e| ApiError::invalid_payload(format!("Failed to serialize body: {e}")))
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(value) => Some(value),
            _ => None,
        }
    }

    fn into_wire(self) -> Result<RequestBody, ApiError> {
        Ok(match self {
            Payload::Json(value) => RequestBody::Text(
                serde_json::to_string(&value)
                    .map_err(|e| ApiError::invalid_payload(format!("Failed to serialize body: {e}")))?,
            ),
            Payload::Text(text) => RequestBody::Text(text),
            Payload::Bytes(bytes) => RequestBody::Bytes(bytes),
            Payload::Form(form) => RequestBody::Form(form),
            Payload::UrlEncoded(pairs) => RequestBody::UrlEncoded(pairs),
            Payload::Stream(stream) => RequestBody::Stream(stream),
        })
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Json(value)
    }
}

/// Per-call options. Every field is optional; the method defaults to `GET`.
#[derive(Default)]
pub struct RequestOptions {
    pub method: Option<String>,
    pub body: Option<Payload>,
    pub form: Option<FormEncoder>,
    /// Passthrough headers. They always win over the client's defaults.
    pub headers: Vec<(String, String)>,
    pub credentials: Option<Credentials>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn body(mut self, body: impl Into<Payload>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `value` as the JSON body.
    pub fn json<T: Serialize>(self, value: &T) -> Result<Self, ApiError> {
        Ok(self.body(Payload::json(value)?))
    }

    pub fn form(mut self, encode: impl FnOnce(&mut FormData, &Payload) + Send + 'static) -> Self {
        self.form = Some(Box::new(encode));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("method", &self.method)
            .field("body", &self.body)
            .field("form", &self.form.as_ref().map(|_| ".."))
            .field("headers", &self.headers)
            .field("credentials", &self.credentials)
            .finish()
    }
}

/// Client for the warehouse backend.
pub struct ApiClient<T = UreqTransport> {
    config: ClientConfig,
    transport: T,
    cache: Arc<SchemaCache>,
}

impl ApiClient<UreqTransport> {
    pub fn new(config: ClientConfig) -> Self {
        let transport =
            UreqTransport::new(config.timeout).with_max_response_bytes(config.max_response_bytes);
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> ApiClient<T> {
    /// Build a client over `transport`, sharing the process-wide schema cache.
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            cache: SchemaCache::shared(),
        }
    }

    pub fn with_cache(mut self, cache: Arc<SchemaCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<SchemaCache> {
        &self.cache
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Validate `options` against the method rules and `registry`, then
    /// build the wire request. Nothing is sent.
    pub fn build_request(
        &self,
        path: &str,
        registry: &SchemaRegistry,
        options: RequestOptions,
    ) -> Result<HttpRequest, ApiError> {
        let RequestOptions {
            method,
            body,
            form,
            headers,
            credentials,
        } = options;

        let method = HttpMethod::parse(method.as_deref().unwrap_or("GET"))?;
        check_payload_rules(method, body.is_some(), form.is_some())?;

        let descriptor = registry
            .descriptor(method)
            .ok_or_else(|| ApiError::schema_not_defined(method))?;
        if let (Some(input), Some(value)) = (&descriptor.input, body.as_ref().and_then(Payload::as_json)) {
            input.validate(value).map_err(|e| {
                debug!(%method, path, error = %e, "request body rejected by input shape");
                ApiError::invalid_payload(format!("{method} body does not match the declared input: {}", e.reason))
            })?;
        }

        let body = match (body, form) {
            (Some(body), Some(encode)) => {
                let mut form = FormData::new();
                encode(&mut form, &body);
                Some(RequestBody::Form(form))
            }
            (Some(body), None) => Some(body.into_wire()?),
            (None, _) => None,
        };

        Ok(HttpRequest {
            method,
            url: self.config.url_for(path),
            headers: merge_headers(headers, body.as_ref()),
            body,
            credentials: credentials.unwrap_or(self.config.credentials),
        })
    }

    /// Check the status, parse the JSON envelope and validate it against the
    /// output shape declared for `method`.
    pub fn parse_response(
        &self,
        method: HttpMethod,
        registry: &SchemaRegistry,
        response: HttpResponse,
    ) -> Result<Value, ApiError> {
        if !response.is_success() {
            let err = http_failure(&response);
            warn!(%method, status = response.status, message = err.message(), "request failed");
            return Err(err);
        }

        let json: Value = serde_json::from_slice(&response.body).map_err(ApiError::parse)?;

        let output = registry
            .output(method)
            .ok_or_else(|| ApiError::schema_not_defined(method))?;
        let envelope = self.cache.envelope_for(output);

        match envelope.validate(json) {
            Ok(Envelope::Success(data)) => Ok(data),
            Ok(Envelope::Failure { message, code }) => {
                warn!(%method, status = response.status, %message, "server reported failure");
                let err = ApiError::new(message).with_status(response.status);
                Err(match code {
                    Some(code) => err.with_code(code),
                    None => err,
                })
            }
            Err(e) => {
                debug!(%method, error = %e, "response envelope failed validation");
                Err(ApiError::generic())
            }
        }
    }

    /// Perform one round-trip and return the validated `data` payload.
    pub async fn request(
        &self,
        path: &str,
        registry: &SchemaRegistry,
        options: RequestOptions,
    ) -> Result<Value, ApiError> {
        let request = self.build_request(path, registry, options)?;
        let method = request.method;
        debug!(%method, url = %request.url, "sending request");

        // The timer lives inside the `timeout` future and is dropped with it
        // on every return path.
        let response = match tokio::time::timeout(self.config.timeout, self.transport.send(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(%method, path, error = %e, "transport failed");
                return Err(ApiError::generic());
            }
            Err(_) => {
                warn!(%method, path, timeout = ?self.config.timeout, "request timed out");
                return Err(ApiError::timeout());
            }
        };
        debug!(%method, status = response.status, "received response");

        self.parse_response(method, registry, response)
    }

    /// Like `request`, deserializing the payload into `O`.
    pub async fn request_as<O: DeserializeOwned>(
        &self,
        path: &str,
        registry: &SchemaRegistry,
        options: RequestOptions,
    ) -> Result<O, ApiError> {
        let data = self.request(path, registry, options).await?;
        serde_json::from_value(data).map_err(|e| {
            debug!(path, error = %e, "payload does not deserialize into the requested type");
            ApiError::generic()
        })
    }
}

fn check_payload_rules(method: HttpMethod, has_body: bool, has_form: bool) -> Result<(), ApiError> {
    match method {
        HttpMethod::Get if has_body || has_form => Err(ApiError::invalid_payload(
            "GET requests cannot have a body or form data",
        )),
        HttpMethod::Get => Ok(()),
        HttpMethod::Delete if has_form && !has_body => Err(ApiError::invalid_payload(
            "DELETE with form data requires body",
        )),
        HttpMethod::Delete => Ok(()),
        HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch if !has_body => {
            Err(ApiError::missing_body(method))
        }
        HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch => Ok(()),
    }
}

/// Add the JSON defaults for header names the caller did not set. Multipart
/// bodies get none; the transport sets their `Content-Type` with the boundary.
fn merge_headers(mut headers: Vec<(String, String)>, body: Option<&RequestBody>) -> Vec<(String, String)> {
    if body.is_some_and(RequestBody::is_form) {
        return headers;
    }
    for (name, value) in DEFAULT_HEADERS {
        if find_header(&headers, name).is_none() {
            headers.push((name.to_string(), value.to_string()));
        }
    }
    headers
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Error for a non-2xx response. The body is only borrowed, so it stays
/// available to the caller of `parse_response`.
fn http_failure(response: &HttpResponse) -> ApiError {
    let message = serde_json::from_slice::<ErrorBody>(&response.body)
        .ok()
        .map(|body| body.message)
        .or_else(|| response.status_text.clone().filter(|text| !text.is_empty()))
        .unwrap_or_else(|| format!("Request failed with status {}", response.status));
    ApiError::http(message, response.status)
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::sync::Mutex;
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::error::{codes, TransportError};
    use crate::registry::Descriptor;
    use crate::schema::Shape;

    #[derive(Debug, Clone, Deserialize, PartialEq)]
    struct Item {
        id: u32,
        name: String,
    }

    #[derive(Debug)]
    struct Sent {
        method: HttpMethod,
        url: String,
        headers: Vec<(String, String)>,
        text: Option<String>,
        form: Option<FormData>,
    }

    /// Records every request and answers with a canned response.
    struct MockTransport {
        response: HttpResponse,
        sent: Mutex<Vec<Sent>>,
    }

    impl MockTransport {
        fn new(status: u16, body: &str) -> Self {
            Self {
                response: HttpResponse::new(status, body.as_bytes()),
                sent: Mutex::new(Vec::new()),
            }
        }

        fn sent_count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    impl Transport for MockTransport {
        fn send(
            &self,
            request: HttpRequest,
        ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send {
            let (text, form) = match &request.body {
                Some(RequestBody::Text(text)) => (Some(text.clone()), None),
                Some(RequestBody::Form(form)) => (None, Some(form.clone())),
                _ => (None, None),
            };
            self.sent.lock().unwrap().push(Sent {
                method: request.method,
                url: request.url,
                headers: request.headers,
                text,
                form,
            });
            std::future::ready(Ok(self.response.clone()))
        }
    }

    struct PendingTransport;

    impl Transport for PendingTransport {
        fn send(
            &self,
            _request: HttpRequest,
        ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send {
            std::future::pending()
        }
    }

    struct FailingTransport;

    impl Transport for FailingTransport {
        fn send(
            &self,
            _request: HttpRequest,
        ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send {
            std::future::ready(Err(TransportError::Network("connection refused".to_string())))
        }
    }

    fn client<T: Transport>(transport: T) -> ApiClient<T> {
        ApiClient::with_transport(ClientConfig::new("http://localhost:3000"), transport)
            .with_cache(Arc::new(SchemaCache::new()))
    }

    fn item_registry() -> SchemaRegistry {
        let item = Shape::of::<Item>();
        SchemaRegistry::builder()
            .get(Descriptor::output(item.clone()))
            .post(Descriptor::output(item.clone()))
            .put(Descriptor::output(item.clone()))
            .patch(Descriptor::output(item.clone()))
            .delete(Descriptor::output(Shape::any()))
            .build()
    }

    const ITEM_ENVELOPE: &str = r#"{"success":true,"data":{"id":1,"name":"Test"}}"#;

    #[tokio::test]
    async fn put_without_body_fails_before_sending() {
        let c = client(MockTransport::new(200, ITEM_ENVELOPE));
        let err = c
            .request("/api/items/1", &item_registry(), RequestOptions::new().method("PUT"))
            .await
            .unwrap_err();
        assert!(err.message().contains("PUT requires body"));
        assert_eq!(err.code(), Some(codes::MISSING_BODY));
        assert_eq!(c.transport().sent_count(), 0);
    }

    #[test]
    fn body_is_required_for_post_put_and_patch() {
        let c = client(MockTransport::new(200, ITEM_ENVELOPE));
        for method in ["POST", "put", "Patch"] {
            let err = c
                .build_request("/items", &item_registry(), RequestOptions::new().method(method))
                .unwrap_err();
            assert_eq!(err.message(), format!("{} requires body", method.to_uppercase()));
        }
    }

    #[test]
    fn get_rejects_body_and_form() {
        let c = client(MockTransport::new(200, ITEM_ENVELOPE));
        let err = c
            .build_request("/items", &item_registry(), RequestOptions::new().body(json!({"a": 1})))
            .unwrap_err();
        assert_eq!(err.code(), Some(codes::INVALID_PAYLOAD));

        let err = c
            .build_request("/items", &item_registry(), RequestOptions::new().form(|_, _| {}))
            .unwrap_err();
        assert_eq!(err.code(), Some(codes::INVALID_PAYLOAD));
    }

    #[test]
    fn delete_body_is_optional_but_form_needs_one() {
        let c = client(MockTransport::new(200, ITEM_ENVELOPE));
        let request = c
            .build_request("/items/1", &item_registry(), RequestOptions::new().method("DELETE"))
            .unwrap();
        assert!(request.body.is_none());

        let err = c
            .build_request(
                "/items/1",
                &item_registry(),
                RequestOptions::new().method("delete").form(|_, _| {}),
            )
            .unwrap_err();
        assert_eq!(err.message(), "DELETE with form data requires body");
    }

    #[test]
    fn unknown_methods_are_rejected() {
        let c = client(MockTransport::new(200, ITEM_ENVELOPE));
        let err = c
            .build_request("/items", &item_registry(), RequestOptions::new().method("TRACE"))
            .unwrap_err();
        assert_eq!(err.code(), Some(codes::UNSUPPORTED_METHOD));
    }

    #[tokio::test]
    async fn missing_descriptor_fails_regardless_of_response() {
        let registry = SchemaRegistry::builder()
            .get(Descriptor::output(Shape::any()))
            .build();
        for (status, body) in [(200, ITEM_ENVELOPE), (404, r#"{"message":"gone"}"#), (200, "oops")] {
            let c = client(MockTransport::new(status, body));
            let err = c
                .request("/items", &registry, RequestOptions::new().method("POST").body(json!({})))
                .await
                .unwrap_err();
            assert_eq!(err.code(), Some(codes::SCHEMA_NOT_DEFINED));
            assert_eq!(err.status(), Some(500));
            assert_eq!(c.transport().sent_count(), 0);
        }
    }

    #[test]
    fn parse_response_without_descriptor_is_a_schema_error() {
        let c = client(MockTransport::new(200, ITEM_ENVELOPE));
        let err = c
            .parse_response(
                HttpMethod::Get,
                &SchemaRegistry::default(),
                HttpResponse::new(200, ITEM_ENVELOPE.as_bytes()),
            )
            .unwrap_err();
        assert!(err.message().contains("No schema defined for HTTP method GET"));
    }

    #[tokio::test]
    async fn success_envelope_yields_data() {
        let c = client(MockTransport::new(200, ITEM_ENVELOPE));
        let data = c
            .request("/items/1", &item_registry(), RequestOptions::new())
            .await
            .unwrap();
        assert_eq!(data, json!({"id": 1, "name": "Test"}));

        let item: Item = c
            .request_as("/items/1", &item_registry(), RequestOptions::new())
            .await
            .unwrap();
        assert_eq!(
            item,
            Item {
                id: 1,
                name: "Test".to_string()
            }
        );
    }

    #[tokio::test]
    async fn failure_envelope_inside_200_is_an_error() {
        let c = client(MockTransport::new(200, r#"{"success":false,"message":"X"}"#));
        let err = c
            .request("/items/1", &item_registry(), RequestOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.message(), "X");
        assert_eq!(err.status(), Some(200));
        assert_eq!(err.code(), None);
    }

    #[tokio::test]
    async fn failure_envelope_code_is_kept() {
        let c = client(MockTransport::new(
            200,
            r#"{"success":false,"message":"Rack is full","code":"RACK_FULL"}"#,
        ));
        let err = c
            .request("/items/1", &item_registry(), RequestOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some("RACK_FULL"));
    }

    #[tokio::test]
    async fn http_error_uses_server_message() {
        let c = client(MockTransport::new(404, r#"{"message":"Resource not found"}"#));
        let err = c
            .request("/items/9", &item_registry(), RequestOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.message(), "Resource not found");
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn http_error_falls_back_to_status_line() {
        let c = client(MockTransport::new(200, ""));
        let response = HttpResponse {
            status_text: Some("Service Unavailable".to_string()),
            ..HttpResponse::new(503, "<html>down</html>".as_bytes())
        };
        let err = c
            .parse_response(HttpMethod::Get, &item_registry(), response.clone())
            .unwrap_err();
        assert_eq!(err.message(), "Service Unavailable");
        assert_eq!(err.status(), Some(503));
        assert_eq!(response.body, b"<html>down</html>".to_vec());

        let err = c
            .parse_response(HttpMethod::Get, &item_registry(), HttpResponse::new(502, Vec::new()))
            .unwrap_err();
        assert_eq!(err.message(), "Request failed with status 502");
    }

    #[tokio::test]
    async fn unparseable_body_is_a_500_parse_error() {
        let c = client(MockTransport::new(200, "not json"));
        let err = c
            .request("/items/1", &item_registry(), RequestOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert!(err.message().starts_with("Failed to parse response JSON"));
        assert_eq!(err.code(), Some(codes::PARSE_ERROR));
    }

    #[tokio::test]
    async fn invalid_envelope_becomes_generic_error() {
        for body in [
            r#"{"success":true,"data":{"id":"one"}}"#,
            r#"{"data":{"id":1,"name":"Test"}}"#,
            r#"[1,2,3]"#,
        ] {
            let c = client(MockTransport::new(200, body));
            let err = c
                .request("/items/1", &item_registry(), RequestOptions::new())
                .await
                .unwrap_err();
            assert!(err.is_generic(), "{body}");
        }
    }

    #[tokio::test]
    async fn repeated_calls_reuse_the_cached_envelope() {
        let c = client(MockTransport::new(200, ITEM_ENVELOPE));
        let registry = item_registry();
        let output = registry.output(HttpMethod::Get).unwrap().clone();
        let before = c.cache().envelope_for(&output);

        for _ in 0..3 {
            c.request("/items/1", &registry, RequestOptions::new())
                .await
                .unwrap();
        }
        assert!(Arc::ptr_eq(&before, &c.cache().envelope_for(&output)));
        assert_eq!(c.cache().len(), 1);
    }

    #[test]
    fn caller_headers_survive_next_to_defaults() {
        let c = client(MockTransport::new(200, ITEM_ENVELOPE));
        let request = c
            .build_request(
                "/items",
                &item_registry(),
                RequestOptions::new()
                    .method("POST")
                    .body(json!({"name": "Test"}))
                    .header("X-Custom-Header", "yes"),
            )
            .unwrap();
        assert_eq!(request.header("x-custom-header"), Some("yes"));
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.header("accept"), Some("application/json"));
        assert_eq!(
            request.body.as_ref().and_then(RequestBody::as_text),
            Some(r#"{"name":"Test"}"#)
        );
    }

    #[test]
    fn caller_headers_are_never_clobbered() {
        let c = client(MockTransport::new(200, ITEM_ENVELOPE));
        let request = c
            .build_request(
                "/items",
                &item_registry(),
                RequestOptions::new()
                    .method("POST")
                    .body(Payload::Text("name=Test".to_string()))
                    .header("content-type", "text/plain"),
            )
            .unwrap();
        let content_types: Vec<_> = request
            .headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("content-type"))
            .collect();
        assert_eq!(content_types.len(), 1);
        assert_eq!(request.header("Content-Type"), Some("text/plain"));
    }

    #[tokio::test]
    async fn form_encoder_builds_multipart_body() {
        let c = client(MockTransport::new(200, ITEM_ENVELOPE));
        c.request(
            "/items",
            &item_registry(),
            RequestOptions::new()
                .method("POST")
                .body(json!({"name": "Test", "csv": "a,b"}))
                .header("X-Custom-Header", "yes")
                .form(|form, body| {
                    let body = body.as_json().unwrap();
                    form.append_text("name", body["name"].as_str().unwrap());
                    form.append_file("file", "items.csv", "text/csv", body["csv"].as_str().unwrap());
                }),
        )
        .await
        .unwrap();

        let sent = c.transport().sent.lock().unwrap();
        let sent = &sent[0];
        assert_eq!(sent.method, HttpMethod::Post);
        assert_eq!(sent.url, "http://localhost:3000/items");
        assert!(sent.text.is_none());
        let form = sent.form.as_ref().unwrap();
        assert_eq!(form.parts().len(), 2);
        assert!(find_header(&sent.headers, "content-type").is_none());
        assert!(find_header(&sent.headers, "accept").is_none());
        assert_eq!(find_header(&sent.headers, "x-custom-header"), Some("yes"));
    }

    #[test]
    fn raw_bodies_are_sent_unchanged() {
        let c = client(MockTransport::new(200, ITEM_ENVELOPE));
        let request = c
            .build_request(
                "/items",
                &item_registry(),
                RequestOptions::new()
                    .method("PUT")
                    .body(Payload::Bytes(vec![0, 159, 146, 150])),
            )
            .unwrap();
        assert!(matches!(request.body, Some(RequestBody::Bytes(ref b)) if b == &vec![0, 159, 146, 150]));

        let mut form = FormData::new();
        form.append_text("k", "v");
        let request = c
            .build_request(
                "/items",
                &item_registry(),
                RequestOptions::new().method("PATCH").body(Payload::Form(form)),
            )
            .unwrap();
        assert!(request.body.as_ref().is_some_and(RequestBody::is_form));
        assert!(request.header("content-type").is_none());
    }

    #[test]
    fn json_body_is_checked_against_declared_input() {
        #[derive(Deserialize)]
        #[allow(dead_code)]
        struct NewItem {
            name: String,
        }
        let registry = SchemaRegistry::builder()
            .post(Descriptor::new(Shape::of::<NewItem>(), Shape::of::<Item>()))
            .build();
        let c = client(MockTransport::new(200, ITEM_ENVELOPE));

        let err = c
            .build_request(
                "/items",
                &registry,
                RequestOptions::new().method("POST").body(json!({"title": 1})),
            )
            .unwrap_err();
        assert_eq!(err.code(), Some(codes::INVALID_PAYLOAD));

        assert!(c
            .build_request(
                "/items",
                &registry,
                RequestOptions::new().method("POST").body(json!({"name": "Test"})),
            )
            .is_ok());
    }

    #[test]
    fn credentials_default_to_config() {
        let c = client(MockTransport::new(200, ITEM_ENVELOPE));
        let request = c
            .build_request("/items", &item_registry(), RequestOptions::new())
            .unwrap();
        assert_eq!(request.credentials, Credentials::SameOrigin);

        let request = c
            .build_request(
                "/items",
                &item_registry(),
                RequestOptions::new().credentials(Credentials::Include),
            )
            .unwrap();
        assert_eq!(request.credentials, Credentials::Include);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_transport_times_out() {
        let c = ApiClient::with_transport(
            ClientConfig::new("http://localhost:3000").with_timeout(Duration::from_secs(15)),
            PendingTransport,
        );
        let started = tokio::time::Instant::now();
        let err = c
            .request("/items/1", &item_registry(), RequestOptions::new())
            .await
            .unwrap_err();
        assert!(err.is_generic());
        assert_eq!(err.code(), Some(codes::TIMEOUT));
        assert!(started.elapsed() >= Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn completed_call_leaves_no_timer_behind() {
        let c = client(MockTransport::new(200, ITEM_ENVELOPE));
        c.request("/items/1", &item_registry(), RequestOptions::new())
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;
        let again = c
            .request("/items/1", &item_registry(), RequestOptions::new())
            .await
            .unwrap();
        assert_eq!(again["id"], 1);
        assert_eq!(c.transport().sent_count(), 2);
    }

    #[tokio::test]
    async fn transport_failure_becomes_generic_error() {
        let c = client(FailingTransport);
        let err = c
            .request("/items/1", &item_registry(), RequestOptions::new())
            .await
            .unwrap_err();
        assert!(err.is_generic());
        assert_eq!(err.code(), None);
    }
}
