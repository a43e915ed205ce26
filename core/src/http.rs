//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! These types describe HTTP requests and responses as plain data. The client
//! builds `HttpRequest` values and parses `HttpResponse` values; a
//! `Transport` implementation performs the actual round-trip. Keeping the
//! wire description as data makes request building and response parsing
//! deterministic and easy to test without a network.

use std::fmt;
use std::io::Read;
use std::str::FromStr;

use crate::error::ApiError;

/// HTTP method accepted by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 5] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
    ];

    /// Normalize a method name. Case is ignored but whitespace is not; only
    /// the five supported verbs are accepted.
    pub fn parse(method: &str) -> Result<Self, ApiError> {
        match method.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            _ => Err(ApiError::unsupported_method(method)),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl FromStr for HttpMethod {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HttpMethod::parse(s)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether cookies and other credentials accompany the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Credentials {
    Omit,
    #[default]
    SameOrigin,
    Include,
}

/// An owned byte stream used as a request body.
pub struct BodyStream(Box<dyn Read + Send + 'static>);

impl BodyStream {
    pub fn new(reader: impl Read + Send + 'static) -> Self {
        Self(Box::new(reader))
    }

    pub fn into_inner(self) -> Box<dyn Read + Send + 'static> {
        self.0
    }
}

impl fmt::Debug for BodyStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BodyStream(..)")
    }
}

/// One value inside a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    Text(String),
    File {
        filename: String,
        content_type: String,
        bytes: Vec<u8>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormPart {
    pub name: String,
    pub value: FormValue,
}

/// Ordered `multipart/form-data` container.
///
/// The boundary is not part of the container; the transport picks one when
/// it encodes the body and sets the matching `Content-Type` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    parts: Vec<FormPart>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_text(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.parts.push(FormPart {
            name: name.into(),
            value: FormValue::Text(value.into()),
        });
        self
    }

    pub fn append_file(
        &mut self,
        name: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> &mut Self {
        self.parts.push(FormPart {
            name: name.into(),
            value: FormValue::File {
                filename: filename.into(),
                content_type: content_type.into(),
                bytes: bytes.into(),
            },
        });
        self
    }

    pub fn parts(&self) -> &[FormPart] {
        &self.parts
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// `Content-Type` header value for a body encoded with `boundary`.
    pub fn content_type(boundary: &str) -> String {
        format!("multipart/form-data; boundary={boundary}")
    }

    /// Encode all parts as a `multipart/form-data` body.
    pub fn encode(&self, boundary: &str) -> Vec<u8> {
        let mut out = Vec::new();
        for part in &self.parts {
            out.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            let name = escape_quoted(&part.name);
            match &part.value {
                FormValue::Text(text) => {
                    out.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                    );
                    out.extend_from_slice(text.as_bytes());
                }
                FormValue::File {
                    filename,
                    content_type,
                    bytes,
                } => {
                    let filename = escape_quoted(filename);
                    out.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                             Content-Type: {content_type}\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    out.extend_from_slice(bytes);
                }
            }
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
        out
    }
}

fn escape_quoted(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Final wire body of a request.
#[derive(Debug)]
pub enum RequestBody {
    /// JSON text or a caller-provided string.
    Text(String),
    /// Binary blob or raw byte buffer.
    Bytes(Vec<u8>),
    /// Multipart form; the transport encodes it and sets the boundary.
    Form(FormData),
    /// `application/x-www-form-urlencoded` parameters.
    UrlEncoded(Vec<(String, String)>),
    Stream(BodyStream),
}

impl RequestBody {
    pub fn is_form(&self) -> bool {
        matches!(self, RequestBody::Form(_))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            RequestBody::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// An HTTP request described as plain data.
///
/// Built by `ApiClient::build_request` and handed to a `Transport`.
#[derive(Debug)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
    pub credentials: Credentials,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u16,
    /// Reason phrase for the status, when the transport knows it.
    ///
    /// `UreqTransport` fills in the canonical phrase for the status code
    /// (`"Not Found"` for 404), not the phrase the server actually sent.
    pub status_text: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            status_text: None,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

pub(crate) fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}
