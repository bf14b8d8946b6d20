use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use std::fmt;
use std::io::{self, Read, Seek, SeekFrom};

/// A payload that can be read more than once by seeking back to its start.
pub trait PartStream: Read + Send {
    fn rewind(&mut self) -> io::Result<()>;
}

impl<T: Read + Seek + Send> PartStream for T {
    fn rewind(&mut self) -> io::Result<()> {
        self.seek(SeekFrom::Start(0)).map(|_| ())
    }
}

pub enum PartContent {
    Bytes(Vec<u8>),
    Stream(Box<dyn PartStream>),
}

impl fmt::Debug for PartContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartContent::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            PartContent::Stream(_) => write!(f, "Stream"),
        }
    }
}

/// One field of a multipart body
#[derive(Debug)]
pub struct Part {
    pub name: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub content: PartContent,
}

impl Part {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filename: None,
            content_type: None,
            content: PartContent::Bytes(value.into().into_bytes()),
        }
    }

    /// File-like part backed by a stream that is rewound before every retry
    pub fn stream(
        name: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        stream: impl PartStream + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            filename: Some(filename.into()),
            content_type: Some(content_type.into()),
            content: PartContent::Stream(Box::new(stream)),
        }
    }

    pub fn is_stream(&self) -> bool {
        matches!(self.content, PartContent::Stream(_))
    }
}

#[derive(Debug, Default)]
pub enum Body {
    #[default]
    Empty,
    Bytes(Vec<u8>),
    Text(String),
    Multipart(Vec<Part>),
}

impl Body {
    /// Number of parts that need rewinding before a resend
    pub fn stream_parts(&self) -> usize {
        match self {
            Body::Multipart(parts) => parts.iter().filter(|p| p.is_stream()).count(),
            _ => 0,
        }
    }
}

/// Outbound request handed to a [`crate::Transport`].
///
/// The request is owned by the dispatcher for the whole retry loop and lent
/// mutably to the transport on every attempt, so stream parts can be consumed
/// and rewound without rebuilding the request.
#[derive(Debug)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Body,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: Body::Empty,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> anyhow::Result<Self> {
        let name: HeaderName = name.parse()?;
        let value: HeaderValue = value.parse()?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    /// Serialize `payload` as the request body and set the JSON content type
    pub fn json<T: Serialize>(mut self, payload: &T) -> anyhow::Result<Self> {
        self.body = Body::Bytes(serde_json::to_vec(payload)?);
        self.headers.insert(
            reqwest::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        Ok(self)
    }
}

#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    /// Build a response from a raw status code, mostly useful in tests and
    /// in-process transports.
    pub fn from_status(status: u16) -> anyhow::Result<Self> {
        Ok(Self::new(StatusCode::from_u16(status)?))
    }

    pub fn with_header(mut self, name: &str, value: &str) -> anyhow::Result<Self> {
        let name: HeaderName = name.parse()?;
        let value: HeaderValue = value.parse()?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Header value as text; header names are matched case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let response = Response::from_status(429)
            .unwrap()
            .with_header("Retry-After", "3")
            .unwrap();
        assert_eq!(response.header("retry-after"), Some("3"));
        assert_eq!(response.header("RETRY-AFTER"), Some("3"));
        assert_eq!(response.header("RateLimit-Reset"), None);
    }

    #[test]
    fn test_json_body_sets_content_type() {
        let request = Request::post("http://localhost/orders")
            .json(&serde_json::json!({"foo": "bar"}))
            .unwrap();
        assert_eq!(
            request.headers.get("content-type").unwrap(),
            "application/json"
        );
        match request.body {
            Body::Bytes(bytes) => assert_eq!(bytes, br#"{"foo":"bar"}"#.to_vec()),
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_seekable_stream_rewinds_to_start() {
        let mut cursor = Cursor::new(b"Test data".to_vec());
        let mut first = String::new();
        cursor.read_to_string(&mut first).unwrap();
        PartStream::rewind(&mut cursor).unwrap();
        let mut second = String::new();
        cursor.read_to_string(&mut second).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_stream_parts_counts_only_streams() {
        let body = Body::Multipart(vec![
            Part::text("field", "value"),
            Part::stream("a", "a.txt", "text/plain", Cursor::new(vec![1u8])),
            Part::stream("b", "b.txt", "text/plain", Cursor::new(vec![2u8])),
        ]);
        assert_eq!(body.stream_parts(), 2);
        assert_eq!(Body::Text("x".into()).stream_parts(), 0);
    }
}
