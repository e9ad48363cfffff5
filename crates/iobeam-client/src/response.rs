//! Buffered API responses and content-type driven decoding.

use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderName, LOCATION};
use serde::de::DeserializeOwned;

use crate::error::{Error, ErrorResponse, Result};

const JSON: &str = "application/json";
const PLAIN: &str = "text/plain";

/// A fully read HTTP response.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    content_type: Option<String>,
    location: Option<String>,
    body: Vec<u8>,
}

impl Response {
    /// Read the whole body of a blocking response.
    pub(crate) fn read(response: reqwest::blocking::Response) -> Result<Self> {
        let status = response.status();
        let header = |name: HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let content_type = header(CONTENT_TYPE);
        let location = header(LOCATION);
        let body = response.bytes().map_err(Error::Body)?.to_vec();
        Ok(Self {
            location,
            ..Self::from_parts(status, content_type, body)
        })
    }

    pub(crate) fn from_parts(
        status: StatusCode,
        content_type: Option<String>,
        body: Vec<u8>,
    ) -> Self {
        Self {
            status,
            content_type,
            location: None,
            body,
        }
    }

    /// HTTP status code.
    pub fn status(&self) -> u16 {
        self.status.as_u16()
    }

    /// Status line such as `204 No Content`.
    pub fn status_line(&self) -> String {
        match self.status.canonical_reason() {
            Some(reason) => format!("{} {}", self.status.as_u16(), reason),
            None => self.status.as_u16().to_string(),
        }
    }

    /// Declared content type, as sent.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// `Location` header of a created resource, if sent.
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// Raw body bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    /// Media type without parameters, lowercased.
    fn media_type(&self) -> Option<String> {
        self.content_type.as_deref().map(|ct| {
            ct.split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        })
    }

    /// Decode the body according to its content type.
    ///
    /// `application/json` (with or without a charset) is decoded as JSON.
    /// `text/plain` is handed to `T` as a single string, so `T` is usually
    /// `String` or `serde_json::Value`. Integers are decoded exactly, so `u64`
    /// ids above 2^53 survive.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        let media = self.media_type().ok_or(Error::MissingContentType)?;
        match media.as_str() {
            JSON => Ok(serde_json::from_slice(&self.body)?),
            PLAIN => {
                let text = String::from_utf8_lossy(&self.body).into_owned();
                Ok(serde_json::from_value(serde_json::Value::String(text))?)
            }
            _ => Err(Error::UnsupportedContentType(
                self.content_type.clone().unwrap_or_default(),
            )),
        }
    }

    /// The body as text, regardless of content type.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Build the error for a status other than the expected one.
    ///
    /// Uses the first entry of a structured error body when there is one,
    /// otherwise the status line.
    pub(crate) fn status_error(&self) -> Error {
        let parsed = if self.body.is_empty() {
            None
        } else {
            serde_json::from_slice::<ErrorResponse>(&self.body).ok()
        };

        match parsed.and_then(|r| r.errors.into_iter().next()) {
            Some(entry) => Error::Api {
                status: self.status(),
                code: entry.code,
                message: entry.message,
                details: entry.details,
            },
            None => Error::UnexpectedStatus {
                status: self.status(),
                status_line: self.status_line(),
            },
        }
    }
}
