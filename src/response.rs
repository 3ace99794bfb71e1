//! Fetch style responses with a one-shot body.

use bytes::{Bytes, BytesMut};
use futures::{TryStreamExt, stream};
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use std::{fmt, io};

use crate::archive::ByteStream;
use crate::error::{FetchError, Result};

/// A response produced by [`HyperFetch`](crate::HyperFetch).
///
/// The body is a single-pass stream. It can be consumed exactly once, either
/// through [`bytes`](Self::bytes), [`text`](Self::text), [`json`](Self::json)
/// or by taking the raw stream with [`take_body`](Self::take_body).
pub struct Response {
    status: u16,
    status_text: String,
    headers: HeaderMap,
    url: String,
    body: Option<ByteStream>,
}

impl Response {
    pub fn new(
        status: u16,
        status_text: impl Into<String>,
        headers: HeaderMap,
        body: ByteStream,
        url: impl Into<String>,
    ) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            headers,
            url: url.into(),
            body: Some(body),
        }
    }

    /// Response whose body is an in-memory buffer
    pub fn from_bytes(
        status: u16,
        status_text: impl Into<String>,
        headers: HeaderMap,
        body: impl Into<Bytes>,
        url: impl Into<String>,
    ) -> Self {
        Self::new(status, status_text, headers, body_from(body), url)
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// True for any set status below 400
    pub fn ok(&self) -> bool {
        self.status != 0 && self.status < 400
    }

    /// The response URL is final; no redirects are followed inside archives
    pub fn use_final_url(&self) -> bool {
        true
    }

    pub fn body_used(&self) -> bool {
        self.body.is_none()
    }

    /// Take the raw body stream. Later consumption calls fail with
    /// [`FetchError::BodyUsed`].
    pub fn take_body(&mut self) -> Result<ByteStream> {
        self.body.take().ok_or(FetchError::BodyUsed)
    }

    /// Drain the whole body into memory
    pub async fn bytes(&mut self) -> Result<Bytes> {
        let mut body = self.take_body()?;
        let mut buf = BytesMut::new();
        while let Some(chunk) = body.try_next().await.map_err(FetchError::Body)? {
            buf.extend_from_slice(&chunk);
        }
        Ok(buf.freeze())
    }

    /// Drain the body and decode it as UTF-8, replacing invalid sequences
    pub async fn text(&mut self) -> Result<String> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Drain the body and parse it as JSON
    pub async fn json<T: DeserializeOwned>(&mut self) -> Result<T> {
        let text = self.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("status_text", &self.status_text)
            .field("headers", &self.headers)
            .field("url", &self.url)
            .field("body_used", &self.body_used())
            .finish()
    }
}

/// A stream yielding `data` as a single chunk
pub fn body_from(data: impl Into<Bytes>) -> ByteStream {
    let chunk: io::Result<Bytes> = Ok(data.into());
    Box::pin(stream::once(futures::future::ready(chunk)))
}

pub fn empty_body() -> ByteStream {
    Box::pin(stream::empty::<io::Result<Bytes>>())
}
