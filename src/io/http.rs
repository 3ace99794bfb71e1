use anyhow::Result;
use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::Client;
use std::io;
use std::time::Duration;
use tracing::debug;

use super::Fallback;
use crate::request::FetchRequest;
use crate::response::Response;

/// Passthrough fetch over HTTP(S)
pub struct ReqwestFallback {
    client: Client,
}

impl ReqwestFallback {
    pub fn new() -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fallback for ReqwestFallback {
    async fn fetch(&self, request: FetchRequest) -> Result<Response> {
        debug!(url = %request.url, method = %request.method, "passthrough fetch");

        let resp = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers)
            .send()
            .await?;

        let status = resp.status();
        let url = resp.url().to_string();
        let headers = resp.headers().clone();
        let body = resp.bytes_stream().map_err(io::Error::other);

        Ok(Response::new(
            status.as_u16(),
            status.canonical_reason().unwrap_or_default(),
            headers,
            Box::pin(body),
            url,
        ))
    }
}
