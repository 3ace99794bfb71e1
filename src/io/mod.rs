mod http;

pub use http::ReqwestFallback;

use anyhow::Result;
use async_trait::async_trait;

use crate::request::FetchRequest;
use crate::response::Response;

/// Network fetch used for every request that is not served from an archive
#[async_trait]
pub trait Fallback: Send + Sync {
    async fn fetch(&self, request: FetchRequest) -> Result<Response>;
}
