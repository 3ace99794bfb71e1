//! The request adapter.
//!
//! [`HyperFetch`] decides whether a request targets an archive, serves it from
//! the archive runtime if so, and hands everything else to a fallback fetch.
//! Archive level problems become ordinary 404/500 responses; only malformed
//! URLs, runtime construction failures and passthrough errors are returned
//! as errors.

use anyhow::Context;
use reqwest::header::{
    ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, HeaderMap, HeaderValue, RANGE,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::archive::{
    ArchiveConstructor, EntryKind, LocalRuntimeFactory, NameResolver, ReadRange, RuntimeFactory,
};
use crate::error::{FetchError, Result};
use crate::io::{Fallback, ReqwestFallback};
use crate::listing;
use crate::mime::content_type_for;
use crate::range::{RangeDecision, translate};
use crate::request::FetchRequest;
use crate::resolve::{Resolution, resolve};
use crate::response::{Response, body_from, empty_body};
use crate::runtime::RuntimeAccessor;
use crate::url::{self, ArchiveUrl};

/// Construction options for [`HyperFetch`].
#[derive(Default)]
pub struct FetchOptions {
    archive_constructor: Option<Arc<dyn ArchiveConstructor>>,
    resolve_name: Option<Arc<dyn NameResolver>>,
    base_url: Option<String>,
    fallback: Option<Arc<dyn Fallback>>,
    runtime_factory: Option<Arc<dyn RuntimeFactory>>,
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open archives with `constructor` instead of the lazily built runtime
    pub fn archive_constructor(mut self, constructor: Arc<dyn ArchiveConstructor>) -> Self {
        self.archive_constructor = Some(constructor);
        self
    }

    /// Resolve archive names with `resolver` instead of the lazily built runtime
    pub fn resolve_name(mut self, resolver: Arc<dyn NameResolver>) -> Self {
        self.resolve_name = Some(resolver);
        self
    }

    /// Base for scheme-less URLs. Those are only intercepted when the base
    /// itself is an archive URL.
    pub fn base_url(mut self, base: impl Into<String>) -> Self {
        self.base_url = Some(base.into());
        self
    }

    pub fn fallback(mut self, fallback: Arc<dyn Fallback>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// How the runtime is built when a capability was not supplied.
    /// Defaults to a directory-backed runtime rooted at the working directory.
    pub fn runtime_factory(mut self, factory: Arc<dyn RuntimeFactory>) -> Self {
        self.runtime_factory = Some(factory);
        self
    }
}

pub struct HyperFetch {
    runtime: RuntimeAccessor,
    base_url: Option<String>,
    fallback: Arc<dyn Fallback>,
}

impl HyperFetch {
    pub fn new(options: FetchOptions) -> Result<Self> {
        let fallback: Arc<dyn Fallback> = match options.fallback {
            Some(fallback) => fallback,
            None => Arc::new(ReqwestFallback::new().map_err(FetchError::Passthrough)?),
        };
        let factory: Arc<dyn RuntimeFactory> = match options.runtime_factory {
            Some(factory) => factory,
            None => Arc::new(LocalRuntimeFactory::new(PathBuf::from("."))),
        };

        Ok(Self {
            runtime: RuntimeAccessor::new(
                options.resolve_name,
                options.archive_constructor,
                factory,
            ),
            base_url: options.base_url,
            fallback,
        })
    }

    /// Shut down the archive runtime if this adapter constructed one
    pub async fn close(&self) -> Result<()> {
        self.runtime.close().await
    }

    pub fn should_intercept(&self, url: &str) -> bool {
        if url::is_archive_url(url) {
            return true;
        }
        url::scheme_of(url).is_none()
            && self
                .base_url
                .as_deref()
                .is_some_and(url::is_archive_url)
    }

    pub async fn fetch(&self, request: impl Into<FetchRequest>) -> Result<Response> {
        let request = request.into();

        if !self.should_intercept(&request.url) {
            debug!(url = %request.url, "not an archive URL, passing through");
            return self
                .fallback
                .fetch(request)
                .await
                .map_err(FetchError::Passthrough);
        }

        let absolute = match (url::scheme_of(&request.url), &self.base_url) {
            (None, Some(base)) => url::join(base, &request.url)?,
            _ => request.url.clone(),
        };
        let target = ArchiveUrl::parse(&absolute)?;

        let mut headers = HeaderMap::new();
        match self.serve(&request, &absolute, &target, &mut headers).await {
            Err(FetchError::Unexpected(e)) => {
                warn!(url = %absolute, error = %format!("{e:#}"), "archive request failed");
                Ok(Response::from_bytes(
                    500,
                    "server error",
                    headers,
                    format!("{e:?}"),
                    absolute,
                ))
            }
            outcome => outcome,
        }
    }

    /// Serve `target` from its archive. `url` is the absolute form of the
    /// request URL and is echoed back on the response.
    async fn serve(
        &self,
        request: &FetchRequest,
        url: &str,
        target: &ArchiveUrl,
        headers: &mut HeaderMap,
    ) -> Result<Response> {
        let resolver = self.runtime.resolver().await?;
        let key = resolver.resolve_name(&target.key).await?;
        let constructor = self.runtime.archive_constructor().await?;

        let archive = constructor.open_archive(&key)?;
        archive.ready().await?;

        let entry = match resolve(archive.as_ref(), &target.path).await? {
            Resolution::Found(entry) => entry,
            Resolution::NotFound(detail) => {
                let mut headers = HeaderMap::new();
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
                return Ok(Response::from_bytes(
                    404,
                    "Not Found",
                    headers,
                    detail,
                    url,
                ));
            }
        };

        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static(content_type_for(&entry.path)),
        );

        let (status, body) = match entry.kind {
            EntryKind::Directory => {
                let files = archive.readdir(&entry.path).await?;
                let page = listing::render(url, &target.path, &files);
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/html"));
                (200, body_from(page))
            }
            EntryKind::File => {
                headers.insert(ACCEPT_RANGES, HeaderValue::from_static("bytes"));
                let size = entry.stat.size;

                match request.headers.get(RANGE) {
                    None => (200, archive.create_read_stream(&entry.path, ReadRange::full())?),
                    Some(value) => match translate(value.to_str().ok(), size) {
                        RangeDecision::Bounded(range) => {
                            debug!(path = %entry.path, ?range, size, "serving byte range");
                            headers.insert(
                                CONTENT_LENGTH,
                                HeaderValue::from(range.content_length()),
                            );
                            let content_range = HeaderValue::from_str(&range.content_range(size))
                                .context("invalid content range")?;
                            headers.insert(CONTENT_RANGE, content_range);
                            let stream = archive.create_read_stream(
                                &entry.path,
                                ReadRange::bounded(range.start, range.end),
                            )?;
                            (206, stream)
                        }
                        RangeDecision::Full => {
                            debug!(
                                path = %entry.path,
                                "unusable range header, serving full entity"
                            );
                            headers.insert(CONTENT_LENGTH, HeaderValue::from(size));
                            let stream =
                                archive.create_read_stream(&entry.path, ReadRange::full())?;
                            (200, stream)
                        }
                    },
                }
            }
        };

        if request.is_head() {
            // Release the reader without ever polling it
            drop(body);
            debug!(url, "HEAD request, body discarded");
            return Ok(Response::new(
                204,
                "ok",
                std::mem::take(headers),
                empty_body(),
                url,
            ));
        }

        Ok(Response::new(
            status,
            "ok",
            std::mem::take(headers),
            body,
            url,
        ))
    }
}
