//! # hyperfetch
//!
//! Fetch-style access to hyperdrive archives.
//!
//! Archive URLs (`hyper://<key>[+version]/<path>`, or the legacy `dat://`)
//! are served from an archive runtime; every other URL is passed through to
//! a regular HTTP fetch. Archive responses look like ordinary HTTP responses:
//! files come back with their content type and `Accept-Ranges: bytes`,
//! Range requests are answered with `206 Partial Content`, directories
//! without an index page get a generated HTML listing, and misses become 404.
//!
//! ## Features
//!
//! - Lazy, single construction of the archive runtime shared by all requests
//! - Byte range reads translated from HTTP Range headers
//! - HTML directory listings
//! - `HEAD` requests that never read archive content
//! - Passthrough to HTTP(S) for non-archive URLs
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use hyperfetch::{FetchOptions, HyperFetch, LocalRuntimeFactory};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Serve every sub-directory of ./drives as an archive keyed by its name
//!     let options = FetchOptions::new()
//!         .runtime_factory(Arc::new(LocalRuntimeFactory::new("./drives")));
//!     let fetch = HyperFetch::new(options)?;
//!
//!     let mut response = fetch.fetch("hyper://blog/index.html").await?;
//!     println!("{} {}", response.status(), response.text().await?);
//!
//!     fetch.close().await?;
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod cli;
pub mod error;
pub mod fetch;
pub mod io;
pub mod listing;
pub mod mime;
pub mod range;
pub mod request;
pub mod resolve;
pub mod response;
pub mod runtime;
pub mod url;

pub use archive::{
    Archive, ArchiveConstructor, ArchiveRuntime, ByteStream, EntryKind, LocalArchive,
    LocalRuntime, LocalRuntimeFactory, NameResolver, ReadRange, ResolvedEntry, RuntimeFactory,
    Stat,
};
pub use cli::Cli;
pub use crate::url::ArchiveUrl;
pub use error::{EntryNotFound, FetchError, Result};
pub use fetch::{FetchOptions, HyperFetch};
pub use io::{Fallback, ReqwestFallback};
pub use request::FetchRequest;
pub use response::Response;
