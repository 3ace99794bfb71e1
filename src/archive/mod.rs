//! Capabilities consumed from the archive runtime.
//!
//! Storage, replication and name lookup live outside this crate. The adapter
//! only talks to them through the traits below, which a runtime (or a test
//! double) implements.

mod local;

pub use local::{LocalArchive, LocalRuntime, LocalRuntimeFactory};

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::io;
use std::pin::Pin;
use std::sync::Arc;

/// Single-pass body stream. Dropping it releases the underlying reader.
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stat {
    pub size: u64,
}

/// A concrete archive entry a logical path resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntry {
    pub kind: EntryKind,
    /// Canonical path inside the archive
    pub path: String,
    pub stat: Stat,
}

/// Byte bounds for [`Archive::create_read_stream`]; `end` is inclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadRange {
    pub start: Option<u64>,
    pub end: Option<u64>,
}

impl ReadRange {
    pub fn full() -> Self {
        Self::default()
    }

    pub fn bounded(start: u64, end: u64) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }
}

/// An opened archive.
#[async_trait]
pub trait Archive: Send + Sync {
    /// Wait until the archive can serve reads
    async fn ready(&self) -> Result<()>;

    /// List the names of the entries directly under `path`
    async fn readdir(&self, path: &str) -> Result<Vec<String>>;

    /// Map a logical path to a file or directory.
    ///
    /// A miss must be reported as [`EntryNotFound`](crate::EntryNotFound) so
    /// callers can tell it apart from I/O failures.
    async fn resolve_path(&self, path: &str) -> Result<ResolvedEntry>;

    /// Open a lazy byte stream over `path`. Nothing is read until polled.
    fn create_read_stream(&self, path: &str, range: ReadRange) -> Result<ByteStream>;
}

/// Turns a human readable name into an archive key.
#[async_trait]
pub trait NameResolver: Send + Sync {
    async fn resolve_name(&self, name: &str) -> Result<String>;
}

/// Opens archives by key.
pub trait ArchiveConstructor: Send + Sync {
    fn open_archive(&self, key: &str) -> Result<Arc<dyn Archive>>;
}

/// A fully initialized archive runtime.
#[async_trait]
pub trait ArchiveRuntime: NameResolver + ArchiveConstructor {
    async fn close(&self) -> Result<()>;
}

/// Builds the default runtime on first use.
#[async_trait]
pub trait RuntimeFactory: Send + Sync {
    async fn construct(&self) -> Result<Arc<dyn ArchiveRuntime>>;
}
