use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use std::io::{self, SeekFrom};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, info};

use super::{
    Archive, ArchiveConstructor, ArchiveRuntime, ByteStream, EntryKind, NameResolver, ReadRange,
    ResolvedEntry, RuntimeFactory, Stat,
};
use crate::error::EntryNotFound;

/// Read granularity for archive streams
const CHUNK_SIZE: u64 = 64 * 1024;

/// Builds a [`LocalRuntime`] over a root directory, checking it exists first.
pub struct LocalRuntimeFactory {
    root: PathBuf,
}

impl LocalRuntimeFactory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl RuntimeFactory for LocalRuntimeFactory {
    async fn construct(&self) -> Result<Arc<dyn ArchiveRuntime>> {
        let meta = fs::metadata(&self.root)
            .await
            .with_context(|| format!("cannot open archive root {}", self.root.display()))?;
        if !meta.is_dir() {
            bail!("archive root {} is not a directory", self.root.display());
        }

        info!(root = %self.root.display(), "local archive runtime ready");
        Ok(Arc::new(LocalRuntime::new(self.root.clone())))
    }
}

/// Archive runtime backed by a directory tree.
///
/// Every sub-directory of the root is an archive whose key is the directory
/// name. Names resolve to themselves when such a directory exists.
pub struct LocalRuntime {
    root: PathBuf,
}

impl LocalRuntime {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

fn checked_key(name: &str) -> Result<&str> {
    let name = name.split_once("://").map_or(name, |(_, rest)| rest);
    let name = name.trim_end_matches('/');
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        bail!("invalid archive name {name:?}");
    }
    Ok(name)
}

#[async_trait]
impl NameResolver for LocalRuntime {
    async fn resolve_name(&self, name: &str) -> Result<String> {
        let key = checked_key(name)?;
        match fs::metadata(self.root.join(key)).await {
            Ok(meta) if meta.is_dir() => Ok(key.to_string()),
            _ => bail!("unable to resolve archive name {key:?}"),
        }
    }
}

impl ArchiveConstructor for LocalRuntime {
    fn open_archive(&self, key: &str) -> Result<Arc<dyn Archive>> {
        let key = checked_key(key)?;
        Ok(Arc::new(LocalArchive::new(self.root.join(key))))
    }
}

#[async_trait]
impl ArchiveRuntime for LocalRuntime {
    async fn close(&self) -> Result<()> {
        debug!(root = %self.root.display(), "local archive runtime closed");
        Ok(())
    }
}

/// A single archive stored as a plain directory.
pub struct LocalArchive {
    dir: PathBuf,
}

impl LocalArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn locate(&self, path: &str) -> PathBuf {
        let mut located = self.dir.clone();
        located.extend(normalize(path));
        located
    }
}

/// Split an archive path into segments, dropping `.` and clamping `..` at the root.
fn normalize(path: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            segment => segments.push(segment),
        }
    }
    segments
}

#[async_trait]
impl Archive for LocalArchive {
    async fn ready(&self) -> Result<()> {
        match fs::metadata(&self.dir).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            _ => bail!("archive {} is not available", self.dir.display()),
        }
    }

    async fn readdir(&self, path: &str) -> Result<Vec<String>> {
        let dir = self.locate(path);
        let mut entries = fs::read_dir(&dir)
            .await
            .with_context(|| format!("cannot list {}", dir.display()))?;

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    async fn resolve_path(&self, path: &str) -> Result<ResolvedEntry> {
        let base = format!("/{}", normalize(path).join("/"));
        let index = match base.as_str() {
            "/" => "/index.html".to_string(),
            base => format!("{base}/index.html"),
        };

        // Directory requests prefer their index page; bare paths also try `.html`
        let candidates = if base == "/" || path.ends_with('/') {
            vec![(index, EntryKind::File), (base, EntryKind::Directory)]
        } else {
            vec![
                (base.clone(), EntryKind::File),
                (format!("{base}.html"), EntryKind::File),
                (index, EntryKind::File),
                (base, EntryKind::Directory),
            ]
        };

        let mut tried = Vec::new();
        for (candidate, kind) in candidates {
            let meta = match fs::metadata(self.locate(&candidate)).await {
                Ok(meta) => Some(meta),
                Err(e) if e.kind() == io::ErrorKind::NotFound => None,
                Err(e) => {
                    return Err(e).with_context(|| format!("cannot stat {candidate}"));
                }
            };

            let stat = match (kind, meta) {
                (EntryKind::File, Some(meta)) if meta.is_file() => Some(Stat { size: meta.len() }),
                (EntryKind::Directory, Some(meta)) if meta.is_dir() => Some(Stat::default()),
                _ => None,
            };
            if let Some(stat) = stat {
                return Ok(ResolvedEntry {
                    kind,
                    path: candidate,
                    stat,
                });
            }
            tried.push(candidate);
        }

        Err(EntryNotFound::new(path, tried).into())
    }

    fn create_read_stream(&self, path: &str, range: ReadRange) -> Result<ByteStream> {
        Ok(read_stream(self.locate(path), range))
    }
}

enum ReadState {
    Unopened { path: PathBuf, range: ReadRange },
    Open { file: File, remaining: Option<u64> },
}

/// Chunked reader over `path`. The file is only opened on first poll.
fn read_stream(path: PathBuf, range: ReadRange) -> ByteStream {
    let state = ReadState::Unopened { path, range };
    Box::pin(stream::try_unfold(state, next_chunk))
}

async fn next_chunk(state: ReadState) -> io::Result<Option<(Bytes, ReadState)>> {
    let (mut file, remaining) = match state {
        ReadState::Unopened { path, range } => {
            let mut file = File::open(&path).await?;
            let start = range.start.unwrap_or(0);
            if start > 0 {
                file.seek(SeekFrom::Start(start)).await?;
            }
            let remaining = range.end.map(|end| (end + 1).saturating_sub(start));
            (file, remaining)
        }
        ReadState::Open { file, remaining } => (file, remaining),
    };

    let want = remaining.map_or(CHUNK_SIZE, |left| left.min(CHUNK_SIZE));
    if want == 0 {
        return Ok(None);
    }

    let mut buf = vec![0u8; want as usize];
    let n = file.read(&mut buf).await?;
    if n == 0 {
        return Ok(None);
    }
    buf.truncate(n);

    let remaining = remaining.map(|left| left - n as u64);
    Ok(Some((Bytes::from(buf), ReadState::Open { file, remaining })))
}
