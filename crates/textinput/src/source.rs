// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! File sources
//!
//! The helper never touches a filesystem directly. It asks a `FileSource`
//! for byte streams and directory listings by URI, so the same code runs
//! against the host filesystem, an in-memory tree in tests, or whatever
//! virtual filesystem the embedding application provides.

use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use log::debug;
use std::path::{Component, Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::io::AsyncRead;

/// Raw or decompressed bytes of one file
pub type ByteStream = Pin<Box<dyn AsyncRead + Send>>;

/// Trait for URI access to files
#[async_trait]
pub trait FileSource: Send + Sync {
    /// Open a file for reading
    async fn open_stream(&self, uri: &str) -> Result<ByteStream>;

    /// URIs of the files below `dir`, sorted. Direct children only unless
    /// `recursive`.
    async fn list(&self, dir: &str, recursive: bool) -> Result<Vec<String>>;

    /// Whether `uri` names an existing file
    async fn exists(&self, uri: &str) -> Result<bool>;
}

/// Represents a file tree backed by memory
///
/// URIs are plain `/`-separated strings; directories exist implicitly as
/// prefixes of file URIs. Suitable for testing and for embedding content
/// that never hits disk.
#[derive(Clone, Default)]
pub struct MemoryFileSource {
    files: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryFileSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file
    pub fn insert<U: Into<String>, T: AsRef<[u8]>>(&self, uri: U, content: T) -> Result<()> {
        let mut files = self
            .files
            .write()
            .map_err(|e| Error::internal(format!("file map poisoned: {}", e)))?;
        let _ = files.insert(uri.into(), content.as_ref().to_vec());
        Ok(())
    }

    /// Builder form of `insert`. A poisoned lock is taken over: every
    /// write replaces a whole entry, so the map is never half-updated.
    #[must_use]
    pub fn with_file<U: Into<String>, T: AsRef<[u8]>>(self, uri: U, content: T) -> Self {
        {
            let mut files = self.files.write().unwrap_or_else(PoisonError::into_inner);
            let _ = files.insert(uri.into(), content.as_ref().to_vec());
        }
        self.files.clear_poison();
        self
    }

    fn snapshot(&self, uri: &str) -> Result<Option<Vec<u8>>> {
        let files = self
            .files
            .read()
            .map_err(|e| Error::internal(format!("file map poisoned: {}", e)))?;
        Ok(files.get(uri).cloned())
    }
}

#[async_trait]
impl FileSource for MemoryFileSource {
    async fn open_stream(&self, uri: &str) -> Result<ByteStream> {
        use std::io::Cursor;
        let content = self
            .snapshot(uri)?
            .ok_or_else(|| Error::NotFound(uri.to_string()))?;
        Ok(Box::pin(Cursor::new(content)))
    }

    async fn list(&self, dir: &str, recursive: bool) -> Result<Vec<String>> {
        let files = self
            .files
            .read()
            .map_err(|e| Error::internal(format!("file map poisoned: {}", e)))?;
        let prefix = format!("{}/", dir.trim_end_matches('/'));
        Ok(files
            .keys()
            .filter(|uri| match uri.strip_prefix(&prefix) {
                Some(rest) => recursive || !rest.contains('/'),
                None => false,
            })
            .cloned()
            .collect())
    }

    async fn exists(&self, uri: &str) -> Result<bool> {
        Ok(self.snapshot(uri)?.is_some())
    }
}

/// Represents a file tree backed by a host directory.
///
/// URIs resolve relative to the root; a leading `/` is ignored so that
/// `/in/a.txt` and `in/a.txt` name the same file. Listings return URIs in
/// the same root-relative form with a leading `/`. A URI that would leave
/// the root, through `..` or a symlink, is reported as not found.
pub struct HostFileSource {
    root: PathBuf,
}

impl HostFileSource {
    /// The directory must exist.
    pub fn new<P: Into<PathBuf>>(root: P) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(Error::NotFound(root.display().to_string()));
        }
        let root = root.canonicalize()?;
        Ok(Self { root })
    }

    /// Host path for `uri`, confined to the root
    async fn host_path(&self, uri: &str) -> Result<PathBuf> {
        let rel = Path::new(uri.trim_start_matches('/'));
        if !rel
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        {
            debug!("rejected '{}': escapes {}", uri, self.root.display());
            return Err(Error::NotFound(uri.to_string()));
        }

        let path = self.root.join(rel);
        match tokio::fs::canonicalize(&path).await {
            Ok(canonical) if !canonical.starts_with(&self.root) => {
                debug!("rejected '{}': resolves to {}", uri, canonical.display());
                Err(Error::NotFound(uri.to_string()))
            }
            Ok(_) => Ok(path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(path),
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn uri_for(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<&str> = rel
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<Vec<_>>>()?;
        Some(format!("/{}", parts.join("/")))
    }
}

#[async_trait]
impl FileSource for HostFileSource {
    async fn open_stream(&self, uri: &str) -> Result<ByteStream> {
        let path = self.host_path(uri).await?;
        match tokio::fs::File::open(&path).await {
            Ok(file) => Ok(Box::pin(file)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(uri.to_string()))
            }
            Err(e) => Err(Error::Io(e)),
        }
    }

    async fn list(&self, dir: &str, recursive: bool) -> Result<Vec<String>> {
        let mut found = Vec::new();
        let mut pending = vec![self.host_path(dir).await?];
        while let Some(current) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&current).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Err(Error::NotFound(dir.to_string()));
                }
                Err(e) => return Err(Error::Io(e)),
            };
            while let Some(entry) = entries.next_entry().await? {
                let file_type = entry.file_type().await?;
                let path = entry.path();
                if file_type.is_dir() {
                    if recursive {
                        pending.push(path);
                    }
                } else if let Some(uri) = self.uri_for(&path) {
                    found.push(uri);
                }
            }
        }
        found.sort();
        Ok(found)
    }

    async fn exists(&self, uri: &str) -> Result<bool> {
        let path = match self.host_path(uri).await {
            Ok(path) => path,
            Err(Error::NotFound(_)) => return Ok(false),
            Err(e) => return Err(e),
        };
        match tokio::fs::metadata(path).await {
            Ok(md) => Ok(md.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::Io(e)),
        }
    }
}
