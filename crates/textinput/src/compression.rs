// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Compression providers
//!
//! Wraps a raw byte stream with decompression chosen by the step's
//! compression name. Format-agnostic - works with any AsyncRead stream.
//!
//! Built-in providers: "None", "GZip", "BZip2", "Zstd". Names match
//! case-insensitively. A blank name and "None" always resolve to the
//! identity provider.

use crate::source::ByteStream;
use crate::{Error, Result};
use async_compression::tokio::bufread::{BzDecoder, GzipDecoder, ZstdDecoder};
use std::sync::Arc;
use tokio::io::BufReader;

pub const NONE: &str = "None";

/// A named adapter from a raw byte stream to a decompressed one
pub trait CompressionProvider: Send + Sync {
    fn name(&self) -> &str;

    fn wrap(&self, stream: ByteStream) -> Result<ByteStream>;
}

/// Identity provider
pub struct NoCompression;

impl CompressionProvider for NoCompression {
    fn name(&self) -> &str {
        NONE
    }

    fn wrap(&self, stream: ByteStream) -> Result<ByteStream> {
        Ok(stream)
    }
}

pub struct GzipCompression;

impl CompressionProvider for GzipCompression {
    fn name(&self) -> &str {
        "GZip"
    }

    fn wrap(&self, stream: ByteStream) -> Result<ByteStream> {
        let mut decoder = GzipDecoder::new(BufReader::new(stream));
        decoder.multiple_members(true);
        Ok(Box::pin(decoder))
    }
}

pub struct Bzip2Compression;

impl CompressionProvider for Bzip2Compression {
    fn name(&self) -> &str {
        "BZip2"
    }

    fn wrap(&self, stream: ByteStream) -> Result<ByteStream> {
        Ok(Box::pin(BzDecoder::new(BufReader::new(stream))))
    }
}

pub struct ZstdCompression;

impl CompressionProvider for ZstdCompression {
    fn name(&self) -> &str {
        "Zstd"
    }

    fn wrap(&self, stream: ByteStream) -> Result<ByteStream> {
        Ok(Box::pin(ZstdDecoder::new(BufReader::new(stream))))
    }
}

/// Compression providers by name
#[derive(Clone)]
pub struct CompressionRegistry {
    providers: Vec<Arc<dyn CompressionProvider>>,
}

impl CompressionRegistry {
    /// A registry that only knows the identity provider
    #[must_use]
    pub fn empty() -> Self {
        Self {
            providers: vec![Arc::new(NoCompression)],
        }
    }

    /// Add a provider, replacing any provider with the same name
    pub fn register(&mut self, provider: Arc<dyn CompressionProvider>) {
        self.providers
            .retain(|p| !p.name().eq_ignore_ascii_case(provider.name()));
        self.providers.push(provider);
    }

    /// Find the provider for a compression name
    pub fn lookup(&self, name: Option<&str>) -> Result<Arc<dyn CompressionProvider>> {
        let name = name.map(str::trim).unwrap_or_default();
        let name = if name.is_empty() { NONE } else { name };
        self.providers
            .iter()
            .find(|p| p.name().eq_ignore_ascii_case(name))
            .cloned()
            .ok_or_else(|| Error::UnknownCompression(name.to_string()))
    }

    /// Registered provider names, in registration order
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }
}

impl Default for CompressionRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(GzipCompression));
        registry.register(Arc::new(Bzip2Compression));
        registry.register(Arc::new(ZstdCompression));
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_compression::tokio::bufread::GzipEncoder;
    use tokio::io::AsyncReadExt;

    async fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzipEncoder::new(data);
        let mut out = Vec::new();
        let _ = encoder.read_to_end(&mut out).await.unwrap();
        out
    }

    #[tokio::test]
    async fn test_decompress_none() {
        let registry = CompressionRegistry::default();
        for name in [None, Some(""), Some("None"), Some("none")] {
            let reader: ByteStream = Box::pin(&b"hello world"[..]);
            let mut decompressed = registry.lookup(name).unwrap().wrap(reader).unwrap();

            let mut result = String::new();
            let _ = decompressed.read_to_string(&mut result).await.unwrap();
            assert_eq!(result, "hello world");
        }
    }

    #[tokio::test]
    async fn test_decompress_gzip() {
        let compressed = gzip(b"line1\nline2\n").await;
        let registry = CompressionRegistry::default();
        let reader: ByteStream = Box::pin(std::io::Cursor::new(compressed));

        let mut decompressed = registry.lookup(Some("gzip")).unwrap().wrap(reader).unwrap();

        let mut result = String::new();
        let _ = decompressed.read_to_string(&mut result).await.unwrap();
        assert_eq!(result, "line1\nline2\n");
    }

    #[test]
    fn test_unknown_compression() {
        let registry = CompressionRegistry::default();
        let result = registry.lookup(Some("Snappy"));
        assert!(matches!(result, Err(Error::UnknownCompression(name)) if name == "Snappy"));
    }

    #[test]
    fn test_empty_registry_still_has_identity() {
        let registry = CompressionRegistry::empty();
        assert!(registry.lookup(None).is_ok());
        assert!(registry.lookup(Some("GZip")).is_err());
        assert_eq!(registry.names(), vec!["None"]);
    }
}
