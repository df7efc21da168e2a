// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use serde::Serialize;

/// Helper error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The step's file list resolved to nothing
    #[error("No files found for step")]
    NoFiles,

    /// Compression name not present in the registry
    #[error("Unknown compression: {0}")]
    UnknownCompression(String),

    /// File missing from the file source
    #[error("File not found: {0}")]
    NotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Character set unknown or input malformed for it
    #[error("Decode error: {0}")]
    Decode(String),

    /// Missing or malformed request parameter
    #[error("Invalid parameter: {0}")]
    Param(String),

    /// Invalid file mask or filter pattern
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Step configuration could not be parsed
    #[error("Invalid step configuration: {0}")]
    Config(String),

    /// Host cancelled the request
    #[error("Request cancelled")]
    Cancelled,

    /// Anything else
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn param<S: Into<String>>(msg: S) -> Self {
        Error::Param(msg.into())
    }

    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Error::Decode(msg.into())
    }

    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Error::Internal(msg.into())
    }

    /// Failure class reported to callers in the response envelope.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NoFiles => ErrorKind::NoFiles,
            Error::UnknownCompression(_) => ErrorKind::UnknownCompression,
            Error::NotFound(_) | Error::Io(_) => ErrorKind::Io,
            Error::Decode(_) => ErrorKind::Decode,
            Error::Param(_) | Error::Pattern(_) | Error::Config(_) => ErrorKind::Param,
            Error::Cancelled => ErrorKind::Cancelled,
            Error::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<serde_yaml_ng::Error> for Error {
    fn from(err: serde_yaml_ng::Error) -> Self {
        Error::Config(err.to_string())
    }
}

/// Wire names for failure classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NoFiles,
    UnknownCompression,
    Io,
    Decode,
    Param,
    Cancelled,
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            ErrorKind::NoFiles => "NO_FILES",
            ErrorKind::UnknownCompression => "UNKNOWN_COMPRESSION",
            ErrorKind::Io => "IO",
            ErrorKind::Decode => "DECODE",
            ErrorKind::Param => "PARAM",
            ErrorKind::Cancelled => "CANCELLED",
            ErrorKind::Internal => "INTERNAL",
        };
        write!(f, "{}", name)
    }
}

/// Result type for helper operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(Error::NoFiles.kind(), ErrorKind::NoFiles);
        assert_eq!(Error::NotFound("/a".into()).kind(), ErrorKind::Io);
        assert_eq!(Error::param("nrlines").kind(), ErrorKind::Param);
        assert_eq!(Error::Cancelled.kind(), ErrorKind::Cancelled);
    }

    #[test]
    fn test_kind_wire_names() {
        let json = serde_json::to_string(&ErrorKind::UnknownCompression).unwrap();
        assert_eq!(json, "\"UNKNOWN_COMPRESSION\"");
        assert_eq!(ErrorKind::NoFiles.to_string(), "NO_FILES");
    }
}
