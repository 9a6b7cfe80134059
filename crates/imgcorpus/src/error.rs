// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

use std::path::PathBuf;

/// Error type for corpus normalization, manifest and publishing operations.
///
/// Most variants wrap the error of an underlying library. The domain variants
/// mirror the pipeline's failure taxonomy: per-file failures
/// ([`Error::DecodeError`], [`Error::UploadError`],
/// [`Error::RecordCreationError`]) are recovered by the stage that raised
/// them, while the remaining variants surface to the caller.
#[derive(Debug)]
pub enum Error {
    /// An I/O error occurred during file operations.
    IoError(std::io::Error),
    /// Configuration parsing or loading error.
    ConfigError(config::ConfigError),
    /// JSON serialization or deserialization error.
    JsonError(serde_json::Error),
    /// HTTP transport error from the reqwest client.
    HttpError(reqwest::Error),
    /// URL parsing error.
    UrlParseError(url::ParseError),
    /// Async task join error.
    JoinError(tokio::task::JoinError),
    /// Path prefix stripping error.
    StripPrefixError(std::path::StripPrefixError),
    /// A source image could not be turned into a normalized image.
    DecodeError(PathBuf, String),
    /// The asset upload was rejected, with the HTTP status when one was
    /// received and the server response body.
    UploadError(Option<u16>, String),
    /// The dataset record could not be created for an uploaded asset.
    RecordCreationError(Option<u16>, String),
    /// A root directory required by the stage does not exist.
    MissingRoot(PathBuf),
    /// Invalid parameters provided to an operation.
    InvalidParameters(String),
    /// The run completed but skipped the given number of files.
    IncompleteRun(usize),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::ConfigError(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::JsonError(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::HttpError(err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::UrlParseError(err)
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::JoinError(err)
    }
}

impl From<std::path::StripPrefixError> for Error {
    fn from(err: std::path::StripPrefixError) -> Self {
        Error::StripPrefixError(err)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::IoError(e) => write!(f, "I/O error: {}", e),
            Error::ConfigError(e) => write!(f, "Configuration error: {}", e),
            Error::JsonError(e) => write!(f, "JSON error: {}", e),
            Error::HttpError(e) => write!(f, "HTTP error: {}", e),
            Error::UrlParseError(e) => write!(f, "URL parse error: {}", e),
            Error::JoinError(e) => write!(f, "Task join error: {}", e),
            Error::StripPrefixError(e) => write!(f, "Path prefix error: {}", e),
            Error::DecodeError(path, reason) => {
                write!(f, "Cannot normalize {}: {}", path.display(), reason)
            }
            Error::UploadError(Some(status), body) => {
                write!(f, "Asset upload failed: HTTP {} - {}", status, body)
            }
            Error::UploadError(None, msg) => write!(f, "Asset upload failed: {}", msg),
            Error::RecordCreationError(Some(status), body) => {
                write!(f, "Record creation failed: HTTP {} - {}", status, body)
            }
            Error::RecordCreationError(None, msg) => {
                write!(f, "Record creation failed: {}", msg)
            }
            Error::MissingRoot(path) => write!(f, "Directory not found: {}", path.display()),
            Error::InvalidParameters(s) => write!(f, "Invalid parameters: {}", s),
            Error::IncompleteRun(n) => write!(f, "Run completed with {} skipped files", n),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            Error::ConfigError(e) => Some(e),
            Error::JsonError(e) => Some(e),
            Error::HttpError(e) => Some(e),
            Error::UrlParseError(e) => Some(e),
            Error::JoinError(e) => Some(e),
            Error::StripPrefixError(e) => Some(e),
            _ => None,
        }
    }
}
