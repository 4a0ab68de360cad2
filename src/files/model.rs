//! Data models for the Files API.

use mime::Mime;
use serde::{Deserialize, Serialize};
use snafu::ensure;
use std::fmt;
use time::OffsetDateTime;

use crate::{
    client::{Error as ClientError, InvalidResourceNameSnafu},
    common::serde::deserialize_optional_string_to_i64,
};

use super::{Error, InvalidTimeoutSnafu};

/// Bytes to upload, together with the metadata declared to the upload endpoint.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct UploadRequest {
    pub file_bytes: Vec<u8>,
    pub mime_type: Mime,
    pub display_name: Option<String>,
}

/// Server-side lifecycle of an uploaded file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileState {
    /// No state reported yet
    #[default]
    StateUnspecified,
    /// File is being processed and cannot be used for inference yet
    Processing,
    /// File is processed and available for inference
    Active,
    /// File failed processing
    Failed,
    /// A state this crate does not know about; treated like `Processing`
    #[serde(other)]
    Unknown,
}

impl FileState {
    pub fn is_terminal(self) -> bool {
        matches!(self, FileState::Active | FileState::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileState::StateUnspecified => "STATE_UNSPECIFIED",
            FileState::Processing => "PROCESSING",
            FileState::Active => "ACTIVE",
            FileState::Failed => "FAILED",
            FileState::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for FileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error status attached to a file whose processing failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A file resource as returned by the Files API.
///
/// Every field is optional: the upload and `files.get` responses are read leniently and
/// only the URI and state drive control flow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct File {
    /// Resource name, e.g. `files/abc-123`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_string_to_i64"
    )]
    pub size_bytes: Option<i64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub create_time: Option<OffsetDateTime>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub expiration_time: Option<OffsetDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default)]
    pub state: FileState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<FileStatus>,
}

/// Body of the `upload, finalize` response.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct UploadResponse {
    pub file: Option<File>,
}

/// Upper bound on how long to wait for a file to become `ACTIVE`.
///
/// The bound is expressed in seconds and doubles as the number of status polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessingTimeout(u32);

impl ProcessingTimeout {
    pub const MIN_SECS: u32 = 5;
    pub const MAX_SECS: u32 = 300;

    pub fn from_secs(secs: u32) -> Result<Self, Error> {
        ensure!(
            (Self::MIN_SECS..=Self::MAX_SECS).contains(&secs),
            InvalidTimeoutSnafu { secs }
        );
        Ok(Self(secs))
    }

    pub fn as_secs(self) -> u32 {
        self.0
    }

    /// Number of status polls allowed.
    pub fn max_attempts(self) -> u32 {
        self.0
    }
}

impl Default for ProcessingTimeout {
    fn default() -> Self {
        Self(30)
    }
}

/// MIME type guessed from a file name's extension, else `application/octet-stream`.
pub(crate) fn mime_from_name(name: Option<&str>) -> Mime {
    name.and_then(|name| mime_guess::from_path(name).first())
        .unwrap_or(mime::APPLICATION_OCTET_STREAM)
}

/// Extract the file id from a file URI such as
/// `https://generativelanguage.googleapis.com/v1beta/files/abc-123`.
pub fn extract_file_id(file_uri: &str) -> Result<String, ClientError> {
    match file_uri.trim_end_matches('/').rsplit('/').next() {
        Some(id) if !id.is_empty() && !id.contains(':') => Ok(id.to_string()),
        _ => InvalidResourceNameSnafu { name: file_uri }.fail(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn file_id_is_last_uri_segment() {
        let id =
            extract_file_id("https://generativelanguage.googleapis.com/v1beta/files/abc-123")
                .unwrap();
        assert_eq!(id, "abc-123");
    }

    #[test]
    fn file_id_rejects_empty_uri() {
        assert!(extract_file_id("").is_err());
        assert!(extract_file_id("https:").is_err());
    }

    #[test]
    fn mime_is_guessed_from_extension() {
        assert_eq!(mime_from_name(Some("report.pdf")), mime::APPLICATION_PDF);
        assert_eq!(mime_from_name(Some("Uploaded file 1")), mime::APPLICATION_OCTET_STREAM);
        assert_eq!(mime_from_name(None), mime::APPLICATION_OCTET_STREAM);
    }

    #[test]
    fn processing_timeout_bounds() {
        assert!(ProcessingTimeout::from_secs(4).is_err());
        assert!(ProcessingTimeout::from_secs(301).is_err());
        assert_eq!(ProcessingTimeout::from_secs(5).unwrap().max_attempts(), 5);
        assert_eq!(ProcessingTimeout::from_secs(300).unwrap().as_secs(), 300);
        assert_eq!(ProcessingTimeout::default().as_secs(), 30);
    }

    #[test]
    fn unknown_state_is_not_terminal() {
        let file: File = serde_json::from_value(json!({ "state": "TRANSCODING" })).unwrap();
        assert_eq!(file.state, FileState::Unknown);
        assert!(!file.state.is_terminal());
    }

    #[test]
    fn failed_file_carries_error() {
        let file: File = serde_json::from_value(json!({
            "name": "files/abc",
            "sizeBytes": "2048",
            "state": "FAILED",
            "error": { "code": 3, "message": "unsupported codec" }
        }))
        .unwrap();

        assert_eq!(file.state, FileState::Failed);
        assert_eq!(file.size_bytes, Some(2048));
        assert_eq!(
            file.error.and_then(|e| e.message).as_deref(),
            Some("unsupported codec")
        );
    }
}
