//! Typed payloads for the handful of requests the client issues itself.
//!
//! Payloads are JSON objects with camelCase keys. The core layers never look
//! inside payloads except through a [`StatusProbe`]; [`JsonStatusProbe`] is
//! the default one and reads the optional `success`, `message` and
//! `progress` fields that backend responses carry.

use serde::{Deserialize, Serialize};

use crate::registry::{Outcome, StatusProbe};

/// Handshake request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterViewer {
    /// Previous session id to resume, or empty for a fresh session.
    pub session_id: String,
    /// API key presented to the backend.
    pub api_key: String,
}

/// Handshake response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterViewerAck {
    /// Whether the backend accepted the viewer.
    pub success: bool,
    /// Session id assigned by the backend.
    pub session_id: String,
    /// Failure reason when `success` is false.
    pub message: String,
}

/// Directory listing request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileListRequest {
    /// Directory relative to the backend's root; empty for the root itself.
    pub directory: String,
}

/// One entry of a directory listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileEntry {
    /// File name.
    pub name: String,
    /// File size in bytes.
    pub size: u64,
    /// Backend-specific file type label (e.g. "FITS").
    #[serde(rename = "type")]
    pub file_type: String,
    /// HDU names for multi-extension files.
    pub hdu_list: Vec<String>,
}

/// Directory listing response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileListResponse {
    /// Whether the listing succeeded.
    pub success: bool,
    /// Failure reason.
    pub message: String,
    /// Directory that was listed.
    pub directory: String,
    /// Parent of `directory`.
    pub parent: String,
    /// Image files in the directory.
    pub files: Vec<FileEntry>,
    /// Sub-directory names.
    pub subdirectories: Vec<String>,
}

/// File info request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfoRequest {
    /// Directory containing the file.
    pub directory: String,
    /// File name.
    pub file: String,
    /// HDU to describe; empty for the first.
    pub hdu: String,
}

/// File info response. Header details are kept as raw JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileInfoResponse {
    /// Whether the lookup succeeded.
    pub success: bool,
    /// Failure reason.
    pub message: String,
    /// Basic file information.
    pub file_info: serde_json::Value,
    /// Extended header information.
    pub file_info_extended: serde_json::Value,
}

/// Status fields any response may carry.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StatusFields {
    success: Option<bool>,
    message: Option<String>,
    progress: Option<f64>,
}

/// Reads `success` / `message` / `progress` from JSON payloads.
///
/// Payloads that aren't JSON objects, or that lack a `success` field, count
/// as successful. `progress >= 1.0` marks the final frame of a stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonStatusProbe;

impl StatusProbe for JsonStatusProbe {
    fn inspect(&self, _event_name: &str, payload: &[u8]) -> Outcome {
        let Ok(fields) = serde_json::from_slice::<StatusFields>(payload) else {
            return Outcome::success();
        };

        let terminal = fields.progress.is_some_and(|p| p >= 1.0);
        match fields.success {
            Some(false) => Outcome::failed(
                fields
                    .message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "request failed".to_string()),
            ),
            _ => Outcome {
                terminal,
                ..Outcome::success()
            },
        }
    }
}
