use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use utoipa::ToSchema;

/// Processing state of an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// Handed to the processing service, outcome pending
    Processing,
    /// Processing service accepted the file
    Completed,
    /// Processing service rejected the file or was unreachable
    Error,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Processing => "processing",
            FileStatus::Completed => "completed",
            FileStatus::Error => "error",
        }
    }
}

impl FromStr for FileStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(FileStatus::Processing),
            "completed" => Ok(FileStatus::Completed),
            "error" => Ok(FileStatus::Error),
            other => Err(anyhow::anyhow!("unknown file status '{}'", other)),
        }
    }
}

/// One status row per uploaded file, keyed by the blob key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StatusRecord {
    pub file_id: String,
    pub file_name: String,
    pub status: FileStatus,
}

/// Raw sqlite row; `status` is stored as TEXT.
#[derive(Debug, FromRow)]
pub struct StatusRow {
    pub file_id: String,
    pub file_name: String,
    pub status: String,
}

impl TryFrom<StatusRow> for StatusRecord {
    type Error = anyhow::Error;

    fn try_from(row: StatusRow) -> Result<Self, Self::Error> {
        Ok(StatusRecord {
            status: row.status.parse()?,
            file_id: row.file_id,
            file_name: row.file_name,
        })
    }
}

/// Row-level mutation kind reported by the change feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

/// Change feed notification for the status table.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub op: ChangeOp,
    pub file_id: String,
}

impl ChangeEvent {
    pub fn new(op: ChangeOp, file_id: impl Into<String>) -> Self {
        Self {
            op,
            file_id: file_id.into(),
        }
    }
}

/// A stored blob as returned by a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobEntry {
    pub key: String,
    pub name: String,
}

/// Recovers the original file name from a `<unix_millis>-<name>` blob key.
///
/// Keys written by the upload coordinator always carry the timestamp
/// prefix; anything else (e.g. objects placed in the bucket out of band)
/// displays as the full key.
pub fn display_name(key: &str) -> &str {
    match key.split_once('-') {
        Some((prefix, rest)) if !prefix.is_empty() && prefix.bytes().all(|b| b.is_ascii_digit()) => {
            rest
        }
        _ => key,
    }
}
