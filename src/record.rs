// File record model and the key/URL conventions shared by every command.
//
// Layout in the remote stores:
//   bucket object   <YYYY-MM-DD>/<name>
//   KV entry        file:<YYYY-MM-DD>/<name>  -> JSON FileRecord
//   KV metadata     {"name": .., "size": ..}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix of every KV key holding a file record.
pub const KEY_PREFIX: &str = "file:";

/// Content type used when the extension says nothing.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Description of one uploaded file. `r2_key` is the identity; `name` is not unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub name: String,
    pub size: u64,
    pub content_type: String,
    pub uploaded_at: DateTime<Utc>,
    /// Written as 0 on upload; nothing in this tool increments it.
    #[serde(default)]
    pub downloads: u64,
    pub r2_key: String,
}

/// Compact metadata attached to the KV entry for cheap scans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub name: String,
    pub size: u64,
}

impl FileRecord {
    /// Build the record for a fresh upload at `now`.
    pub fn new(name: &str, size: u64, now: DateTime<Utc>) -> Self {
        FileRecord {
            name: name.to_string(),
            size,
            content_type: content_type_for(name),
            uploaded_at: now,
            downloads: 0,
            r2_key: storage_key(now, name),
        }
    }

    pub fn kv_key(&self) -> String {
        kv_key(&self.r2_key)
    }

    pub fn index_entry(&self) -> IndexEntry {
        IndexEntry {
            name: self.name.clone(),
            size: self.size,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    /// True when `token` is exactly this record's display name or storage key.
    pub fn matches(&self, token: &str) -> bool {
        self.name == token || self.r2_key == token
    }
}

/// `<UTC date>/<name>`: same name on the same day overwrites, a new day gets a new key.
pub fn storage_key(now: DateTime<Utc>, name: &str) -> String {
    format!("{}/{}", now.format("%Y-%m-%d"), name)
}

pub fn kv_key(storage_key: &str) -> String {
    format!("{KEY_PREFIX}{storage_key}")
}

pub fn public_url(public_base: &str, storage_key: &str) -> String {
    format!("{}/{}", public_base.trim_end_matches('/'), storage_key)
}

pub fn content_type_for(name: &str) -> String {
    mime_guess::from_path(name)
        .first()
        .map(|mime| mime.essence_str().to_string())
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string())
}
