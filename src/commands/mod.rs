//! Command handlers for `share upload`, `ls`, `rm` and `setup`.
//!
//! Handlers receive everything they touch as arguments: the loaded
//! [`Config`], the remote adapters bundled in [`Services`], and the
//! [`Console`](crate::ui::Console) they print to.

pub mod ls;
pub mod rm;
pub mod setup;
pub mod upload;


use anyhow::{Context, Result};
use tracing::warn;

use crate::api::{KvNamespace, KvStore};
use crate::clipboard::{self, Clipboard};
use crate::config::Config;
use crate::record::{FileRecord, KEY_PREFIX};
use crate::storage::{ObjectStore, R2Store};

/// Remote adapters used by one invocation.
pub struct Services {
    pub objects: Box<dyn ObjectStore>,
    pub kv: Box<dyn KvStore>,
    pub clipboard: Box<dyn Clipboard>,
}

impl Services {
    /// R2 bucket, KV namespace and system clipboard described by `config`.
    pub fn connect(config: &Config) -> Result<Self> {
        Ok(Services {
            objects: Box::new(R2Store::from_config(config)?),
            kv: Box::new(KvNamespace::from_config(config)?),
            clipboard: clipboard::detect(),
        })
    }
}

/// Every file record in the namespace, fetched one value at a time.
///
/// Keys outside `file:` are ignored; values that are not a valid record are
/// skipped with a warning.
pub fn fetch_records(kv: &dyn KvStore) -> Result<Vec<FileRecord>> {
    let mut records = Vec::new();
    for key in kv.list_keys(KEY_PREFIX)? {
        if !key.name.starts_with(KEY_PREFIX) {
            continue;
        }
        let raw = kv
            .get(&key.name)
            .with_context(|| format!("Failed to read {}", key.name))?;
        match FileRecord::from_json(&raw) {
            Ok(record) => records.push(record),
            Err(err) => warn!(key = %key.name, error = %err, "skipping malformed file record"),
        }
    }
    Ok(records)
}
