// share upload <file> [--name NAME]

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use super::Services;
use crate::config::Config;
use crate::error::ShareError;
use crate::record::{public_url, FileRecord};
use crate::ui::{format_size, Console, Tone};

/// A local file that passed the precondition checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSource {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
}

impl UploadSource {
    /// Check `path` is an existing regular file and settle its display name.
    pub fn inspect(path: &Path, name_override: Option<&str>) -> Result<Self, ShareError> {
        if !path.exists() {
            return Err(ShareError::FileNotFound(path.display().to_string()));
        }
        let meta = fs::metadata(path)
            .map_err(|_| ShareError::FileNotFound(path.display().to_string()))?;
        if !meta.is_file() {
            return Err(ShareError::NotAFile(path.to_path_buf()));
        }
        let name = match name_override {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| ShareError::NotAFile(path.to_path_buf()))?,
        };
        Ok(UploadSource {
            path: path.to_path_buf(),
            name,
            size: meta.len(),
        })
    }
}

/// Upload the object, then write its record. Returns the public URL.
///
/// The file is read whole into memory and sent as one PUT.
/// The two writes are not atomic: if the record write fails the object stays.
pub fn run<W: Write>(
    config: &Config,
    services: &Services,
    console: &mut Console<W>,
    source: &UploadSource,
    now: DateTime<Utc>,
) -> Result<String> {
    let record = FileRecord::new(&source.name, source.size, now);
    let body = fs::read(&source.path)
        .with_context(|| format!("Failed to read {}", source.path.display()))?;

    let spinner = console.spinner(format!(
        "Uploading {} ({})...",
        record.name,
        format_size(record.size)
    ));
    let uploaded = services
        .objects
        .put_object(&record.r2_key, &body, &record.content_type);
    spinner.finish_and_clear();
    uploaded?;

    let value = record.to_json().context("Failed to serialize file record")?;
    let metadata = serde_json::to_value(record.index_entry())
        .context("Failed to serialize index entry")?;
    services.kv.put(&record.kv_key(), &value, &metadata)?;
    info!(key = %record.r2_key, size = record.size, "uploaded");

    let url = public_url(&config.urls.public_base, &record.r2_key);
    if services.clipboard.copy(&url) {
        let line = format!("{} (copied)", console.paint(&url, Tone::Green));
        console.line(line)?;
    } else {
        console.success(&url)?;
    }
    Ok(url)
}
