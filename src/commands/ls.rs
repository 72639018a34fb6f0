// share ls

use anyhow::Result;
use std::io::Write;

use super::fetch_records;
use crate::api::KvStore;
use crate::config::Config;
use crate::record::{public_url, FileRecord};
use crate::ui::{format_gb, format_size, Column, Console, Table, Tone};

/// Print every shared file, newest first, followed by a count/size summary.
/// Returns the records in display order.
pub fn run<W: Write>(
    config: &Config,
    kv: &dyn KvStore,
    console: &mut Console<W>,
) -> Result<Vec<FileRecord>> {
    let mut files = fetch_records(kv)?;
    if files.is_empty() {
        console.dim("No files shared yet.")?;
        return Ok(files);
    }
    files.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));

    let mut table = Table::new(
        "Shared Files",
        vec![
            Column::new("Name", Tone::Cyan),
            Column::new("Size", Tone::Yellow).right(),
            Column::new("Uploaded", Tone::Dim),
            Column::new("Downloads", Tone::Plain).right(),
            Column::new("URL", Tone::Blue),
        ],
    );
    for f in &files {
        table.add_row(vec![
            f.name.clone(),
            format_size(f.size),
            f.uploaded_at.format("%Y-%m-%d").to_string(),
            f.downloads.to_string(),
            public_url(&config.urls.public_base, &f.r2_key),
        ]);
    }
    console.table(&table)?;

    let total: u64 = files.iter().map(|f| f.size).sum();
    console.blank()?;
    console.dim(&format!(
        "{} files, {} total (10 GB free tier)",
        files.len(),
        format_gb(total)
    ))?;
    Ok(files)
}
