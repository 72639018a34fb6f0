// share rm <name>

use anyhow::Result;
use std::io::Write;
use tracing::info;

use super::{fetch_records, Services};
use crate::error::ShareError;
use crate::record::kv_key;
use crate::ui::{Console, Tone};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// The object and its record were deleted.
    Deleted(String),
    /// More than one record matched; nothing was deleted.
    Ambiguous(Vec<String>),
}

/// Delete the one file whose display name or storage key equals `token`.
///
/// Object first, record second. A failure in between leaves a record
/// pointing at a missing object.
pub fn run<W: Write>(
    services: &Services,
    console: &mut Console<W>,
    token: &str,
) -> Result<RemoveOutcome> {
    let mut matches: Vec<_> = fetch_records(services.kv.as_ref())?
        .into_iter()
        .filter(|f| f.matches(token))
        .collect();

    if matches.is_empty() {
        return Err(ShareError::FileNotFound(token.to_string()).into());
    }
    if matches.len() > 1 {
        let keys: Vec<String> = matches.into_iter().map(|f| f.r2_key).collect();
        console.warn(&format!("Multiple matches for '{token}':"))?;
        for key in &keys {
            console.line(format!("  {key}"))?;
        }
        console.warn("Use the full r2_key to delete a specific one.")?;
        return Ok(RemoveOutcome::Ambiguous(keys));
    }

    let target = matches.remove(0);
    services.objects.delete_object(&target.r2_key)?;
    services.kv.delete(&kv_key(&target.r2_key))?;
    info!(key = %target.r2_key, "deleted");

    console.styled(&format!("Deleted {}", target.r2_key), Tone::Red)?;
    Ok(RemoveOutcome::Deleted(target.r2_key))
}
