// Error taxonomy for conditions the CLI checks itself. Failures coming back
// from R2 or the Cloudflare API are not listed here: they travel as
// `anyhow::Error` with the status and body the service returned.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShareError {
    #[error("Config not found at {}. Run: share setup", .0.display())]
    ConfigMissing(PathBuf),

    #[error("Missing config key: {0}")]
    ConfigIncomplete(&'static str),

    #[error("Invalid config file {}: {source}", path.display())]
    InvalidConfig {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to access config file {}: {source}", path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not determine the home directory")]
    NoHomeDir,

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Not a file: {}", .0.display())]
    NotAFile(PathBuf),
}
