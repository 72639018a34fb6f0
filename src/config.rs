// Local configuration: where it lives, how it is validated, how setup writes it.
//
// The file is TOML with two sections, `[cloudflare]` and `[urls]`. Loading goes
// through an all-optional raw shape first so that a missing key is reported by
// name instead of as a generic deserialization failure.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::ShareError;

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV: &str = "SHARE_CONFIG";

/// Fully validated configuration. Every field is present and non-empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Config {
    pub cloudflare: CloudflareConfig,
    pub urls: UrlConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CloudflareConfig {
    pub account_id: String,
    pub r2_access_key_id: String,
    pub r2_secret_access_key: String,
    pub api_token: String,
    pub bucket: String,
    pub kv_namespace_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UrlConfig {
    pub public_base: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    cloudflare: RawCloudflare,
    #[serde(default)]
    urls: RawUrls,
}

#[derive(Debug, Default, Deserialize)]
struct RawCloudflare {
    account_id: Option<String>,
    r2_access_key_id: Option<String>,
    r2_secret_access_key: Option<String>,
    api_token: Option<String>,
    bucket: Option<String>,
    kv_namespace_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawUrls {
    public_base: Option<String>,
}

/// Location of the config file: `$SHARE_CONFIG`, else `~/.config/share/config.toml`.
pub fn config_path() -> Result<PathBuf, ShareError> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }
    let home = dirs::home_dir().ok_or(ShareError::NoHomeDir)?;
    Ok(home.join(".config").join("share").join("config.toml"))
}

fn required(value: Option<String>, key: &'static str) -> Result<String, ShareError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ShareError::ConfigIncomplete(key)),
    }
}

impl Config {
    /// Load the config from its default location.
    pub fn load() -> Result<Self, ShareError> {
        Self::load_from(config_path()?)
    }

    /// Load and validate the config at `path`.
    ///
    /// # Errors
    ///
    /// - `ConfigMissing` if the file does not exist
    /// - `ConfigIo` if it exists but cannot be read
    /// - `InvalidConfig` if it is not valid TOML
    /// - `ConfigIncomplete` naming the first absent or empty key
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ShareError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => ShareError::ConfigMissing(path.to_path_buf()),
            _ => ShareError::ConfigIo {
                path: path.to_path_buf(),
                source,
            },
        })?;
        Self::parse(&content).map_err(|err| match err {
            ShareError::InvalidConfig { source, .. } => ShareError::InvalidConfig {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Parse and validate config text.
    pub fn parse(content: &str) -> Result<Self, ShareError> {
        let raw: RawConfig =
            toml::from_str(content).map_err(|source| ShareError::InvalidConfig {
                path: PathBuf::new(),
                source,
            })?;
        let cf = raw.cloudflare;
        Ok(Config {
            cloudflare: CloudflareConfig {
                account_id: required(cf.account_id, "cloudflare.account_id")?,
                r2_access_key_id: required(cf.r2_access_key_id, "cloudflare.r2_access_key_id")?,
                r2_secret_access_key: required(
                    cf.r2_secret_access_key,
                    "cloudflare.r2_secret_access_key",
                )?,
                api_token: required(cf.api_token, "cloudflare.api_token")?,
                bucket: required(cf.bucket, "cloudflare.bucket")?,
                kv_namespace_id: required(cf.kv_namespace_id, "cloudflare.kv_namespace_id")?,
            },
            urls: UrlConfig {
                public_base: required(raw.urls.public_base, "urls.public_base")?,
            },
        })
    }

    /// Write the config to `path`, creating parent directories.
    /// On Unix the file is made readable by the owner only.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = toml::to_string(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))
                .with_context(|| format!("Failed to restrict permissions on {}", path.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FULL: &str = r#"
[cloudflare]
account_id = "acc"
r2_access_key_id = "key"
r2_secret_access_key = "secret"
api_token = "token"
bucket = "share"
kv_namespace_id = "ns"

[urls]
public_base = "https://pub-abc.r2.dev"
"#;

    #[test]
    fn parse_full_config() {
        let config = Config::parse(FULL).unwrap();
        assert_eq!(config.cloudflare.account_id, "acc");
        assert_eq!(config.cloudflare.bucket, "share");
        assert_eq!(config.urls.public_base, "https://pub-abc.r2.dev");
    }

    #[test]
    fn missing_file_is_config_missing() {
        let dir = TempDir::new().unwrap();
        let err = Config::load_from(dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ShareError::ConfigMissing(_)));
        assert!(err.to_string().contains("Run: share setup"));
    }

    #[test]
    fn missing_key_is_reported_by_name() {
        let text = FULL.replace("api_token = \"token\"\n", "");
        let err = Config::parse(&text).unwrap_err();
        assert!(matches!(err, ShareError::ConfigIncomplete("cloudflare.api_token")));
    }

    #[test]
    fn missing_urls_section() {
        let text = FULL.split("[urls]").next().unwrap();
        let err = Config::parse(text).unwrap_err();
        assert!(matches!(err, ShareError::ConfigIncomplete("urls.public_base")));
    }

    #[test]
    fn empty_value_counts_as_missing() {
        let text = FULL.replace("bucket = \"share\"", "bucket = \"\"");
        let err = Config::parse(&text).unwrap_err();
        assert!(matches!(err, ShareError::ConfigIncomplete("cloudflare.bucket")));
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_path_is_not_reported_as_missing() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("plain-file");
        fs::write(&blocker, "x").unwrap();
        let err = Config::load_from(blocker.join("config.toml")).unwrap_err();
        assert!(matches!(err, ShareError::ConfigIo { .. }), "got {err}");
    }

    #[test]
    fn invalid_toml_carries_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[cloudflare\nbroken").unwrap();
        match Config::load_from(&path).unwrap_err() {
            ShareError::InvalidConfig { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("share").join("config.toml");
        let config = Config::parse(FULL).unwrap();
        config.save_to(&path).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("[cloudflare]"));
        assert!(written.contains("[urls]"));
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        Config::parse(FULL).unwrap().save_to(&path).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
