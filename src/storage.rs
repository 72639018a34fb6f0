// Object storage: the `ObjectStore` seam and its R2 implementation.
//
// R2 speaks the S3 API, so the adapter is a thin wrapper over `rust-s3` with
// the blocking backend. Every call goes straight through; there is no retry.

use anyhow::{bail, Context, Result};
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::{Bucket, BucketConfiguration, Region};
use tracing::debug;

use crate::config::Config;

/// The four bucket operations the commands need.
pub trait ObjectStore {
    fn put_object(&self, key: &str, body: &[u8], content_type: &str) -> Result<()>;
    fn delete_object(&self, key: &str) -> Result<()>;
    fn bucket_exists(&self) -> Result<bool>;
    fn create_bucket(&self) -> Result<()>;
}

pub struct R2Store {
    bucket: Bucket,
    name: String,
    region: Region,
    credentials: Credentials,
}

impl R2Store {
    /// Build a client for `bucket` in the R2 account `account_id`.
    /// No request is made until an operation is called.
    pub fn new(
        account_id: &str,
        access_key_id: &str,
        secret_access_key: &str,
        bucket: &str,
    ) -> Result<Self> {
        let region = Region::R2 {
            account_id: account_id.to_string(),
        };
        let credentials =
            Credentials::new(Some(access_key_id), Some(secret_access_key), None, None, None)
                .context("Invalid R2 credentials")?;
        let handle = Bucket::new(bucket, region.clone(), credentials.clone())
            .context("Failed to build R2 bucket client")?
            .with_path_style();
        Ok(R2Store {
            bucket: handle,
            name: bucket.to_string(),
            region,
            credentials,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let cf = &config.cloudflare;
        Self::new(
            &cf.account_id,
            &cf.r2_access_key_id,
            &cf.r2_secret_access_key,
            &cf.bucket,
        )
    }
}

fn object_path(key: &str) -> String {
    format!("/{}", key.trim_start_matches('/'))
}

impl ObjectStore for R2Store {
    fn put_object(&self, key: &str, body: &[u8], content_type: &str) -> Result<()> {
        debug!(bucket = %self.name, key, content_type, bytes = body.len(), "put object");
        self.bucket
            .put_object_with_content_type(object_path(key), body, content_type)
            .with_context(|| format!("Failed to upload {key} to bucket '{}'", self.name))?;
        Ok(())
    }

    fn delete_object(&self, key: &str) -> Result<()> {
        debug!(bucket = %self.name, key, "delete object");
        self.bucket
            .delete_object(object_path(key))
            .with_context(|| format!("Failed to delete {key} from bucket '{}'", self.name))?;
        Ok(())
    }

    fn bucket_exists(&self) -> Result<bool> {
        debug!(bucket = %self.name, "check bucket");
        match self
            .bucket
            .list_page(String::new(), None, None, None, Some(1))
        {
            Ok(_) => Ok(true),
            Err(S3Error::HttpFailWithBody(404, _)) => Ok(false),
            Err(err) => {
                Err(err).with_context(|| format!("Failed to check bucket '{}'", self.name))
            }
        }
    }

    fn create_bucket(&self) -> Result<()> {
        debug!(bucket = %self.name, "create bucket");
        let response = Bucket::create_with_path_style(
            &self.name,
            self.region.clone(),
            self.credentials.clone(),
            BucketConfiguration::default(),
        )
        .with_context(|| format!("Failed to create bucket '{}'", self.name))?;
        if !response.success() {
            bail!(
                "Failed to create bucket '{}': {} - {}",
                self.name,
                response.response_code,
                response.response_text
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_path_has_one_leading_slash() {
        assert_eq!(object_path("2026-01-01/a.txt"), "/2026-01-01/a.txt");
        assert_eq!(object_path("/2026-01-01/a.txt"), "/2026-01-01/a.txt");
    }

    #[test]
    fn client_construction_is_offline() {
        let store = R2Store::new("acc", "key", "secret", "share").unwrap();
        assert_eq!(store.name, "share");
    }
}
