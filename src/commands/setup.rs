// share setup: interactive wizard that provisions the bucket and KV namespace
// and writes the local config file.
//
// Nothing is rolled back. A bucket or namespace created before a later step
// fails stays in place and is picked up again on the next run.

use anyhow::Result;
use std::io::Write;
use std::path::Path;
use tracing::info;

use crate::api::{CloudflareClient, Namespace, NamespaceDirectory};
use crate::config::{CloudflareConfig, Config, UrlConfig};
use crate::storage::{ObjectStore, R2Store};
use crate::ui::{Console, Prompter, Tone};

/// Title of the KV namespace the tool stores its records in.
pub const NAMESPACE_TITLE: &str = "share";

pub const DEFAULT_BUCKET: &str = "share";

/// Credentials and bucket name collected from the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub account_id: String,
    pub r2_access_key_id: String,
    pub r2_secret_access_key: String,
    pub api_token: String,
    pub bucket: String,
}

/// Builds remote clients from freshly entered credentials.
pub trait Provisioner {
    fn object_store(&self, creds: &Credentials) -> Result<Box<dyn ObjectStore>>;
    fn namespaces(&self, creds: &Credentials) -> Result<Box<dyn NamespaceDirectory>>;
}

/// Talks to R2 and the Cloudflare API.
pub struct CloudflareProvisioner;

impl Provisioner for CloudflareProvisioner {
    fn object_store(&self, creds: &Credentials) -> Result<Box<dyn ObjectStore>> {
        Ok(Box::new(R2Store::new(
            &creds.account_id,
            &creds.r2_access_key_id,
            &creds.r2_secret_access_key,
            &creds.bucket,
        )?))
    }

    fn namespaces(&self, creds: &Credentials) -> Result<Box<dyn NamespaceDirectory>> {
        Ok(Box::new(CloudflareClient::new(
            &creds.account_id,
            &creds.api_token,
        )?))
    }
}

fn print_intro<W: Write>(console: &mut Console<W>) -> Result<()> {
    let title = console.paint("share setup", Tone::Bold);
    console.line(format!("{title} - configure Cloudflare R2 + KV"))?;
    console.blank()?;
    console.line("You need from the Cloudflare dashboard:")?;
    console.line("  1. Account ID: wrangler whoami, or dashboard URL: dash.cloudflare.com/<ACCOUNT_ID>/...")?;
    console.line("  2. R2 API credentials: dashboard -> R2 -> Manage R2 API Tokens -> Create API token")?;
    console.line("     -> Object Read & Write, scope to your bucket")?;
    console.line("  3. CF API token: dashboard -> My Profile -> API Tokens -> Create Token")?;
    console.line("     -> use template 'Edit Cloudflare Workers' (covers KV read/write)")?;
    console.blank()?;
    Ok(())
}

/// Create `bucket` unless it already exists. Returns true when it was created.
pub fn ensure_bucket<W: Write>(
    store: &dyn ObjectStore,
    bucket: &str,
    console: &mut Console<W>,
) -> Result<bool> {
    if store.bucket_exists()? {
        console.success(&format!("Bucket '{bucket}' exists."))?;
        return Ok(false);
    }
    console.warn(&format!("Creating bucket '{bucket}'..."))?;
    store.create_bucket()?;
    info!(bucket, "created bucket");
    console.success(&format!("Bucket '{bucket}' created."))?;
    Ok(true)
}

/// Reuse the namespace whose title is exactly `title`, or create it.
pub fn find_or_create_namespace<W: Write>(
    directory: &dyn NamespaceDirectory,
    title: &str,
    console: &mut Console<W>,
) -> Result<Namespace> {
    if let Some(ns) = directory
        .list_namespaces()?
        .into_iter()
        .find(|ns| ns.title == title)
    {
        console.success(&format!("KV namespace '{title}' exists: {}", ns.id))?;
        return Ok(ns);
    }
    console.warn(&format!("Creating KV namespace '{title}'..."))?;
    let ns = directory.create_namespace(title)?;
    info!(title, id = %ns.id, "created KV namespace");
    console.success(&format!("KV namespace created: {}", ns.id))?;
    Ok(ns)
}

/// Run the wizard and write the resulting config to `config_path`.
pub fn run<W: Write>(
    prompter: &dyn Prompter,
    provisioner: &dyn Provisioner,
    console: &mut Console<W>,
    config_path: &Path,
) -> Result<Config> {
    print_intro(console)?;

    let creds = Credentials {
        account_id: prompter.ask("Cloudflare Account ID", None)?,
        r2_access_key_id: prompter.ask("R2 Access Key ID", None)?,
        r2_secret_access_key: prompter.ask_secret("R2 Secret Access Key")?,
        api_token: prompter.ask_secret("CF API Token (for KV)")?,
        bucket: prompter.ask("R2 Bucket name", Some(DEFAULT_BUCKET))?,
    };

    let store = provisioner.object_store(&creds)?;
    ensure_bucket(store.as_ref(), &creds.bucket, console)?;

    let directory = provisioner.namespaces(&creds)?;
    let namespace = find_or_create_namespace(directory.as_ref(), NAMESPACE_TITLE, console)?;

    console.blank()?;
    console.warn("Enable public access on the R2 bucket:")?;
    console.line(format!(
        "  dashboard.cloudflare.com -> R2 -> {} -> Settings -> Public access",
        creds.bucket
    ))?;
    console.line("  -> Enable R2.dev subdomain")?;
    console.line("  -> Copy the public URL (looks like: https://pub-<hash>.r2.dev)")?;
    console.blank()?;

    let public_base = prompter.ask("R2 public URL base (e.g. https://pub-abc123.r2.dev)", None)?;
    let public_base = public_base.trim_end_matches('/').to_string();

    let config = Config {
        cloudflare: CloudflareConfig {
            account_id: creds.account_id,
            r2_access_key_id: creds.r2_access_key_id,
            r2_secret_access_key: creds.r2_secret_access_key,
            api_token: creds.api_token,
            bucket: creds.bucket,
            kv_namespace_id: namespace.id,
        },
        urls: UrlConfig { public_base },
    };
    config.save_to(config_path)?;

    console.blank()?;
    console.success(&format!("Config saved to {}", config_path.display()))?;
    console.success("Ready! Try: share upload <file>")?;
    Ok(config)
}
