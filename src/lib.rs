// Library root
// -----------
// `share` uploads a file to a Cloudflare R2 bucket, records it in a Workers
// KV namespace and prints the public URL. The binary (`main.rs`) only parses
// arguments and dispatches into `commands`.
//
// Module responsibilities:
// - `config`: the local credentials file (load, validate, write).
// - `record`: the per-file record and key/URL conventions.
// - `storage` / `api`: thin adapters over R2 and the Cloudflare KV API.
// - `clipboard`: best-effort copy of the resulting URL.
// - `ui`: terminal output sink, tables and setup prompts.
// - `commands`: the four subcommands.
pub mod api;
pub mod clipboard;
pub mod commands;
pub mod config;
pub mod error;
pub mod record;
pub mod storage;
pub mod ui;

pub use error::ShareError;

/// Initialize tracing on stderr; `RUST_LOG` overrides the default `warn` level.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();
}
