// Entrypoint for the CLI application.
// Parses one subcommand, loads the config where needed, and hands the
// adapters to the matching handler. Exit status is 1 on any error.

use anyhow::Result;
use chrono::Utc;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use share::commands::setup::{self, CloudflareProvisioner};
use share::commands::upload::UploadSource;
use share::commands::{ls, rm, upload, Services};
use share::config::{config_path, Config};
use share::ui::{report_error, Console, TerminalPrompter};

#[derive(Parser)]
#[command(name = "share", version, about = "CLI file sharing backed by Cloudflare R2 + KV")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file and get a public URL
    ///
    /// The whole file is read into memory and sent in a single request, so
    /// the largest uploadable file is bounded by available RAM.
    Upload {
        /// Path to file
        file: PathBuf,
        /// Override filename
        #[arg(long)]
        name: Option<String>,
    },
    /// List shared files
    Ls,
    /// Delete a shared file
    Rm {
        /// Filename or r2_key to delete
        name: String,
    },
    /// Configure Cloudflare credentials
    Setup,
}

fn run(command: Commands) -> Result<()> {
    let mut console = Console::stdout();
    match command {
        Commands::Upload { file, name } => {
            let source = UploadSource::inspect(&file, name.as_deref())?;
            let config = Config::load()?;
            let services = Services::connect(&config)?;
            upload::run(&config, &services, &mut console, &source, Utc::now())?;
        }
        Commands::Ls => {
            let config = Config::load()?;
            let services = Services::connect(&config)?;
            ls::run(&config, services.kv.as_ref(), &mut console)?;
        }
        Commands::Rm { name } => {
            let config = Config::load()?;
            let services = Services::connect(&config)?;
            rm::run(&services, &mut console, &name)?;
        }
        Commands::Setup => {
            let path = config_path()?;
            setup::run(&TerminalPrompter, &CloudflareProvisioner, &mut console, &path)?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    share::init_tracing();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        let _ = Cli::command().print_help();
        return ExitCode::FAILURE;
    };

    match run(command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_error(&err);
            ExitCode::FAILURE
        }
    }
}
