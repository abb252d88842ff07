//! # chunkscope CLI
//!
//! The `chunkscope` binary drives a document-chunking service: upload files
//! with splitter parameters, browse documents and their chunks, delete them.
//!
//! ## Usage
//!
//! ```bash
//! chunkscope --config ./config/chunkscope.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `chunkscope list` | List documents, newest first |
//! | `chunkscope show <id>` | Show a document, its parameters and chunks |
//! | `chunkscope chunk <id> <chunk_id>` | Print a single chunk |
//! | `chunkscope upload <path>` | Upload a file for chunking |
//! | `chunkscope delete <id>` | Delete a document and its chunks |
//! | `chunkscope splitters` | Show splitter types and recommendations |
//! | `chunkscope stats` | Show service-wide counts |
//! | `chunkscope completions <shell>` | Print a shell completion script |
//!
//! ## Examples
//!
//! ```bash
//! # Upload with the recommended parameters for .pdf
//! chunkscope upload ./report.pdf
//!
//! # Override the chunk size
//! chunkscope upload ./notes.txt --separator $'\n' --chunk-size 500 --chunk-overlap 50
//!
//! # Only failed documents
//! chunkscope list --status failed
//! ```

use std::io;
use std::path::PathBuf;

use chunkscope::commands::{self, ParameterOverrides};
use chunkscope::config;
use chunkscope::logging;
use chunkscope::models::ProcessingStatus;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

/// chunkscope: client for a document-chunking service.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. `CHUNKSCOPE_API_URL` overrides the configured API base URL.
#[derive(Parser)]
#[command(
    name = "chunkscope",
    about = "Upload documents to a chunking service and inspect the resulting chunks",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/chunkscope.toml`; a missing file at the default
    /// path means built-in defaults.
    #[arg(long, global = true, default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List documents, newest first.
    List {
        /// Page number, starting at 1.
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Documents per page (1-100). Defaults to `listing.per_page`.
        #[arg(long)]
        per_page: Option<u32>,

        /// Only documents in this processing status.
        #[arg(long)]
        status: Option<ProcessingStatus>,

        /// Only documents with this MIME type.
        #[arg(long)]
        content_type: Option<String>,
    },

    /// Show a document with its splitter parameters and chunks.
    Show {
        /// Document ID.
        id: String,

        /// Chunk to print instead of the first one.
        #[arg(long)]
        chunk: Option<String>,
    },

    /// Print a single chunk of a document.
    Chunk {
        document_id: String,
        chunk_id: String,
    },

    /// Upload a file for chunking.
    ///
    /// Parameters start from the server's recommendation for the file
    /// extension; any flag given here overrides the recommended value.
    Upload {
        path: PathBuf,

        #[arg(long)]
        splitter_type: Option<String>,

        #[arg(long)]
        separator: Option<String>,

        #[arg(long)]
        chunk_size: Option<u32>,

        #[arg(long)]
        chunk_overlap: Option<u32>,

        #[arg(long)]
        length_function: Option<String>,
    },

    /// Delete a document and its chunks.
    Delete {
        /// Document ID.
        id: String,
    },

    /// Show splitter types, length functions and per-extension recommendations.
    Splitters,

    /// Show document and chunk counts.
    Stats,

    /// Check that the service is up.
    Health,

    /// Print a shell completion script to stdout.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Commands that don't require config
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "chunkscope", &mut io::stdout());
        return Ok(());
    }

    let cfg = config::load_or_default(&cli.config)?;
    logging::init_tracing(&cfg.logging.level);

    match cli.command {
        Commands::List {
            page,
            per_page,
            status,
            content_type,
        } => {
            commands::run_list(&cfg, page, per_page, status, content_type).await?;
        }
        Commands::Show { id, chunk } => {
            commands::run_show(&cfg, &id, chunk.as_deref()).await?;
        }
        Commands::Chunk {
            document_id,
            chunk_id,
        } => {
            commands::run_chunk(&cfg, &document_id, &chunk_id).await?;
        }
        Commands::Upload {
            path,
            splitter_type,
            separator,
            chunk_size,
            chunk_overlap,
            length_function,
        } => {
            let overrides = ParameterOverrides {
                splitter_type,
                separator,
                chunk_size,
                chunk_overlap,
                length_function,
            };
            commands::run_upload(&cfg, &path, overrides).await?;
        }
        Commands::Delete { id } => {
            commands::run_delete(&cfg, &id).await?;
        }
        Commands::Splitters => {
            commands::run_splitters(&cfg).await?;
        }
        Commands::Stats => {
            commands::run_stats(&cfg).await?;
        }
        Commands::Health => {
            commands::run_health(&cfg).await?;
        }
        Commands::Completions { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
