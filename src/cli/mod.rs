//! Command-line interface.
//!
//! `vellum-server` runs the HTTP server by default; the subcommands cover
//! one-shot ingestion and querying so the pipeline is usable without a
//! client.

pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Vellum - a document-native RAG server
#[derive(Parser, Debug)]
#[command(
    name = "vellum-server",
    version,
    about = "Vellum - a document-native RAG server",
    long_about = "Ingests PDF and text documents, indexes them in a vector store,\n\
                  and answers questions about them with a configurable LLM provider.\n\n\
                  Run without arguments to start the HTTP server.",
    after_help = "EXAMPLES:\n    \
                  vellum-server                         # Start the HTTP server\n    \
                  vellum-server ingest ./data           # Index every document under ./data\n    \
                  vellum-server query \"What is HNSW?\"   # Ask a question from the index\n    \
                  vellum-server collections             # List indexed collections"
)]
pub struct Cli {
    /// Path to an env file to load before reading configuration
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server (the default when no subcommand is given)
    Serve,

    /// Ingest every supported document under a directory
    Ingest {
        /// Directory to scan for .pdf, .txt, and .md files
        path: PathBuf,

        /// Collection to ingest into (defaults to the configured one)
        #[arg(short = 'n', long)]
        collection: Option<String>,
    },

    /// Ask a question against an indexed collection
    Query {
        /// The question to answer
        question: String,

        /// Collection to query (defaults to the configured one)
        #[arg(short = 'n', long)]
        collection: Option<String>,

        /// Number of chunks to retrieve
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// List collections and their document counts
    Collections,
}

impl Cli {
    /// Parse CLI arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
