//! CLI type definitions
//!
//! Clap command structures for the `repsync` binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level arguments.
#[derive(Parser, Debug)]
#[command(name = "repsync")]
#[command(about = "repsync - shared realtime subscription cache", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read a collection query once through the cache
    GetCollection(GetCollectionArgs),

    /// Read a single document once through the cache
    GetDocument(GetDocumentArgs),

    /// Subscribe to several paths and print cache introspection
    Stats(StatsArgs),

    /// Configuration commands
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Arguments for `get-collection`.
#[derive(Args, Debug)]
pub struct GetCollectionArgs {
    /// JSON fixture: { "collection/path": { "docId": { fields } } }
    pub fixture: PathBuf,

    /// Collection path, e.g. users/u1/workouts
    pub path: String,

    /// Field to order by
    #[arg(short, long)]
    pub order_by: Option<String>,

    /// Order ascending instead of descending
    #[arg(long, requires = "order_by")]
    pub asc: bool,

    /// Equality filter as field=value (value parsed as JSON when possible)
    #[arg(short = 'w', long = "where", value_name = "FIELD=VALUE")]
    pub filters: Vec<String>,

    /// Maximum number of documents
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Cache key to use instead of the derived one
    #[arg(long)]
    pub key: Option<String>,
}

/// Arguments for `get-document`.
#[derive(Args, Debug)]
pub struct GetDocumentArgs {
    /// JSON fixture: { "collection/path": { "docId": { fields } } }
    pub fixture: PathBuf,

    /// Document path, e.g. exercises/bench
    pub path: String,

    /// Cache key to use instead of the derived one
    #[arg(long)]
    pub key: Option<String>,
}

/// Arguments for `stats`.
#[derive(Args, Debug)]
pub struct StatsArgs {
    /// JSON fixture: { "collection/path": { "docId": { fields } } }
    pub fixture: PathBuf,

    /// Collection paths to subscribe to
    #[arg(short, long = "collection", value_name = "PATH")]
    pub collections: Vec<String>,

    /// Document paths to subscribe to
    #[arg(short, long = "document", value_name = "PATH")]
    pub documents: Vec<String>,
}

/// `config` subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,
}
