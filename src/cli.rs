//! CLI definitions for jobfill.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// jobfill CLI.
#[derive(Parser)]
#[command(name = "jobfill")]
#[command(about = "Discover, fill and snapshot job-application form fields")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// List the fields found in a document
    Discover {
        /// Document JSON file
        #[arg(short, long)]
        document: PathBuf,
    },

    /// Print the live value of every field as a snapshot
    Snapshot {
        /// Document JSON file
        #[arg(short, long)]
        document: PathBuf,
    },

    /// Fill a document from saved answers and report the result
    Fill {
        /// Document JSON file
        #[arg(short, long)]
        document: PathBuf,

        /// Saved answers (JSON array of field snapshots)
        #[arg(short, long)]
        answers: PathBuf,
    },
}
