//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use cadence_core::TransactionFilter;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

/// Cadence - Find the spending that keeps coming back
#[derive(Parser)]
#[command(name = "cadence")]
#[command(about = "Recurring spending detector for spreadsheet exports", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path (overrides the config file and CADENCE_DB_PATH)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Config file (defaults to <config dir>/cadence/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Import transactions from a CSV export
    Import {
        /// CSV file to import
        #[arg(short, long)]
        file: PathBuf,

        /// Display name for the import (defaults to the file name)
        #[arg(short, long)]
        name: Option<String>,

        /// Skip recurring detection after import
        #[arg(long)]
        no_detect: bool,
    },

    /// Manage imported files
    Files {
        #[command(subcommand)]
        action: Option<FilesAction>,
    },

    /// List transactions
    Transactions {
        /// Only transactions from this source (requires --category)
        #[arg(long, requires = "category")]
        source: Option<String>,

        /// Only transactions in this category (requires --source)
        #[arg(long, requires = "source")]
        category: Option<String>,

        #[command(flatten)]
        filter: FilterArgs,

        /// Number of transactions to show
        #[arg(
            short,
            long,
            default_value = "20",
            value_parser = clap::value_parser!(i64).range(1..)
        )]
        limit: i64,
    },

    /// Spending totals: paid vs unpaid, per category and per source
    Stats {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Recompute recurring patterns from all transactions
    Detect,

    /// Review recurring patterns
    Recurring {
        #[command(subcommand)]
        action: Option<RecurringAction>,
    },

    /// Start the web server
    Serve {
        /// Port to listen on (defaults to config, then 3000)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (defaults to config, then 127.0.0.1)
        #[arg(long)]
        host: Option<String>,

        /// Disable authentication (for local development only)
        ///
        /// WARNING: Do not use this flag when exposing the server to a network.
        /// By default, the server requires a bearer API key from CADENCE_API_KEYS.
        #[arg(long)]
        no_auth: bool,

        /// Directory containing static files to serve (e.g., ui/dist)
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum FilesAction {
    /// List imported files
    List,
    /// Remove a file and its transactions
    Remove {
        /// File ID
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum RecurringAction {
    /// List detected patterns with the monthly/yearly summary
    List {
        /// Hide patterns below this confidence
        #[arg(long, default_value = "0.0")]
        min_confidence: f64,

        /// Only confirmed patterns
        #[arg(long)]
        confirmed_only: bool,

        /// Include rejected patterns
        #[arg(long)]
        include_rejected: bool,
    },
    /// Show a pattern and its transactions
    Show {
        /// Pattern ID
        id: i64,
    },
    /// Confirm a pattern so it survives recomputation
    Confirm {
        /// Pattern ID
        id: i64,

        /// Label to show instead of the detected description
        #[arg(short, long)]
        label: Option<String>,
    },
    /// Reject a pattern
    Reject {
        /// Pattern ID
        id: i64,
    },
    /// Set or clear (with an empty string) a pattern's label
    Label {
        /// Pattern ID
        id: i64,

        /// New label
        text: String,
    },
    /// Show recent detection runs and pattern decisions
    History {
        /// Number of entries of each kind to show
        #[arg(
            short,
            long,
            default_value = "10",
            value_parser = clap::value_parser!(i64).range(1..)
        )]
        limit: i64,
    },
}

/// Payment status and date filters shared by listing and stats commands
#[derive(Args, Debug)]
pub struct FilterArgs {
    /// Only paid transactions
    #[arg(long, conflicts_with = "unpaid")]
    pub paid: bool,

    /// Only unpaid transactions
    #[arg(long)]
    pub unpaid: bool,

    /// Earliest transaction date (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Latest transaction date (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<NaiveDate>,
}

impl FilterArgs {
    pub fn to_filter(&self) -> TransactionFilter {
        let is_paid = match (self.paid, self.unpaid) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        };
        TransactionFilter::new()
            .is_paid(is_paid)
            .date_range(self.from, self.to)
    }
}
