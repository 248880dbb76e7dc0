//! CLI module - Command-line interface for shopscout
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand};

/// shopscout - cross-platform product search
/// Aggregates Amazon, Flipkart, Meesho and Myntra listings behind a result cache
#[derive(Parser)]
#[command(name = "shopscout")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API (default)
    #[command(alias = "daemon", alias = "web")]
    Serve {
        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Search every enabled platform
    #[command(alias = "s")]
    Search {
        /// Search query
        #[arg(required = true)]
        query: Vec<String>,
        /// Restrict to one platform
        #[arg(long, short)]
        platform: Option<String>,
        /// Skip the cache and scrape live
        #[arg(long, short)]
        force: bool,
    },

    /// Show homepage deals
    Deals,

    /// List recently cached searches
    #[command(alias = "history", alias = "h")]
    Results {
        /// Number of entries to show
        #[arg(default_value = "10")]
        limit: u64,
    },

    /// Check store connectivity and cache settings
    Status,

    /// Create default config file
    #[command(alias = "--init")]
    Init,
}

pub use commands::*;
