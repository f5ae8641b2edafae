//! CLI module - Command-line interface for Shopper
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand};

/// Shopper - cached product search over Google Shopping
#[derive(Parser)]
#[command(name = "shopper")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API with the cache sweeper (default)
    #[command(alias = "daemon", alias = "-d")]
    Serve,

    /// Run a single product search and print the results
    #[command(alias = "s")]
    Search {
        /// Product search query
        #[arg(required = true)]
        query: Vec<String>,
        /// Number of results to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show usage statistics
    Stats,

    /// Delete expired cache entries
    Purge,

    /// Create default config file
    #[command(alias = "--init")]
    Init,
}

pub use commands::*;
