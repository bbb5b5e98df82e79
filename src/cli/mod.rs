//! CLI module - Command-line interface for snatcharr
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand};

/// snatcharr - TV episode search and snatch engine
#[derive(Parser)]
#[command(name = "snatcharr")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Read the config from this file instead of the default locations
    #[arg(long, global = true)]
    pub config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run as background daemon with scheduler
    #[command(alias = "-d", alias = "--daemon")]
    Daemon,

    /// Search for one episode and snatch the best result
    #[command(alias = "s")]
    Search {
        /// Show ID
        show_id: u32,
        season: u32,
        episode: u32,
        /// Search even if the episode is not wanted
        #[arg(long)]
        manual: bool,
    },

    /// Search for the wanted episodes of one season
    Season {
        /// Show ID
        show_id: u32,
        season: u32,
    },

    /// Sweep the provider feeds for needed episodes now
    Rss,

    /// Run a backlog search now
    Backlog,

    /// Look for propers of recently snatched episodes now
    Propers,

    /// Show how a release name is parsed and classified
    #[command(alias = "p")]
    Parse {
        /// Release or file name
        name: String,
        /// Treat the name as a file name (quality from the extension when unknown)
        #[arg(long)]
        file: bool,
    },

    /// Show recent snatch history
    #[command(alias = "h")]
    History {
        /// Number of entries to show
        #[arg(default_value = "10")]
        limit: usize,
    },

    /// Create default config file
    #[command(alias = "--init")]
    Init,
}

pub use commands::*;
