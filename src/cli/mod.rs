//! CLI module - command-line interface for Heatarr
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand};

pub use commands::{cmd_recent, cmd_refresh, cmd_search, cmd_show};

/// Heatarr - episode rating heatmap client
/// Terminal front-end for the show-rating heatmap backend
#[derive(Parser)]
#[command(name = "heatarr")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve a show and print its per-season rating grid
    #[command(alias = "s")]
    Show {
        /// IMDb id (tt...) or free-text title
        #[arg(required = true)]
        query: Vec<String>,

        /// Keep watching while server-side enrichment fills in ratings
        #[arg(long, short = 'f')]
        follow: bool,
    },

    /// Autocomplete search against the backend
    Search {
        /// Search query
        #[arg(required = true)]
        query: Vec<String>,
    },

    /// List recently viewed shows
    #[command(alias = "r")]
    Recent,

    /// Trigger a server-side refresh for a show
    Refresh {
        #[command(subcommand)]
        command: RefreshCommands,
    },

    /// Create default config file
    #[command(alias = "--init")]
    Init,
}

#[derive(Subcommand)]
pub enum RefreshCommands {
    /// Re-scrape ratings the server marked permanently missing
    Missing {
        /// IMDb id of the show
        id: String,
    },

    /// Full re-enrichment of the whole show
    All {
        /// IMDb id of the show
        id: String,
    },

    /// Metadata only
    Metadata {
        /// IMDb id of the show
        id: String,
    },
}
