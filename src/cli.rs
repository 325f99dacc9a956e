//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// quire static site generator CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Site root directory
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Config file name (default: quire.toml)
    #[arg(short = 'C', long, default_value = "quire.toml")]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Drop the content cache and build the site for production
    Build {
        /// Output directory (default: ./docs)
        #[arg(short, long)]
        outdir: Option<PathBuf>,

        /// Minify the html content
        #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
        minify: Option<bool>,
    },

    /// Serve the site in development mode. Re-render and reload on change
    Serve {
        /// Output directory (default: ./dev)
        #[arg(short, long)]
        outdir: Option<PathBuf>,

        /// Interface to bind on
        #[arg(short, long)]
        interface: Option<String>,

        /// The port you should provide
        #[arg(short, long)]
        port: Option<u16>,

        /// enable watch
        #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
        watch: Option<bool>,
    },

    /// Delete the parsed content cache
    CleanCache,

    /// Generate an empty draft post
    Draft,

    /// Generate sample posts
    Sample {
        /// Number of posts to generate
        #[arg(short, long, default_value_t = 10)]
        number_of_posts: usize,
    },
}

impl Cli {
    pub const fn is_build(&self) -> bool {
        matches!(self.command, Commands::Build { .. })
    }
}
