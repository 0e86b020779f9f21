use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ripforge")]
#[command(author, version, about = "Optical-media ripping and transcoding automation")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rip a disc and run it through the configured stage pipeline
    Run {
        /// Drive index to rip from (see `scan`)
        #[arg(short, long, default_value = "0")]
        drive: u32,

        /// Title of the media; names the output directory and file
        #[arg(short, long)]
        title: String,

        /// Override the configured output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List optical drives and their inserted discs
    Scan,

    /// Show the title catalog and the would-be selection for a disc
    Info {
        /// Drive index to read
        #[arg(short, long, default_value = "0")]
        drive: u32,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Write a default config file
    Init,
}
