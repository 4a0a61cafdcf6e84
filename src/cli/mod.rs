//! CLI Module
//!
//! Command-line front-end over the pipeline, working on local WAV files.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Audiolab - apply effects to audio clips and render their waveforms
#[derive(Parser, Debug)]
#[command(name = "audiolab-cli")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// JSON configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show format, duration and level of an audio file
    #[command(name = "info")]
    Info {
        /// Input audio file
        file: PathBuf,
    },

    /// Apply one effect and write the result
    #[command(name = "process")]
    Process {
        /// Input audio file
        file: PathBuf,

        /// Effect name (see `effects`)
        #[arg(short, long)]
        effect: String,

        /// Effect parameters as a JSON object
        #[arg(short, long, default_value = "{}")]
        params: String,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Render waveform and spectrogram images
    #[command(name = "visualize")]
    Visualize {
        /// Input audio file
        file: PathBuf,

        /// Directory for the PNG files and analysis JSON
        #[arg(short, long)]
        out_dir: PathBuf,
    },

    /// List effects and their parameter ranges
    #[command(name = "effects")]
    Effects,
}
