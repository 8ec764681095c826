use std::path::PathBuf;

use clap::{Parser, Subcommand};
use litefetch_hub::RepoKind;

#[derive(Parser)]
#[command(name = "litefetch")]
#[command(version, about = "Download speech model variants from a model repository host", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the registered model variants
    Variants,

    /// Download a model variant into a flat directory
    Download {
        /// Variant id (e.g., "qualcomm/Whisper_Tiny_En")
        variant: String,

        /// Destination directory, defaults to the user cache
        #[arg(long, env = "LITEFETCH_DEST")]
        dest: Option<PathBuf>,
    },

    /// Show the files of a repository with their sizes
    Files {
        /// Repository id (e.g., "openai/whisper-tiny")
        repo: String,

        /// Glob selecting files (can be specified multiple times)
        #[arg(long = "glob", default_value = "**")]
        globs: Vec<String>,

        /// Branch, tag or commit
        #[arg(long, default_value = "main")]
        revision: String,

        /// Repository kind: models, datasets or spaces
        #[arg(long, default_value = "models")]
        kind: RepoKind,
    },

    /// Show which files of a variant are present locally
    Status {
        /// Variant id
        variant: String,

        /// Destination directory, defaults to the user cache
        #[arg(long, env = "LITEFETCH_DEST")]
        dest: Option<PathBuf>,

        /// Print the status as JSON
        #[arg(long)]
        json: bool,
    },
}
