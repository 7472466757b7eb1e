//! CLI argument parsing with clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// AI image description generator - captions and keywords from Gemini,
/// written into image metadata with exiftool.
#[derive(Parser, Debug)]
#[command(name = "imgdescgen", version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file path override.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose (debug) logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output logs in JSON format.
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// What to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Describe images and print the descriptions as JSON.
    Describe(DescribeArgs),

    /// List the Gemini models that can be used.
    Models(ModelsArgs),
}

/// Arguments of `imgdescgen models`.
#[derive(Args, Debug)]
pub struct ModelsArgs {
    /// Show only this model (name or short alias).
    pub model: Option<String>,
}

/// Arguments of `imgdescgen describe`.
#[derive(Args, Debug)]
pub struct DescribeArgs {
    /// Images to describe, in order.
    #[arg(required = true)]
    pub images: Vec<PathBuf>,

    /// Write copies with the description in their metadata to this directory.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Re-encode at reduced quality before sending.
    #[arg(long)]
    pub reduce_quality: bool,

    /// Always upload through the Files API instead of sending inline.
    #[arg(long)]
    pub force_upload: bool,

    /// Model name or short alias (e.g. flash, pro).
    #[arg(short, long)]
    pub model: Option<String>,
}
