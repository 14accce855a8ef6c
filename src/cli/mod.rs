//! CLI module for the lesson compositor
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod args;
pub mod commands;

pub use args::{PlanArgs, RenderArgs, SlideArgs, VerifyArgs};

/// Lesson Video Compositor
///
/// Turns a topic, its narration and a handful of visuals into a single
/// narrated lesson video.
#[derive(Parser, Debug)]
#[command(name = "compositor")]
#[command(about = "Lesson Video Compositor - narrated lesson videos from slides, screenshots and generated media")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Logging level (trace, debug, info, warn, error); RUST_LOG when unset
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Configuration file (default: config/compositor.toml or compositor.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Narrate and render a lesson video
    Render(RenderArgs),
    /// Print the timeline plan for a narration length
    Plan(PlanArgs),
    /// Render a title card to PNG
    Slide(SlideArgs),
    /// Check a rendered video's duration
    Verify(VerifyArgs),
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Render(_) => "render",
            Commands::Plan(_) => "plan",
            Commands::Slide(_) => "slide",
            Commands::Verify(_) => "verify",
        }
    }
}
