//! Lesson Video Compositor
//!
//! Command-line front door for composing narrated lesson videos.
//!
//! # Usage
//!
//! ```bash
//! compositor render --title "Intro to APIs" --source notes.md --audio voice.mp3 \
//!     --screenshot shots/1.png --screenshot shots/2.png
//! compositor plan --duration 30 --title "Intro to APIs" -c screenshot=a.png -c screenshot=b.png
//! compositor slide --text "Intro to APIs" --output title.png
//! compositor verify --input media/video.mp4 --expected 30
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use lesson_compositor::adapters::TracingLogAdapter;
use lesson_compositor::app::DefaultAppContainer;
use lesson_compositor::cli::{commands, Cli, Commands};
use lesson_compositor::config_initialization::initialize_configuration_hierarchy;

/// Main entry point for the compositor CLI
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    TracingLogAdapter::new(cli.log_level.as_deref(), cli.json_logs)?.init();

    info!("Starting Lesson Video Compositor");
    let config = initialize_configuration_hierarchy(&cli)?;
    let command_name = cli.command.name();

    // Execute the requested command
    match cli.command {
        Commands::Render(args) => {
            info!("Executing render command");
            let container =
                DefaultAppContainer::from_config(&config).context("Failed to set up renderer")?;
            commands::render(args, &container, &config).await?;
        }
        Commands::Plan(args) => {
            info!("Executing plan command");
            commands::plan(args, &config)?;
        }
        Commands::Slide(args) => {
            info!("Executing slide command");
            commands::slide(args, &config)?;
        }
        Commands::Verify(args) => {
            info!("Executing verify command");
            commands::verify(args).await?;
        }
    }

    info!("Command {} completed successfully", command_name);
    Ok(())
}
