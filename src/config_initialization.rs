//! Configuration initialization and hierarchy management

use anyhow::{Context, Result};
use tracing::info;

use crate::adapters::{EnvConfigAdapter, TomlConfigAdapter};
use crate::cli::{Cli, Commands};
use crate::config::{CompositorConfig, NarrationMode, SpeechMode};
use crate::ports::ConfigPort;

/// Build the configuration following precedence: CLI > Env > File > Defaults
pub fn initialize_configuration_hierarchy(cli: &Cli) -> Result<CompositorConfig> {
    let env = EnvConfigAdapter::from_env();
    resolve_configuration(cli, &env)
}

/// Same as [`initialize_configuration_hierarchy`] with an explicit environment
pub fn resolve_configuration(cli: &Cli, env: &EnvConfigAdapter) -> Result<CompositorConfig> {
    info!("Initializing configuration hierarchy");

    // Step 1: defaults
    let config = CompositorConfig::default();

    // Step 2: file, explicit or discovered
    let file = match &cli.config {
        Some(path) => TomlConfigAdapter::from_path(path),
        None => TomlConfigAdapter::discover(),
    };
    let config = file.load(config).context("Failed to load configuration file")?;

    // Step 3: environment variables
    let config = env
        .load(config)
        .context("Failed to apply environment overrides")?;

    // Step 4: CLI arguments
    let config = apply_cli_configuration_overrides(cli, config)?;

    config.validate().context("Invalid configuration")?;
    info!("Configuration hierarchy initialized successfully");
    Ok(config)
}

/// Apply CLI argument overrides to configuration
fn apply_cli_configuration_overrides(
    cli: &Cli,
    mut config: CompositorConfig,
) -> Result<CompositorConfig> {
    let mut cli_overrides = 0;

    match &cli.command {
        Commands::Render(args) => {
            if let Some(audio) = &args.audio {
                info!("CLI override: speech.audio_file = {}", audio.display());
                config.speech.mode = SpeechMode::Prerecorded;
                config.speech.audio_file = Some(audio.clone());
                cli_overrides += 1;
            }
            if let Some(url) = &args.remote_url {
                info!("CLI override: remote.base_url = {}", url);
                config.remote.enabled = true;
                config.remote.base_url = Some(url.clone());
                cli_overrides += 1;
            }
            if let Some(mode) = &args.narration {
                config.narration.mode = match mode.trim().to_lowercase().as_str() {
                    "verbatim" => NarrationMode::Verbatim,
                    "chat" => NarrationMode::Chat,
                    other => anyhow::bail!(
                        "Invalid narration mode: {}. Valid modes: verbatim, chat",
                        other
                    ),
                };
                info!("CLI override: narration.mode = {}", mode);
                cli_overrides += 1;
            }
            if let Some(fps) = args.fps {
                info!("CLI override: video.fps = {}", fps);
                config.video.fps = fps;
                cli_overrides += 1;
            }
        }
        Commands::Slide(args) => {
            if let Some(width) = args.width {
                config.video.width = width;
                cli_overrides += 1;
            }
            if let Some(height) = args.height {
                config.video.height = height;
                cli_overrides += 1;
            }
        }
        Commands::Plan(_) | Commands::Verify(_) => {}
    }

    if cli_overrides > 0 {
        info!("Applied {} CLI configuration overrides", cli_overrides);
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> EnvConfigAdapter {
        EnvConfigAdapter::from_vars(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())))
    }

    #[test]
    fn test_precedence_cli_over_env_over_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("compositor.toml");
        std::fs::write(&path, "[video]\nfps = 25\nwidth = 640\nheight = 360\n").unwrap();

        let cli = Cli::try_parse_from([
            "compositor",
            "--config",
            path.to_str().unwrap(),
            "render",
            "--title",
            "Intro",
            "--fps",
            "30",
        ])
        .unwrap();
        let config = resolve_configuration(
            &cli,
            &env(&[("LESSON_VIDEO_FPS", "50"), ("LESSON_VIDEO_WIDTH", "320")]),
        )
        .unwrap();

        assert_eq!(config.video.fps, 30);
        assert_eq!(config.video.width, 320);
        assert_eq!(config.video.height, 360);
    }

    #[test]
    fn test_remote_url_enables_remote_generation() {
        let cli = Cli::try_parse_from([
            "compositor",
            "render",
            "--title",
            "Intro",
            "--remote-url",
            "http://gen.local",
            "--audio",
            "voice.mp3",
        ])
        .unwrap();
        let config = resolve_configuration(&cli, &env(&[])).unwrap();
        assert!(config.remote.enabled);
        assert_eq!(config.speech.audio_file, Some("voice.mp3".into()));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let cli = Cli::try_parse_from(["compositor", "plan", "--duration", "10"]).unwrap();
        assert!(resolve_configuration(&cli, &env(&[("LESSON_VIDEO_WIDTH", "641")])).is_err());

        let cli = Cli::try_parse_from([
            "compositor",
            "render",
            "--title",
            "Intro",
            "--narration",
            "poetry",
        ])
        .unwrap();
        assert!(resolve_configuration(&cli, &env(&[])).is_err());
    }
}
