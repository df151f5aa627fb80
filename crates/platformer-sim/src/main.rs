//! Platformer Sim
//!
//! Plays a scripted input sequence through one or more levels without a
//! window and logs what happens.
//!
//! ```text
//! platformer-sim [LEVEL.json ...] [--config CONFIG.json] [--script SCRIPT.json]
//! ```
//!
//! The first level is the hub. Without level files the bundled level is used.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use platformer_core::{Game, GameEvent, LevelDocument, PlayerInput, SessionConfig};
use serde::Deserialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Input held for a number of frames.
#[derive(Debug, Clone, Copy, Deserialize)]
struct ScriptStep {
    frames: u32,
    #[serde(flatten)]
    input: PlayerInput,
}

/// Plays scripted input through platformer levels without a window.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Level documents in campaign order. The first one is the hub.
    #[arg(value_name = "LEVEL.json")]
    levels: Vec<PathBuf>,
    /// Session tuning overrides.
    #[arg(long, value_name = "CONFIG.json")]
    config: Option<PathBuf>,
    /// Input script: a list of `{ "frames": N, "right": true, ... }` steps.
    #[arg(long, value_name = "SCRIPT.json")]
    script: Option<PathBuf>,
}

fn default_script() -> Vec<ScriptStep> {
    let idle = PlayerInput::default();
    let right = PlayerInput {
        right: true,
        ..PlayerInput::default()
    };
    let jump_right = PlayerInput {
        right: true,
        up: true,
        ..PlayerInput::default()
    };
    vec![
        ScriptStep {
            frames: 60,
            input: idle,
        },
        ScriptStep {
            frames: 40,
            input: right,
        },
        ScriptStep {
            frames: 20,
            input: jump_right,
        },
        ScriptStep {
            frames: 240,
            input: right,
        },
    ]
}

fn read(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = CliArgs::parse();

    let config = match &args.config {
        Some(path) => SessionConfig::from_json(&read(path)?)
            .with_context(|| format!("Invalid config {}", path.display()))?,
        None => SessionConfig::default(),
    };

    let levels = if args.levels.is_empty() {
        vec![LevelDocument::default_level()?]
    } else {
        args.levels
            .iter()
            .map(|path| {
                LevelDocument::from_json(&read(path)?)
                    .with_context(|| format!("Invalid level {}", path.display()))
            })
            .collect::<anyhow::Result<Vec<_>>>()?
    };

    let script = match &args.script {
        Some(path) => serde_json::from_str::<Vec<ScriptStep>>(&read(path)?)
            .with_context(|| format!("Invalid script {}", path.display()))?,
        None => default_script(),
    };

    let mut game = Game::new(levels, config)?;
    tracing::info!(
        "[sim] Starting in '{}' with {} levels",
        game.session().level().meta.name,
        game.levels().len()
    );

    for step in &script {
        for _ in 0..step.frames {
            match game.frame(step.input)? {
                GameEvent::Running(report) => {
                    if report.status_changed {
                        tracing::debug!(
                            "[sim] Frame {}: {:?}, {} platforms moving",
                            report.frame,
                            report.status,
                            report.active_platforms
                        );
                    }
                }
                GameEvent::Died(cause) => {
                    tracing::info!("[sim] Died ({:?}), respawning", cause);
                    game.respawn();
                }
                GameEvent::LevelChanged { from, to } => {
                    tracing::info!(
                        "[sim] Level {} -> {} ('{}')",
                        from,
                        to,
                        game.session().level().meta.name
                    );
                }
            }
        }
    }

    let position = game.session().player_position().unwrap_or_default();
    tracing::info!(
        "[sim] Finished in level {} at ({:.2}, {:.2}), status {:?}",
        game.campaign().current(),
        position[0],
        position[1],
        game.session().status()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_cli_levels_and_flags() {
        let args = CliArgs::try_parse_from([
            "platformer-sim",
            "hub.json",
            "one.json",
            "--config",
            "tuning.json",
            "--script",
            "run.json",
        ])
        .unwrap();

        assert_eq!(
            args.levels,
            vec![PathBuf::from("hub.json"), PathBuf::from("one.json")]
        );
        assert_eq!(args.config, Some(PathBuf::from("tuning.json")));
        assert_eq!(args.script, Some(PathBuf::from("run.json")));
    }

    #[test]
    fn test_cli_defaults_to_bundled_level() {
        let args = CliArgs::try_parse_from(["platformer-sim"]).unwrap();

        assert!(args.levels.is_empty());
        assert!(args.config.is_none());
        assert!(args.script.is_none());
    }

    #[test]
    fn test_cli_help_is_not_an_unknown_flag() {
        let err = CliArgs::try_parse_from(["platformer-sim", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);

        let err = CliArgs::try_parse_from(["platformer-sim", "--frames", "3"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_script_step_flattens_input() {
        let steps: Vec<ScriptStep> =
            serde_json::from_str(r#"[{ "frames": 30, "right": true, "up": true }]"#).unwrap();

        assert_eq!(steps[0].frames, 30);
        assert!(steps[0].input.right && steps[0].input.up);
        assert!(!steps[0].input.left);
    }
}
