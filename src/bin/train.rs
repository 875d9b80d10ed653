use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ml_pong::checkpoint::{CheckpointManager, CheckpointManagerConfig, NetworkCheckpoint};
use ml_pong::config::AppConfig;
use ml_pong::env::SimPong;
use ml_pong::training::{DqnTrainer, ReinforceTrainer, SupervisedTrainer};

/// Train a paddle-game agent.
#[derive(Parser)]
#[command(name = "train", about = "Train a paddle-game RL agent")]
struct Cli {
    /// Algorithm to train: dqn, reinforce, or supervised
    #[arg(long, default_value = "dqn")]
    algorithm: String,

    /// Resume training from the latest checkpoint
    #[arg(long)]
    resume: bool,

    /// Path to TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Override number of training episodes
    #[arg(long)]
    episodes: Option<usize>,

    /// Override learning rate
    #[arg(long)]
    lr: Option<f64>,

    /// Evaluate the latest checkpoint greedily for N episodes instead of
    /// training
    #[arg(long, value_name = "N")]
    eval: Option<usize>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    match cli.algorithm.as_str() {
        "dqn" | "reinforce" | "supervised" => {}
        other => bail!(
            "unknown algorithm '{}' (expected 'dqn', 'reinforce', or 'supervised')",
            other
        ),
    }

    let mut app_config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    // Apply CLI overrides
    if let Some(episodes) = cli.episodes {
        app_config.training.num_episodes = episodes;
    }
    if let Some(lr) = cli.lr {
        match cli.algorithm.as_str() {
            "dqn" => app_config.dqn.learning_rate = lr,
            "reinforce" => app_config.reinforce.learning_rate = lr,
            "supervised" => app_config.supervised.learning_rate = lr,
            _ => {}
        }
    }

    // Use an algorithm-specific checkpoint directory.
    let checkpoint_dir = app_config.checkpoint.checkpoint_dir.join(&cli.algorithm);
    let manager = CheckpointManager::new(CheckpointManagerConfig {
        checkpoint_dir,
        ..app_config.checkpoint.clone()
    });

    let env = SimPong::new();

    match cli.algorithm.as_str() {
        "dqn" => {
            let mut trainer =
                DqnTrainer::new(env, app_config.dqn.clone(), app_config.training.clone());
            if cli.resume || cli.eval.is_some() {
                resume(&manager, cli.eval.is_some(), |ckpt, episode| {
                    trainer.restore(ckpt, episode).map_err(Into::into)
                })?;
            }
            if let Some(games) = cli.eval {
                let (wins, losses) = trainer.evaluate(games)?;
                info!(games, wins, losses, "evaluation finished");
            } else {
                trainer.train(&manager)?;
            }
        }
        "reinforce" => {
            let mut trainer = ReinforceTrainer::new(
                env,
                app_config.reinforce.clone(),
                app_config.training.clone(),
            );
            if cli.resume || cli.eval.is_some() {
                resume(&manager, cli.eval.is_some(), |ckpt, episode| {
                    trainer.restore(ckpt, episode).map_err(Into::into)
                })?;
            }
            if let Some(games) = cli.eval {
                let (wins, losses) = trainer.evaluate(games)?;
                info!(games, wins, losses, "evaluation finished");
            } else {
                trainer.train(&manager)?;
            }
        }
        "supervised" => {
            let mut trainer = SupervisedTrainer::new(
                env,
                app_config.supervised.clone(),
                app_config.training.clone(),
            );
            if cli.resume || cli.eval.is_some() {
                resume(&manager, cli.eval.is_some(), |ckpt, episode| {
                    trainer.restore(ckpt, episode).map_err(Into::into)
                })?;
            }
            if let Some(games) = cli.eval {
                let (wins, losses) = trainer.evaluate(games)?;
                info!(games, wins, losses, "evaluation finished");
            } else {
                trainer.train(&manager)?;
            }
        }
        _ => unreachable!(),
    }

    Ok(())
}

/// Restore the latest checkpoint into a trainer. A missing checkpoint is
/// fatal for evaluation but only informational when resuming training.
fn resume(
    manager: &CheckpointManager,
    required: bool,
    mut restore: impl FnMut(&NetworkCheckpoint, usize) -> Result<()>,
) -> Result<()> {
    match manager.load_latest() {
        Ok((episode, checkpoint)) => {
            restore(&checkpoint, episode).context("restoring checkpoint")?;
            info!(episode, "resumed from checkpoint");
            Ok(())
        }
        Err(e) if required => Err(e).context("loading checkpoint for evaluation"),
        Err(e) => {
            info!("no checkpoint found ({e}), starting fresh");
            Ok(())
        }
    }
}
