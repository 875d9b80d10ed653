use std::fs;
use std::path::{Path, PathBuf};

use crate::checkpoint::metadata::NetworkCheckpoint;
use crate::error::CheckpointError;

/// Configuration for the checkpoint manager.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CheckpointManagerConfig {
    pub checkpoint_dir: PathBuf,
    pub keep_last_n: usize,
}

impl Default for CheckpointManagerConfig {
    fn default() -> Self {
        CheckpointManagerConfig {
            checkpoint_dir: PathBuf::from("checkpoints"),
            keep_last_n: 5,
        }
    }
}

/// Manages saving, loading, listing, and pruning checkpoint files. Each
/// checkpoint is one JSON file named by its episode number; the latest is
/// the one with the highest episode.
pub struct CheckpointManager {
    config: CheckpointManagerConfig,
}

impl CheckpointManager {
    pub fn new(config: CheckpointManagerConfig) -> Self {
        fs::create_dir_all(&config.checkpoint_dir).ok();
        CheckpointManager { config }
    }

    /// Persist a checkpoint synchronously. Writes to a temp file first and
    /// renames into place so a crash never leaves a partial checkpoint.
    pub fn save(
        &self,
        checkpoint: &NetworkCheckpoint,
        episode: usize,
    ) -> Result<PathBuf, CheckpointError> {
        let file_name = format!("checkpoint_{:07}.json", episode);
        let tmp_path = self.config.checkpoint_dir.join(format!("{}.tmp", file_name));
        let final_path = self.config.checkpoint_dir.join(&file_name);

        let json = serde_json::to_string_pretty(checkpoint)?;
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &final_path)?;

        self.prune_old_checkpoints()?;
        Ok(final_path)
    }

    /// Load one checkpoint file.
    pub fn load(&self, path: &Path) -> Result<NetworkCheckpoint, CheckpointError> {
        let json = fs::read_to_string(path).map_err(|e| CheckpointError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&json).map_err(|e| CheckpointError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Load the checkpoint with the highest episode number.
    pub fn load_latest(&self) -> Result<(usize, NetworkCheckpoint), CheckpointError> {
        let (episode, path) = self
            .list_checkpoints()?
            .into_iter()
            .last()
            .ok_or_else(|| CheckpointError::NoCheckpoints(self.config.checkpoint_dir.clone()))?;
        Ok((episode, self.load(&path)?))
    }

    /// All checkpoints sorted by episode (ascending).
    pub fn list_checkpoints(&self) -> Result<Vec<(usize, PathBuf)>, CheckpointError> {
        let mut results = Vec::new();
        for entry in fs::read_dir(&self.config.checkpoint_dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if let Some(episode) = parse_checkpoint_name(&entry.file_name().to_string_lossy()) {
                results.push((episode, path));
            }
        }
        results.sort_by_key(|(episode, _)| *episode);
        Ok(results)
    }

    fn prune_old_checkpoints(&self) -> Result<(), CheckpointError> {
        let checkpoints = self.list_checkpoints()?;
        if checkpoints.len() <= self.config.keep_last_n {
            return Ok(());
        }
        let excess = checkpoints.len() - self.config.keep_last_n;
        for (_, path) in checkpoints.into_iter().take(excess) {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

fn parse_checkpoint_name(name: &str) -> Option<usize> {
    name.strip_prefix("checkpoint_")?
        .strip_suffix(".json")?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::network::{Init, Network, OutputActivation};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sample_checkpoint(learning_rate: f64) -> NetworkCheckpoint {
        let mut rng = StdRng::seed_from_u64(9);
        let network = Network::with_random_weights(
            2,
            3,
            1,
            learning_rate,
            OutputActivation::Sigmoid,
            Init::HeXavier,
            &mut rng,
        );
        NetworkCheckpoint::from_network(&network, None, None)
    }

    fn manager_in(dir: &Path) -> CheckpointManager {
        CheckpointManager::new(CheckpointManagerConfig {
            checkpoint_dir: dir.to_path_buf(),
            keep_last_n: 3,
        })
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path());

        let ckpt = sample_checkpoint(0.01);
        let path = manager.save(&ckpt, 1000).unwrap();
        assert!(path.ends_with("checkpoint_0001000.json"));

        let loaded = manager.load(&path).unwrap();
        assert_eq!(loaded.weights, ckpt.weights);
    }

    #[test]
    fn test_load_latest_picks_highest_episode() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path());

        manager.save(&sample_checkpoint(0.01), 100).unwrap();
        manager.save(&sample_checkpoint(0.02), 300).unwrap();
        manager.save(&sample_checkpoint(0.03), 200).unwrap();

        let (episode, ckpt) = manager.load_latest().unwrap();
        assert_eq!(episode, 300);
        assert_eq!(ckpt.learning_rate, 0.02);
    }

    #[test]
    fn test_load_latest_empty_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path());
        let err = manager.load_latest().unwrap_err();
        assert!(matches!(err, CheckpointError::NoCheckpoints(_)));
    }

    #[test]
    fn test_prune_keeps_last_n() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path());

        for episode in [100, 200, 300, 400, 500] {
            manager.save(&sample_checkpoint(0.01), episode).unwrap();
        }

        let remaining = manager.list_checkpoints().unwrap();
        let episodes: Vec<usize> = remaining.iter().map(|(e, _)| *e).collect();
        assert_eq!(episodes, vec![300, 400, 500]);
    }

    #[test]
    fn test_corrupt_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path());
        let path = dir.path().join("checkpoint_0000001.json");
        fs::write(&path, "{ not json").unwrap();

        let err = manager.load(&path).unwrap_err();
        assert!(matches!(err, CheckpointError::Parse { .. }));
    }

    #[test]
    fn test_missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path());
        let err = manager.load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, CheckpointError::Read { .. }));
    }
}
