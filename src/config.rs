use std::path::Path;

use crate::checkpoint::CheckpointManagerConfig;
use crate::error::ConfigError;
use crate::training::trainer::TrainerConfig;

/// Q-learning hyperparameters.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DqnConfig {
    pub input_size: usize,
    pub hidden_size: usize,
    pub action_count: usize,
    pub learning_rate: f64,
    pub discount_rate: f64,
    pub explore_start: f64,
    pub explore_decay: f64,
    pub min_explore: f64,
    pub sync_interval: usize,
    pub batch_size: usize,
    pub replay_capacity: usize,
    pub min_replay_size: usize,
}

impl Default for DqnConfig {
    fn default() -> Self {
        DqnConfig {
            input_size: 6,
            hidden_size: 50,
            action_count: 2,
            learning_rate: 0.001,
            discount_rate: 0.99,
            explore_start: 1.0,
            explore_decay: 0.997,
            min_explore: 0.1,
            sync_interval: 12,
            batch_size: 32,
            replay_capacity: 50_000,
            min_replay_size: 1000,
        }
    }
}

/// REINFORCE policy-gradient hyperparameters.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ReinforceConfig {
    pub input_size: usize,
    pub hidden_size: usize,
    pub action_count: usize,
    pub learning_rate: f64,
    pub discount_rate: f64,
    /// Episodes accumulated before one batched gradient application.
    pub batch_episodes: usize,
    /// Initial trajectory arena capacity, in steps.
    pub initial_capacity: usize,
    /// Rows added per arena extension.
    pub extend_capacity: usize,
}

impl Default for ReinforceConfig {
    fn default() -> Self {
        ReinforceConfig {
            input_size: 6,
            hidden_size: 600,
            action_count: 2,
            learning_rate: 0.0002,
            discount_rate: 0.99,
            batch_episodes: 800,
            initial_capacity: 100_000,
            extend_capacity: 20_000,
        }
    }
}

/// Supervised imitation hyperparameters.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SupervisedConfig {
    pub input_size: usize,
    pub hidden_size: usize,
    pub learning_rate: f64,
}

impl Default for SupervisedConfig {
    fn default() -> Self {
        SupervisedConfig {
            input_size: 6,
            hidden_size: 20,
            learning_rate: 0.001,
        }
    }
}

/// Top-level application configuration, loadable from TOML.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub dqn: DqnConfig,
    pub reinforce: ReinforceConfig,
    pub supervised: SupervisedConfig,
    pub training: TrainerConfig,
    pub checkpoint: CheckpointManagerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            dqn: DqnConfig::default(),
            reinforce: ReinforceConfig::default(),
            supervised: SupervisedConfig::default(),
            training: TrainerConfig::default(),
            checkpoint: CheckpointManagerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::warn!("config file '{}' not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dqn.learning_rate <= 0.0 {
            return Err(ConfigError::Validation(
                "dqn.learning_rate must be > 0".into(),
            ));
        }
        if self.reinforce.learning_rate <= 0.0 {
            return Err(ConfigError::Validation(
                "reinforce.learning_rate must be > 0".into(),
            ));
        }
        if self.supervised.learning_rate <= 0.0 {
            return Err(ConfigError::Validation(
                "supervised.learning_rate must be > 0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.dqn.discount_rate) {
            return Err(ConfigError::Validation(
                "dqn.discount_rate must be in [0, 1]".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.reinforce.discount_rate) {
            return Err(ConfigError::Validation(
                "reinforce.discount_rate must be in [0, 1]".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.dqn.explore_start) {
            return Err(ConfigError::Validation(
                "dqn.explore_start must be in [0, 1]".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.dqn.explore_decay) {
            return Err(ConfigError::Validation(
                "dqn.explore_decay must be in [0, 1]".into(),
            ));
        }
        if self.dqn.min_explore > self.dqn.explore_start {
            return Err(ConfigError::Validation(
                "dqn.min_explore must be <= dqn.explore_start".into(),
            ));
        }
        if self.dqn.action_count < 2 {
            return Err(ConfigError::Validation(
                "dqn.action_count must be >= 2".into(),
            ));
        }
        if self.reinforce.action_count < 2 {
            return Err(ConfigError::Validation(
                "reinforce.action_count must be >= 2".into(),
            ));
        }
        if self.dqn.sync_interval == 0 {
            return Err(ConfigError::Validation(
                "dqn.sync_interval must be > 0".into(),
            ));
        }
        if self.dqn.batch_size == 0 {
            return Err(ConfigError::Validation("dqn.batch_size must be > 0".into()));
        }
        if self.dqn.replay_capacity < self.dqn.batch_size {
            return Err(ConfigError::Validation(
                "dqn.replay_capacity must be >= dqn.batch_size".into(),
            ));
        }
        if self.dqn.min_replay_size < self.dqn.batch_size {
            return Err(ConfigError::Validation(
                "dqn.min_replay_size must be >= dqn.batch_size".into(),
            ));
        }
        if self.reinforce.batch_episodes == 0 {
            return Err(ConfigError::Validation(
                "reinforce.batch_episodes must be >= 1".into(),
            ));
        }
        if self.reinforce.initial_capacity == 0 {
            return Err(ConfigError::Validation(
                "reinforce.initial_capacity must be > 0".into(),
            ));
        }
        if self.reinforce.extend_capacity == 0 {
            return Err(ConfigError::Validation(
                "reinforce.extend_capacity must be > 0".into(),
            ));
        }
        if self.training.num_episodes == 0 {
            return Err(ConfigError::Validation(
                "training.num_episodes must be > 0".into(),
            ));
        }
        if self.training.log_interval == 0 {
            return Err(ConfigError::Validation(
                "training.log_interval must be > 0".into(),
            ));
        }
        if self.training.checkpoint_interval == 0 {
            return Err(ConfigError::Validation(
                "training.checkpoint_interval must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Generate a TOML string with all default values (useful for creating
    /// example config files).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&AppConfig::default()).expect("default config serializes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        config.validate().expect("default config should be valid");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_str = r#"
[dqn]
learning_rate = 0.01
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert!((config.dqn.learning_rate - 0.01).abs() < 1e-12);
        // Other fields should be defaults
        assert!((config.dqn.discount_rate - 0.99).abs() < 1e-12);
        assert_eq!(config.reinforce.batch_episodes, 800);
    }

    #[test]
    fn test_empty_toml_uses_all_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        let default = AppConfig::default();
        assert!((config.dqn.learning_rate - default.dqn.learning_rate).abs() < 1e-12);
        assert_eq!(config.training.num_episodes, default.training.num_episodes);
    }

    #[test]
    fn test_validation_rejects_zero_episodes() {
        let mut config = AppConfig::default();
        config.training.num_episodes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_negative_lr() {
        let mut config = AppConfig::default();
        config.reinforce.learning_rate = -0.001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_invalid_discount() {
        let mut config = AppConfig::default();
        config.reinforce.discount_rate = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_explore_start_out_of_range() {
        let mut config = AppConfig::default();
        config.dqn.explore_start = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_min_explore_gt_start() {
        let mut config = AppConfig::default();
        config.dqn.explore_start = 0.05;
        config.dqn.min_explore = 0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_replay_capacity_lt_batch() {
        let mut config = AppConfig::default();
        config.dqn.replay_capacity = 10;
        config.dqn.batch_size = 64;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_min_replay_lt_batch() {
        let mut config = AppConfig::default();
        config.dqn.min_replay_size = 10;
        config.dqn.batch_size = 64;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_batch_episodes() {
        let mut config = AppConfig::default();
        config.reinforce.batch_episodes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_sync_interval() {
        let mut config = AppConfig::default();
        config.dqn.sync_interval = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_single_action() {
        let mut config = AppConfig::default();
        config.reinforce.action_count = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = AppConfig::load_or_default(Path::new("nonexistent_config.toml")).unwrap();
        assert_eq!(config.dqn.replay_capacity, 50_000);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test_config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            r#"
[training]
num_episodes = 500
"#
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.training.num_episodes, 500);
        // Others are defaults
        assert!((config.dqn.learning_rate - 0.001).abs() < 1e-12);
    }

    #[test]
    fn test_default_toml_roundtrips() {
        let toml_str = AppConfig::default_toml();
        let config: AppConfig = toml::from_str(&toml_str).unwrap();
        config.validate().expect("roundtripped config should be valid");
    }
}
