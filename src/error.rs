use std::path::PathBuf;

/// Errors from the network core: declared sizes inconsistent with supplied
/// inputs or loaded weights. Detected at first use, fatal, not recovered.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("input vector has length {actual} but the network expects {expected}")]
    InputLength { expected: usize, actual: usize },

    #[error(
        "{layer} weight matrix has shape ({actual_rows}, {actual_cols}), \
         declared sizes require ({rows}, {cols})"
    )]
    WeightShape {
        layer: &'static str,
        rows: usize,
        cols: usize,
        actual_rows: usize,
        actual_cols: usize,
    },
}

/// Errors that can occur during training.
#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("requested a batch of {requested} transitions but the buffer holds {available}")]
    InsufficientSamples { requested: usize, available: usize },

    #[error("reward batch has zero variance and cannot be standardized")]
    DegenerateRewardBatch,

    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),
}

/// Errors that can occur during checkpoint operations.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("no checkpoints found in {0}")]
    NoCheckpoints(PathBuf),

    #[error("failed to read checkpoint from {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse checkpoint from {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("checkpoint is missing the '{0}' field required by this variant")]
    MissingField(&'static str),

    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_error_display() {
        let err = NetworkError::InputLength {
            expected: 6,
            actual: 4,
        };
        assert_eq!(
            err.to_string(),
            "input vector has length 4 but the network expects 6"
        );
    }

    #[test]
    fn test_training_error_display() {
        let err = TrainingError::InsufficientSamples {
            requested: 32,
            available: 7,
        };
        assert_eq!(
            err.to_string(),
            "requested a batch of 32 transitions but the buffer holds 7"
        );
    }

    #[test]
    fn test_checkpoint_error_display() {
        let err = CheckpointError::NoCheckpoints(PathBuf::from("checkpoints"));
        assert_eq!(err.to_string(), "no checkpoints found in checkpoints");
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Validation("dqn.learning_rate must be > 0".to_string());
        assert_eq!(
            err.to_string(),
            "config validation error: dqn.learning_rate must be > 0"
        );
    }
}
