use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::ai::network::{Network, OutputActivation};
use crate::error::{CheckpointError, NetworkError};

/// Serializable model record: declared sizes, hyperparameters, and both
/// weight matrices with the bias as the trailing column of each row.
/// `discount_rate` and `explore_factor` are present only for the variants
/// that carry them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkCheckpoint {
    pub input_size: usize,
    pub hidden_size: usize,
    pub output_size: usize,
    pub learning_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explore_factor: Option<f64>,
    pub weights: [Vec<Vec<f64>>; 2],
}

impl NetworkCheckpoint {
    pub fn from_network(
        network: &Network,
        discount_rate: Option<f64>,
        explore_factor: Option<f64>,
    ) -> Self {
        NetworkCheckpoint {
            input_size: network.input_size(),
            hidden_size: network.hidden_size(),
            output_size: network.output_size(),
            learning_rate: network.learning_rate(),
            discount_rate,
            explore_factor,
            weights: [
                matrix_to_rows(network.hidden_weights()),
                matrix_to_rows(network.output_weights()),
            ],
        }
    }

    /// Reconstruct a network with exactly the declared shapes. Any mismatch
    /// between the stored arrays and the declared sizes is a fatal load
    /// error.
    pub fn to_network(&self, activation: OutputActivation) -> Result<Network, CheckpointError> {
        let hidden_weights = rows_to_matrix(
            &self.weights[0],
            "hidden",
            self.hidden_size,
            self.input_size + 1,
        )?;
        let output_weights = rows_to_matrix(
            &self.weights[1],
            "output",
            self.output_size,
            self.hidden_size + 1,
        )?;
        let network = Network::from_weights(
            self.input_size,
            self.hidden_size,
            self.output_size,
            self.learning_rate,
            activation,
            hidden_weights,
            output_weights,
        )?;
        Ok(network)
    }
}

fn matrix_to_rows(matrix: &Array2<f64>) -> Vec<Vec<f64>> {
    matrix.rows().into_iter().map(|row| row.to_vec()).collect()
}

fn rows_to_matrix(
    rows: &[Vec<f64>],
    layer: &'static str,
    expected_rows: usize,
    expected_cols: usize,
) -> Result<Array2<f64>, CheckpointError> {
    let shape_error = |actual_rows: usize, actual_cols: usize| {
        CheckpointError::Network(NetworkError::WeightShape {
            layer,
            rows: expected_rows,
            cols: expected_cols,
            actual_rows,
            actual_cols,
        })
    };

    if rows.len() != expected_rows {
        return Err(shape_error(rows.len(), rows.first().map_or(0, Vec::len)));
    }
    let mut flat = Vec::with_capacity(expected_rows * expected_cols);
    for row in rows {
        if row.len() != expected_cols {
            return Err(shape_error(rows.len(), row.len()));
        }
        flat.extend_from_slice(row);
    }
    Ok(Array2::from_shape_vec((expected_rows, expected_cols), flat)
        .expect("validated dimensions"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::network::Init;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sample_network() -> Network {
        let mut rng = StdRng::seed_from_u64(5);
        Network::with_random_weights(
            3,
            4,
            2,
            0.01,
            OutputActivation::Linear,
            Init::Small,
            &mut rng,
        )
    }

    #[test]
    fn test_round_trip_preserves_weights() {
        let network = sample_network();
        let ckpt = NetworkCheckpoint::from_network(&network, Some(0.99), Some(0.8));
        let restored = ckpt.to_network(OutputActivation::Linear).unwrap();

        assert_eq!(restored.hidden_weights(), network.hidden_weights());
        assert_eq!(restored.output_weights(), network.output_weights());
        assert_eq!(restored.learning_rate(), network.learning_rate());
    }

    #[test]
    fn test_json_round_trip() {
        let network = sample_network();
        let ckpt = NetworkCheckpoint::from_network(&network, Some(0.99), None);
        let json = serde_json::to_string_pretty(&ckpt).unwrap();
        // Absent options are omitted entirely.
        assert!(!json.contains("explore_factor"));

        let parsed: NetworkCheckpoint = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.discount_rate, Some(0.99));
        assert_eq!(parsed.explore_factor, None);
        let restored = parsed.to_network(OutputActivation::Linear).unwrap();
        assert_eq!(restored.hidden_weights(), network.hidden_weights());
    }

    #[test]
    fn test_mismatched_declared_sizes_fail_to_load() {
        let network = sample_network();
        let mut ckpt = NetworkCheckpoint::from_network(&network, None, None);
        ckpt.hidden_size = 7;
        let err = ckpt.to_network(OutputActivation::Linear).unwrap_err();
        assert!(matches!(
            err,
            CheckpointError::Network(NetworkError::WeightShape { layer: "hidden", .. })
        ));
    }

    #[test]
    fn test_ragged_rows_fail_to_load() {
        let network = sample_network();
        let mut ckpt = NetworkCheckpoint::from_network(&network, None, None);
        ckpt.weights[1][0].pop();
        let err = ckpt.to_network(OutputActivation::Linear).unwrap_err();
        assert!(matches!(
            err,
            CheckpointError::Network(NetworkError::WeightShape { layer: "output", .. })
        ));
    }
}
