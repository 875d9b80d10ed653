use ndarray::{Array1, ArrayView1};
use rand::rngs::StdRng;
use rand::Rng;

use crate::ai::network::{mean_squared_error, Gradients, Init, Network, OutputActivation};
use crate::config::SupervisedConfig;
use crate::error::NetworkError;

/// Observation layout indices used by the scripted policy.
const BALL_Y: usize = 1;
const OWN_PADDLE_Y: usize = 4;

/// Supervised imitation model: a single sigmoid probability head trained
/// against labels from a scripted policy.
#[derive(Debug, Clone)]
pub struct SupervisedModel {
    network: Network,
}

impl SupervisedModel {
    pub fn new(config: &SupervisedConfig, rng: &mut StdRng) -> Self {
        let network = Network::with_random_weights(
            config.input_size,
            config.hidden_size,
            1,
            config.learning_rate,
            OutputActivation::Sigmoid,
            Init::HeXavier,
            rng,
        );
        SupervisedModel { network }
    }

    pub fn from_network(network: Network) -> Self {
        SupervisedModel { network }
    }

    /// Stochastic selection: action 1 with the predicted probability.
    /// Returns the hidden activations and probability for the episode batch.
    pub fn select_action(
        &self,
        state: ArrayView1<f64>,
        rng: &mut StdRng,
    ) -> Result<(Array1<f64>, Array1<f64>, usize), NetworkError> {
        let (hidden, prob) = self.network.forward(state)?;
        let action = if rng.random_range(0.0..1.0) < prob[0] { 1 } else { 0 };
        Ok((hidden, prob, action))
    }

    /// Deterministic selection: action 1 when the predicted probability
    /// reaches one half.
    pub fn greedy_action(&self, state: ArrayView1<f64>) -> Result<usize, NetworkError> {
        let (_, prob) = self.network.forward(state)?;
        Ok(if prob[0] >= 0.5 { 1 } else { 0 })
    }

    /// Gradients for one labeled step using the sigmoid derivative; also
    /// returns the step's mean squared error.
    pub fn back_prop(
        &self,
        state: ArrayView1<f64>,
        hidden: ArrayView1<f64>,
        prob: ArrayView1<f64>,
        label: f64,
    ) -> (Gradients, f64) {
        let expected = Array1::from_elem(1, label);
        let delta = (&prob - &expected) * &prob * &prob.mapv(|p| 1.0 - p);
        let grads = self.network.backward(state, hidden, delta.view());
        let error = mean_squared_error(expected.view(), prob);
        (grads, error)
    }

    /// Apply pre-summed episode gradients.
    pub fn apply_gradients(&mut self, grads: &Gradients) {
        self.network.apply_gradients(grads);
    }

    pub fn network(&self) -> &Network {
        &self.network
    }
}

/// Scripted reference policy: move up when the ball sits above the paddle
/// in the normalized observation (smaller y is higher on screen).
pub fn scripted_action(state: ArrayView1<f64>) -> usize {
    if state[BALL_Y] < state[OWN_PADDLE_Y] {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2};

    fn fixed_model() -> SupervisedModel {
        let hidden_weights = arr2(&[[1.0, 0.0], [-1.0, 0.0]]);
        let output_weights = arr2(&[[1.0, -1.0, 0.0]]);
        let network = Network::from_weights(
            1,
            2,
            1,
            0.5,
            OutputActivation::Sigmoid,
            hidden_weights,
            output_weights,
        )
        .unwrap();
        SupervisedModel::from_network(network)
    }

    #[test]
    fn test_scripted_action_follows_ball() {
        // Ball above the paddle: move up.
        let above = arr1(&[0.0, -0.5, 0.0, 0.0, 0.2, 0.0]);
        assert_eq!(scripted_action(above.view()), 1);
        // Ball below the paddle: move down.
        let below = arr1(&[0.0, 0.4, 0.0, 0.0, -0.1, 0.0]);
        assert_eq!(scripted_action(below.view()), 0);
    }

    #[test]
    fn test_greedy_action_threshold() {
        let model = fixed_model();
        // Positive input: hidden = [x, 0], output = sigmoid(x) > 0.5.
        assert_eq!(model.greedy_action(arr1(&[2.0]).view()).unwrap(), 1);
        // Zero input: sigmoid(0) = 0.5, still action 1 at the boundary.
        assert_eq!(model.greedy_action(arr1(&[0.0]).view()).unwrap(), 1);
        // Negative input: only the second hidden unit fires, which drives
        // the output below one half.
        assert_eq!(model.greedy_action(arr1(&[-2.0]).view()).unwrap(), 0);
    }

    #[test]
    fn test_back_prop_error_is_mse() {
        let model = fixed_model();
        let state = arr1(&[2.0]);
        let (hidden, prob) = model.network.forward(state.view()).unwrap();
        let (_, error) = model.back_prop(state.view(), hidden.view(), prob.view(), 1.0);
        let expected = (1.0 - prob[0]) * (1.0 - prob[0]);
        assert!((error - expected).abs() < 1e-12);
    }

    #[test]
    fn test_training_moves_probability_toward_label() {
        let mut model = fixed_model();
        let state = arr1(&[2.0]);
        let (_, before) = model.network.forward(state.view()).unwrap();

        for _ in 0..20 {
            let (hidden, prob) = model.network.forward(state.view()).unwrap();
            let (grads, _) = model.back_prop(state.view(), hidden.view(), prob.view(), 0.0);
            model.apply_gradients(&grads);
        }

        let (_, after) = model.network.forward(state.view()).unwrap();
        assert!(after[0] < before[0], "{} !< {}", after[0], before[0]);
    }
}
