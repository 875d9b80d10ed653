use ndarray::{Array1, ArrayView1};
use rand::rngs::StdRng;
use rand::Rng;

use crate::ai::network::{mean_squared_error, Gradients, Init, Network, OutputActivation};
use crate::config::DqnConfig;
use crate::error::NetworkError;

/// A single state transition produced by one environment decision.
/// Immutable once stored; `next_state` is `None` on terminal steps.
#[derive(Debug, Clone)]
pub struct Transition {
    pub state: Array1<f64>,
    pub action: usize,
    pub reward: f64,
    pub next_state: Option<Array1<f64>>,
}

/// Frozen copy of a value network used to compute bootstrap targets.
/// Captured by wholesale replacement; mutating the online network never
/// touches an already-captured target.
#[derive(Debug, Clone)]
pub struct TargetNetwork {
    network: Network,
}

impl TargetNetwork {
    pub fn capture(online: &Network) -> Self {
        TargetNetwork {
            network: online.clone(),
        }
    }

    /// Replace the frozen weights with the online network's current weights.
    pub fn refresh(&mut self, online: &Network) {
        self.network = online.clone();
    }

    /// Highest action value for a state under the frozen weights.
    pub fn max_value(&self, state: ArrayView1<f64>) -> Result<f64, NetworkError> {
        let (_, values) = self.network.forward(state)?;
        Ok(values.fold(f64::NEG_INFINITY, |m, &v| m.max(v)))
    }

    pub fn network(&self) -> &Network {
        &self.network
    }
}

/// Q-learning model: linear per-action value heads over the shared
/// two-layer core, with epsilon-greedy action selection.
#[derive(Debug, Clone)]
pub struct ValueModel {
    network: Network,
    discount_rate: f64,
    explore_factor: f64,
}

impl ValueModel {
    pub fn new(config: &DqnConfig, rng: &mut StdRng) -> Self {
        let network = Network::with_random_weights(
            config.input_size,
            config.hidden_size,
            config.action_count,
            config.learning_rate,
            OutputActivation::Linear,
            Init::Small,
            rng,
        );
        ValueModel {
            network,
            discount_rate: config.discount_rate,
            explore_factor: config.explore_start,
        }
    }

    pub fn from_network(network: Network, discount_rate: f64, explore_factor: f64) -> Self {
        ValueModel {
            network,
            discount_rate,
            explore_factor,
        }
    }

    /// Epsilon-greedy selection: uniform random with probability
    /// `explore_factor`, otherwise greedy.
    pub fn select_action(
        &self,
        state: ArrayView1<f64>,
        rng: &mut StdRng,
    ) -> Result<usize, NetworkError> {
        if rng.random_range(0.0..1.0) < self.explore_factor {
            return Ok(rng.random_range(0..self.network.output_size()));
        }
        self.greedy_action(state)
    }

    /// Argmax over the predicted action values, ties broken by preferring
    /// the lower action index.
    pub fn greedy_action(&self, state: ArrayView1<f64>) -> Result<usize, NetworkError> {
        let (_, values) = self.network.forward(state)?;
        let mut best = 0;
        for (i, &v) in values.iter().enumerate().skip(1) {
            if v > values[best] {
                best = i;
            }
        }
        Ok(best)
    }

    /// Bootstrap target for one transition: the raw reward on terminal
    /// steps, otherwise reward plus the discounted best value of the next
    /// state under the frozen target network.
    pub fn bootstrap_target(
        &self,
        transition: &Transition,
        target: &TargetNetwork,
    ) -> Result<f64, NetworkError> {
        let mut value = transition.reward;
        if let Some(next_state) = &transition.next_state {
            value += self.discount_rate * target.max_value(next_state.view())?;
        }
        Ok(value)
    }

    /// Gradients for one transition: predict, overwrite the taken action's
    /// entry with the bootstrap target, back-propagate the linear delta.
    /// Untouched entries have zero delta, so non-taken actions receive zero
    /// gradient by construction. Also returns the mean squared error.
    pub fn transition_gradients(
        &self,
        transition: &Transition,
        target: &TargetNetwork,
    ) -> Result<(Gradients, f64), NetworkError> {
        let (hidden, predicted) = self.network.forward(transition.state.view())?;

        let mut expected = predicted.clone();
        expected[transition.action] = self.bootstrap_target(transition, target)?;

        let delta = &predicted - &expected;
        let grads = self
            .network
            .backward(transition.state.view(), hidden.view(), delta.view());
        let error = mean_squared_error(expected.view(), predicted.view());
        Ok((grads, error))
    }

    /// One training step over a sampled mini-batch: per-transition gradients
    /// summed across the batch and applied once. Returns the mean error.
    pub fn train_batch(
        &mut self,
        batch: &[&Transition],
        target: &TargetNetwork,
    ) -> Result<f64, NetworkError> {
        let mut summed = Gradients::zeros(
            self.network.input_size(),
            self.network.hidden_size(),
            self.network.output_size(),
        );
        let mut total_error = 0.0;
        for transition in batch {
            let (grads, error) = self.transition_gradients(transition, target)?;
            summed.accumulate(&grads);
            total_error += error;
        }
        self.network.apply_gradients(&summed);
        Ok(total_error / batch.len() as f64)
    }

    /// Geometric exploration decay, floored at the configured minimum.
    pub fn decay_exploration(&mut self, decay: f64, floor: f64) {
        self.explore_factor = (self.explore_factor * decay).max(floor);
    }

    pub fn explore_factor(&self) -> f64 {
        self.explore_factor
    }

    pub fn set_explore_factor(&mut self, explore_factor: f64) {
        self.explore_factor = explore_factor;
    }

    pub fn discount_rate(&self) -> f64 {
        self.discount_rate
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut Network {
        &mut self.network
    }
}
