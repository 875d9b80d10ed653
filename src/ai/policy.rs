use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::Rng;

use crate::ai::network::{Gradients, Init, Network, OutputActivation};
use crate::config::ReinforceConfig;
use crate::error::{NetworkError, TrainingError};

/// REINFORCE policy model: softmax categorical head over the shared
/// two-layer core. Actions are sampled from the output distribution, and
/// gradients are weighted by standardized discounted rewards.
#[derive(Debug, Clone)]
pub struct PolicyModel {
    network: Network,
    discount_rate: f64,
}

impl PolicyModel {
    pub fn new(config: &ReinforceConfig, rng: &mut StdRng) -> Self {
        let network = Network::with_random_weights(
            config.input_size,
            config.hidden_size,
            config.action_count,
            config.learning_rate,
            OutputActivation::Softmax,
            Init::Small,
            rng,
        );
        PolicyModel {
            network,
            discount_rate: config.discount_rate,
        }
    }

    pub fn from_network(network: Network, discount_rate: f64) -> Self {
        PolicyModel {
            network,
            discount_rate,
        }
    }

    /// Forward pass plus a categorical draw from the action distribution.
    /// Returns the hidden activations and distribution so the caller can
    /// store them for the deferred batched gradient pass.
    pub fn select_action(
        &self,
        state: ArrayView1<f64>,
        rng: &mut StdRng,
    ) -> Result<(Array1<f64>, Array1<f64>, usize), NetworkError> {
        let (hidden, probs) = self.network.forward(state)?;
        let action = sample_categorical(probs.view(), rng);
        Ok((hidden, probs, action))
    }

    /// Most probable action, ties broken by preferring the lower index.
    pub fn greedy_action(&self, state: ArrayView1<f64>) -> Result<usize, NetworkError> {
        let (_, probs) = self.network.forward(state)?;
        let mut best = 0;
        for (i, &p) in probs.iter().enumerate().skip(1) {
            if p > probs[best] {
                best = i;
            }
        }
        Ok(best)
    }

    /// Discounted reward-to-go for an episode with a single terminal reward:
    /// step `s` of `T` receives `reward * discount^(T - 1 - s)`.
    pub fn discounted_rewards(&self, final_reward: f64, episode_len: usize) -> Vec<f64> {
        (0..episode_len)
            .map(|s| final_reward * self.discount_rate.powi((episode_len - 1 - s) as i32))
            .collect()
    }

    /// Policy gradients for one step: output delta
    /// `(probs - action_one_hot) * advantage` combines the softmax
    /// cross-entropy derivative with the policy-gradient weighting.
    pub fn back_prop(
        &self,
        state: ArrayView1<f64>,
        hidden: ArrayView1<f64>,
        probs: ArrayView1<f64>,
        action_one_hot: ArrayView1<f64>,
        advantage: f64,
    ) -> Gradients {
        let delta = (&probs - &action_one_hot) * advantage;
        self.network.backward(state, hidden, delta.view())
    }

    /// One batched gradient pass over a drained trajectory batch. Rows of
    /// the matrix arguments are steps; gradients are summed over the whole
    /// batch and applied once.
    pub fn train_batch(
        &mut self,
        states: ArrayView2<f64>,
        hiddens: ArrayView2<f64>,
        outputs: ArrayView2<f64>,
        actions: ArrayView2<f64>,
        advantages: ArrayView1<f64>,
    ) -> Result<(), TrainingError> {
        let deltas =
            (&outputs - &actions) * &advantages.insert_axis(Axis(1));
        let grads = self.network.batch_backward(states, hiddens, deltas.view());
        self.network.apply_gradients(&grads);
        Ok(())
    }

    pub fn discount_rate(&self) -> f64 {
        self.discount_rate
    }

    pub fn network(&self) -> &Network {
        &self.network
    }
}

/// Standardize a reward batch to zero mean and unit standard deviation in
/// place. A zero-variance batch cannot be standardized and fails fast.
pub fn standardize_rewards(rewards: &mut Array1<f64>) -> Result<(), TrainingError> {
    let mean = rewards.mean().unwrap_or(0.0);
    rewards.mapv_inplace(|r| r - mean);
    let std = (rewards.dot(rewards) / rewards.len() as f64).sqrt();
    if std == 0.0 {
        return Err(TrainingError::DegenerateRewardBatch);
    }
    rewards.mapv_inplace(|r| r / std);
    Ok(())
}

/// Draw an index from a categorical distribution by cumulative scan.
fn sample_categorical(probs: ArrayView1<f64>, rng: &mut StdRng) -> usize {
    let r: f64 = rng.random_range(0.0..1.0);
    let mut cumulative = 0.0;
    for (i, &p) in probs.iter().enumerate() {
        cumulative += p;
        if r < cumulative {
            return i;
        }
    }
    // Fallback to the last non-zero probability action.
    probs.iter().rposition(|&p| p > 0.0).unwrap_or(0)
}
