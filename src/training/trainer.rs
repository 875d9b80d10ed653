use ndarray::Array1;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use crate::ai::{
    scripted_action, standardize_rewards, Gradients, OutputActivation, PolicyModel,
    SupervisedModel, TargetNetwork, Transition, ValueModel,
};
use crate::checkpoint::{CheckpointManager, NetworkCheckpoint};
use crate::config::{DqnConfig, ReinforceConfig, SupervisedConfig};
use crate::env::Environment;
use crate::error::{CheckpointError, TrainingError};
use crate::training::array_vec::ArrayVec;
use crate::training::metrics::{EpisodeResult, TrainingMetrics};
use crate::training::replay_buffer::ReplayBuffer;

/// Shared training-loop configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub num_episodes: usize,
    /// Advance the environment two ticks per decision, reusing the action.
    pub frame_skip: bool,
    pub log_interval: usize,
    pub checkpoint_interval: usize,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        TrainerConfig {
            num_episodes: 100_000,
            frame_skip: true,
            log_interval: 1000,
            checkpoint_interval: 2000,
        }
    }
}

/// Advance one decision: one tick, or two with frame skipping. The episode
/// ends as soon as either tick yields a nonzero reward.
fn advance<E: Environment>(env: &mut E, action: usize, frame_skip: bool) -> f64 {
    let mut reward = env.tick(action);
    if reward == 0.0 && frame_skip {
        reward = env.tick(action);
    }
    reward
}

/// Q-learning orchestrator: drives the environment, fills the replay
/// buffer, trains the online network against the frozen target, and decays
/// exploration on the sync cadence.
pub struct DqnTrainer<E: Environment> {
    env: E,
    model: ValueModel,
    target: TargetNetwork,
    replay: ReplayBuffer,
    config: DqnConfig,
    trainer_config: TrainerConfig,
    metrics: TrainingMetrics,
    episode_count: usize,
    state: Array1<f64>,
    rng: StdRng,
}

impl<E: Environment> DqnTrainer<E> {
    pub fn new(env: E, config: DqnConfig, trainer_config: TrainerConfig) -> Self {
        Self::with_rng(env, config, trainer_config, StdRng::from_os_rng())
    }

    pub fn with_rng(
        env: E,
        config: DqnConfig,
        trainer_config: TrainerConfig,
        mut rng: StdRng,
    ) -> Self {
        let model = ValueModel::new(&config, &mut rng);
        let target = TargetNetwork::capture(model.network());
        let replay = ReplayBuffer::new(config.replay_capacity);
        DqnTrainer {
            env,
            model,
            target,
            replay,
            config,
            trainer_config,
            metrics: TrainingMetrics::new(),
            episode_count: 0,
            state: Array1::zeros(0),
            rng,
        }
    }

    /// Replace the model with checkpointed weights and resume counting from
    /// the checkpoint's episode.
    pub fn restore(
        &mut self,
        checkpoint: &NetworkCheckpoint,
        episode: usize,
    ) -> Result<(), CheckpointError> {
        let network = checkpoint.to_network(OutputActivation::Linear)?;
        let discount_rate = checkpoint
            .discount_rate
            .ok_or(CheckpointError::MissingField("discount_rate"))?;
        let explore_factor = checkpoint
            .explore_factor
            .ok_or(CheckpointError::MissingField("explore_factor"))?;
        self.model = ValueModel::from_network(network, discount_rate, explore_factor);
        self.target = TargetNetwork::capture(self.model.network());
        self.episode_count = episode;
        Ok(())
    }

    /// Start a fresh episode and observe its initial state. Must precede
    /// the first `step` of every episode.
    pub fn begin_episode(&mut self) {
        self.env.start();
        self.state = self.env.observe_state();
    }

    /// Advance exactly one decision: select an action, tick the
    /// environment, store the transition, and train once the buffer is
    /// ready. Returns the decision's reward.
    pub fn step(&mut self) -> Result<f64, TrainingError> {
        let action = self.model.select_action(self.state.view(), &mut self.rng)?;
        let reward = advance(&mut self.env, action, self.trainer_config.frame_skip);
        let next_state = self.env.observe_state();

        let transition = Transition {
            state: std::mem::replace(&mut self.state, next_state.clone()),
            action,
            reward,
            next_state: if reward == 0.0 { Some(next_state) } else { None },
        };
        self.replay.push(transition);

        let threshold = self.config.min_replay_size.max(self.config.batch_size);
        if self.replay.len() >= threshold {
            let batch = self.replay.sample(self.config.batch_size, &mut self.rng)?;
            let error = self.model.train_batch(&batch, &self.target)?;
            self.metrics.record_error(error);
        }
        Ok(reward)
    }

    /// Play one episode to its terminal reward. Exploration decay and
    /// target refresh happen here, on the episode cadence, independent of
    /// the per-step gradient cadence.
    pub fn run_episode(&mut self) -> Result<EpisodeResult, TrainingError> {
        self.begin_episode();
        let mut steps = 0;
        let reward = loop {
            let reward = self.step()?;
            steps += 1;
            if reward != 0.0 {
                break reward;
            }
        };

        self.episode_count += 1;
        let result = EpisodeResult {
            won: reward > 0.0,
            steps,
        };
        self.metrics.record_episode(result);

        if self.episode_count % self.config.sync_interval == 0 {
            self.model
                .decay_exploration(self.config.explore_decay, self.config.min_explore);
            self.target.refresh(self.model.network());
        }

        self.env.reset();
        Ok(result)
    }

    /// Run the configured number of episodes with periodic logging and
    /// synchronous checkpointing.
    pub fn train(&mut self, manager: &CheckpointManager) -> Result<(), TrainingError> {
        let end_episode = self.episode_count + self.trainer_config.num_episodes;
        info!(
            episodes = self.trainer_config.num_episodes,
            start = self.episode_count + 1,
            "starting Q-learning training"
        );

        while self.episode_count < end_episode {
            self.run_episode()?;

            if self.episode_count % self.trainer_config.log_interval == 0 {
                let (wins, losses) = self.metrics.tally(self.trainer_config.log_interval);
                info!(
                    episode = self.episode_count,
                    wins,
                    losses,
                    explore_factor = self.model.explore_factor(),
                    mean_error = self.metrics.average_error(self.trainer_config.log_interval),
                    "finished episode interval"
                );
            }

            if self.episode_count % self.trainer_config.checkpoint_interval == 0 {
                let path = manager.save(&self.to_checkpoint(), self.episode_count)?;
                info!(episode = self.episode_count, path = %path.display(), "checkpoint saved");
            }
        }
        Ok(())
    }

    /// Play greedy episodes without storing or training.
    pub fn evaluate(&mut self, episodes: usize) -> Result<(usize, usize), TrainingError> {
        let mut wins = 0;
        let mut losses = 0;
        for _ in 0..episodes {
            self.env.start();
            let mut reward = 0.0;
            while reward == 0.0 {
                let state = self.env.observe_state();
                let action = self.model.greedy_action(state.view())?;
                reward = advance(&mut self.env, action, self.trainer_config.frame_skip);
            }
            if reward > 0.0 {
                wins += 1;
            } else {
                losses += 1;
            }
            self.env.reset();
        }
        Ok((wins, losses))
    }

    pub fn to_checkpoint(&self) -> NetworkCheckpoint {
        NetworkCheckpoint::from_network(
            self.model.network(),
            Some(self.model.discount_rate()),
            Some(self.model.explore_factor()),
        )
    }

    pub fn episode_count(&self) -> usize {
        self.episode_count
    }

    pub fn model(&self) -> &ValueModel {
        &self.model
    }

    pub fn replay(&self) -> &ReplayBuffer {
        &self.replay
    }

    pub fn metrics(&self) -> &TrainingMetrics {
        &self.metrics
    }
}

/// REINFORCE orchestrator: collects whole trajectories across a batch of
/// episodes, then drains them into one standardized, batched gradient pass.
pub struct ReinforceTrainer<E: Environment> {
    env: E,
    model: PolicyModel,
    states: ArrayVec,
    hiddens: ArrayVec,
    outputs: ArrayVec,
    actions: ArrayVec,
    rewards: Vec<f64>,
    config: ReinforceConfig,
    trainer_config: TrainerConfig,
    metrics: TrainingMetrics,
    episode_count: usize,
    rng: StdRng,
}

impl<E: Environment> ReinforceTrainer<E> {
    pub fn new(env: E, config: ReinforceConfig, trainer_config: TrainerConfig) -> Self {
        Self::with_rng(env, config, trainer_config, StdRng::from_os_rng())
    }

    pub fn with_rng(
        env: E,
        config: ReinforceConfig,
        trainer_config: TrainerConfig,
        mut rng: StdRng,
    ) -> Self {
        let model = PolicyModel::new(&config, &mut rng);
        let states = ArrayVec::new(
            config.input_size,
            config.initial_capacity,
            config.extend_capacity,
        );
        let hiddens = ArrayVec::new(
            config.hidden_size,
            config.initial_capacity,
            config.extend_capacity,
        );
        let outputs = ArrayVec::new(
            config.action_count,
            config.initial_capacity,
            config.extend_capacity,
        );
        let actions = ArrayVec::new(
            config.action_count,
            config.initial_capacity,
            config.extend_capacity,
        );
        ReinforceTrainer {
            env,
            model,
            states,
            hiddens,
            outputs,
            actions,
            rewards: Vec::new(),
            config,
            trainer_config,
            metrics: TrainingMetrics::new(),
            episode_count: 0,
            rng,
        }
    }

    pub fn restore(
        &mut self,
        checkpoint: &NetworkCheckpoint,
        episode: usize,
    ) -> Result<(), CheckpointError> {
        let network = checkpoint.to_network(OutputActivation::Softmax)?;
        let discount_rate = checkpoint
            .discount_rate
            .ok_or(CheckpointError::MissingField("discount_rate"))?;
        self.model = PolicyModel::from_network(network, discount_rate);
        self.episode_count = episode;
        Ok(())
    }

    /// Play one episode, recording every step into the trajectory arenas.
    /// At the batch boundary the whole batch is drained into one gradient
    /// application.
    pub fn run_episode(&mut self) -> Result<EpisodeResult, TrainingError> {
        self.env.start();
        let mut steps = 0;
        let mut reward = 0.0;

        while reward == 0.0 {
            let state = self.env.observe_state();
            let (hidden, probs, action) = self.model.select_action(state.view(), &mut self.rng)?;

            self.states.push(state.view());
            self.hiddens.push(hidden.view());
            self.outputs.push(probs.view());
            let mut one_hot = Array1::zeros(self.config.action_count);
            one_hot[action] = 1.0;
            self.actions.push(one_hot.view());

            reward = advance(&mut self.env, action, self.trainer_config.frame_skip);
            steps += 1;
        }

        self.rewards
            .extend(self.model.discounted_rewards(reward, steps));

        self.episode_count += 1;
        let result = EpisodeResult {
            won: reward > 0.0,
            steps,
        };
        self.metrics.record_episode(result);

        if self.episode_count % self.config.batch_episodes == 0 {
            self.apply_batch()?;
        }

        self.env.reset();
        Ok(result)
    }

    /// Standardize the accumulated rewards and apply one summed gradient
    /// pass over every stored step, then clear all trajectory storage.
    fn apply_batch(&mut self) -> Result<(), TrainingError> {
        let mut advantages = Array1::from(std::mem::take(&mut self.rewards));
        standardize_rewards(&mut advantages)?;

        self.model.train_batch(
            self.states.as_view(),
            self.hiddens.as_view(),
            self.outputs.as_view(),
            self.actions.as_view(),
            advantages.view(),
        )?;

        self.states.clear();
        self.hiddens.clear();
        self.outputs.clear();
        self.actions.clear();
        Ok(())
    }

    pub fn train(&mut self, manager: &CheckpointManager) -> Result<(), TrainingError> {
        let end_episode = self.episode_count + self.trainer_config.num_episodes;
        info!(
            episodes = self.trainer_config.num_episodes,
            start = self.episode_count + 1,
            "starting REINFORCE training"
        );

        while self.episode_count < end_episode {
            self.run_episode()?;

            if self.episode_count % self.trainer_config.log_interval == 0 {
                let (wins, losses) = self.metrics.tally(self.trainer_config.log_interval);
                info!(
                    episode = self.episode_count,
                    wins,
                    losses,
                    mean_episode_length =
                        self.metrics.average_episode_length(self.trainer_config.log_interval),
                    "finished episode interval"
                );
            }

            if self.episode_count % self.trainer_config.checkpoint_interval == 0 {
                let path = manager.save(&self.to_checkpoint(), self.episode_count)?;
                info!(episode = self.episode_count, path = %path.display(), "checkpoint saved");
            }
        }
        Ok(())
    }

    pub fn evaluate(&mut self, episodes: usize) -> Result<(usize, usize), TrainingError> {
        let mut wins = 0;
        let mut losses = 0;
        for _ in 0..episodes {
            self.env.start();
            let mut reward = 0.0;
            while reward == 0.0 {
                let state = self.env.observe_state();
                let action = self.model.greedy_action(state.view())?;
                reward = advance(&mut self.env, action, self.trainer_config.frame_skip);
            }
            if reward > 0.0 {
                wins += 1;
            } else {
                losses += 1;
            }
            self.env.reset();
        }
        Ok((wins, losses))
    }

    pub fn to_checkpoint(&self) -> NetworkCheckpoint {
        NetworkCheckpoint::from_network(
            self.model.network(),
            Some(self.model.discount_rate()),
            None,
        )
    }

    pub fn episode_count(&self) -> usize {
        self.episode_count
    }

    pub fn metrics(&self) -> &TrainingMetrics {
        &self.metrics
    }

    pub fn pending_steps(&self) -> usize {
        self.states.len()
    }
}

/// Supervised imitation orchestrator: plays stochastically, labels every
/// step with the scripted policy, and applies one summed gradient pass per
/// episode.
pub struct SupervisedTrainer<E: Environment> {
    env: E,
    model: SupervisedModel,
    trainer_config: TrainerConfig,
    metrics: TrainingMetrics,
    episode_count: usize,
    rng: StdRng,
}

struct LabeledStep {
    state: Array1<f64>,
    hidden: Array1<f64>,
    prob: Array1<f64>,
    label: f64,
}

impl<E: Environment> SupervisedTrainer<E> {
    pub fn new(env: E, config: SupervisedConfig, trainer_config: TrainerConfig) -> Self {
        Self::with_rng(env, config, trainer_config, StdRng::from_os_rng())
    }

    pub fn with_rng(
        env: E,
        config: SupervisedConfig,
        trainer_config: TrainerConfig,
        mut rng: StdRng,
    ) -> Self {
        let model = SupervisedModel::new(&config, &mut rng);
        SupervisedTrainer {
            env,
            model,
            trainer_config,
            metrics: TrainingMetrics::new(),
            episode_count: 0,
            rng,
        }
    }

    pub fn restore(
        &mut self,
        checkpoint: &NetworkCheckpoint,
        episode: usize,
    ) -> Result<(), CheckpointError> {
        let network = checkpoint.to_network(OutputActivation::Sigmoid)?;
        self.model = SupervisedModel::from_network(network);
        self.episode_count = episode;
        Ok(())
    }

    /// Play one episode and back-propagate the scripted labels through the
    /// model, applying the summed gradients once at the end.
    pub fn run_episode(&mut self) -> Result<EpisodeResult, TrainingError> {
        self.env.start();
        let mut episode: Vec<LabeledStep> = Vec::new();
        let mut reward = 0.0;

        while reward == 0.0 {
            let state = self.env.observe_state();
            let (hidden, prob, action) = self.model.select_action(state.view(), &mut self.rng)?;
            let label = scripted_action(state.view()) as f64;
            episode.push(LabeledStep {
                state,
                hidden,
                prob,
                label,
            });
            reward = advance(&mut self.env, action, self.trainer_config.frame_skip);
        }

        let network = self.model.network();
        let mut summed = Gradients::zeros(
            network.input_size(),
            network.hidden_size(),
            network.output_size(),
        );
        let mut total_error = 0.0;
        for step in &episode {
            let (grads, error) = self.model.back_prop(
                step.state.view(),
                step.hidden.view(),
                step.prob.view(),
                step.label,
            );
            summed.accumulate(&grads);
            total_error += error;
        }
        self.model.apply_gradients(&summed);
        self.metrics.record_error(total_error / episode.len() as f64);

        self.episode_count += 1;
        let result = EpisodeResult {
            won: reward > 0.0,
            steps: episode.len(),
        };
        self.metrics.record_episode(result);

        self.env.reset();
        Ok(result)
    }

    pub fn train(&mut self, manager: &CheckpointManager) -> Result<(), TrainingError> {
        let end_episode = self.episode_count + self.trainer_config.num_episodes;
        info!(
            episodes = self.trainer_config.num_episodes,
            start = self.episode_count + 1,
            "starting supervised training"
        );

        while self.episode_count < end_episode {
            self.run_episode()?;

            if self.episode_count % self.trainer_config.log_interval == 0 {
                let (wins, losses) = self.metrics.tally(self.trainer_config.log_interval);
                info!(
                    episode = self.episode_count,
                    wins,
                    losses,
                    mean_error = self.metrics.average_error(self.trainer_config.log_interval),
                    "finished episode interval"
                );
            }

            if self.episode_count % self.trainer_config.checkpoint_interval == 0 {
                let path = manager.save(&self.to_checkpoint(), self.episode_count)?;
                info!(episode = self.episode_count, path = %path.display(), "checkpoint saved");
            }
        }
        Ok(())
    }

    pub fn evaluate(&mut self, episodes: usize) -> Result<(usize, usize), TrainingError> {
        let mut wins = 0;
        let mut losses = 0;
        for _ in 0..episodes {
            self.env.start();
            let mut reward = 0.0;
            while reward == 0.0 {
                let state = self.env.observe_state();
                let action = self.model.greedy_action(state.view())?;
                reward = advance(&mut self.env, action, self.trainer_config.frame_skip);
            }
            if reward > 0.0 {
                wins += 1;
            } else {
                losses += 1;
            }
            self.env.reset();
        }
        Ok((wins, losses))
    }

    pub fn to_checkpoint(&self) -> NetworkCheckpoint {
        NetworkCheckpoint::from_network(self.model.network(), None, None)
    }

    pub fn episode_count(&self) -> usize {
        self.episode_count
    }

    pub fn metrics(&self) -> &TrainingMetrics {
        &self.metrics
    }
}
