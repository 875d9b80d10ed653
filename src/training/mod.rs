pub mod array_vec;
pub mod metrics;
pub mod replay_buffer;
pub mod trainer;

pub use array_vec::ArrayVec;
pub use metrics::{EpisodeResult, TrainingMetrics};
pub use replay_buffer::ReplayBuffer;
pub use trainer::{DqnTrainer, ReinforceTrainer, SupervisedTrainer, TrainerConfig};
