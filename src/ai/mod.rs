pub mod network;
pub mod policy;
pub mod supervised;
pub mod value;

pub use network::{mean_squared_error, Gradients, Init, Network, OutputActivation};
pub use policy::{standardize_rewards, PolicyModel};
pub use supervised::{scripted_action, SupervisedModel};
pub use value::{TargetNetwork, Transition, ValueModel};
