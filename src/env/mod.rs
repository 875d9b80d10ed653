//! Environment contract consumed by the trainers. The game engine itself is
//! a collaborator behind this trait; [`pong`] provides a minimal headless
//! implementation for the shipped binary.

pub mod pong;

pub use pong::SimPong;

use ndarray::Array1;

/// One decision environment: the trainers drive it tick by tick and read
/// back observations between ticks.
pub trait Environment {
    /// Begin an episode from the initial serve.
    fn start(&mut self);

    /// Clear the episode state after a terminal tick.
    fn reset(&mut self);

    /// Advance one tick with the given action. Returns the reward: 0 while
    /// the episode continues, 1 on a win, -1 on a loss.
    fn tick(&mut self, action: usize) -> f64;

    /// Normalized low-dimensional state vector.
    fn observe_state(&self) -> Array1<f64>;

    /// Flattened visual observation with values in {0, 1}.
    fn observe_frame(&self) -> Array1<f64>;
}
