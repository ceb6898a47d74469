use ndarray::Array1;

/// Contract for the game environment the agent learns from.
///
/// The simulation itself lives outside this crate; training and play only
/// rely on this interface.
pub trait Environment {
    /// Length of the state vector.
    fn n_state(&self) -> usize;

    /// Number of discrete actions.
    fn n_action(&self) -> usize;

    /// Current state observation, length `n_state()`.
    fn get_state(&self) -> Array1<f32>;

    /// Advance one step with the given action index. Returns
    /// `(reward, done, score)`.
    fn play_step(&mut self, action: usize) -> (f32, bool, i32);

    /// Reset the environment for a new game.
    fn reset(&mut self);
}
