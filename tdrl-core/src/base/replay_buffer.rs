//! Replay buffer interface.
//!
//! Storing experiences and generating batches are separated into two traits.
//! A training loop pushes items through [`ExperienceBufferBase`], an agent
//! takes batches through [`ReplayBufferBase`].
use anyhow::Result;

/// Interface for buffers that store experiences from environments.
///
/// # Examples
///
/// ```ignore
/// struct SimpleBuffer<T> {
///     items: Vec<T>,
/// }
///
/// impl<T> ExperienceBufferBase for SimpleBuffer<T> {
///     type Item = T;
///
///     fn push(&mut self, tr: T) -> Result<()> {
///         self.items.push(tr);
///         Ok(())
///     }
///
///     fn len(&self) -> usize {
///         self.items.len()
///     }
/// }
/// ```
pub trait ExperienceBufferBase {
    /// The type of items stored in the buffer.
    type Item;

    /// Pushes a new experience into the buffer.
    ///
    /// The buffer takes ownership of the item and never mutates it afterwards.
    fn push(&mut self, tr: Self::Item) -> Result<()>;

    /// Returns the current number of experiences in the buffer.
    fn len(&self) -> usize;

    /// Returns `true` if the buffer holds no experience.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Interface for replay buffers that generate batches for training.
pub trait ReplayBufferBase {
    /// Configuration parameters for the replay buffer.
    type Config: Clone;

    /// The type of batch generated for training.
    type Batch;

    /// Builds a new replay buffer from the given configuration.
    fn build(config: &Self::Config) -> Self;

    /// Constructs a batch of `size` experiences for training.
    ///
    /// Fails with [`TdrlError::InsufficientData`] if the buffer does not hold
    /// enough experiences that can be sampled.
    ///
    /// [`TdrlError::InsufficientData`]: crate::error::TdrlError::InsufficientData
    fn batch(&mut self, size: usize) -> Result<Self::Batch>;
}
