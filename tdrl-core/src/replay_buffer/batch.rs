//! Batches of transitions.
use crate::TransitionBatch;
use anyhow::Result;

/// Column storage of observations or actions.
///
/// A replay buffer holds one object of this trait per column, with the capacity
/// of the buffer, and writes pushed data at a given index. Sampling builds a new
/// object holding the rows at the given indices.
///
/// # Examples
///
/// ```ignore
/// struct VecBatch(Vec<f32>);
///
/// impl BatchBase for VecBatch {
///     fn new(capacity: usize) -> Self {
///         Self(vec![0.0; capacity])
///     }
///
///     fn push(&mut self, ix: usize, data: Self) -> Result<()> {
///         let capacity = self.0.len();
///         for (j, v) in data.0.into_iter().enumerate() {
///             self.0[(ix + j) % capacity] = v;
///         }
///         Ok(())
///     }
///
///     fn sample(&self, ixs: &[usize]) -> Result<Self> {
///         Ok(Self(ixs.iter().map(|&ix| self.0[ix]).collect()))
///     }
/// }
/// ```
pub trait BatchBase: Sized {
    /// Creates a new batch with the specified capacity.
    fn new(capacity: usize) -> Self;

    /// Writes the rows of `data` starting at index `ix`.
    ///
    /// Rows exceeding the capacity wrap around to the head.
    fn push(&mut self, ix: usize, data: Self) -> Result<()>;

    /// Retrieves the rows at the specified indices.
    fn sample(&self, ixs: &[usize]) -> Result<Self>;
}

/// A batch of transitions.
///
/// A single transition pushed into a replay buffer is a batch of length one.
pub struct GenericTransitionBatch<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    /// Observations.
    pub obs: O,

    /// Actions.
    pub act: A,

    /// Next observations.
    pub next_obs: O,

    /// Rewards.
    pub reward: Vec<f32>,

    /// Episode termination flags.
    pub is_terminated: Vec<i8>,

    /// Episode truncation flags.
    pub is_truncated: Vec<i8>,

    /// Indices of sampled transitions.
    pub ix_sample: Option<Vec<usize>>,
}

impl<O, A> TransitionBatch for GenericTransitionBatch<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    type ObsBatch = O;
    type ActBatch = A;

    fn unpack(
        self,
    ) -> (
        Self::ObsBatch,
        Self::ActBatch,
        Self::ObsBatch,
        Vec<f32>,
        Vec<i8>,
        Vec<i8>,
        Option<Vec<usize>>,
    ) {
        (
            self.obs,
            self.act,
            self.next_obs,
            self.reward,
            self.is_terminated,
            self.is_truncated,
            self.ix_sample,
        )
    }

    fn len(&self) -> usize {
        self.reward.len()
    }

    fn obs(&self) -> &Self::ObsBatch {
        &self.obs
    }

    fn act(&self) -> &Self::ActBatch {
        &self.act
    }
}

impl<O, A> GenericTransitionBatch<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    /// Creates a new batch with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            obs: O::new(capacity),
            act: A::new(capacity),
            next_obs: O::new(capacity),
            reward: Vec::with_capacity(capacity),
            is_terminated: Vec::with_capacity(capacity),
            is_truncated: Vec::with_capacity(capacity),
            ix_sample: None,
        }
    }
}
