use super::SimpleReplayBufferConfig;
use crate::{
    error::TdrlError,
    replay_buffer::{sample_without_replacement, BatchBase, GenericTransitionBatch},
    ExperienceBufferBase, ReplayBufferBase, TransitionBatch,
};
use anyhow::{bail, Result};
use rand::{rngs::StdRng, SeedableRng};

/// A fixed-capacity ring buffer of transitions.
///
/// When the buffer is full, a push overwrites the oldest transition.
/// [`ReplayBufferBase::batch`] draws distinct transitions uniformly at random.
///
/// # Type Parameters
///
/// * `O` - Column storage of observations
/// * `A` - Column storage of actions
///
/// # Examples
///
/// ```ignore
/// let config = SimpleReplayBufferConfig::default().capacity(10000);
/// let mut buffer = SimpleReplayBuffer::<TensorBatch, TensorBatch>::build(&config);
///
/// buffer.push(transition)?;
/// let batch = buffer.batch(32)?;
/// ```
pub struct SimpleReplayBuffer<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    capacity: usize,

    /// Index at which the next transition is written.
    i: usize,

    size: usize,
    obs: O,
    act: A,
    next_obs: O,
    reward: Vec<f32>,
    is_terminated: Vec<i8>,
    is_truncated: Vec<i8>,
    rng: StdRng,
}

impl<O, A> SimpleReplayBuffer<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    #[inline]
    fn push_column<T: Copy>(column: &mut [T], i: usize, b: &[T]) {
        let capacity = column.len();
        for (j, v) in b.iter().enumerate() {
            column[(i + j) % capacity] = *v;
        }
    }

    /// Returns the capacity of the buffer.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the physical indices of the held transitions, oldest first.
    pub fn ordered_indices(&self) -> Vec<usize> {
        if self.size < self.capacity {
            (0..self.size).collect()
        } else {
            (self.i..self.capacity).chain(0..self.i).collect()
        }
    }

    /// Returns all held transitions, oldest first.
    ///
    /// This copies the whole buffer, use with care on large buffers.
    pub fn ordered(&self) -> Result<GenericTransitionBatch<O, A>> {
        self.gather(self.ordered_indices())
    }

    /// Returns the number of terminated flags in the buffer.
    pub fn num_terminated_flags(&self) -> usize {
        self.is_terminated
            .iter()
            .map(|is_terminated| *is_terminated as usize)
            .sum()
    }

    /// Returns the sum of all rewards in the buffer.
    pub fn sum_rewards(&self) -> f32 {
        self.reward.iter().sum()
    }

    fn gather(&self, ixs: Vec<usize>) -> Result<GenericTransitionBatch<O, A>> {
        Ok(GenericTransitionBatch {
            obs: self.obs.sample(&ixs)?,
            act: self.act.sample(&ixs)?,
            next_obs: self.next_obs.sample(&ixs)?,
            reward: ixs.iter().map(|ix| self.reward[*ix]).collect(),
            is_terminated: ixs.iter().map(|ix| self.is_terminated[*ix]).collect(),
            is_truncated: ixs.iter().map(|ix| self.is_truncated[*ix]).collect(),
            ix_sample: Some(ixs),
        })
    }
}

impl<O, A> ExperienceBufferBase for SimpleReplayBuffer<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    type Item = GenericTransitionBatch<O, A>;

    fn len(&self) -> usize {
        self.size
    }

    fn push(&mut self, tr: Self::Item) -> Result<()> {
        if self.capacity == 0 {
            bail!("Cannot push into a replay buffer of capacity 0");
        }
        let len = tr.len();
        let (obs, act, next_obs, reward, is_terminated, is_truncated, _) = tr.unpack();
        self.obs.push(self.i, obs)?;
        self.act.push(self.i, act)?;
        self.next_obs.push(self.i, next_obs)?;
        Self::push_column(&mut self.reward, self.i, &reward);
        Self::push_column(&mut self.is_terminated, self.i, &is_terminated);
        Self::push_column(&mut self.is_truncated, self.i, &is_truncated);

        self.i = (self.i + len) % self.capacity;
        self.size = (self.size + len).min(self.capacity);

        Ok(())
    }
}

impl<O, A> ReplayBufferBase for SimpleReplayBuffer<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    type Config = SimpleReplayBufferConfig;
    type Batch = GenericTransitionBatch<O, A>;

    fn build(config: &Self::Config) -> Self {
        let capacity = config.capacity;

        Self {
            capacity,
            i: 0,
            size: 0,
            obs: O::new(capacity),
            act: A::new(capacity),
            next_obs: O::new(capacity),
            reward: vec![0.; capacity],
            is_terminated: vec![0; capacity],
            is_truncated: vec![0; capacity],
            rng: StdRng::seed_from_u64(config.seed),
        }
    }

    fn batch(&mut self, size: usize) -> Result<Self::Batch> {
        if self.size < size {
            return Err(TdrlError::InsufficientData {
                requested: size,
                available: self.size,
            }
            .into());
        }

        // While the buffer is not full, transitions occupy slots 0..size.
        let ixs = sample_without_replacement(&mut self.rng, self.size, size);
        self.gather(ixs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// Stores one integer per row, enough to identify a transition.
    struct IdBatch(Vec<i32>);

    impl BatchBase for IdBatch {
        fn new(capacity: usize) -> Self {
            Self(vec![-1; capacity])
        }

        fn push(&mut self, ix: usize, data: Self) -> Result<()> {
            let capacity = self.0.len();
            for (j, v) in data.0.into_iter().enumerate() {
                self.0[(ix + j) % capacity] = v;
            }
            Ok(())
        }

        fn sample(&self, ixs: &[usize]) -> Result<Self> {
            Ok(Self(ixs.iter().map(|&ix| self.0[ix]).collect()))
        }
    }

    type Buffer = SimpleReplayBuffer<IdBatch, IdBatch>;

    fn transition(id: i32) -> GenericTransitionBatch<IdBatch, IdBatch> {
        GenericTransitionBatch {
            obs: IdBatch(vec![id]),
            act: IdBatch(vec![id * 10]),
            next_obs: IdBatch(vec![id + 1]),
            reward: vec![id as f32],
            is_terminated: vec![0],
            is_truncated: vec![0],
            ix_sample: None,
        }
    }

    fn build(capacity: usize) -> Buffer {
        Buffer::build(&SimpleReplayBufferConfig::default().capacity(capacity).seed(0))
    }

    #[test]
    fn test_fifo_eviction() -> Result<()> {
        // A, B, C, D -> [B, C, D]
        let mut buffer = build(3);
        for id in 0..4 {
            buffer.push(transition(id))?;
        }
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.ordered()?.obs.0, vec![1, 2, 3]);

        let batch = buffer.batch(3)?;
        let ids: HashSet<i32> = batch.obs.0.iter().copied().collect();
        assert_eq!(ids, HashSet::from([1, 2, 3]));

        let err = match buffer.batch(4) {
            Ok(_) => panic!("Sampled more transitions than available"),
            Err(e) => e,
        };
        assert_eq!(
            err.downcast_ref::<TdrlError>(),
            Some(&TdrlError::InsufficientData {
                requested: 4,
                available: 3
            })
        );
        Ok(())
    }

    #[test]
    fn test_never_exceeds_capacity() -> Result<()> {
        let mut buffer = build(7);
        for id in 0..100 {
            buffer.push(transition(id))?;
            assert!(buffer.len() <= 7);
            let ordered = buffer.ordered()?.obs.0;
            let first = (id - 6).max(0);
            assert_eq!(ordered, (first..=id).collect::<Vec<_>>());
        }
        Ok(())
    }

    #[test]
    fn test_sample_has_no_duplicates() -> Result<()> {
        let mut buffer = build(50);
        for id in 0..80 {
            buffer.push(transition(id))?;
        }
        for _ in 0..20 {
            let batch = buffer.batch(32)?;
            let ixs = batch.ix_sample.clone().unwrap();
            let unique: HashSet<usize> = ixs.iter().copied().collect();
            assert_eq!(unique.len(), 32);

            // Columns of a sampled transition stay aligned.
            for (o, (a, r)) in batch.obs.0.iter().zip(batch.act.0.iter().zip(&batch.reward)) {
                assert_eq!(*a, o * 10);
                assert_eq!(*r, *o as f32);
                assert!(*o >= 30);
            }
        }
        Ok(())
    }

    #[test]
    fn test_sampling_does_not_modify_contents() -> Result<()> {
        let mut buffer = build(5);
        for id in 0..5 {
            buffer.push(transition(id))?;
        }
        let before = buffer.ordered()?.obs.0;
        let _ = buffer.batch(5)?;
        let _ = buffer.batch(2)?;
        assert_eq!(buffer.ordered()?.obs.0, before);
        assert_eq!(buffer.sum_rewards(), 10.0);
        Ok(())
    }

    #[test]
    fn test_empty_buffer() {
        let mut buffer = build(5);
        assert!(buffer.is_empty());
        assert!(buffer.batch(1).is_err());
    }

    #[test]
    fn test_zero_capacity() {
        let mut buffer = build(0);
        assert!(buffer.push(transition(0)).is_err());
        assert!(buffer.is_empty());
    }
}
