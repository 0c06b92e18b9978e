use super::{FrameStackReplayBufferConfig, FrameTransition, FromStackedFrames, StackedFrames};
use crate::{
    error::TdrlError,
    replay_buffer::{sample_without_replacement, BatchBase, GenericTransitionBatch},
    ExperienceBufferBase, ReplayBufferBase,
};
use anyhow::{bail, Result};
use log::trace;
use rand::{rngs::StdRng, SeedableRng};
use std::{marker::PhantomData, ops::Range};

/// A fixed-capacity ring buffer of frames.
///
/// Slots are addressed by a logical index, `0` being the oldest held slot.
/// A logical index `i` can be sampled if `k <= i < len - max(k - 1, 1)`, where
/// `k` is the number of stacked frames, so that both the observation and the
/// next observation are made of frames currently held in the buffer.
///
/// When `mask_episode_boundary` is enabled, a slot following a slot with a done
/// flag starts a new episode, and frames older than it are replaced by its frame
/// in a reconstructed stack. This is the same as what environments do for the
/// first observation of an episode.
pub struct FrameStackReplayBuffer<O, A>
where
    O: BatchBase + FromStackedFrames,
    A: BatchBase,
{
    capacity: usize,

    /// Physical index at which the next frame is written.
    i: usize,

    size: usize,
    stack: usize,
    frame_shape: Vec<usize>,
    frame_len: usize,
    mask_episode_boundary: bool,
    frames: Vec<u8>,
    act: A,
    reward: Vec<f32>,
    is_terminated: Vec<i8>,
    is_truncated: Vec<i8>,
    rng: StdRng,
    phantom: PhantomData<O>,
}

impl<O, A> FrameStackReplayBuffer<O, A>
where
    O: BatchBase + FromStackedFrames,
    A: BatchBase,
{
    /// Returns the capacity of the buffer.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the range of logical indices that can be sampled.
    pub fn valid_range(&self) -> Range<usize> {
        let start = self.stack;
        let end = self.size.saturating_sub((self.stack - 1).max(1));
        start..end.max(start)
    }

    /// Returns the number of transitions that can be sampled.
    pub fn num_valid(&self) -> usize {
        self.valid_range().len()
    }

    #[inline]
    fn physical(&self, l: usize) -> usize {
        if self.size < self.capacity {
            l
        } else {
            (self.i + l) % self.capacity
        }
    }

    #[inline]
    fn is_done_at(&self, l: usize) -> bool {
        let p = self.physical(l);
        self.is_terminated[p] == 1 || self.is_truncated[p] == 1
    }

    /// Logical indices of the frames in the stack ending at `newest`, oldest first.
    fn window(&self, newest: usize) -> Vec<usize> {
        let oldest = newest + 1 - self.stack;
        let mut first = oldest;

        if self.mask_episode_boundary {
            for j in (oldest + 1..=newest).rev() {
                if self.is_done_at(j - 1) {
                    first = j;
                    break;
                }
            }
        }

        (oldest..=newest).map(|l| l.max(first)).collect()
    }

    fn stacked_frames(&self, newest: &[usize]) -> StackedFrames {
        let mut data = Vec::with_capacity(newest.len() * self.stack * self.frame_len);
        for &l in newest.iter() {
            for w in self.window(l) {
                let p = self.physical(w);
                data.extend_from_slice(&self.frames[p * self.frame_len..(p + 1) * self.frame_len]);
            }
        }

        StackedFrames {
            data,
            batch_size: newest.len(),
            stack: self.stack,
            frame_shape: self.frame_shape.clone(),
        }
    }
}

impl<O, A> ExperienceBufferBase for FrameStackReplayBuffer<O, A>
where
    O: BatchBase + FromStackedFrames,
    A: BatchBase,
{
    type Item = FrameTransition<A>;

    fn len(&self) -> usize {
        self.size
    }

    fn push(&mut self, tr: Self::Item) -> Result<()> {
        if self.capacity == 0 {
            bail!("Cannot push into a replay buffer of capacity 0");
        }
        if tr.frame.len() != self.frame_len {
            bail!(
                "Frame of {} pixels does not match frame_shape {:?}",
                tr.frame.len(),
                self.frame_shape
            );
        }

        // The action goes first, a failing push leaves the slot untouched.
        let p = self.i;
        self.act.push(p, tr.act)?;
        self.frames[p * self.frame_len..(p + 1) * self.frame_len].copy_from_slice(&tr.frame);
        self.reward[p] = tr.reward;
        self.is_terminated[p] = tr.is_terminated;
        self.is_truncated[p] = tr.is_truncated;

        self.i = (p + 1) % self.capacity;
        self.size = (self.size + 1).min(self.capacity);

        Ok(())
    }
}

impl<O, A> ReplayBufferBase for FrameStackReplayBuffer<O, A>
where
    O: BatchBase + FromStackedFrames,
    A: BatchBase,
{
    type Config = FrameStackReplayBufferConfig;
    type Batch = GenericTransitionBatch<O, A>;

    fn build(config: &Self::Config) -> Self {
        let capacity = config.capacity;
        let frame_len = config.frame_shape.iter().product();

        Self {
            capacity,
            i: 0,
            size: 0,
            stack: config.stack.max(1),
            frame_shape: config.frame_shape.clone(),
            frame_len,
            mask_episode_boundary: config.mask_episode_boundary,
            frames: vec![0; capacity * frame_len],
            act: A::new(capacity),
            reward: vec![0.; capacity],
            is_terminated: vec![0; capacity],
            is_truncated: vec![0; capacity],
            rng: StdRng::seed_from_u64(config.seed),
            phantom: PhantomData,
        }
    }

    fn batch(&mut self, size: usize) -> Result<Self::Batch> {
        let range = self.valid_range();
        if range.len() < size {
            return Err(TdrlError::InsufficientData {
                requested: size,
                available: range.len(),
            }
            .into());
        }

        let ls: Vec<usize> = sample_without_replacement(&mut self.rng, range.len(), size)
            .into_iter()
            .map(|j| range.start + j)
            .collect();
        let next_ls: Vec<usize> = ls.iter().map(|l| l + 1).collect();
        let ps: Vec<usize> = ls.iter().map(|&l| self.physical(l)).collect();
        trace!("Sampled logical indices {:?}", ls);

        Ok(GenericTransitionBatch {
            obs: O::from_stacked_frames(self.stacked_frames(&ls))?,
            act: self.act.sample(&ps)?,
            next_obs: O::from_stacked_frames(self.stacked_frames(&next_ls))?,
            reward: ps.iter().map(|&p| self.reward[p]).collect(),
            is_terminated: ps.iter().map(|&p| self.is_terminated[p]).collect(),
            is_truncated: ps.iter().map(|&p| self.is_truncated[p]).collect(),
            ix_sample: Some(ps),
        })
    }
}
