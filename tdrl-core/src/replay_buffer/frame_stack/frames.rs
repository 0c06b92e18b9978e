use anyhow::Result;

/// An item pushed into [`FrameStackReplayBuffer`](super::FrameStackReplayBuffer).
///
/// There is no next observation. It is the frame of the following item.
#[derive(Clone, Debug)]
pub struct FrameTransition<A> {
    /// The newest frame of the observation in which `act` was taken.
    pub frame: Vec<u8>,

    /// Action, a batch of length one.
    pub act: A,

    /// Reward.
    pub reward: f32,

    /// Flag denoting if the episode is terminated by this transition.
    pub is_terminated: i8,

    /// Flag denoting if the episode is truncated by this transition.
    pub is_truncated: i8,
}

/// Stacks of frames sampled from a replay buffer.
///
/// `data` is laid out as `[batch_size, stack, frame_shape..]` in row-major order,
/// frames in a stack are ordered from the oldest to the newest.
#[derive(Clone, Debug, PartialEq)]
pub struct StackedFrames {
    /// Pixel values.
    pub data: Vec<u8>,

    /// The number of stacks.
    pub batch_size: usize,

    /// The number of frames in a stack.
    pub stack: usize,

    /// Shape of a frame.
    pub frame_shape: Vec<usize>,
}

impl StackedFrames {
    /// The number of pixels in a frame.
    pub fn frame_len(&self) -> usize {
        self.frame_shape.iter().product()
    }

    /// Returns the frames of the `ix`-th stack.
    pub fn stack_at(&self, ix: usize) -> &[u8] {
        let n = self.stack * self.frame_len();
        &self.data[ix * n..(ix + 1) * n]
    }
}

/// Observation batches built from [`StackedFrames`].
pub trait FromStackedFrames: Sized {
    /// Converts stacked frames into a batch.
    fn from_stacked_frames(frames: StackedFrames) -> Result<Self>;
}

/// Observations holding a stack of frames.
pub trait LatestFrame {
    /// Returns the newest frame.
    fn latest_frame(&self) -> Vec<u8>;
}
