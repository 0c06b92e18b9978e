//! Observations.
use tdrl_core::{replay_buffer::LatestFrame, Obs};

/// Observation given as a real vector.
#[derive(Clone, Debug, PartialEq)]
pub struct VecObs(pub Vec<f32>);

impl Obs for VecObs {}

impl From<Vec<f32>> for VecObs {
    fn from(v: Vec<f32>) -> Self {
        Self(v)
    }
}

/// Stack of the latest `stack` frames of shape `[height, width]`.
///
/// Frames are ordered from the oldest to the newest.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameObs {
    /// Pixel values of the frames, `[stack, height, width]` in row-major order.
    pub frames: Vec<u8>,

    /// The number of frames.
    pub stack: usize,

    /// Height of a frame.
    pub height: usize,

    /// Width of a frame.
    pub width: usize,
}

impl FrameObs {
    /// Constructs an observation repeating `frame` `stack` times.
    pub fn repeat(frame: &[u8], stack: usize, height: usize, width: usize) -> Self {
        Self {
            frames: frame.repeat(stack),
            stack,
            height,
            width,
        }
    }

    /// Drops the oldest frame and appends `frame`.
    pub fn push_frame(&mut self, frame: &[u8]) {
        let n = self.height * self.width;
        self.frames.drain(..n);
        self.frames.extend_from_slice(frame);
    }
}

impl Obs for FrameObs {}

impl LatestFrame for FrameObs {
    fn latest_frame(&self) -> Vec<u8> {
        let n = self.height * self.width;
        self.frames[self.frames.len() - n..].to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_frame() {
        let mut obs = FrameObs::repeat(&[1, 1], 3, 1, 2);
        assert_eq!(obs.frames, vec![1, 1, 1, 1, 1, 1]);
        obs.push_frame(&[2, 3]);
        obs.push_frame(&[4, 5]);
        assert_eq!(obs.frames, vec![1, 1, 2, 3, 4, 5]);
        assert_eq!(obs.latest_frame(), vec![4, 5]);
    }
}
