//! Decoded audio input and window extraction
//!
//! The analyzer never decodes files itself: callers hand it an [`AudioSource`]
//! holding interleaved PCM already normalized to [-1, 1]. Loading splits it
//! into one [`SampleBuffer`] per channel.

use crate::error::DspError;

/// Fully decoded PCM audio supplied by the caller
#[derive(Debug, Clone)]
pub struct AudioSource {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of interleaved channels
    pub channels: usize,
    /// Interleaved samples in [-1, 1]
    pub samples: Vec<f32>,
}

impl AudioSource {
    /// Wraps mono samples
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: 1,
            samples,
        }
    }

    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels
        }
    }

    /// Splits interleaved samples into one buffer per channel
    ///
    /// # Errors
    ///
    /// Returns `DspError::InvalidInput` when the channel count is zero or the
    /// sample count is not a multiple of it.
    pub fn deinterleave(&self) -> Result<Vec<SampleBuffer>, DspError> {
        if self.channels == 0 {
            return Err(DspError::InvalidInput("Channel count must be > 0".to_string()));
        }
        if self.samples.len() % self.channels != 0 {
            return Err(DspError::InvalidInput(format!(
                "{} samples is not a multiple of {} channels",
                self.samples.len(),
                self.channels
            )));
        }
        let frames = self.frames();
        let mut buffers: Vec<Vec<f32>> = (0..self.channels)
            .map(|_| Vec::with_capacity(frames))
            .collect();
        for frame in self.samples.chunks_exact(self.channels) {
            for (ch, &s) in frame.iter().enumerate() {
                buffers[ch].push(s);
            }
        }
        Ok(buffers.into_iter().map(SampleBuffer::from).collect())
    }
}

/// Samples of one channel
#[derive(Debug, Clone, Default)]
pub struct SampleBuffer {
    data: Vec<f32>,
}

impl From<Vec<f32>> for SampleBuffer {
    fn from(data: Vec<f32>) -> Self {
        Self { data }
    }
}

impl SampleBuffer {
    /// Number of samples
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when there are no samples
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw samples
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Copies `window.len()` samples starting at `pos` into `window`
    ///
    /// Samples past the end of the buffer are written as zeros.
    pub fn copy_window(&self, pos: usize, window: &mut [f32]) {
        let avail = self.data.len().saturating_sub(pos).min(window.len());
        if avail > 0 {
            window[..avail].copy_from_slice(&self.data[pos..pos + avail]);
        }
        window[avail..].fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deinterleave_stereo() {
        let source = AudioSource {
            sample_rate: 16000,
            channels: 2,
            samples: vec![1.0, -1.0, 2.0, -2.0, 3.0, -3.0],
        };
        let buffers = source.deinterleave().unwrap();
        assert_eq!(buffers.len(), 2);
        assert_eq!(buffers[0].as_slice(), &[1.0, 2.0, 3.0]);
        assert_eq!(buffers[1].as_slice(), &[-1.0, -2.0, -3.0]);
    }

    #[test]
    fn test_deinterleave_ragged() {
        let source = AudioSource {
            sample_rate: 16000,
            channels: 2,
            samples: vec![0.0; 5],
        };
        assert!(matches!(source.deinterleave(), Err(DspError::InvalidInput(_))));
    }

    #[test]
    fn test_copy_window_zero_pads() {
        let buffer = SampleBuffer::from(vec![1.0, 2.0, 3.0, 4.0]);
        let mut window = [9.0f32; 4];

        buffer.copy_window(2, &mut window);
        assert_eq!(window, [3.0, 4.0, 0.0, 0.0]);

        buffer.copy_window(10, &mut window);
        assert_eq!(window, [0.0; 4], "Window past the end must be silent");
    }
}
