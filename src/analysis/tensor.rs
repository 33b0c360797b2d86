//! Dense trial buffers with named axes
//!
//! Both tensors are flat `Vec<f32>` buffers with a fixed stride function.
//! They are allocated once per geometry and overwritten trial after trial.

use crate::error::DspError;

/// `[feature][step][channel]` buffer holding a full trial of per-step features
#[derive(Debug, Clone, PartialEq)]
pub struct TrialTensor {
    features: usize,
    steps: usize,
    channels: usize,
    data: Vec<f32>,
}

impl TrialTensor {
    /// Zero-filled tensor
    pub fn new(features: usize, steps: usize, channels: usize) -> Self {
        Self {
            features,
            steps,
            channels,
            data: vec![0.0; features * steps * channels],
        }
    }

    /// Feature axis length
    pub fn features(&self) -> usize {
        self.features
    }

    /// Step axis length
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Channel axis length
    pub fn channels(&self) -> usize {
        self.channels
    }

    #[inline]
    fn index(&self, feature: usize, step: usize, channel: usize) -> usize {
        (feature * self.steps + step) * self.channels + channel
    }

    /// Value at `(feature, step, channel)`; panics when out of range
    #[inline]
    pub fn get(&self, feature: usize, step: usize, channel: usize) -> f32 {
        self.data[self.index(feature, step, channel)]
    }

    /// Checked read
    pub fn try_get(&self, feature: usize, step: usize, channel: usize) -> Option<f32> {
        if feature < self.features && step < self.steps && channel < self.channels {
            Some(self.get(feature, step, channel))
        } else {
            None
        }
    }

    /// Sets the value at `(feature, step, channel)`
    #[inline]
    pub fn set(&mut self, feature: usize, step: usize, channel: usize, value: f32) {
        let idx = self.index(feature, step, channel);
        self.data[idx] = value;
    }

    /// Writes one step of features for a channel
    pub fn set_step(&mut self, step: usize, channel: usize, values: &[f32]) {
        for (i, &v) in values.iter().enumerate().take(self.features) {
            self.set(i, step, channel, v);
        }
    }

    /// Copies every feature of `from` into `to` for one channel
    pub fn copy_step(&mut self, to: usize, from: usize, channel: usize) {
        for i in 0..self.features {
            let v = self.get(i, from, channel);
            self.set(i, to, channel, v);
        }
    }

    /// Raw buffer
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

/// `[channel][filter][sign][freq_tap][time_tap]` buffer of gabor responses
///
/// `sign` 0 holds the positive part of a response, 1 the negative part.
#[derive(Debug, Clone, PartialEq)]
pub struct GaborTensor {
    channels: usize,
    filters: usize,
    freq_taps: usize,
    time_taps: usize,
    data: Vec<f32>,
}

impl GaborTensor {
    /// Zero-filled tensor
    pub fn new(channels: usize, filters: usize, freq_taps: usize, time_taps: usize) -> Self {
        Self {
            channels,
            filters,
            freq_taps,
            time_taps,
            data: vec![0.0; channels * filters * 2 * freq_taps * time_taps],
        }
    }

    /// Channel axis length
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Filter axis length
    pub fn filters(&self) -> usize {
        self.filters
    }

    /// Frequency tap axis length
    pub fn freq_taps(&self) -> usize {
        self.freq_taps
    }

    /// Time tap axis length
    pub fn time_taps(&self) -> usize {
        self.time_taps
    }

    fn frame_len(&self) -> usize {
        self.filters * 2 * self.freq_taps * self.time_taps
    }

    #[inline]
    fn index(&self, channel: usize, filter: usize, sign: usize, freq: usize, time: usize) -> usize {
        (((channel * self.filters + filter) * 2 + sign) * self.freq_taps + freq) * self.time_taps
            + time
    }

    /// Value at the given position; panics when out of range
    #[inline]
    pub fn get(&self, channel: usize, filter: usize, sign: usize, freq: usize, time: usize) -> f32 {
        self.data[self.index(channel, filter, sign, freq, time)]
    }

    /// Stores a signed response as its rectified (positive, negative) pair
    ///
    /// # Errors
    ///
    /// Returns `DspError::ShapeOverflow` if a tap index is past the allocated extent.
    pub fn set_pair(
        &mut self,
        channel: usize,
        filter: usize,
        freq: usize,
        time: usize,
        pos: f32,
        neg: f32,
    ) -> Result<(), DspError> {
        if channel >= self.channels
            || filter >= self.filters
            || freq >= self.freq_taps
            || time >= self.time_taps
        {
            return Err(DspError::ShapeOverflow(format!(
                "Gabor tap (ch {}, filter {}, freq {}, time {}) outside [{}, {}, 2, {}, {}]",
                channel, filter, freq, time, self.channels, self.filters, self.freq_taps, self.time_taps
            )));
        }
        let p = self.index(channel, filter, 0, freq, time);
        let n = self.index(channel, filter, 1, freq, time);
        self.data[p] = pos;
        self.data[n] = neg;
        Ok(())
    }

    /// All values of one channel, contiguous
    pub fn channel_frame(&self, channel: usize) -> &[f32] {
        let len = self.frame_len();
        &self.data[channel * len..(channel + 1) * len]
    }

    /// Mutable values of one channel
    pub fn channel_frame_mut(&mut self, channel: usize) -> &mut [f32] {
        let len = self.frame_len();
        &mut self.data[channel * len..(channel + 1) * len]
    }
}
