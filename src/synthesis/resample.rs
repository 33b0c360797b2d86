//! Band-limited sample-rate conversion of the tube output
//!
//! The tube runs at a rate fixed by the tract length and control rate. Its
//! samples are pushed into a ring buffer and converted to the output rate
//! with a Kaiser-windowed sinc interpolator (13 zero crossings, β = 5.658,
//! cutoff 11/13 of Nyquist). Filter positions are tracked in a fixed-point
//! time register: 16 fractional bits, of which the top 8 select the filter
//! table entry and the bottom 8 interpolate between entries.
//!
//! The converter records the largest absolute output sample so the caller
//! can normalize the finished buffer.

const ZERO_CROSSINGS: usize = 13;
const BETA: f64 = 5.658;
const LP_CUTOFF: f64 = 11.0 / 13.0;
const L_BITS: u32 = 8;
const L_RANGE: usize = 1 << L_BITS;
const M_BITS: u32 = 8;
const M_RANGE: f32 = (1 << M_BITS) as f32;
const FRACTION_BITS: u32 = L_BITS + M_BITS;
const FRACTION_RANGE: f64 = (1u32 << FRACTION_BITS) as f64;
const FILTER_LENGTH: usize = ZERO_CROSSINGS * L_RANGE;
const N_MASK: u32 = 0xFFFF_0000;
const L_MASK: u32 = 0x0000_FF00;
const M_MASK: u32 = 0x0000_00FF;
const FRACTION_MASK: u32 = 0x0000_FFFF;
const BUFFER_SIZE: usize = 1024;

fn l_value(x: u32) -> usize {
    ((x & L_MASK) >> M_BITS) as usize
}

fn m_value(x: u32) -> f32 {
    (x & M_MASK) as f32
}

fn n_value(x: u32) -> usize {
    ((x & N_MASK) >> FRACTION_BITS) as usize
}

fn fraction_value(x: u32) -> f64 {
    (x & FRACTION_MASK) as f64
}

/// Distance from the output instant to the next input sample, in register units
fn right_fraction(time_register: u32) -> u32 {
    match time_register & FRACTION_MASK {
        0 => FRACTION_MASK + 1,
        f => FRACTION_MASK + 1 - f,
    }
}

/// Modified Bessel function of the first kind, order 0
fn izero(x: f64) -> f64 {
    let half_x = x / 2.0;
    let mut sum = 1.0;
    let mut u = 1.0;
    let mut n = 1.0;
    loop {
        let mut temp = half_x / n;
        n += 1.0;
        temp *= temp;
        u *= temp;
        sum += u;
        if u < 1e-21 * sum {
            return sum;
        }
    }
}

fn ring_inc(i: usize) -> usize {
    if i + 1 >= BUFFER_SIZE {
        0
    } else {
        i + 1
    }
}

fn ring_dec(i: usize) -> usize {
    if i == 0 {
        BUFFER_SIZE - 1
    } else {
        i - 1
    }
}

/// Streaming sample-rate converter
#[derive(Debug, Clone)]
pub struct SampleRateConverter {
    ratio: f64,
    h: Vec<f32>,
    delta_h: Vec<f32>,
    time_register: u32,
    time_register_increment: u32,
    filter_increment: usize,
    phase_increment: u32,
    pad_size: usize,
    fill_size: usize,
    fill_ptr: usize,
    fill_counter: usize,
    empty_ptr: usize,
    buffer: Vec<f32>,
    max_sample: f32,
    output: Vec<f32>,
}

impl SampleRateConverter {
    /// Creates a converter from `input_rate` to `output_rate`
    pub fn new(input_rate: f32, output_rate: f32) -> Self {
        let (h, delta_h) = lowpass_table();
        let ratio = output_rate as f64 / input_rate as f64;
        let time_register_increment = (FRACTION_RANGE / ratio).round() as u32;
        let rounded_ratio = FRACTION_RANGE / time_register_increment as f64;
        let (filter_increment, phase_increment, pad_size) = if ratio >= 1.0 {
            (L_RANGE, 0, ZERO_CROSSINGS)
        } else {
            (
                0,
                (ratio * FRACTION_RANGE).round() as u32,
                (ZERO_CROSSINGS as f64 / rounded_ratio) as usize + 1,
            )
        };
        log::debug!(
            "Sample-rate converter: {} Hz -> {} Hz (ratio {:.4}, pad {})",
            input_rate,
            output_rate,
            ratio,
            pad_size
        );
        Self {
            ratio,
            h,
            delta_h,
            time_register: 0,
            time_register_increment,
            filter_increment,
            phase_increment,
            pad_size,
            fill_size: BUFFER_SIZE - 2 * pad_size,
            fill_ptr: pad_size,
            fill_counter: 0,
            empty_ptr: 0,
            buffer: vec![0.0; BUFFER_SIZE],
            max_sample: 0.0,
            output: Vec::new(),
        }
    }

    /// Output/input rate ratio
    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Pushes one input sample; converts a block when the buffer is full
    pub fn push(&mut self, sample: f32) {
        self.buffer[self.fill_ptr] = sample;
        self.fill_ptr = ring_inc(self.fill_ptr);
        self.fill_counter += 1;
        if self.fill_counter >= self.fill_size {
            self.convert();
            self.fill_counter = 0;
        }
    }

    /// Pads with silence and converts everything still buffered
    pub fn flush(&mut self) {
        for _ in 0..2 * self.pad_size {
            self.push(0.0);
        }
        self.convert();
    }

    /// Largest absolute output sample so far
    pub fn max_sample(&self) -> f32 {
        self.max_sample
    }

    /// Converted samples
    pub fn output(&self) -> &[f32] {
        &self.output
    }

    /// Takes the converted samples, leaving the peak tracker untouched
    pub fn take_output(&mut self) -> Vec<f32> {
        std::mem::take(&mut self.output)
    }

    /// Clears the buffer, the output and the peak tracker
    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.fill_ptr = self.pad_size;
        self.fill_counter = 0;
        self.empty_ptr = 0;
        self.time_register = 0;
        self.max_sample = 0.0;
        self.output.clear();
    }

    fn convert(&mut self) {
        let mut end_ptr = self.fill_ptr as isize - self.pad_size as isize;
        if end_ptr < 0 {
            end_ptr += BUFFER_SIZE as isize;
        }
        let mut end_ptr = end_ptr as usize;
        if end_ptr < self.empty_ptr {
            end_ptr += BUFFER_SIZE;
        }

        while self.empty_ptr < end_ptr {
            let value = if self.ratio >= 1.0 {
                self.interpolate_up()
            } else {
                self.interpolate_down()
            };
            self.max_sample = self.max_sample.max(value.abs());
            self.output.push(value);

            self.time_register = self
                .time_register
                .wrapping_add(self.time_register_increment);
            self.empty_ptr += n_value(self.time_register);
            if self.empty_ptr >= BUFFER_SIZE {
                self.empty_ptr -= BUFFER_SIZE;
                end_ptr = end_ptr.saturating_sub(BUFFER_SIZE);
            }
            self.time_register &= !N_MASK;
        }
    }

    fn interpolate_up(&self) -> f32 {
        let mut output = 0.0;

        // Left wing
        let interp = m_value(self.time_register) / M_RANGE;
        let mut index = self.empty_ptr;
        let mut fi = l_value(self.time_register);
        while fi < FILTER_LENGTH {
            output += self.buffer[index] * (self.h[fi] + self.delta_h[fi] * interp);
            index = ring_dec(index);
            fi += self.filter_increment;
        }

        // Right wing
        let right = right_fraction(self.time_register);
        let interp = m_value(right) / M_RANGE;
        let mut index = ring_inc(self.empty_ptr);
        let mut fi = (right >> M_BITS) as usize;
        while fi < FILTER_LENGTH {
            output += self.buffer[index] * (self.h[fi] + self.delta_h[fi] * interp);
            index = ring_inc(index);
            fi += self.filter_increment;
        }
        output
    }

    fn interpolate_down(&self) -> f32 {
        let mut output = 0.0;

        let mut phase = (fraction_value(self.time_register) * self.ratio).round() as u32;
        let mut index = self.empty_ptr;
        while ((phase >> M_BITS) as usize) < FILTER_LENGTH {
            let i = (phase >> M_BITS) as usize;
            let impulse = self.h[i] + self.delta_h[i] * (m_value(phase) / M_RANGE);
            output += self.buffer[index] * impulse;
            index = ring_dec(index);
            phase += self.phase_increment;
        }

        let right = right_fraction(self.time_register) as f64;
        let mut phase = (right * self.ratio).round() as u32;
        let mut index = ring_inc(self.empty_ptr);
        while ((phase >> M_BITS) as usize) < FILTER_LENGTH {
            let i = (phase >> M_BITS) as usize;
            let impulse = self.h[i] + self.delta_h[i] * (m_value(phase) / M_RANGE);
            output += self.buffer[index] * impulse;
            index = ring_inc(index);
            phase += self.phase_increment;
        }
        output
    }
}

/// Kaiser-windowed sinc and its first differences
fn lowpass_table() -> (Vec<f32>, Vec<f32>) {
    let mut h = vec![0.0f64; FILTER_LENGTH];
    h[0] = LP_CUTOFF;
    let x = std::f64::consts::PI / L_RANGE as f64;
    for (i, v) in h.iter_mut().enumerate().skip(1) {
        let y = i as f64 * x;
        *v = (y * LP_CUTOFF).sin() / y;
    }
    let i_beta = 1.0 / izero(BETA);
    for (i, v) in h.iter_mut().enumerate() {
        let t = i as f64 / FILTER_LENGTH as f64;
        *v *= izero(BETA * (1.0 - t * t).sqrt()) * i_beta;
    }
    let mut delta = vec![0.0f32; FILTER_LENGTH];
    for i in 0..FILTER_LENGTH - 1 {
        delta[i] = (h[i + 1] - h[i]) as f32;
    }
    delta[FILTER_LENGTH - 1] = -h[FILTER_LENGTH - 1] as f32;
    (h.into_iter().map(|v| v as f32).collect(), delta)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert_all(input_rate: f32, output_rate: f32, input: &[f32]) -> Vec<f32> {
        let mut src = SampleRateConverter::new(input_rate, output_rate);
        for &s in input {
            src.push(s);
        }
        src.flush();
        src.take_output()
    }

    #[test]
    fn test_izero() {
        assert!((izero(0.0) - 1.0).abs() < 1e-12);
        // I0(1) = 1.2660658...
        assert!((izero(1.0) - 1.266_065_877_752).abs() < 1e-9);
    }

    #[test]
    fn test_upsampling_length() {
        let input = vec![0.0f32; 23360];
        let out = convert_all(23360.0, 44100.0, &input);
        let expected = 44100.0;
        let got = out.len() as f32;
        assert!((got - expected).abs() / expected < 0.01, "got {} samples", got);
    }

    #[test]
    fn test_downsampling_length() {
        let input = vec![0.0f32; 46760];
        let out = convert_all(46760.0, 44100.0, &input);
        let got = out.len() as f32;
        assert!((got - 44100.0).abs() / 44100.0 < 0.01, "got {} samples", got);
    }

    #[test]
    fn test_sine_survives_conversion() {
        let rate = 20000.0f32;
        let input: Vec<f32> = (0..20000)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / rate).sin())
            .collect();
        let mut src = SampleRateConverter::new(rate, 44100.0);
        for &s in &input {
            src.push(s);
        }
        src.flush();
        let peak = src.max_sample();
        assert!(peak > 0.9 && peak < 1.1, "peak {}", peak);
        let out = src.output();
        let mid = &out[out.len() / 4..out.len() / 2];
        let mid_peak = mid.iter().fold(0.0f32, |m, v| m.max(v.abs()));
        assert!(mid_peak > 0.95, "steady-state peak {}", mid_peak);
    }

    #[test]
    fn test_reset_clears_peak() {
        let mut src = SampleRateConverter::new(20000.0, 44100.0);
        for _ in 0..2000 {
            src.push(0.5);
        }
        assert!(src.max_sample() > 0.0);
        src.reset();
        assert_eq!(src.max_sample(), 0.0);
        assert!(src.output().is_empty());
    }
}
