//! Writing trial tensors into a feature sink
//!
//! Column names are `{prefix}_{feature}` with a `_ch{n}` suffix when more than
//! one channel is processed. Columns are registered on first write.

use crate::analysis::tensor::{GaborTensor, TrialTensor};
use crate::error::DspError;
use crate::io::feature_table::FeatureSink;

/// Builds a column name
///
/// # Example
///
/// ```
/// use vocalis_dsp::analysis::output::column_name;
///
/// assert_eq!(column_name("AudProc", "mel_fbank", 0, false), "AudProc_mel_fbank");
/// assert_eq!(column_name("AudProc", "mel_gabor1_raw", 1, true), "AudProc_mel_gabor1_raw_ch1");
/// ```
pub fn column_name(prefix: &str, feature: &str, channel: usize, multi_channel: bool) -> String {
    if multi_channel {
        format!("{}_{}_ch{}", prefix, feature, channel)
    } else {
        format!("{}_{}", prefix, feature)
    }
}

/// Writes the first `n_features` features of every step as a `[steps, n_features]` cell
pub fn write_steps(
    sink: &mut dyn FeatureSink,
    name: &str,
    row: usize,
    tensor: &TrialTensor,
    channel: usize,
    n_features: usize,
) -> Result<(), DspError> {
    let n = n_features.min(tensor.features());
    sink.add_column_if_absent(name, &[tensor.steps(), n])?;
    for s in 0..tensor.steps() {
        for i in 0..n {
            sink.write_cell(name, row, &[s, i], tensor.get(i, s, channel))?;
        }
    }
    Ok(())
}

/// Writes one channel of a gabor tensor as a `[filter, 2, time_tap, freq_tap]` cell
pub fn write_gabor(
    sink: &mut dyn FeatureSink,
    name: &str,
    row: usize,
    tensor: &GaborTensor,
    channel: usize,
) -> Result<(), DspError> {
    let shape = [tensor.filters(), 2, tensor.time_taps(), tensor.freq_taps()];
    sink.add_column_if_absent(name, &shape)?;
    for fi in 0..tensor.filters() {
        for sign in 0..2 {
            for t in 0..tensor.time_taps() {
                for f in 0..tensor.freq_taps() {
                    let v = tensor.get(channel, fi, sign, f, t);
                    sink.write_cell(name, row, &[fi, sign, t, f], v)?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::feature_table::FeatureTable;

    #[test]
    fn test_write_steps_truncates_features() {
        let mut t = TrialTensor::new(4, 3, 1);
        t.set(3, 2, 0, 9.0);
        t.set(1, 2, 0, 5.0);
        let mut table = FeatureTable::new();
        let row = table.add_row();
        write_steps(&mut table, "mfcc", row, &t, 0, 2).unwrap();
        assert_eq!(table.column("mfcc").unwrap().shape(), &[3, 2]);
        assert_eq!(table.cell("mfcc", 0, &[2, 1]), Some(5.0));
    }

    #[test]
    fn test_write_gabor_transposes_taps() {
        let mut g = GaborTensor::new(1, 2, 3, 4);
        g.set_pair(0, 1, 2, 3, 0.0, 0.25).unwrap();
        let mut table = FeatureTable::new();
        let row = table.add_row();
        write_gabor(&mut table, "g", row, &g, 0).unwrap();
        assert_eq!(table.column("g").unwrap().shape(), &[2, 2, 4, 3]);
        assert_eq!(table.cell("g", 0, &[1, 1, 3, 2]), Some(0.25));
    }
}
