//! Phone and word sequencing
//!
//! Drives a [`VocalTract`] from symbolic input. A phone string such as
//! `"h_e_l.'ah_uu%"` is split into phones by `_`; `'` and `"` mark the next
//! phone as stressed, `.` closes a syllable, and `%` ends the phrase. Each
//! phone holds its articulatory target long enough to cover its steady state
//! plus the transition into it.
//!
//! # Example
//!
//! ```no_run
//! use vocalis_dsp::config::SynthConfig;
//! use vocalis_dsp::io::phone_table::{Dictionary, PhoneTable};
//! use vocalis_dsp::synthesis::sequencer::ControlSequencer;
//! use vocalis_dsp::synthesis::tract::VocalTract;
//!
//! let phones = PhoneTable::from_json(&std::fs::read_to_string("phones.json").unwrap_or_default())?;
//! let dict = Dictionary::from_json(&std::fs::read_to_string("dict.json").unwrap_or_default())?;
//! let mut tract = VocalTract::new(SynthConfig::default())?;
//! let sequencer = ControlSequencer::new(&phones, &dict);
//! sequencer.synth_words(&mut tract, "hello there", true)?;
//! tract.flush();
//! # Ok::<(), vocalis_dsp::DspError>(())
//! ```

use crate::error::DspError;
use crate::io::phone_table::{DictionaryStore, PhoneStore};
use crate::synthesis::tract::VocalTract;

/// Phone inserted between words
pub const PAUSE_PHONE: &str = "#";

/// Frames are held for this multiple of duration + transition
const HOLD_FACTOR: f32 = 1.5;

/// Prosodic marks carried by one phone
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhoneMarks {
    /// Preceded by `'`
    pub stress: bool,
    /// Preceded by `"`
    pub double_stress: bool,
    /// Closes a syllable (`.`)
    pub syllable: bool,
}

impl PhoneMarks {
    fn stressed(&self) -> bool {
        self.stress || self.double_stress
    }
}

/// Maps phones and words to control frames over borrowed lookup stores
pub struct ControlSequencer<'a> {
    phones: &'a dyn PhoneStore,
    dictionary: &'a dyn DictionaryStore,
}

impl<'a> ControlSequencer<'a> {
    /// Creates a sequencer over the given stores
    pub fn new(phones: &'a dyn PhoneStore, dictionary: &'a dyn DictionaryStore) -> Self {
        Self { phones, dictionary }
    }

    /// Synthesizes one phone
    ///
    /// A stressed phone is looked up as `phone'` first, falling back to the
    /// plain name.
    ///
    /// # Arguments
    ///
    /// * `tract` - Synthesizer to drive
    /// * `phone` - Phone name
    /// * `marks` - Stress and syllable marks
    /// * `reset_first` - Re-initialize the tract before the first frame
    ///
    /// # Returns
    ///
    /// Number of control frames synthesized
    ///
    /// # Errors
    ///
    /// Returns `DspError::NotFound` for an unknown phone, or any error from
    /// the synthesizer.
    pub fn synth_phone(
        &self,
        tract: &mut VocalTract,
        phone: &str,
        marks: PhoneMarks,
        reset_first: bool,
    ) -> Result<usize, DspError> {
        let entry = if marks.stressed() {
            let stressed = format!("{}'", phone);
            match self.phones.lookup(&stressed) {
                Ok(entry) => entry,
                Err(DspError::NotFound(_)) => {
                    log::debug!("No stressed form of '{}', using plain phone", phone);
                    self.phones.lookup(phone)?
                }
                Err(e) => return Err(e),
            }
        } else {
            self.phones.lookup(phone)?
        };

        let frame_ms = tract.config().frame_ms;
        let reps = ((HOLD_FACTOR * (entry.duration_ms + entry.transition_ms)) / frame_ms)
            .ceil()
            .max(1.0) as usize;

        tract.set_control(entry.frame);
        if reset_first {
            tract.init_synth()?;
        }
        for _ in 0..reps {
            tract.synthesize(false)?;
        }
        log::debug!(
            "Phone '{}'{}{}: {} frames",
            phone,
            if marks.stressed() { " stressed" } else { "" },
            if marks.syllable { " end of syllable" } else { "" },
            reps
        );
        Ok(reps)
    }

    /// Synthesizes a phone string
    ///
    /// Unknown or empty phones are skipped with a warning.
    ///
    /// # Returns
    ///
    /// Number of phones synthesized
    ///
    /// # Errors
    ///
    /// Returns any error from the synthesizer.
    pub fn synth_phones(
        &self,
        tract: &mut VocalTract,
        phones: &str,
        reset_first: bool,
    ) -> Result<usize, DspError> {
        let mut first = true;
        let mut count = 0;
        let mut marks = PhoneMarks::default();
        let mut phone = String::new();

        let mut flush = |phone: &mut String,
                         marks: &mut PhoneMarks,
                         tract: &mut VocalTract|
         -> Result<(), DspError> {
            let name = std::mem::take(phone);
            let m = *marks;
            *marks = PhoneMarks::default();
            if name.is_empty() {
                return Ok(());
            }
            match self.synth_phone(tract, &name, m, reset_first && first) {
                Ok(_) => {
                    first = false;
                    count += 1;
                    Ok(())
                }
                Err(DspError::NotFound(msg)) => {
                    log::warn!("Skipping unknown {}", msg);
                    Ok(())
                }
                Err(e) => Err(e),
            }
        };

        for ch in phones.chars() {
            match ch {
                '\'' => marks.stress = true,
                '"' => marks.double_stress = true,
                '.' => {
                    marks.syllable = true;
                    flush(&mut phone, &mut marks, tract)?;
                }
                '_' => flush(&mut phone, &mut marks, tract)?,
                '%' => {
                    flush(&mut phone, &mut marks, tract)?;
                    break;
                }
                c if c.is_whitespace() => {}
                c => phone.push(c),
            }
        }
        flush(&mut phone, &mut marks, tract)?;
        Ok(count)
    }

    /// Synthesizes one dictionary word
    ///
    /// # Errors
    ///
    /// Returns `DspError::NotFound` for a word missing from the dictionary.
    pub fn synth_word(
        &self,
        tract: &mut VocalTract,
        word: &str,
        reset_first: bool,
    ) -> Result<usize, DspError> {
        let phones = self.dictionary.phones(word)?;
        self.synth_phones(tract, &phones, reset_first)
    }

    /// Synthesizes whitespace-separated words with a pause between them
    ///
    /// # Returns
    ///
    /// Number of phones synthesized, pauses included
    ///
    /// # Errors
    ///
    /// Stops at the first unknown word with `DspError::NotFound`.
    pub fn synth_words(
        &self,
        tract: &mut VocalTract,
        words: &str,
        reset_first: bool,
    ) -> Result<usize, DspError> {
        let mut count = 0;
        for (i, word) in words.split_whitespace().enumerate() {
            if i > 0 {
                count += self.synth_phones(tract, PAUSE_PHONE, false)?;
            }
            count += self.synth_word(tract, word, reset_first && i == 0)?;
        }
        Ok(count)
    }
}
