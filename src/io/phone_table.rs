//! Phone and pronunciation lookup
//!
//! The synthesizer only needs two lookups: a phone name to its timing and
//! articulatory target, and a word to its phone string. Both are traits so a
//! caller can back them with any store; [`PhoneTable`] and [`Dictionary`] are
//! in-memory implementations loadable from JSON.
//!
//! # Example
//!
//! ```no_run
//! use vocalis_dsp::io::phone_table::{PhoneStore, PhoneTable};
//!
//! let json = std::fs::read_to_string("phones.json").unwrap_or_default();
//! let phones = PhoneTable::from_json(&json)?;
//! let entry = phones.lookup("aa")?;
//! println!("aa lasts {} ms", entry.duration_ms);
//! # Ok::<(), vocalis_dsp::DspError>(())
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::DspError;
use crate::synthesis::control::ControlFrame;

/// Timing and target of one phone
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhoneEntry {
    /// Steady-state duration in ms
    pub duration_ms: f32,
    /// Transition time into the phone in ms
    pub transition_ms: f32,
    /// Articulatory target
    pub frame: ControlFrame,
}

/// Phone name to [`PhoneEntry`]
pub trait PhoneStore {
    /// # Errors
    ///
    /// Returns `DspError::NotFound` for an unknown phone.
    fn lookup(&self, phone: &str) -> Result<PhoneEntry, DspError>;
}

/// Word to phone string, e.g. `"hello" -> "h_e_l.'ah_uu"`
pub trait DictionaryStore {
    /// # Errors
    ///
    /// Returns `DspError::NotFound` for an unknown word.
    fn phones(&self, word: &str) -> Result<String, DspError>;
}

/// In-memory phone table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhoneTable {
    phones: HashMap<String, PhoneEntry>,
}

impl PhoneTable {
    /// Creates an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON object mapping phone names to entries
    ///
    /// # Errors
    ///
    /// Returns `DspError::InvalidInput` on malformed JSON.
    pub fn from_json(json: &str) -> Result<Self, DspError> {
        let phones: HashMap<String, PhoneEntry> = serde_json::from_str(json)
            .map_err(|e| DspError::InvalidInput(format!("Phone table: {}", e)))?;
        log::debug!("Loaded {} phones", phones.len());
        Ok(Self { phones })
    }

    /// Adds or replaces a phone
    pub fn insert(&mut self, phone: impl Into<String>, entry: PhoneEntry) {
        self.phones.insert(phone.into(), entry);
    }

    /// Number of phones
    pub fn len(&self) -> usize {
        self.phones.len()
    }

    /// True when the table holds no phones
    pub fn is_empty(&self) -> bool {
        self.phones.is_empty()
    }
}

impl PhoneStore for PhoneTable {
    fn lookup(&self, phone: &str) -> Result<PhoneEntry, DspError> {
        self.phones
            .get(phone)
            .copied()
            .ok_or_else(|| DspError::NotFound(format!("phone '{}'", phone)))
    }
}

/// In-memory pronunciation dictionary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dictionary {
    words: HashMap<String, String>,
}

impl Dictionary {
    /// Creates an empty dictionary
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON object mapping words to phone strings
    ///
    /// # Errors
    ///
    /// Returns `DspError::InvalidInput` on malformed JSON.
    pub fn from_json(json: &str) -> Result<Self, DspError> {
        let words: HashMap<String, String> = serde_json::from_str(json)
            .map_err(|e| DspError::InvalidInput(format!("Dictionary: {}", e)))?;
        log::debug!("Loaded {} dictionary words", words.len());
        Ok(Self { words })
    }

    /// Adds or replaces a word
    pub fn insert(&mut self, word: impl Into<String>, phones: impl Into<String>) {
        self.words.insert(word.into(), phones.into());
    }
}

impl DictionaryStore for Dictionary {
    fn phones(&self, word: &str) -> Result<String, DspError> {
        self.words
            .get(word)
            .cloned()
            .ok_or_else(|| DspError::NotFound(format!("word '{}'", word)))
    }
}
