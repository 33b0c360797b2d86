//! External interfaces of the analysis and synthesis cores
//!
//! Decoded audio input, the feature sink written by the analyzer, and the
//! phone/dictionary stores read by the sequencer.

pub mod feature_table;
pub mod phone_table;
pub mod sample_buffer;
