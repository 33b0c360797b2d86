//! Trial-based auditory analysis
//!
//! - Trial tensors holding per-step features
//! - The trial driver that runs the feature stages over a loaded sound
//! - Column naming and writing into a feature sink

pub mod output;
pub mod processor;
pub mod tensor;
