//! Visualization configuration: the immutable record that drives waveform rendering.

pub mod config;
pub(crate) mod random;
