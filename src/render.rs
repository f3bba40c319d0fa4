//! Waveform renderer: audio window in, RGB24 frame on black out.

pub mod envelope;
pub mod frame;
pub mod layout;
pub mod raster;
pub mod renderer;
pub mod styles;
pub mod waveform;
