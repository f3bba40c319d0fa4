//! Chunked audio frame source: one short sample window per video frame.

pub mod frames;
pub mod pcm;
pub mod probe;
