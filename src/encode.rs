//! Encoder pipe driver: spawns the external transcoder, streams raw RGB24 frames into it
//! and supervises the child until a finished MP4 exists or every trace of it is gone.

pub mod capability;
pub mod child;
pub mod driver;
pub mod job;
pub mod memory;
pub mod monitor;
pub mod preset;
pub mod stderr;
