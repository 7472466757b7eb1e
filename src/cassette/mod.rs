//! Cassettes: recorded Gemini API sessions for deterministic replay.

pub mod format;
pub mod loader;
pub mod recorder;
pub mod replayer;
