//! Adapter implementations for the Gemini API port.
//!
//! - `live/`: reqwest transport against the real endpoint
//! - `recording/`: wraps a transport and records each call to a cassette
//! - `replaying/`: serves recorded calls, never touching the network

pub mod live;
pub mod recording;
pub mod replaying;
