//! On-disk cassette format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A recorded session: every port call made during one run, in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cassette {
    /// Session name.
    pub name: String,
    /// When the session was recorded.
    pub recorded_at: DateTime<Utc>,
    /// Git commit of the recording build.
    pub commit: String,
    /// Recorded calls.
    pub interactions: Vec<Interaction>,
}

/// One port call and its result.
///
/// `output` follows the `{"Ok": value}` / `{"Err": message}` convention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    /// Position in the session.
    pub seq: u64,
    /// Port name, e.g. `"gemini_api"`.
    pub port: String,
    /// Method name, e.g. `"generate_content"`.
    pub method: String,
    /// Call arguments.
    pub input: serde_json::Value,
    /// Call result.
    pub output: serde_json::Value,
}
