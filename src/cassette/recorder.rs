//! Writes the port calls of one session to a YAML cassette.
//!
//! Image payloads never reach the file. Inline `data` blobs in recorded
//! inputs are replaced by their decoded length and content hash, the same
//! summary the upload recorder stores for raw bytes.

use std::path::PathBuf;

use base64::Engine;
use chrono::Utc;
use serde_json::{json, Value};
use tracing::info;

use super::format::{Cassette, Interaction};
use crate::error::Error;
use crate::image::content_hash;

/// Wire name of an inline image part.
const INLINE_DATA_KEY: &str = "inlineData";

/// Collects interactions in call order and writes them on [`finish`].
///
/// [`finish`]: CassetteRecorder::finish
#[derive(Debug)]
pub struct CassetteRecorder {
    path: PathBuf,
    cassette: Cassette,
}

impl CassetteRecorder {
    /// Recorder for a session named `name`, written to `path`.
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>, commit: impl Into<String>) -> Self {
        let cassette = Cassette {
            name: name.into(),
            recorded_at: Utc::now(),
            commit: commit.into(),
            interactions: Vec::new(),
        };
        Self { path: path.into(), cassette }
    }

    /// Append one call. `seq` is its position in the session; inline image
    /// data in `input` is summarized.
    pub fn record(&mut self, port: &str, method: &str, mut input: Value, output: Value) {
        redact_payloads(&mut input);
        let seq = self.cassette.interactions.len() as u64;
        self.cassette.interactions.push(Interaction {
            seq,
            port: port.to_string(),
            method: method.to_string(),
            input,
            output,
        });
    }

    /// Number of calls recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cassette.interactions.len()
    }

    /// True before the first call is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cassette.interactions.is_empty()
    }

    /// Stamp the session and write the cassette, creating parent
    /// directories as needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cassette`] if the cassette cannot be serialized, or
    /// an I/O error if it cannot be written.
    pub fn finish(mut self) -> Result<PathBuf, Error> {
        self.cassette.recorded_at = Utc::now();
        let yaml = serde_yaml::to_string(&self.cassette)
            .map_err(|e| Error::Cassette(format!("Failed to serialize cassette: {e}")))?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, yaml)?;
        info!(path = %self.path.display(), interactions = self.len(), "cassette written");
        Ok(self.path)
    }
}

/// What a cassette stores in place of image bytes.
#[must_use]
pub fn payload_summary(data: &[u8]) -> Value {
    json!({ "length": data.len(), "sha256_hash": content_hash(data) })
}

/// Replace the `data` of every `inlineData` object with a
/// [`payload_summary`] of the decoded bytes.
fn redact_payloads(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if let Some(Value::Object(blob)) = map.get_mut(INLINE_DATA_KEY) {
                if let Some(Value::String(data)) = blob.remove("data") {
                    let bytes = base64::engine::general_purpose::STANDARD
                        .decode(&data)
                        .unwrap_or_else(|_| data.into_bytes());
                    blob.insert("payload".to_string(), payload_summary(&bytes));
                }
            }
            map.values_mut().for_each(redact_payloads);
        }
        Value::Array(items) => items.iter_mut().for_each(redact_payloads),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chatbot::schemas::{GenerateContentRequest, Part};

    #[test]
    fn record_and_finish() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("gemini_api.cassette.yaml");

        let mut recorder = CassetteRecorder::new(&path, "test-recording", "deadbeef");
        assert!(recorder.is_empty());
        recorder.record(
            "gemini_api",
            "list_files",
            json!({"page_token": null}),
            json!({"Ok": {"files": []}}),
        );
        recorder.record(
            "gemini_api",
            "generate_content",
            json!({"model": "models/gemini-1.5-flash"}),
            json!({"Err": {"status": 413, "body": "too large"}}),
        );
        assert_eq!(recorder.len(), 2);

        let result_path = recorder.finish().expect("finish should succeed");
        assert_eq!(result_path, path);

        let content = std::fs::read_to_string(&path).unwrap();
        let cassette: Cassette = serde_yaml::from_str(&content).unwrap();
        assert_eq!(cassette.name, "test-recording");
        assert_eq!(cassette.commit, "deadbeef");
        assert_eq!(cassette.interactions.len(), 2);
        assert_eq!(cassette.interactions[0].seq, 0);
        assert_eq!(cassette.interactions[1].seq, 1);
        assert_eq!(cassette.interactions[1].input["model"], "models/gemini-1.5-flash");
        assert_eq!(cassette.interactions[1].output["Err"]["status"], 413);
    }

    #[test]
    fn inline_image_data_is_summarized() {
        let image = vec![0xAB_u8; 64 * 1024];
        let encoded = base64::engine::general_purpose::STANDARD.encode(&image);
        let request = GenerateContentRequest::json(vec![
            Part::text("describe"),
            Part::inline_jpeg(encoded.clone()),
        ]);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.cassette.yaml");
        let mut recorder = CassetteRecorder::new(&path, "t", "c");
        recorder.record(
            "gemini_api",
            "generate_content",
            json!({"model": "models/m", "request": request}),
            json!({"Ok": {}}),
        );
        recorder.finish().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(!content.contains(&encoded[..64]));
        assert!(content.len() < 4096, "cassette is {} bytes", content.len());

        let cassette: Cassette = serde_yaml::from_str(&content).unwrap();
        let parts = &cassette.interactions[0].input["request"]["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], "describe");
        let blob = &parts[1]["inlineData"];
        assert!(blob.get("data").is_none());
        assert_eq!(blob["mimeType"], "image/jpeg");
        assert_eq!(blob["payload"]["length"], image.len());
        assert_eq!(blob["payload"]["sha256_hash"], content_hash(&image));
    }

    #[test]
    fn other_inputs_are_kept() {
        let mut input = json!({"display_name": "a.jpg", "data": "not an inline part"});
        redact_payloads(&mut input);
        assert_eq!(input["data"], "not an inline part");
    }
}
