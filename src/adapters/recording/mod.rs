//! Recording adapters that capture interactions to cassettes.

pub mod gemini_api;

use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde_json::{json, Value};

use crate::cassette::recorder::CassetteRecorder;
use crate::error::Error;

/// Record a `Result<T, Error>` interaction using the Ok/Err JSON convention.
///
/// Errors with an HTTP status are stored as `{"status", "body"}` so replay
/// reproduces the same error kind; everything else is stored as its message.
pub(crate) fn record_result<T, I>(
    recorder: &Arc<Mutex<CassetteRecorder>>,
    port: &str,
    method: &str,
    input: &I,
    result: &Result<T, Error>,
) where
    T: Serialize,
    I: Serialize,
{
    let input_json = match serde_json::to_value(input) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(port, method, error = %e, "failed to serialize recording input");
            Value::Null
        }
    };

    let output_json = match result {
        Ok(v) => match serde_json::to_value(v) {
            Ok(inner) => json!({ "Ok": inner }),
            Err(e) => {
                tracing::warn!(port, method, error = %e, "failed to serialize recording output");
                return;
            }
        },
        Err(e) => json!({ "Err": error_value(e) }),
    };

    match recorder.lock() {
        Ok(mut guard) => guard.record(port, method, input_json, output_json),
        Err(e) => tracing::warn!(port, method, error = %e, "recorder lock poisoned"),
    }
}

fn error_value(error: &Error) -> Value {
    match error {
        Error::Transport { status, body } => json!({ "status": status, "body": body }),
        Error::PayloadTooLarge { body } => {
            json!({ "status": crate::error::STATUS_PAYLOAD_TOO_LARGE, "body": body })
        }
        other => Value::String(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (tempfile::TempDir, Arc<Mutex<CassetteRecorder>>) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.cassette.yaml");
        (dir, Arc::new(Mutex::new(CassetteRecorder::new(path, "t", "c"))))
    }

    fn finish(recorder: Arc<Mutex<CassetteRecorder>>) -> crate::cassette::format::Cassette {
        let recorder = Arc::try_unwrap(recorder).unwrap().into_inner().unwrap();
        let path = recorder.finish().unwrap();
        serde_yaml::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn ok_result_is_wrapped() {
        let (_dir, rec) = recorder();
        let ok: Result<String, Error> = Ok("https://upload.test/1".into());
        record_result(&rec, "gemini_api", "start_upload", &json!({"x": 1}), &ok);

        let cassette = finish(rec);
        assert_eq!(cassette.interactions[0].output, json!({"Ok": "https://upload.test/1"}));
        assert_eq!(cassette.interactions[0].input, json!({"x": 1}));
    }

    #[test]
    fn status_errors_keep_status() {
        let (_dir, rec) = recorder();
        let err: Result<String, Error> = Err(Error::from_status(413, "big"));
        record_result(&rec, "gemini_api", "generate_content", &(), &err);
        let err: Result<String, Error> = Err(Error::Chatbot("blocked".into()));
        record_result(&rec, "gemini_api", "generate_content", &(), &err);

        let cassette = finish(rec);
        assert_eq!(cassette.interactions[0].output, json!({"Err": {"status": 413, "body": "big"}}));
        assert_eq!(cassette.interactions[1].output, json!({"Err": "Chatbot error: blocked"}));
    }
}
