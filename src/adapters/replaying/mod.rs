//! Replaying adapters that serve recorded interactions from cassettes.

pub mod gemini_api;

use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::cassette::replayer::CassetteReplayer;
use crate::error::Error;

/// Retrieve the next recorded output for a given port and method.
pub(crate) fn next_output(
    replayer: &Arc<Mutex<CassetteReplayer>>,
    port: &str,
    method: &str,
) -> Result<Value, Error> {
    let mut guard =
        replayer.lock().map_err(|e| Error::Cassette(format!("Replayer lock poisoned: {e}")))?;
    guard
        .next_interaction(port, method)
        .map(|interaction| interaction.output.clone())
        .map_err(Error::Cassette)
}

/// Deserialize a replayed output as `Result<T, Error>`.
///
/// `{"Err": {"status", "body"}}` replays as the matching transport error,
/// `{"Err": "message"}` as a chatbot error.
pub(crate) fn replay_result<T: DeserializeOwned>(output: Value) -> Result<T, Error> {
    if let Some(err_val) = output.get("Err").or_else(|| output.get("err")) {
        return Err(replayed_error(err_val));
    }
    let ok_val = output.get("Ok").or_else(|| output.get("ok")).cloned().unwrap_or(output);
    serde_json::from_value(ok_val)
        .map_err(|e| Error::Cassette(format!("Recorded output has unexpected shape: {e}")))
}

fn replayed_error(value: &Value) -> Error {
    if let Some(status) = value.get("status").and_then(Value::as_u64) {
        let body = value.get("body").and_then(Value::as_str).unwrap_or_default();
        return match u16::try_from(status) {
            Ok(status) => Error::from_status(status, body),
            Err(_) => Error::Cassette(format!("Recorded status out of range: {status}")),
        };
    }
    let message = value.as_str().unwrap_or("replayed error");
    Error::Chatbot(message.to_string())
}
