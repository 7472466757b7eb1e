//! Service context that bundles all port trait objects.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::adapters::live::gemini::LiveGeminiApi;
use crate::adapters::recording::gemini_api::RecordingGeminiApi;
use crate::adapters::replaying::gemini_api::ReplayingGeminiApi;
use crate::cassette::loader::load_cassette;
use crate::cassette::recorder::CassetteRecorder;
use crate::config::GeminiConfig;
use crate::error::Error;
use crate::ports::GeminiApi;

/// Environment variable naming a cassette to replay instead of calling the API.
pub const REPLAY_ENV: &str = "IMGDESCGEN_REPLAY";

/// Environment variable that turns on recording (`true` or `1`).
pub const RECORD_ENV: &str = "IMGDESCGEN_REC";

/// Directory recorded sessions are written under.
pub const CASSETTE_DIR: &str = ".imgdescgen/cassettes";

/// Bundles all port trait objects into a single context.
pub struct ServiceContext {
    /// Gemini API port.
    pub api: Box<dyn GeminiApi>,
}

/// Handle to a recording session that must be finished after use.
pub struct RecordingSession {
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingSession {
    /// Finish the recording and write cassette files to disk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cassette`] if an adapter still holds the recorder,
    /// or the error from writing the file.
    pub fn finish(self) -> Result<PathBuf, Error> {
        let recorder = Arc::try_unwrap(self.recorder)
            .map_err(|_| Error::Cassette("Recording adapter still has references".into()))?
            .into_inner()
            .map_err(|e| Error::Cassette(format!("Recorder lock poisoned: {e}")))?;
        recorder.finish()
    }
}

impl ServiceContext {
    /// Create a live context.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is not configured.
    pub fn live(config: &GeminiConfig) -> Result<Self, Error> {
        if config.api_key.is_empty() {
            return Err(Error::MissingApiKey { env_var: "GEMINI_API_KEY".into() });
        }
        Ok(Self { api: Box::new(LiveGeminiApi::new(config.api_key.clone())) })
    }

    /// Create a recording context that wraps a live adapter with a recorder.
    ///
    /// # Errors
    ///
    /// Returns an error if the live context cannot be created.
    pub fn recording(config: &GeminiConfig) -> Result<(Self, RecordingSession), Error> {
        let live_ctx = Self::live(config)?;

        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H-%M-%S").to_string();
        let output_dir = PathBuf::from(CASSETTE_DIR).join(&timestamp);
        let path = output_dir.join("gemini_api.cassette.yaml");
        let recorder = Arc::new(Mutex::new(CassetteRecorder::new(
            path,
            format!("{timestamp}-gemini_api"),
            get_commit_hash(),
        )));

        let recording_api = RecordingGeminiApi::new(live_ctx.api, Arc::clone(&recorder));

        let ctx = Self { api: Box::new(recording_api) };
        let session = RecordingSession { recorder };

        Ok((ctx, session))
    }

    /// Create a replaying context from a cassette file.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette file cannot be loaded.
    pub fn replaying(path: &Path) -> Result<Self, Error> {
        let replayer = load_cassette(path)?;
        let api = Box::new(ReplayingGeminiApi::new(Arc::new(Mutex::new(replayer))));
        Ok(Self { api })
    }

    /// Pick replay, recording or live mode from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the selected mode cannot be set up.
    pub fn from_env(config: &GeminiConfig) -> Result<(Self, Option<RecordingSession>), Error> {
        if let Ok(cassette_path) = std::env::var(REPLAY_ENV) {
            tracing::info!(cassette = %cassette_path, "replaying recorded session");
            return Ok((Self::replaying(Path::new(&cassette_path))?, None));
        }
        if std::env::var(RECORD_ENV).is_ok_and(|v| v == "true" || v == "1") {
            tracing::info!("recording mode enabled");
            let (ctx, session) = Self::recording(config)?;
            return Ok((ctx, Some(session)));
        }
        Ok((Self::live(config)?, None))
    }
}

/// Get the current git commit hash, or "unknown" if unavailable.
fn get_commit_hash() -> String {
    std::process::Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map_or_else(|| "unknown".to_string(), |s| s.trim().to_string())
}
