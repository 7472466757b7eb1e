//! Replaying adapter for the `GeminiApi` port.

use std::sync::{Arc, Mutex};

use super::{next_output, replay_result};
use crate::cassette::replayer::CassetteReplayer;
use crate::chatbot::schemas::{
    FileList, GenerateContentRequest, GenerateContentResponse, ModelList, RemoteFile,
    UploadMetadata,
};
use crate::ports::gemini_api::{ApiFuture, GeminiApi};

const PORT: &str = "gemini_api";

/// Serves recorded Gemini API results from a cassette. Inputs are ignored;
/// outputs are served in recorded order per method.
pub struct ReplayingGeminiApi {
    replayer: Arc<Mutex<CassetteReplayer>>,
}

impl ReplayingGeminiApi {
    /// Create a replaying API backed by the given replayer.
    #[must_use]
    pub fn new(replayer: Arc<Mutex<CassetteReplayer>>) -> Self {
        Self { replayer }
    }

    fn replay<'a, T>(&self, method: &'static str) -> ApiFuture<'a, T>
    where
        T: serde::de::DeserializeOwned + Send + 'a,
    {
        let result = next_output(&self.replayer, PORT, method).and_then(replay_result::<T>);
        Box::pin(async move { result })
    }
}

impl GeminiApi for ReplayingGeminiApi {
    fn list_models<'a>(&'a self, _page_token: Option<&'a str>) -> ApiFuture<'a, ModelList> {
        self.replay("list_models")
    }

    fn list_files<'a>(&'a self, _page_token: Option<&'a str>) -> ApiFuture<'a, FileList> {
        self.replay("list_files")
    }

    fn start_upload<'a>(&'a self, _metadata: &'a UploadMetadata) -> ApiFuture<'a, String> {
        self.replay("start_upload")
    }

    fn finish_upload<'a>(
        &'a self,
        _upload_url: &'a str,
        _data: &'a [u8],
    ) -> ApiFuture<'a, RemoteFile> {
        self.replay("finish_upload")
    }

    fn generate_content<'a>(
        &'a self,
        _model: &'a str,
        _request: &'a GenerateContentRequest,
    ) -> ApiFuture<'a, GenerateContentResponse> {
        self.replay("generate_content")
    }
}
