//! Recording adapter for the `GeminiApi` port.

use std::sync::{Arc, Mutex};

use serde_json::json;

use super::record_result;
use crate::cassette::recorder::{payload_summary, CassetteRecorder};
use crate::chatbot::schemas::{
    FileList, GenerateContentRequest, GenerateContentResponse, ModelList, RemoteFile,
    UploadMetadata,
};
use crate::ports::gemini_api::{ApiFuture, GeminiApi};

const PORT: &str = "gemini_api";

/// Records Gemini API interactions while delegating to an inner implementation.
pub struct RecordingGeminiApi {
    inner: Box<dyn GeminiApi>,
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingGeminiApi {
    /// Creates a new recording API wrapping the given implementation.
    pub fn new(inner: Box<dyn GeminiApi>, recorder: Arc<Mutex<CassetteRecorder>>) -> Self {
        Self { inner, recorder }
    }
}

impl GeminiApi for RecordingGeminiApi {
    fn list_models<'a>(&'a self, page_token: Option<&'a str>) -> ApiFuture<'a, ModelList> {
        Box::pin(async move {
            let result = self.inner.list_models(page_token).await;
            let input = json!({ "page_token": page_token });
            record_result(&self.recorder, PORT, "list_models", &input, &result);
            result
        })
    }

    fn list_files<'a>(&'a self, page_token: Option<&'a str>) -> ApiFuture<'a, FileList> {
        Box::pin(async move {
            let result = self.inner.list_files(page_token).await;
            let input = json!({ "page_token": page_token });
            record_result(&self.recorder, PORT, "list_files", &input, &result);
            result
        })
    }

    fn start_upload<'a>(&'a self, metadata: &'a UploadMetadata) -> ApiFuture<'a, String> {
        Box::pin(async move {
            let result = self.inner.start_upload(metadata).await;
            record_result(&self.recorder, PORT, "start_upload", metadata, &result);
            result
        })
    }

    fn finish_upload<'a>(
        &'a self,
        upload_url: &'a str,
        data: &'a [u8],
    ) -> ApiFuture<'a, RemoteFile> {
        Box::pin(async move {
            let result = self.inner.finish_upload(upload_url, data).await;
            let input = json!({ "upload_url": upload_url, "payload": payload_summary(data) });
            record_result(&self.recorder, PORT, "finish_upload", &input, &result);
            result
        })
    }

    fn generate_content<'a>(
        &'a self,
        model: &'a str,
        request: &'a GenerateContentRequest,
    ) -> ApiFuture<'a, GenerateContentResponse> {
        Box::pin(async move {
            let result = self.inner.generate_content(model, request).await;
            let input = json!({ "model": model, "request": request });
            record_result(&self.recorder, PORT, "generate_content", &input, &result);
            result
        })
    }
}
