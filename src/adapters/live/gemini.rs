//! Live adapter for the Gemini REST API.

use reqwest::header::HeaderMap;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::chatbot::schemas::{
    FileList, GenerateContentRequest, GenerateContentResponse, ModelList, RemoteFile,
    UploadMetadata, UploadResponse,
};
use crate::error::Error;
use crate::ports::gemini_api::{ApiFuture, GeminiApi};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";

const UPLOAD_URL_HEADER: &str = "x-goog-upload-url";

/// Live Gemini transport. One `reqwest::Client` is kept for the lifetime of
/// the adapter so connections are pooled across calls.
pub struct LiveGeminiApi {
    client: Client,
    api_key: String,
    base_url: String,
}

impl LiveGeminiApi {
    /// Create a transport with the given API key.
    #[must_use]
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, GEMINI_API_BASE)
    }

    /// Create a transport against another endpoint (proxies, test servers).
    #[must_use]
    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client: Client::new(), api_key, base_url }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("x-goog-api-key", &self.api_key)
    }

    /// Send, check the status, and parse the JSON body.
    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, Error> {
        let response = self.authorized(request).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        check_status(status, &body)?;
        serde_json::from_str(&body)
            .map_err(|e| Error::Chatbot(format!("Failed to parse response: {e}. Body: {}", truncate(&body))))
    }
}

/// Anything but 200 is a failure; 413 is reported as payload-too-large.
fn check_status(status: u16, body: &str) -> Result<(), Error> {
    if status == 200 {
        Ok(())
    } else {
        Err(Error::from_status(status, body))
    }
}

fn truncate(body: &str) -> String {
    if body.len() > 500 {
        let end = (0..=500).rev().find(|&i| body.is_char_boundary(i)).unwrap_or(0);
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}

impl GeminiApi for LiveGeminiApi {
    fn list_models<'a>(&'a self, page_token: Option<&'a str>) -> ApiFuture<'a, ModelList> {
        Box::pin(async move {
            let mut request = self.client.get(format!("{}/v1beta/models", self.base_url));
            if let Some(token) = page_token {
                request = request.query(&[("pageToken", token)]);
            }
            self.send_json(request).await
        })
    }

    fn list_files<'a>(&'a self, page_token: Option<&'a str>) -> ApiFuture<'a, FileList> {
        Box::pin(async move {
            let mut request = self.client.get(format!("{}/v1beta/files", self.base_url));
            if let Some(token) = page_token {
                request = request.query(&[("pageToken", token)]);
            }
            self.send_json(request).await
        })
    }

    fn start_upload<'a>(&'a self, metadata: &'a UploadMetadata) -> ApiFuture<'a, String> {
        Box::pin(async move {
            let body = serde_json::json!({
                "file": { "display_name": metadata.display_name }
            });
            let request = self
                .client
                .post(format!("{}/upload/v1beta/files", self.base_url))
                .header("X-Goog-Upload-Protocol", "resumable")
                .header("X-Goog-Upload-Command", "start")
                .header("X-Goog-Upload-Header-Content-Length", metadata.content_length.to_string())
                .header("X-Goog-Upload-Header-Content-Type", &metadata.mime_type)
                .json(&body);

            let response = self.authorized(request).send().await?;
            let status = response.status().as_u16();
            let upload_url = upload_url(response.headers());
            let text = response.text().await?;
            check_status(status, &text)?;

            upload_url
        })
    }

    fn finish_upload<'a>(
        &'a self,
        upload_url: &'a str,
        data: &'a [u8],
    ) -> ApiFuture<'a, RemoteFile> {
        Box::pin(async move {
            let request = self
                .client
                .post(upload_url)
                .header("Content-Length", data.len().to_string())
                .header("X-Goog-Upload-Offset", "0")
                .header("X-Goog-Upload-Command", "upload, finalize")
                .body(data.to_vec());

            let parsed: UploadResponse = self.send_json(request).await?;
            parsed.file.ok_or_else(|| Error::Chatbot("Upload response has no file".into()))
        })
    }

    fn generate_content<'a>(
        &'a self,
        model: &'a str,
        request: &'a GenerateContentRequest,
    ) -> ApiFuture<'a, GenerateContentResponse> {
        Box::pin(async move {
            let url = format!("{}/v1beta/{model}:generateContent", self.base_url);
            self.send_json(self.client.post(&url).json(request)).await
        })
    }
}

/// Session URL the server hands out for a resumable upload.
fn upload_url(headers: &HeaderMap) -> Result<String, Error> {
    headers
        .get(UPLOAD_URL_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| Error::Chatbot("Failed to get upload URL".into()))
}
