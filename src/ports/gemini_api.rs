//! Gemini API port: one method per remote endpoint.
//!
//! Implementations classify non-success responses with
//! [`Error::from_status`] so callers see the same error kinds whether the
//! call was live or replayed.

use std::future::Future;
use std::pin::Pin;

use crate::chatbot::schemas::{
    FileList, GenerateContentRequest, GenerateContentResponse, ModelList, RemoteFile,
    UploadMetadata,
};
use crate::error::Error;

/// Boxed future returned by every [`GeminiApi`] method.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, Error>> + Send + 'a>>;

/// Remote endpoints of the Gemini API used by the client.
pub trait GeminiApi: Send + Sync {
    /// One page of the models listing.
    fn list_models<'a>(&'a self, page_token: Option<&'a str>) -> ApiFuture<'a, ModelList>;

    /// One page of the files listing.
    fn list_files<'a>(&'a self, page_token: Option<&'a str>) -> ApiFuture<'a, FileList>;

    /// Start a resumable upload and return the upload URL.
    fn start_upload<'a>(&'a self, metadata: &'a UploadMetadata) -> ApiFuture<'a, String>;

    /// Send the bytes to an upload URL and finalize the upload.
    fn finish_upload<'a>(&'a self, upload_url: &'a str, data: &'a [u8])
        -> ApiFuture<'a, RemoteFile>;

    /// Call `generateContent` on `model` (a `models/...` resource name).
    fn generate_content<'a>(
        &'a self,
        model: &'a str,
        request: &'a GenerateContentRequest,
    ) -> ApiFuture<'a, GenerateContentResponse>;
}
