//! Wire types of the Gemini REST API.
//!
//! Request types serialize to exactly the shape `generateContent` expects;
//! response types accept what the API returns and ignore unknown fields.

use serde::{Deserialize, Serialize};

use crate::image::MIME_TYPE;

/// Finish reason of a candidate that completed normally.
pub const FINISH_REASON_STOP: &str = "STOP";

/// Generation methods a model must offer (any of them) to be listed as
/// supported.
pub const SUPPORTED_GENERATION_METHODS: &[&str] = &["generateContent", "countTokens"];

// --- generateContent request ---

/// Body of a `generateContent` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateContentRequest {
    /// Conversation turns; this crate always sends one.
    pub contents: Vec<Content>,
    /// Output settings.
    #[serde(rename = "generationConfig")]
    pub generation_config: GenerationConfig,
}

impl GenerateContentRequest {
    /// Single-turn request asking for a JSON answer.
    #[must_use]
    pub fn json(parts: Vec<Part>) -> Self {
        Self {
            contents: vec![Content { parts }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
            },
        }
    }

    /// All parts of the first turn.
    #[must_use]
    pub fn parts(&self) -> &[Part] {
        self.contents.first().map(|c| c.parts.as_slice()).unwrap_or_default()
    }
}

/// One request turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// Text and image parts, in order.
    pub parts: Vec<Part>,
}

/// Output settings. Snake case on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// MIME type of the answer.
    pub response_mime_type: String,
}

/// A request part: text, inline image bytes, or a reference to an uploaded
/// file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    /// Plain text.
    Text {
        /// The text.
        text: String,
    },
    /// Base64 image bytes embedded in the request.
    InlineData {
        /// The blob.
        #[serde(rename = "inlineData")]
        inline_data: Blob,
    },
    /// An image previously uploaded through the Files API.
    FileData {
        /// The reference.
        file_data: FileData,
    },
}

impl Part {
    /// Text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Inline JPEG part from base64 data.
    pub fn inline_jpeg(data: impl Into<String>) -> Self {
        Self::InlineData { inline_data: Blob { mime_type: MIME_TYPE.to_string(), data: data.into() } }
    }

    /// File reference part for an uploaded JPEG.
    pub fn file_jpeg(uri: impl Into<String>) -> Self {
        Self::FileData {
            file_data: FileData { mime_type: MIME_TYPE.to_string(), file_uri: uri.into() },
        }
    }
}

/// Inline bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blob {
    /// MIME type of the data.
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    /// Base64 data.
    pub data: String,
}

/// Uploaded file reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileData {
    /// MIME type of the file.
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    /// URI returned by the Files API.
    pub file_uri: String,
}

// --- generateContent response ---

/// Response of a `generateContent` call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    /// Generated candidates; the first is used.
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    /// Token accounting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_metadata: Option<UsageMetadata>,
}

/// One generated answer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// The answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<CandidateContent>,
    /// Why generation stopped, e.g. `"STOP"`, `"MAX_TOKENS"`, `"SAFETY"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Content of a candidate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateContent {
    /// Answer parts.
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
    /// Author role, usually `"model"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// One part of an answer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidatePart {
    /// Text, when the part is textual.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Token usage of a call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    /// Tokens in the prompt, images included.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_token_count: Option<u64>,
    /// Tokens generated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidates_token_count: Option<u64>,
    /// Total tokens billed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_token_count: Option<u64>,
}

// --- models ---

/// Model descriptor from the models listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Resource name, `models/{base-id}-{version}`.
    pub name: String,
    /// Human readable name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Maximum input tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_token_limit: Option<u64>,
    /// Maximum output tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_token_limit: Option<u64>,
    /// API methods the model supports.
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

/// A page of the models listing, or a filtered set of models.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelList {
    /// Models.
    #[serde(default)]
    pub models: Vec<Model>,
    /// Token for the next page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

impl ModelList {
    /// The model with exactly this resource name.
    #[must_use]
    pub fn get_model_by_name(&self, name: &str) -> Option<&Model> {
        self.models.iter().find(|m| m.name == name)
    }

    /// Models that support any of `methods`.
    #[must_use]
    pub fn filter_by_generation_methods(&self, methods: &[&str]) -> Self {
        let models = self
            .models
            .iter()
            .filter(|m| m.supported_generation_methods.iter().any(|s| methods.contains(&s.as_str())))
            .cloned()
            .collect();
        Self { models, next_page_token: None }
    }

    /// Models this library can use.
    #[must_use]
    pub fn supported_models(&self) -> Self {
        self.filter_by_generation_methods(SUPPORTED_GENERATION_METHODS)
    }
}

// --- files ---

/// A file stored through the Files API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    /// Resource name, `files/{id}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Name given at upload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// MIME type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Size in bytes (int64 encoded as a string).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<String>,
    /// URI to reference the file in a request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Base64 of the hex SHA-256 digest of the content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256_hash: Option<String>,
}

/// A page of the files listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileList {
    /// Files.
    #[serde(default)]
    pub files: Vec<RemoteFile>,
    /// Token for the next page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// Metadata declared when starting an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadMetadata {
    /// Name shown in the files listing.
    pub display_name: String,
    /// MIME type of the bytes.
    pub mime_type: String,
    /// Number of bytes that will be sent.
    pub content_length: u64,
}

/// Response of the finalizing upload call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadResponse {
    /// The stored file.
    #[serde(default)]
    pub file: Option<RemoteFile>,
}
