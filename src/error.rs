//! Unified error type for imgdescgen.
//!
//! Every failure is one variant of [`Error`]. Callers that need to react to a
//! family of failures (for example "anything the HTTP layer rejected") use
//! [`Error::kind`] or the `is_*` predicates instead of matching status codes.

use std::path::PathBuf;

use thiserror::Error;

/// HTTP status the Gemini API returns when a request body is too large.
pub const STATUS_PAYLOAD_TOO_LARGE: u16 = 413;

/// Errors that can occur while describing images.
#[derive(Debug, Error)]
pub enum Error {
    /// An image file could not be read or decoded.
    #[error("Failed to load image {}: {message}", path.display())]
    ImageLoad {
        /// Path of the image.
        path: PathBuf,
        /// Decoder or I/O message.
        message: String,
    },

    /// An image could not be re-encoded for transfer.
    #[error("Failed to encode image {}: {message}", path.display())]
    ImageEncode {
        /// Path of the image.
        path: PathBuf,
        /// Encoder message.
        message: String,
    },

    /// The metadata tool is missing or exited with an error.
    #[error("Image tool error: {0}")]
    ImageTool(String),

    /// The API answered with a non-success status.
    #[error("HTTP request failed ({status}): {body}")]
    Transport {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The API rejected the request body as too large (HTTP 413).
    #[error("Payload too large ({STATUS_PAYLOAD_TOO_LARGE}): {body}")]
    PayloadTooLarge {
        /// Response body.
        body: String,
    },

    /// No model is configured.
    #[error(
        "Model name is required to use Gemini. Set GEMINI_MODEL_NAME, add it to the config file, or pass --model."
    )]
    ModelRequired,

    /// The model did not produce a usable answer.
    #[error("Chatbot error: {0}")]
    Chatbot(String),

    /// The model's answer did not match the description schema.
    #[error("Failed to parse image descriptions: {0}")]
    Parse(#[source] serde_json::Error),

    /// The number of descriptions does not match the number of images.
    #[error("Expected {expected} image descriptions, got {actual}")]
    DescriptionCountMismatch {
        /// Number of images.
        expected: usize,
        /// Number of descriptions.
        actual: usize,
    },

    /// A network error occurred before a response was received.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// No API key configured.
    #[error("No API key for Gemini. Set {env_var} or add it to config file.")]
    MissingApiKey {
        /// The environment variable name.
        env_var: String,
    },

    /// A recorded cassette could not be loaded or replayed.
    #[error("Cassette error: {0}")]
    Cassette(String),
}

/// Discriminant of [`Error`], for callers that branch on the failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// See [`Error::ImageLoad`].
    ImageLoad,
    /// See [`Error::ImageEncode`].
    ImageEncode,
    /// See [`Error::ImageTool`].
    ImageTool,
    /// See [`Error::Transport`].
    Transport,
    /// See [`Error::PayloadTooLarge`].
    PayloadTooLarge,
    /// See [`Error::ModelRequired`].
    ModelRequired,
    /// See [`Error::Chatbot`].
    Chatbot,
    /// See [`Error::Parse`].
    Parse,
    /// See [`Error::DescriptionCountMismatch`].
    DescriptionCountMismatch,
    /// See [`Error::Network`].
    Network,
    /// See [`Error::Io`].
    Io,
    /// See [`Error::Config`].
    Config,
    /// See [`Error::MissingApiKey`].
    MissingApiKey,
    /// See [`Error::Cassette`].
    Cassette,
}

impl Error {
    /// Classify a non-success HTTP status.
    ///
    /// 413 becomes [`Error::PayloadTooLarge`], everything else
    /// [`Error::Transport`].
    #[must_use]
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        if status == STATUS_PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge { body }
        } else {
            Self::Transport { status, body }
        }
    }

    /// The kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ImageLoad { .. } => ErrorKind::ImageLoad,
            Self::ImageEncode { .. } => ErrorKind::ImageEncode,
            Self::ImageTool(_) => ErrorKind::ImageTool,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            Self::ModelRequired => ErrorKind::ModelRequired,
            Self::Chatbot(_) => ErrorKind::Chatbot,
            Self::Parse(_) => ErrorKind::Parse,
            Self::DescriptionCountMismatch { .. } => ErrorKind::DescriptionCountMismatch,
            Self::Network(_) => ErrorKind::Network,
            Self::Io(_) => ErrorKind::Io,
            Self::Config(_) => ErrorKind::Config,
            Self::MissingApiKey { .. } => ErrorKind::MissingApiKey,
            Self::Cassette(_) => ErrorKind::Cassette,
        }
    }

    /// HTTP status of a transport failure, if the server answered.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => Some(*status),
            Self::PayloadTooLarge { .. } => Some(STATUS_PAYLOAD_TOO_LARGE),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// True for every failure of the HTTP exchange, including 413.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self.kind(), ErrorKind::Transport | ErrorKind::PayloadTooLarge | ErrorKind::Network)
    }

    /// True when the request was rejected for its size. The caller can
    /// shrink the batch or reduce quality and try again.
    #[must_use]
    pub fn is_payload_too_large(&self) -> bool {
        self.kind() == ErrorKind::PayloadTooLarge
    }

    /// True for every failure on the provider side of the pipeline.
    #[must_use]
    pub fn is_chatbot(&self) -> bool {
        self.is_transport()
            || matches!(
                self.kind(),
                ErrorKind::ModelRequired
                    | ErrorKind::Chatbot
                    | ErrorKind::Parse
                    | ErrorKind::DescriptionCountMismatch
            )
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
