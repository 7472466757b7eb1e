//! Imgdescgen - AI image descriptions written into image metadata.
//!
//! Images are re-encoded as JPEG and sent to a Gemini vision model, either
//! inline or through the Files API when the batch is too large. The model
//! answers with one description and a keyword list per image; optionally
//! the description is written into the `ImageDescription` tag of a copy of
//! each image with `exiftool`.
//!
//! ```no_run
//! use imgdescgen::{ExifTool, GeminiClient, GeminiConfig, ImgDescGen, ServiceContext};
//!
//! # async fn run() -> imgdescgen::Result<()> {
//! let config = GeminiConfig::resolve(&Default::default(), |k| std::env::var(k).ok())?;
//! let ctx = ServiceContext::live(&config)?;
//! let gen = ImgDescGen::new(GeminiClient::new(config, ctx.api), ExifTool::default());
//! let descriptions = gen.generate_image_description(&["photo.jpg"], None, false).await?;
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod cassette;
pub mod chatbot;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod exiftool;
pub mod image;
pub mod images;
pub mod imgdescgen;
pub mod logging;
pub mod model;
pub mod ports;
pub mod schemas;

#[cfg(test)]
mod test_support;

pub use crate::chatbot::{Chatbot, GeminiClient, TransportMode};
pub use crate::config::{Config, GeminiConfig};
pub use crate::context::ServiceContext;
pub use crate::error::{Error, ErrorKind, Result};
pub use crate::exiftool::ExifTool;
pub use crate::images::Images;
pub use crate::imgdescgen::ImgDescGen;
pub use crate::model::ModelName;
pub use crate::schemas::ImageDescription;
