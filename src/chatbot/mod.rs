//! Vision model clients.

pub mod gemini;
pub mod schemas;

use std::future::Future;
use std::pin::Pin;

use crate::error::Error;
use crate::images::Images;
use crate::schemas::ImageDescription;

pub use gemini::{GeminiClient, TransportMode, INLINE_PAYLOAD_LIMIT};

/// Boxed future returned by [`Chatbot::generate_image_description`].
pub type DescribeFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<ImageDescription>, Error>> + Send + 'a>>;

/// Something that can describe a batch of images.
pub trait Chatbot: Send + Sync {
    /// One description per image, in the order of `images`.
    fn generate_image_description<'a>(&'a self, images: &'a Images) -> DescribeFuture<'a>;
}
