//! Description generation facade: load, describe, optionally write back.

use std::path::Path;

use tracing::{debug, info};

use crate::chatbot::Chatbot;
use crate::error::Error;
use crate::exiftool::ExifTool;
use crate::images::Images;
use crate::schemas::ImageDescription;

/// Ties a [`Chatbot`] to the metadata tool used for writing descriptions.
pub struct ImgDescGen<C: Chatbot> {
    chatbot: C,
    exiftool: ExifTool,
}

impl<C: Chatbot> ImgDescGen<C> {
    /// Facade over `chatbot`, writing metadata with `exiftool`.
    #[must_use]
    pub fn new(chatbot: C, exiftool: ExifTool) -> Self {
        Self { chatbot, exiftool }
    }

    /// The wrapped chatbot.
    #[must_use]
    pub fn chatbot(&self) -> &C {
        &self.chatbot
    }

    /// Describe every image in `paths`, in order.
    ///
    /// With `reduce_quality` the images are re-encoded at reduced quality
    /// before sending. With `output_dir` a copy of each image carrying its
    /// description is written there. Any failure aborts the whole batch.
    ///
    /// # Errors
    ///
    /// Returns the first load, chatbot or metadata tool error.
    pub async fn generate_image_description<P: AsRef<Path>>(
        &self,
        paths: &[P],
        output_dir: Option<&Path>,
        reduce_quality: bool,
    ) -> Result<Vec<ImageDescription>, Error> {
        let mut images = Images::load(paths)?;
        if reduce_quality {
            debug!("reducing image quality");
            images.reduce_quality();
        }

        let descriptions = self.chatbot.generate_image_description(&images).await?;
        info!(count = descriptions.len(), "generated image descriptions");

        if let Some(dir) = output_dir {
            images.write_description_metadata(&descriptions, &self.exiftool, dir)?;
        }
        Ok(descriptions)
    }
}
