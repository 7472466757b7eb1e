//! A single image loaded for description.

use std::path::{Path, PathBuf};

use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use sha2::{Digest, Sha256};

use crate::error::Error;
use crate::exiftool::ExifTool;
use crate::schemas::ImageDescription;

/// MIME type of every encoded image sent to the provider.
pub const MIME_TYPE: &str = "image/jpeg";

/// JPEG quality used while the quality setting is [`Quality::Keep`].
pub const KEEP_JPEG_QUALITY: u8 = 100;

/// JPEG quality used after [`Image::reduce_quality`].
pub const REDUCED_QUALITY: u8 = 50;

/// Output quality for re-encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quality {
    /// Re-encode at the highest quality.
    #[default]
    Keep,
    /// Re-encode at the given JPEG quality (1-100).
    Level(u8),
}

impl Quality {
    fn jpeg_quality(self) -> u8 {
        match self {
            Self::Keep => KEEP_JPEG_QUALITY,
            Self::Level(q) => q.clamp(1, 100),
        }
    }
}

/// A decoded image and the settings used to re-encode it.
pub struct Image {
    path: PathBuf,
    pixels: DynamicImage,
    quality: Quality,
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("path", &self.path)
            .field("width", &self.pixels.width())
            .field("height", &self.pixels.height())
            .field("quality", &self.quality)
            .finish()
    }
}

impl Image {
    /// Load and decode the image at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ImageLoad`] if the file is missing or cannot be
    /// decoded.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let pixels = image::open(path)
            .map_err(|e| Error::ImageLoad { path: path.to_path_buf(), message: e.to_string() })?;
        Ok(Self { path: path.to_path_buf(), pixels, quality: Quality::Keep })
    }

    /// Source file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Source file name, used for uploads and output files.
    #[must_use]
    pub fn filename(&self) -> String {
        self.path
            .file_name()
            .map_or_else(|| "image.jpg".to_string(), |n| n.to_string_lossy().into_owned())
    }

    /// Current quality setting.
    #[must_use]
    pub fn quality(&self) -> Quality {
        self.quality
    }

    /// Switch to the reduced quality level. Calling it again has no effect.
    pub fn reduce_quality(&mut self) {
        self.quality = Quality::Level(REDUCED_QUALITY);
    }

    /// Re-encode the pixels as JPEG at the current quality.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ImageEncode`] if the encoder fails.
    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        let mut buf = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut buf, self.quality.jpeg_quality());
        DynamicImage::ImageRgb8(self.pixels.to_rgb8())
            .write_with_encoder(encoder)
            .map_err(|e| Error::ImageEncode { path: self.path.clone(), message: e.to_string() })?;
        Ok(buf)
    }

    /// Base64 of [`Image::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::ImageEncode`] if the encoder fails.
    pub fn encode_base64(&self) -> Result<String, Error> {
        Ok(base64::engine::general_purpose::STANDARD.encode(self.encode()?))
    }

    /// Byte length of [`Image::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::ImageEncode`] if the encoder fails.
    pub fn size_bytes(&self) -> Result<u64, Error> {
        Ok(self.encode()?.len() as u64)
    }

    /// Content hash of [`Image::encode`] in the form the Files API reports
    /// it: base64 of the lowercase hex SHA-256 digest.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ImageEncode`] if the encoder fails.
    pub fn sha256_hash(&self) -> Result<String, Error> {
        Ok(content_hash(&self.encode()?))
    }

    /// Copy the original file into `directory` under its own name.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the copy fails.
    pub fn save(&self, directory: &Path) -> Result<PathBuf, Error> {
        let destination = directory.join(self.filename());
        std::fs::copy(&self.path, &destination)?;
        Ok(destination)
    }

    /// Copy the image into `output_directory` with the description tag set.
    /// The source file is not modified.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ImageTool`] if exiftool is missing or fails, or an
    /// I/O error if the output directory cannot be created.
    pub fn write_description(
        &self,
        description: &ImageDescription,
        exiftool: &ExifTool,
        output_directory: &Path,
    ) -> Result<PathBuf, Error> {
        std::fs::create_dir_all(output_directory)?;
        let destination = output_directory.join(self.filename());
        exiftool.write_description(&self.path, &destination, &description.description)?;
        Ok(destination)
    }

    /// Read the description tag of the source file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ImageTool`] if exiftool is missing or fails.
    pub fn read_description(&self, exiftool: &ExifTool) -> Result<Option<String>, Error> {
        Ok(exiftool.read_descriptions(std::slice::from_ref(&self.path))?.pop().flatten())
    }
}

/// Base64 of the lowercase hex SHA-256 digest of `data`.
#[must_use]
pub fn content_hash(data: &[u8]) -> String {
    let hex = format!("{:x}", Sha256::digest(data));
    base64::engine::general_purpose::STANDARD.encode(hex)
}
