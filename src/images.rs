//! An ordered batch of images and the batch metadata writer.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::exiftool::{csv_field, ExifTool, DESCRIPTION_TAG};
use crate::image::Image;
use crate::schemas::ImageDescription;

const METADATA_CSV: &str = "metadata.csv";

/// Subdirectory of the staging directory exiftool writes into.
const TOOL_OUTPUT_DIR: &str = "out";

/// Ordered collection of images. Position is identity: the `i`-th
/// description always belongs to the `i`-th image.
#[derive(Debug)]
pub struct Images {
    images: Vec<Image>,
    common_dir: Option<PathBuf>,
    staging: OnceLock<StagingDir>,
}

impl Images {
    /// Load every path in order.
    ///
    /// # Errors
    ///
    /// Returns the first load failure.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Result<Self, Error> {
        let images =
            paths.iter().map(|p| Image::load(p.as_ref())).collect::<Result<Vec<_>, _>>()?;
        let common_dir = common_parent(images.iter().map(Image::path));
        debug!(count = images.len(), common_dir = ?common_dir, "loaded images");
        Ok(Self { images, common_dir, staging: OnceLock::new() })
    }

    /// Number of images.
    #[must_use]
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// True when the batch is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Iterate over the images in input order.
    pub fn iter(&self) -> std::slice::Iter<'_, Image> {
        self.images.iter()
    }

    /// The directory every image lives in, if they share one.
    #[must_use]
    pub fn common_dir(&self) -> Option<&Path> {
        self.common_dir.as_deref()
    }

    /// Sum of the encoded sizes of all images at their current quality.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ImageEncode`] if an image cannot be encoded.
    pub fn calculate_total_size(&self) -> Result<u64, Error> {
        self.images.iter().map(Image::size_bytes).sum()
    }

    /// Reduce the quality of every image.
    pub fn reduce_quality(&mut self) {
        for img in &mut self.images {
            img.reduce_quality();
        }
    }

    /// Base64 of every image, in order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ImageEncode`] if an image cannot be encoded.
    pub fn encode_base64_all(&self) -> Result<Vec<String>, Error> {
        self.images.iter().map(Image::encode_base64).collect()
    }

    /// Copy every image into `output_directory` with its description set,
    /// using a single exiftool run.
    ///
    /// Images that do not share a directory are first copied into the
    /// private staging directory so exiftool sees one flat set of files.
    /// exiftool writes into the staging directory too; the results are moved
    /// into `output_directory` only once every image has been written, so a
    /// failed run leaves no output behind.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DescriptionCountMismatch`] if the lengths differ,
    /// [`Error::ImageTool`] if exiftool fails, two images share a file name,
    /// or an output file already exists, or an I/O error from staging.
    pub fn write_description_metadata(
        &self,
        descriptions: &[ImageDescription],
        exiftool: &ExifTool,
        output_directory: &Path,
    ) -> Result<Vec<PathBuf>, Error> {
        if descriptions.len() != self.images.len() {
            return Err(Error::DescriptionCountMismatch {
                expected: self.images.len(),
                actual: descriptions.len(),
            });
        }
        if self.images.is_empty() {
            return Ok(Vec::new());
        }

        let names = self.unique_filenames()?;
        let written: Vec<PathBuf> = names.iter().map(|name| output_directory.join(name)).collect();
        if let Some(existing) = written.iter().find(|p| p.exists()) {
            return Err(Error::ImageTool(format!(
                "output file {} already exists",
                existing.display()
            )));
        }

        let staging = self.staging()?;
        let sources = if self.common_dir.is_some() {
            self.images.iter().map(|img| img.path().to_path_buf()).collect()
        } else {
            debug!(staging = %staging.path().display(), "staging images from different directories");
            self.images.iter().map(|img| img.save(staging.path())).collect::<Result<Vec<_>, _>>()?
        };

        let csv_path = staging.path().join(METADATA_CSV);
        write_metadata_csv(&csv_path, &sources, descriptions)?;

        let tool_output = staging.path().join(TOOL_OUTPUT_DIR);
        std::fs::create_dir_all(&tool_output)?;
        exiftool.write_csv(&csv_path, &tool_output, &sources)?;

        let produced: Vec<PathBuf> = names.iter().map(|name| tool_output.join(name)).collect();
        publish(&produced, &written, output_directory)?;
        info!(count = written.len(), output = %output_directory.display(), "wrote image descriptions");
        Ok(written)
    }

    /// Read the description tag of every source image, in order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ImageTool`] if exiftool is missing or fails.
    pub fn read_descriptions(&self, exiftool: &ExifTool) -> Result<Vec<Option<String>>, Error> {
        let paths: Vec<PathBuf> = self.images.iter().map(|img| img.path().to_path_buf()).collect();
        exiftool.read_descriptions(&paths)
    }

    /// File names of the images; they become the output names, so they
    /// must not collide.
    fn unique_filenames(&self) -> Result<Vec<String>, Error> {
        let mut seen = HashSet::new();
        self.images
            .iter()
            .map(|img| {
                let name = img.filename();
                if seen.insert(name.clone()) {
                    Ok(name)
                } else {
                    Err(Error::ImageTool(format!(
                        "two images are named '{name}'; output files would collide"
                    )))
                }
            })
            .collect()
    }

    /// The staging directory, created on first use.
    fn staging(&self) -> Result<&StagingDir, Error> {
        if let Some(staging) = self.staging.get() {
            return Ok(staging);
        }
        let staging = StagingDir::new()?;
        Ok(self.staging.get_or_init(|| staging))
    }
}

impl<'a> IntoIterator for &'a Images {
    type Item = &'a Image;
    type IntoIter = std::slice::Iter<'a, Image>;

    fn into_iter(self) -> Self::IntoIter {
        self.images.iter()
    }
}

fn write_metadata_csv(
    path: &Path,
    sources: &[PathBuf],
    descriptions: &[ImageDescription],
) -> Result<(), Error> {
    let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
    writeln!(file, "SourceFile,{DESCRIPTION_TAG}")?;
    for (source, description) in sources.iter().zip(descriptions) {
        writeln!(
            file,
            "{},{}",
            csv_field(&source.to_string_lossy()),
            csv_field(&description.description)
        )?;
    }
    file.flush()?;
    Ok(())
}

/// Move finished files into `output_directory`. If any move fails, the
/// files already moved are removed again.
fn publish(produced: &[PathBuf], written: &[PathBuf], output_directory: &Path) -> Result<(), Error> {
    std::fs::create_dir_all(output_directory)?;
    for (done, (from, to)) in produced.iter().zip(written).enumerate() {
        if let Err(e) = move_file(from, to) {
            for moved in &written[..done] {
                if let Err(cleanup) = std::fs::remove_file(moved) {
                    warn!(path = %moved.display(), error = %cleanup, "failed to remove partial output");
                }
            }
            return Err(e.into());
        }
    }
    Ok(())
}

/// Rename, falling back to copy + delete across file systems.
fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }
    std::fs::copy(from, to)?;
    std::fs::remove_file(from)
}

/// The parent directory shared by every path, or `None` if they differ or
/// there are no paths.
fn common_parent<'a>(paths: impl IntoIterator<Item = &'a Path>) -> Option<PathBuf> {
    let mut common: Option<PathBuf> = None;
    for path in paths {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        match &common {
            None => common = Some(parent),
            Some(dir) if *dir == parent => {}
            Some(_) => return None,
        }
    }
    common
}

/// Temporary directory removed on drop. Removal failures are logged, never
/// propagated.
#[derive(Debug)]
pub(crate) struct StagingDir {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl StagingDir {
    pub(crate) fn new() -> Result<Self, Error> {
        let dir = tempfile::Builder::new().prefix("imgdescgen-").tempdir()?;
        let path = dir.path().to_path_buf();
        Ok(Self { dir: Some(dir), path })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            if let Err(e) = dir.close() {
                warn!(path = %self.path.display(), error = %e, "failed to remove staging directory");
            }
        }
    }
}
