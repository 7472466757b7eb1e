//! Subprocess wrapper around the `exiftool` command-line utility.

use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::Value;
use tracing::debug;

use crate::error::Error;

/// Tag the generated description is stored in.
pub const DESCRIPTION_TAG: &str = "EXIF:ImageDescription";

/// Handle to an exiftool executable.
#[derive(Debug, Clone)]
pub struct ExifTool {
    program: PathBuf,
}

impl Default for ExifTool {
    fn default() -> Self {
        Self { program: PathBuf::from("exiftool") }
    }
}

impl ExifTool {
    /// Use the executable at `program`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into() }
    }

    /// Path of the executable.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Whether the executable can be started.
    #[must_use]
    pub fn is_available(&self) -> bool {
        Command::new(&self.program).arg("-ver").output().is_ok_and(|o| o.status.success())
    }

    /// Run exiftool with the given arguments and return its stdout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ImageTool`] if the executable is missing or exits
    /// with a non-zero status.
    pub fn run<I, S>(&self, args: I) -> Result<String, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut command = Command::new(&self.program);
        command.args(args);
        debug!(command = ?command, "running exiftool");

        let output = command.output().map_err(|e| match e.kind() {
            ErrorKind::NotFound => {
                Error::ImageTool(format!("executable not found: {}", self.program.display()))
            }
            _ => Error::ImageTool(format!("failed to start {}: {e}", self.program.display())),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::ImageTool(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Copy `source` to `destination` with the description tag set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ImageTool`] if the tool fails, including when
    /// `destination` already exists.
    pub fn write_description(
        &self,
        source: &Path,
        destination: &Path,
        description: &str,
    ) -> Result<(), Error> {
        let tag = format!("-{DESCRIPTION_TAG}={description}");
        self.run([
            OsStr::new(&tag),
            OsStr::new("-o"),
            destination.as_os_str(),
            source.as_os_str(),
        ])?;
        Ok(())
    }

    /// Apply the tags listed in `csv` to `sources`, writing the results into
    /// `output_dir` under their original file names.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ImageTool`] if the tool fails.
    pub fn write_csv(&self, csv: &Path, output_dir: &Path, sources: &[PathBuf]) -> Result<(), Error> {
        let mut args: Vec<OsString> = vec![
            format!("-csv={}", csv.display()).into(),
            "-o".into(),
            dir_argument(output_dir),
        ];
        args.extend(sources.iter().map(|p| p.as_os_str().to_os_string()));
        self.run(args)?;
        Ok(())
    }

    /// Read the description tag of each file, in the order given.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ImageTool`] if the tool fails or prints output that
    /// is not the expected JSON.
    pub fn read_descriptions(&self, paths: &[PathBuf]) -> Result<Vec<Option<String>>, Error> {
        if paths.is_empty() {
            return Ok(Vec::new());
        }

        let mut args: Vec<OsString> =
            vec!["-json".into(), format!("-{DESCRIPTION_TAG}").into()];
        args.extend(paths.iter().map(|p| p.as_os_str().to_os_string()));
        let stdout = self.run(args)?;

        let entries: Vec<HashMap<String, Value>> = serde_json::from_str(&stdout)
            .map_err(|e| Error::ImageTool(format!("unexpected exiftool output: {e}")))?;

        let mut by_source: HashMap<String, Option<String>> = entries
            .into_iter()
            .filter_map(|mut entry| {
                let source = entry.remove("SourceFile")?.as_str()?.to_string();
                let description = entry.remove("ImageDescription").map(|v| match v {
                    Value::String(s) => s,
                    other => other.to_string(),
                });
                Some((source, description))
            })
            .collect();

        Ok(paths
            .iter()
            .map(|p| by_source.remove(p.to_string_lossy().as_ref()).flatten())
            .collect())
    }
}

/// exiftool treats an `-o` argument ending in a separator as a directory.
fn dir_argument(dir: &Path) -> OsString {
    let mut arg = dir.as_os_str().to_os_string();
    if !arg.to_string_lossy().ends_with(std::path::MAIN_SEPARATOR) {
        arg.push(std::path::MAIN_SEPARATOR_STR);
    }
    arg
}

/// Quote a field for a CSV file (RFC 4180).
pub(crate) fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
