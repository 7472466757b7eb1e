//! Helpers shared by unit tests.

use std::path::{Path, PathBuf};

use crate::exiftool::ExifTool;

/// Write a JPEG with a deterministic, non-uniform pattern.
pub(crate) fn write_test_jpeg(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        let v = x.wrapping_mul(31) ^ y.wrapping_mul(17);
        image::Rgb([(v % 256) as u8, ((x * 7 + y) % 256) as u8, ((y * 13) % 256) as u8])
    });
    let path = dir.join(name);
    image::DynamicImage::ImageRgb8(img).save_with_format(&path, image::ImageFormat::Jpeg).unwrap();
    path
}

/// The system exiftool, or `None` (and a note on stderr) when it is not
/// installed.
pub(crate) fn exiftool_or_skip() -> Option<ExifTool> {
    let tool = ExifTool::default();
    if tool.is_available() {
        Some(tool)
    } else {
        eprintln!("exiftool not found on PATH, skipping");
        None
    }
}

/// A shell script standing in for exiftool. It logs its arguments, one per
/// line, to `args.log` in `dir` and keeps a copy of the `-csv=` file as
/// `seen.csv`. Every source after `-o <dir>` is copied into that directory.
/// With `fail_after_first`, it exits 1 right after the first copy.
#[cfg(unix)]
pub(crate) fn fake_exiftool(dir: &Path, fail_after_first: bool) -> ExifTool {
    use std::os::unix::fs::PermissionsExt;

    const SCRIPT: &str = r#"#!/bin/sh
: > "@DIR@/args.log"
for a in "$@"; do printf '%s\n' "$a" >> "@DIR@/args.log"; done
out=""
while [ $# -gt 0 ]; do
  case "$1" in
    -csv=*) cp "${1#-csv=}" "@DIR@/seen.csv"; shift ;;
    -o) out="$2"; shift 2 ;;
    *)
      cp "$1" "$out" || exit 1
      if [ "@FAIL@" = "1" ]; then echo "Error: simulated failure" >&2; exit 1; fi
      shift ;;
  esac
done
"#;

    let script = SCRIPT
        .replace("@DIR@", &dir.to_string_lossy())
        .replace("@FAIL@", if fail_after_first { "1" } else { "0" });
    let path = dir.join("fake-exiftool");
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    ExifTool::new(path)
}
