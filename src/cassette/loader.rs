//! Reading cassettes back from disk.

use std::path::Path;

use super::format::Cassette;
use super::replayer::CassetteReplayer;
use crate::error::Error;

/// Parse the cassette at `path`.
///
/// # Errors
///
/// Returns [`Error::Cassette`] naming the path if the file cannot be read
/// or is not a cassette.
pub fn read_cassette(path: &Path) -> Result<Cassette, Error> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Cassette(format!("Failed to read {}: {e}", path.display())))?;
    serde_yaml::from_str(&content)
        .map_err(|e| Error::Cassette(format!("Failed to parse {}: {e}", path.display())))
}

/// Load the cassette at `path` and wrap it in a replayer.
///
/// # Errors
///
/// See [`read_cassette`].
pub fn load_cassette(path: &Path) -> Result<CassetteReplayer, Error> {
    let cassette = read_cassette(path)?;
    tracing::debug!(
        cassette = %cassette.name,
        interactions = cassette.interactions.len(),
        "loaded cassette"
    );
    Ok(CassetteReplayer::new(&cassette))
}
