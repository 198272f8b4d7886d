//! File access for encrypted configs. A candidate path that cannot be read is
//! skipped; anything that goes wrong after the bytes are in hand is the
//! loader's error and ends the whole batch.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::CryptError;

/// Reads each candidate in order and hands its bytes to `load`. Returns the
/// paths that were read and loaded.
pub(crate) fn read_all<P, L>(paths: &[P], mut load: L) -> Result<Vec<PathBuf>, CryptError>
where
    P: AsRef<Path>,
    L: FnMut(&Path, Vec<u8>) -> Result<(), CryptError>,
{
    let mut read_ok = Vec::new();
    for path in paths {
        let path = path.as_ref();
        let blob = match fs::read(path) {
            Ok(blob) => blob,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "skipping unreadable config candidate");
                continue;
            }
        };
        load(path, blob)?;
        read_ok.push(path.to_path_buf());
    }
    Ok(read_ok)
}

/// Writes the whole blob in one call.
pub(crate) fn write_one<W: Write>(writer: &mut W, blob: &[u8]) -> Result<(), CryptError> {
    writer.write_all(blob)?;
    writer.flush()?;
    Ok(())
}

pub(crate) fn write_path(path: &Path, blob: &[u8]) -> Result<(), CryptError> {
    fs::write(path, blob)?;
    debug!(path = %path.display(), bytes = blob.len(), "wrote encrypted config");
    Ok(())
}
