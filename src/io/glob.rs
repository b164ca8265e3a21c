//! Expanding glob patterns into flow source files.
//!
//! CIDDS ships one CSV per week (`week1.csv`, `week2.csv`, ...). A reader can
//! be pointed at a pattern such as `traffic/week*.csv` and will consume the
//! matches in sorted order.

use crate::error::Result;
use std::io;
use std::path::PathBuf;

/// Expand `pattern` into a sorted list of matching regular files.
///
/// No matches is not an error; the result is simply empty.
///
/// # Errors
/// Returns an error if the pattern is invalid or a directory cannot be read.
pub fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob::glob(pattern).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid glob pattern {pattern:?}: {e}"),
        )
    })?;

    let mut result = Vec::new();
    for entry in paths {
        let path = entry.map_err(io::Error::from)?;
        if path.is_file() {
            result.push(path);
        }
    }
    result.sort();
    Ok(result)
}
