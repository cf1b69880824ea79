//! Input validation: the source must be a regular file and the destination an
//! existing directory.
//!
//! The check is advisory. A file can disappear or lose permissions between
//! here and the read in [`crate::pipeline::ocr`]; that later failure surfaces
//! as a system error rather than being caught here.

use crate::error::Paper2MdError;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Paths that passed [`validate_paths`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPaths {
    pub input: PathBuf,
    pub out_dir: PathBuf,
}

/// Check that `input` is an existing regular file and `out_dir` an existing
/// directory, in that order.
pub fn validate_paths(
    input: impl AsRef<Path>,
    out_dir: impl AsRef<Path>,
) -> Result<ValidatedPaths, Paper2MdError> {
    let input = input.as_ref();
    let out_dir = out_dir.as_ref();

    match std::fs::metadata(input) {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => {
            return Err(Paper2MdError::validation(format!(
                "Input path is not a regular file: '{}'",
                input.display()
            )))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(Paper2MdError::validation(format!(
                "Input file does not exist: '{}'",
                input.display()
            )))
        }
        Err(e) => {
            return Err(Paper2MdError::validation(format!(
                "Cannot access input file '{}': {}",
                input.display(),
                e
            )))
        }
    }

    match std::fs::metadata(out_dir) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            return Err(Paper2MdError::validation(format!(
                "Output path is not a directory: '{}'",
                out_dir.display()
            )))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(Paper2MdError::validation(format!(
                "Output directory does not exist: '{}'",
                out_dir.display()
            )))
        }
        Err(e) => {
            return Err(Paper2MdError::validation(format!(
                "Cannot access output directory '{}': {}",
                out_dir.display(),
                e
            )))
        }
    }

    debug!(
        "Validated input '{}' and output directory '{}'",
        input.display(),
        out_dir.display()
    );

    Ok(ValidatedPaths {
        input: input.to_path_buf(),
        out_dir: out_dir.to_path_buf(),
    })
}
