//! Fixture files on the host: scanner cache directory, captured tool output
//! and reference comparison.

use std::path::{Path, PathBuf};

use tracing::debug;

use sonarcheck_core::error::{CheckError, HarnessError};

/// Creates the scanner cache directory if it does not exist yet.
pub async fn ensure_cache_dir(path: &Path) -> Result<(), HarnessError> {
    if tokio::fs::try_exists(path).await? {
        return Ok(());
    }
    debug!(path = %path.display(), "creating scanner cache directory");
    tokio::fs::create_dir_all(path).await?;
    Ok(())
}

/// Writes captured output, creating parent directories as needed.
pub async fn store_output(path: &Path, content: &str) -> Result<(), HarnessError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, content).await?;
    Ok(())
}

/// Byte-for-byte comparison of two files.
pub async fn files_identical(a: &Path, b: &Path) -> std::io::Result<bool> {
    let (left, right) = tokio::try_join!(tokio::fs::read(a), tokio::fs::read(b))?;
    Ok(left == right)
}

/// Fails with `CheckError::OutputMismatch` unless `actual` equals `reference`.
pub async fn compare_with_reference(actual: PathBuf, reference: PathBuf) -> Result<(), HarnessError> {
    if files_identical(&actual, &reference).await? {
        Ok(())
    } else {
        Err(CheckError::OutputMismatch { actual, reference }.into())
    }
}
