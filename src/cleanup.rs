//! Removal of the downloaded image.

use std::io;
use std::path::Path;

use tracing::info;

use crate::{Error, Result};

/// OS error description without the trailing ` (os error N)`.
fn os_message(err: &io::Error) -> String {
    let message = err.to_string();
    match err.raw_os_error() {
        Some(code) => message
            .strip_suffix(&format!(" (os error {})", code))
            .map(str::to_string)
            .unwrap_or(message),
        None => message,
    }
}

/// Delete `path`, reporting OS failures as [`Error::File`].
pub async fn delete_file(path: &Path) -> Result<()> {
    tokio::fs::remove_file(path)
        .await
        .map_err(|e| Error::File {
            path: path.to_path_buf(),
            message: os_message(&e),
        })?;

    info!(path = %path.display(), "Temporary image removed");
    Ok(())
}
