//! ZIP extraction into the submission base directory.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::Result;

/// Extract every archive into `extract_base_dir`.
///
/// A corrupt or unreadable archive is logged and skipped so one bad
/// download cannot sink the batch.
pub fn extract_zip_files(zip_paths: &[PathBuf], extract_base_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(extract_base_dir)?;

    for zip_path in zip_paths {
        match extract_zip_file(zip_path, extract_base_dir) {
            Ok(()) => info!(archive = %zip_path.display(), to = %extract_base_dir.display(), "extracted"),
            Err(e) => warn!(archive = %zip_path.display(), error = %e, "failed to extract, skipping"),
        }
    }

    Ok(extract_base_dir.to_path_buf())
}

fn extract_zip_file(zip_path: &Path, extract_dir: &Path) -> Result<()> {
    let file = std::fs::File::open(zip_path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    archive.extract(extract_dir)?;
    Ok(())
}
