//! Local inputs: the CSV identity map and on-disk student files.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::warn;

use crate::config::NameUserMapConfig;
use crate::error::{Result, UploaderError};

/// Name and email attached to one CSV key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedUser {
    pub name: String,
    pub email: String,
}

/// Load the filename-key to name/email map from the configured CSV.
///
/// Rows with an empty key are skipped; missing columns are errors.
pub fn load_fname_user_map(config: &NameUserMapConfig) -> Result<BTreeMap<String, MappedUser>> {
    let mut reader = csv::Reader::from_path(&config.csv)?;
    let headers = reader.headers()?.clone();

    let column = |name: &str| -> Result<usize> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| UploaderError::CsvColumnMissing {
                column: name.to_string(),
            })
    };
    let key_idx = column(&config.key)?;
    let name_idx = column(&config.name)?;
    let email_idx = column(&config.email)?;

    let mut map = BTreeMap::new();
    for record in reader.records() {
        let record = record?;
        let key = record.get(key_idx).unwrap_or_default();
        if key.is_empty() {
            continue;
        }
        map.insert(
            key.to_string(),
            MappedUser {
                name: record.get(name_idx).unwrap_or_default().to_string(),
                email: record.get(email_idx).unwrap_or_default().to_string(),
            },
        );
    }
    Ok(map)
}

/// Discover student files under `base_dir`, grouped by the parent
/// directory name (the file key).
///
/// Returns `{ user_dir_name: { filename: path } }` with deterministic
/// (sorted) iteration order.
pub fn get_user_files(
    base_dir: &std::path::Path,
    pattern: &str,
) -> Result<BTreeMap<String, BTreeMap<String, PathBuf>>> {
    if !base_dir.is_dir() {
        return Err(UploaderError::BaseDirInvalid {
            path: base_dir.to_path_buf(),
        });
    }

    let full_pattern = base_dir.join(pattern).to_string_lossy().into_owned();
    let paths = glob::glob(&full_pattern).map_err(|source| UploaderError::GlobPattern {
        pattern: full_pattern.clone(),
        source,
    })?;

    let mut user_files: BTreeMap<String, BTreeMap<String, PathBuf>> = BTreeMap::new();
    for path in paths {
        let path = match path {
            Ok(path) => path,
            Err(e) => {
                warn!(error = %e, "skipping unreadable path while scanning files");
                continue;
            }
        };
        if !path.is_file() {
            continue;
        }
        let (Some(user_dir), Some(filename)) = (
            path.parent().and_then(|p| p.file_name()),
            path.file_name(),
        ) else {
            continue;
        };
        user_files
            .entry(user_dir.to_string_lossy().into_owned())
            .or_default()
            .insert(filename.to_string_lossy().into_owned(), path.clone());
    }
    Ok(user_files)
}
