//! Sequential file download with basic-auth support.

use std::path::{Path, PathBuf};

use reqwest::Url;
use tracing::{info, warn};

use crate::config::BasicAuthConfig;
use crate::error::{Result, UploaderError};

/// Download each URL into `output_dir`.
///
/// Individual failures are logged and skipped; the returned list holds
/// only the files that made it to disk.
pub async fn download_files(
    http: &reqwest::Client,
    urls: &[String],
    output_dir: &Path,
    auth: Option<&BasicAuthConfig>,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)?;

    let mut downloaded: Vec<PathBuf> = Vec::new();
    for url in urls {
        let filename = url_filename(url).unwrap_or_else(|| format!("download_{}", downloaded.len()));
        let output_path = unique_path(output_dir, &filename);
        match download_file(http, url, &output_path, auth).await {
            Ok(()) => {
                info!(url = %url, path = %output_path.display(), "downloaded");
                downloaded.push(output_path);
            }
            Err(e) => {
                warn!(url = %url, error = %e, "failed to download, skipping");
            }
        }
    }
    Ok(downloaded)
}

async fn download_file(
    http: &reqwest::Client,
    url: &str,
    output_path: &Path,
    auth: Option<&BasicAuthConfig>,
) -> Result<()> {
    let mut request = http.get(url);
    if let Some(auth) = auth {
        request = request.basic_auth(&auth.username, Some(&auth.password));
    }
    let response = request
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|source| UploaderError::Request {
            endpoint: url.to_string(),
            source,
        })?;

    // An HTML body here means an error or login page, not the file.
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_lowercase();
    if content_type.contains("text/html") {
        return Err(UploaderError::UnexpectedResponse {
            endpoint: url.to_string(),
            reason: "received HTML response, check credentials or URL".to_string(),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|source| UploaderError::Request {
            endpoint: url.to_string(),
            source,
        })?;
    tokio::fs::write(output_path, &bytes).await?;
    Ok(())
}

/// Last non-empty path segment of the URL, if any.
fn url_filename(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let name = parsed
        .path_segments()?
        .filter(|s| !s.is_empty())
        .last()?
        .to_string();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Suffix the filename with a counter until it no longer collides.
fn unique_path(dir: &Path, filename: &str) -> PathBuf {
    let candidate = dir.join(filename);
    if !candidate.exists() {
        return candidate;
    }
    let original = candidate.clone();
    let stem = original
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = original
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let mut counter = 1;
    loop {
        let candidate = dir.join(format!("{}_{}{}", stem, counter, extension));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}
