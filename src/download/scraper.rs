//! Directory-index crawling and URL filtering.

use std::collections::{HashSet, VecDeque};

use regex::RegexBuilder;
use reqwest::Url;
use scraper::{Html, Selector};
use tracing::{debug, warn};

use crate::config::BasicAuthConfig;
use crate::error::{Result, UploaderError};

/// Breadth-first crawl of an HTML directory index.
///
/// Only same-origin links under the root path are followed; fetch and
/// parse failures on individual pages are logged and skipped. Returns
/// harvested URLs in discovery order, deduplicated.
pub async fn scrape_directory_index(
    http: &reqwest::Client,
    base_url: &str,
    auth: Option<&BasicAuthConfig>,
) -> Result<Vec<String>> {
    let mut base = base_url.to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    let root = Url::parse(&base)
        .map_err(|e| UploaderError::Config(format!("invalid directory index URL: {}", e)))?;
    let anchors = Selector::parse("a[href]")
        .map_err(|e| UploaderError::Config(format!("invalid link selector: {}", e)))?;

    let mut queue: VecDeque<Url> = VecDeque::from([root.clone()]);
    let mut visited: HashSet<String> = HashSet::new();
    let mut all_links: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    while let Some(current) = queue.pop_front() {
        if !visited.insert(current.to_string()) {
            continue;
        }

        let mut request = http.get(current.clone());
        if let Some(auth) = auth {
            request = request.basic_auth(&auth.username, Some(&auth.password));
        }
        let response = match request.send().await.and_then(|r| r.error_for_status()) {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %current, error = %e, "failed to fetch index page");
                continue;
            }
        };

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_lowercase();
        if !content_type.contains("text/html") {
            warn!(url = %current, "index page is not HTML, skipping");
            continue;
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(url = %current, error = %e, "failed to read index page");
                continue;
            }
        };

        let page_links = extract_links(&body, &current, &root, &anchors);
        debug!(url = %current, links = page_links.len(), "harvested links");

        for link in page_links {
            let link_str = link.to_string();
            if seen.insert(link_str.clone()) {
                all_links.push(link_str.clone());
            }
            if link_str.ends_with('/') && !visited.contains(&link_str) {
                queue.push_back(link);
            }
        }
    }

    Ok(all_links)
}

/// Pull in-scope links out of one index page.
///
/// Parsing happens in a sync helper so the non-`Send` DOM never lives
/// across an await point.
fn extract_links(html: &str, current: &Url, root: &Url, anchors: &Selector) -> Vec<Url> {
    let document = Html::parse_document(html);

    let mut links = Vec::new();
    for element in document.select(anchors) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        // Parent-directory links and fragment/query anchors are noise.
        if href == "../" || href == "/" || href.starts_with('#') || href.starts_with('?') {
            continue;
        }
        let Ok(url) = current.join(href) else {
            continue;
        };
        if in_scope(root, &url) {
            links.push(url);
        }
    }
    links
}

/// A link is in scope when it shares the root's origin and lives under
/// the root's path.
fn in_scope(root: &Url, target: &Url) -> bool {
    root.scheme() == target.scheme()
        && root.host_str() == target.host_str()
        && root.port_or_known_default() == target.port_or_known_default()
        && target
            .path()
            .trim_end_matches('/')
            .starts_with(root.path().trim_end_matches('/'))
}

/// Keep only URLs matching the case-insensitive regex `pattern`.
pub fn filter_urls(urls: &[String], pattern: &str) -> Result<Vec<String>> {
    let re = RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| UploaderError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
    Ok(urls
        .iter()
        .filter(|url| re.find(url).is_some())
        .cloned()
        .collect())
}
