//! Web scraping module for content extraction.
//!
//! Uses reqwest for fetching and scraper for HTML parsing.

use reqwest::Client;
use scraper::{Html, Node};
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Desktop browser User-Agent sent with every page request
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Elements whose text must never reach the extracted content
const EXCLUDED_ELEMENTS: [&str; 2] = ["script", "style"];

/// Characters `str::splitlines`-style line splitting breaks on
const LINE_BREAKS: [char; 10] = [
    '\n', '\r', '\x0b', '\x0c', '\x1c', '\x1d', '\x1e', '\u{85}', '\u{2028}', '\u{2029}',
];

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("Error: Invalid URL format")]
    InvalidUrl(String),
    #[error("Error fetching website: {0}")]
    FetchError(#[from] reqwest::Error),
}

/// Create a configured HTTP client for scraping
pub fn create_client() -> Result<Client, ScraperError> {
    let client = Client::builder().user_agent(USER_AGENT).build()?;
    Ok(client)
}

/// Check that the URL has both a scheme and a host
pub fn validate_url(url: &str) -> Result<Url, ScraperError> {
    if !has_authority(url) {
        return Err(ScraperError::InvalidUrl(url.to_string()));
    }
    let parsed = Url::parse(url).map_err(|_| ScraperError::InvalidUrl(url.to_string()))?;
    if !parsed.has_host() {
        return Err(ScraperError::InvalidUrl(url.to_string()));
    }
    Ok(parsed)
}

/// Whether `scheme://` is followed by a non-empty authority.
///
/// `Url::parse` repairs `http:///path` and `http:path` into `http://path/`,
/// so the raw text is checked first.
fn has_authority(url: &str) -> bool {
    url.split_once(':')
        .and_then(|(_, rest)| rest.strip_prefix("//"))
        .is_some_and(|authority| !authority.is_empty() && !authority.starts_with(['/', '?', '#']))
}

/// Fetch a page and reduce it to newline-separated plain text.
///
/// The URL is validated before any request is made. Non-success statuses are
/// reported as fetch errors, and the text is returned uncapped.
pub async fn fetch_content(client: &Client, url: &str) -> Result<String, ScraperError> {
    let url = validate_url(url)?;

    debug!(%url, "fetching page");
    let response = client.get(url).send().await?.error_for_status()?;
    let html = response.text().await?;

    let text = extract_text(&html);
    debug!(chars = text.chars().count(), "extracted page text");
    Ok(text)
}

/// Extract visible text from an HTML document.
///
/// Every text node outside `<script>` and `<style>` contributes its lines; each
/// line is trimmed and blank lines are dropped.
pub fn extract_text(html: &str) -> String {
    let mut lines = Vec::new();
    collect_lines(&Html::parse_document(html), &mut lines);
    lines.join("\n")
}

fn collect_lines(document: &Html, lines: &mut Vec<String>) {
    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        if node.ancestors().any(|ancestor| is_excluded(ancestor.value())) {
            continue;
        }
        // With scripting enabled, html5ever keeps <noscript> markup as raw text
        if node.parent().is_some_and(|parent| is_noscript(parent.value())) {
            collect_lines(&Html::parse_fragment(text), lines);
            continue;
        }
        lines.extend(
            text.split(LINE_BREAKS)
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string),
        );
    }
}

fn is_excluded(node: &Node) -> bool {
    node.as_element()
        .is_some_and(|element| EXCLUDED_ELEMENTS.contains(&element.name()))
}

fn is_noscript(node: &Node) -> bool {
    node.as_element()
        .is_some_and(|element| element.name() == "noscript")
}
