//! Web tools — search (DuckDuckGo lite, no API key) and page fetch.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use super::base::{require_string, Capability, Tool};
use super::schema::ParamSpec;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_7_2) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const DDG_LITE_ENDPOINT: &str = "https://lite.duckduckgo.com/lite/";

/// Elements removed (with their content) before extracting page text.
const NOISE_TAGS: &[&str] = &[
    "script", "style", "nav", "footer", "iframe", "svg", "noscript", "header", "aside",
];

/// A client that failed to build keeps its error; the tool reports it per call.
type ClientSlot = Result<Client, String>;

fn browser_client(timeout: Duration) -> ClientSlot {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(REFERER, HeaderValue::from_static("https://www.google.com/"));

    Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .redirect(reqwest::redirect::Policy::limited(5))
        .timeout(timeout)
        .build()
        .map_err(|e| {
            warn!(error = %e, "failed to build HTTP client");
            e.to_string()
        })
}

fn ready(slot: &ClientSlot) -> anyhow::Result<&Client> {
    slot.as_ref()
        .map_err(|e| anyhow::anyhow!("HTTP client unavailable: {e}"))
}

// ─────────────────────────────────────────────
// WebSearchTool
// ─────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
struct SearchHit {
    title: String,
    url: String,
    snippet: String,
}

/// Searches the web through the DuckDuckGo lite HTML page.
pub struct WebSearchTool {
    client: ClientSlot,
    endpoint: String,
    max_results: usize,
}

impl WebSearchTool {
    pub fn new(max_results: u32) -> Self {
        Self {
            client: browser_client(Duration::from_secs(15)),
            endpoint: DDG_LITE_ENDPOINT.to_string(),
            max_results: max_results.max(1) as usize,
        }
    }

    /// Point the tool at another results page (tests, mirrors).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web using DuckDuckGo to find information, news, or technical documentation."
    }

    fn capability(&self) -> Capability {
        Capability::WebSearch
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::string(
            "query",
            "The search query to execute on DuckDuckGo.",
        )]
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String> {
        let query = require_string(&params, "query")?;
        let query = query.trim();
        if query.is_empty() {
            anyhow::bail!("Query cannot be empty.");
        }

        debug!(query, "searching web");

        let resp = ready(&self.client)?
            .get(&self.endpoint)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Search request failed: {e}"))?;
        if !resp.status().is_success() {
            anyhow::bail!("Search returned HTTP {}", resp.status());
        }
        let html = resp.text().await?;

        let hits = parse_lite_results(&html, self.max_results);
        if hits.is_empty() {
            return Ok("No results found on DuckDuckGo.".into());
        }

        Ok(hits
            .iter()
            .enumerate()
            .map(|(i, h)| {
                let snippet = if h.snippet.is_empty() {
                    "No description"
                } else {
                    h.snippet.as_str()
                };
                format!(
                    "[{}] {}\n    Link: {}\n    Snippet: {snippet}",
                    i + 1,
                    h.title,
                    h.url
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}

/// Scan the lite page: `<a ... class="result-link">Title</a>` followed by a
/// `<td class="result-snippet">` cell.
fn parse_lite_results(html: &str, max_results: usize) -> Vec<SearchHit> {
    let mut hits = Vec::new();
    let mut pos = 0;

    while hits.len() < max_results {
        let Some(link_at) = html[pos..].find("class=\"result-link\"").map(|p| pos + p) else {
            break;
        };
        let tag_start = html[..link_at].rfind("<a ").unwrap_or(link_at);
        let href = extract_attr(&html[tag_start..], "href").unwrap_or_default();

        let Some(title_start) = html[link_at..].find('>').map(|p| link_at + p + 1) else {
            break;
        };
        let Some(title_end) = html[title_start..].find("</a>").map(|p| title_start + p) else {
            break;
        };
        let title = strip_tags(&html[title_start..title_end]).trim().to_string();

        // The snippet belongs to this hit only if it precedes the next link.
        let next_link = html[title_end..]
            .find("class=\"result-link\"")
            .map(|p| title_end + p)
            .unwrap_or(html.len());
        let snippet = html[title_end..next_link]
            .find("class=\"result-snippet\"")
            .map(|p| title_end + p)
            .and_then(|sn| {
                let start = sn + html[sn..].find('>')? + 1;
                let end = start + html[start..].find("</td>")?;
                Some(strip_tags(&html[start..end]).trim().to_string())
            })
            .unwrap_or_default();

        if !href.is_empty() && !title.is_empty() {
            hits.push(SearchHit {
                title,
                url: unwrap_redirect(&href),
                snippet,
            });
        }
        pos = title_end;
    }

    hits
}

/// DuckDuckGo may wrap targets as `//duckduckgo.com/l/?uddg=<encoded>&...`.
fn unwrap_redirect(href: &str) -> String {
    href.split_once("uddg=")
        .map(|(_, rest)| percent_decode(rest.split('&').next().unwrap_or(rest)))
        .unwrap_or_else(|| href.to_string())
}

fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let hex = (bytes[i] == b'%')
            .then(|| s.get(i + 1..i + 3))
            .flatten()
            .and_then(|h| u8::from_str_radix(h, 16).ok());
        match hex {
            Some(b) => {
                out.push(b);
                i += 3;
            }
            None => {
                out.push(if bytes[i] == b'+' { b' ' } else { bytes[i] });
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn extract_attr(tag: &str, attr: &str) -> Option<String> {
    let pattern = format!("{attr}=\"");
    let start = tag.find(&pattern)? + pattern.len();
    let end = tag[start..].find('"')? + start;
    Some(html_decode(&tag[start..end]))
}

fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for ch in s.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    html_decode(&out)
}

fn html_decode(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ")
}

// ─────────────────────────────────────────────
// WebFetchTool
// ─────────────────────────────────────────────

/// Fetches a page and returns its title and readable text.
pub struct WebFetchTool {
    client: ClientSlot,
    max_chars: usize,
}

impl WebFetchTool {
    pub fn new(timeout_secs: u64, max_chars: usize) -> Self {
        Self {
            client: browser_client(Duration::from_secs(timeout_secs)),
            max_chars,
        }
    }
}

#[async_trait]
impl Tool for WebFetchTool {
    fn name(&self) -> &str {
        "web_fetch"
    }

    fn description(&self) -> &str {
        "Fetch and extract the main text content from a specific webpage URL."
    }

    fn capability(&self) -> Capability {
        Capability::WebFetch
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::string(
            "url",
            "The URL of the webpage to fetch and read.",
        )]
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String> {
        let url = require_string(&params, "url")?;
        let url = url.trim();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            anyhow::bail!("Invalid URL: must start with http:// or https://");
        }

        debug!(url, "fetching web page");

        let resp = ready(&self.client)?
            .get(url)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("HTTP request failed: {e}"))?;
        if !resp.status().is_success() {
            anyhow::bail!("HTTP {} fetching {url}", resp.status());
        }
        let html = resp
            .text()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read response body: {e}"))?;

        let page = extract_page(&html, self.max_chars);
        Ok(format!("URL: {url}\nTitle: {}\n\n{}", page.title, page.content))
    }
}

struct PageText {
    title: String,
    content: String,
}

/// Drop noise elements, prefer `<main>`, then `<article>`, then `<body>`,
/// collapse whitespace and cap the result at `max_chars` characters.
fn extract_page(html: &str, max_chars: usize) -> PageText {
    let title = Regex::new(r"(?is)<title[^>]*>(.*?)</title\s*>")
        .ok()
        .and_then(|re| re.captures(html).and_then(|c| c.get(1)))
        .map(|m| html_decode(m.as_str()).trim().to_string())
        .unwrap_or_default();

    let mut cleaned = html.to_string();
    for tag in NOISE_TAGS {
        if let Ok(re) = Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")) {
            cleaned = re.replace_all(&cleaned, " ").into_owned();
        }
    }

    let region = ["main", "article", "body"]
        .iter()
        .find_map(|tag| {
            let re = Regex::new(&format!(r"(?is)<{tag}\b[^>]*>(.*)</{tag}\s*>")).ok()?;
            let inner = re.captures(&cleaned)?.get(1)?.as_str().to_string();
            let text = element_text(&inner);
            (!text.is_empty()).then_some(text)
        })
        .unwrap_or_else(|| element_text(&cleaned));

    let content = if region.chars().count() > max_chars {
        let cut: String = region.chars().take(max_chars).collect();
        format!("{cut}... [Truncated]")
    } else {
        region
    };

    PageText { title, content }
}

/// Tag-free text with whitespace runs collapsed to single spaces.
fn element_text(html: &str) -> String {
    let spaced = Regex::new(r"<[^>]*>")
        .map(|re| re.replace_all(html, " ").into_owned())
        .unwrap_or_else(|_| strip_tags(html));
    html_decode(&spaced)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
