use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use tracing::debug;

use crate::config::CrawlerConfig;
use crate::error::CrawlError;

/// Titles returned by one list-pages call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageListing {
    pub titles: Vec<String>,
    /// `apcontinue` token when the wiki had more pages than one response holds.
    /// It is reported, never followed.
    pub continuation: Option<String>,
}

impl PageListing {
    pub fn is_truncated(&self) -> bool {
        self.continuation.is_some()
    }
}

pub trait WikiSource {
    fn list_all_pages(&mut self) -> Result<PageListing, CrawlError>;
    fn fetch_page_html(&mut self, title: &str) -> Result<String, CrawlError>;
    fn request_count(&self) -> usize;
}

pub struct MediaWikiClient {
    client: Client,
    config: CrawlerConfig,
    request_count: usize,
}

impl MediaWikiClient {
    pub fn new(config: CrawlerConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.timeout_ms.map(Duration::from_millis))
            .user_agent(config.user_agent.clone())
            .build()
            .context("failed to build MediaWiki HTTP client")?;

        Ok(Self {
            client,
            config,
            request_count: 0,
        })
    }

    pub fn page_url(&self, title: &str) -> String {
        page_url(&self.config.wiki_url, &self.config.article_path, title)
    }

    fn get(&mut self, url: &str, query: &[(&str, &str)]) -> Result<Response, CrawlError> {
        self.request_count += 1;
        debug!(url, ?query, "GET");
        let mut request = self.client.get(url);
        if !query.is_empty() {
            request = request.query(query);
        }
        let response = request
            .send()
            .map_err(|source| CrawlError::Fetch {
                url: url.to_string(),
                source,
            })?;

        // Only 200 counts; other 2xx codes would yield an empty or partial body.
        let status = response.status();
        if status != StatusCode::OK {
            return Err(CrawlError::HttpStatus {
                url: url.to_string(),
                status,
            });
        }
        Ok(response)
    }
}

impl WikiSource for MediaWikiClient {
    fn list_all_pages(&mut self) -> Result<PageListing, CrawlError> {
        let api_url = self.config.api_url.clone();
        let response = self.get(
            &api_url,
            &[
                ("action", "query"),
                ("list", "allpages"),
                ("aplimit", "max"),
                ("format", "json"),
            ],
        )?;
        let body = response.text().map_err(|source| CrawlError::Decode {
            url: api_url.clone(),
            source: Box::new(source),
        })?;
        parse_allpages_response(&body).map_err(|source| CrawlError::Decode {
            url: api_url,
            source: Box::new(source),
        })
    }

    fn fetch_page_html(&mut self, title: &str) -> Result<String, CrawlError> {
        let url = self.page_url(title);
        let response = self.get(&url, &[])?;
        response.text().map_err(|source| CrawlError::Decode {
            url,
            source: Box::new(source),
        })
    }

    fn request_count(&self) -> usize {
        self.request_count
    }
}

/// Decode an `action=query&list=allpages` JSON body, keeping API order.
pub fn parse_allpages_response(body: &str) -> Result<PageListing, serde_json::Error> {
    let parsed: AllPagesResponse = serde_json::from_str(body)?;
    Ok(PageListing {
        titles: parsed
            .query
            .allpages
            .into_iter()
            .map(|item| item.title)
            .collect(),
        continuation: parsed.continuation.and_then(|cont| cont.apcontinue),
    })
}

/// Build `<wiki_url><article_path>` with `$1` replaced by the title.
pub fn page_url(wiki_url: &str, article_path: &str, title: &str) -> String {
    let segment = title_path_segment(title);
    format!(
        "{}{}",
        wiki_url.trim_end_matches('/'),
        article_path.replace("$1", &segment)
    )
}

/// Spaces become underscores. `%`, `?` and `#` are escaped so the whole
/// title stays inside the URL path.
pub fn title_path_segment(title: &str) -> String {
    let mut segment = String::with_capacity(title.len());
    for ch in title.chars() {
        match ch {
            ' ' => segment.push('_'),
            '%' => segment.push_str("%25"),
            '?' => segment.push_str("%3F"),
            '#' => segment.push_str("%23"),
            other => segment.push(other),
        }
    }
    segment
}

#[derive(Debug, Deserialize)]
struct AllPagesResponse {
    query: AllPagesQuery,
    #[serde(default, rename = "continue")]
    continuation: Option<ContinuationPayload>,
}

#[derive(Debug, Deserialize)]
struct AllPagesQuery {
    allpages: Vec<TitleQueryItem>,
}

#[derive(Debug, Deserialize)]
struct ContinuationPayload {
    apcontinue: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TitleQueryItem {
    title: String,
}
