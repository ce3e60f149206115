use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::client::{MediaWikiClient, PageListing, WikiSource};
use crate::config::CrawlerConfig;
use crate::error::{CrawlError, describe_error};
use crate::extract::extract_text;
use crate::output::{ensure_output_dir, write_page_text};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Fetch,
    Write,
}

impl FailureStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Write => "write",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PageOutcome {
    Written {
        title: String,
        path: PathBuf,
        bytes: usize,
    },
    Failed {
        title: String,
        stage: FailureStage,
        error: String,
    },
}

impl PageOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub success: bool,
    pub listed: usize,
    pub written: usize,
    pub failed: usize,
    pub truncated: bool,
    pub continuation: Option<String>,
    pub request_count: usize,
    pub pages: Vec<PageOutcome>,
}

impl CrawlReport {
    pub fn failures(&self) -> impl Iterator<Item = &PageOutcome> {
        self.pages.iter().filter(|page| !page.is_written())
    }
}

/// Crawl the configured wiki into `config.output_dir`.
pub fn crawl(config: &CrawlerConfig) -> Result<CrawlReport> {
    let mut client = MediaWikiClient::new(config.clone())?;
    crawl_with_source(&mut client, &config.output_dir).context("crawl aborted")
}

/// List once, then fetch and write each title in order.
///
/// Only a listing failure or an uncreatable output directory is returned as
/// `Err`; per-page failures are logged, recorded in the report, and the loop
/// moves on. The output directory is created after the listing succeeds.
pub fn crawl_with_source<S: WikiSource>(
    source: &mut S,
    output_dir: &Path,
) -> Result<CrawlReport, CrawlError> {
    let listing = list_pages(source)?;
    ensure_output_dir(output_dir)?;
    let truncated = listing.is_truncated();
    let PageListing {
        titles,
        continuation,
    } = listing;

    let mut report = CrawlReport {
        success: true,
        listed: titles.len(),
        written: 0,
        failed: 0,
        truncated,
        continuation,
        request_count: 0,
        pages: Vec::with_capacity(titles.len()),
    };

    for title in titles {
        let outcome = crawl_page(source, output_dir, &title);
        if outcome.is_written() {
            report.written += 1;
        } else {
            report.failed += 1;
        }
        report.pages.push(outcome);
    }

    report.request_count = source.request_count();
    report.success = report.failed == 0;
    info!(
        listed = report.listed,
        written = report.written,
        failed = report.failed,
        "crawl finished"
    );
    Ok(report)
}

/// Fetch the title's HTML and reduce it to text.
pub fn fetch_page_text<S: WikiSource>(source: &mut S, title: &str) -> Result<String, CrawlError> {
    let html = source.fetch_page_html(title)?;
    Ok(extract_text(&html))
}

pub fn list_pages<S: WikiSource>(source: &mut S) -> Result<PageListing, CrawlError> {
    let listing = source.list_all_pages()?;
    info!(count = listing.titles.len(), "listed wiki pages");
    if let Some(token) = &listing.continuation {
        warn!(
            apcontinue = %token,
            "page list was truncated by the API; titles after this point are not crawled"
        );
    }
    Ok(listing)
}

fn crawl_page<S: WikiSource>(source: &mut S, output_dir: &Path, title: &str) -> PageOutcome {
    let text = match fetch_page_text(source, title) {
        Ok(text) => text,
        Err(err) => return failed(title, FailureStage::Fetch, &err),
    };

    match write_page_text(output_dir, title, &text) {
        Ok(path) => {
            info!(title, path = %path.display(), bytes = text.len(), "wrote page");
            PageOutcome::Written {
                title: title.to_string(),
                path,
                bytes: text.len(),
            }
        }
        Err(err) => failed(title, FailureStage::Write, &err),
    }
}

fn failed(title: &str, stage: FailureStage, err: &CrawlError) -> PageOutcome {
    let message = describe_error(err);
    error!(title, stage = stage.as_str(), kind = err.kind(), "{message}");
    PageOutcome::Failed {
        title: title.to_string(),
        stage,
        error: message,
    }
}
