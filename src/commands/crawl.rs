//! Crawl commands: fetch a site and store its pages

use crate::crawl::SiteFetcher;
use crate::error::{ErrorCode, Result};
use crate::meta::{PageRepository, SiteRepository};
use crate::models::Site;
use serde::Serialize;
use std::time::Instant;
use tracing::{info, warn};

/// Outcome of crawling one site
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub site: Site,
    /// Pages written to the store
    pub pages_stored: usize,
    /// Of those, pages flagged `noindex`
    pub noindex_pages: usize,
    pub duration_ms: u64,
    /// Set when the crawl failed and nothing was stored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorCode>,
}

impl CrawlReport {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Crawl one site and upsert every page it produced.
///
/// A fetch failure stores nothing. The first upsert failure is returned.
pub async fn cmd_crawl_site(
    fetcher: &dyn SiteFetcher,
    pages: &dyn PageRepository,
    site: &Site,
) -> Result<CrawlReport> {
    let start = Instant::now();
    let crawled = fetcher.fetch(site).await?;

    for page in &crawled {
        pages.upsert(site, page).await?;
    }

    let report = CrawlReport {
        site: site.clone(),
        pages_stored: crawled.len(),
        noindex_pages: crawled.iter().filter(|p| p.noindex).count(),
        duration_ms: start.elapsed().as_millis() as u64,
        error: None,
    };

    info!(
        "Stored {} pages for {} ({} noindex)",
        report.pages_stored, site.root_url, report.noindex_pages
    );
    Ok(report)
}

/// Crawl every registered site in turn.
///
/// A failing site is reported with its error code and does not stop the
/// remaining sites.
pub async fn cmd_crawl_all(
    fetcher: &dyn SiteFetcher,
    sites: &dyn SiteRepository,
    pages: &dyn PageRepository,
) -> Result<Vec<CrawlReport>> {
    let all = sites.get_all().await?;
    info!("Crawling {} registered sites", all.len());

    let mut reports = Vec::with_capacity(all.len());
    for site in all {
        let start = Instant::now();
        let report = match cmd_crawl_site(fetcher, pages, &site).await {
            Ok(report) => report,
            Err(e) => {
                warn!("Crawl of {} failed: {}", site.root_url, e);
                CrawlReport {
                    site,
                    pages_stored: 0,
                    noindex_pages: 0,
                    duration_ms: start.elapsed().as_millis() as u64,
                    error: Some(ErrorCode::from(&e)),
                }
            }
        };
        reports.push(report);
    }

    Ok(reports)
}

/// Print crawl reports to console
pub fn print_crawl_reports(reports: &[CrawlReport]) {
    if reports.is_empty() {
        println!("No sites to crawl.");
        return;
    }

    for report in reports {
        match &report.error {
            None => println!(
                "✓ {}: {} pages ({} noindex) in {}ms",
                report.site.root_url, report.pages_stored, report.noindex_pages, report.duration_ms
            ),
            Some(error) => println!("✗ {}: {}", report.site.root_url, error.code),
        }
    }
}
