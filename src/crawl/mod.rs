//! Single-site crawling with robots.txt support and a politeness delay
//!
//! This module provides:
//! - The crawl loop (depth-first, one page at a time)
//! - robots.txt fetching and matching
//! - Scope, media, nofollow and fragment filtering of outbound links
//! - Page rendering through a swappable session-based renderer

mod frontier;
mod links;
mod rate_limit;
mod renderer;
mod robots;

pub use frontier::*;
pub use links::*;
pub use rate_limit::*;
pub use renderer::*;
pub use robots::*;

use crate::config::{CrawlConfig, FailurePolicy};
use crate::error::{Error, Result};
use crate::models::{relative_path, Page, Site};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Fetches every page of a site
#[async_trait]
pub trait SiteFetcher: Send + Sync {
    /// Crawl `site` and return its pages, or a single error for the whole crawl
    async fn fetch(&self, site: &Site) -> Result<Vec<Page>>;
}

/// Crawl engine; each crawl builds its own frontier, robots policy and session
pub struct CrawlEngine {
    config: CrawlConfig,
    client: Client,
    renderer: Arc<dyn Renderer>,
}

impl CrawlEngine {
    /// Create an engine using the renderer selected in configuration
    pub fn new(config: CrawlConfig) -> Result<Self> {
        let renderer = create_renderer(&config)?;
        Self::with_renderer(config, renderer)
    }

    /// Create an engine with an explicit renderer
    pub fn with_renderer(config: CrawlConfig, renderer: Arc<dyn Renderer>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.robots_timeout_secs))
            .gzip(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            client,
            renderer,
        })
    }

    /// Crawl a site from its root URL
    pub async fn crawl_site(&self, site: &Site) -> Result<Vec<Page>> {
        let root = parse_root_url(&site.root_url)?;
        info!("Crawling {} ({})", site.title, root);

        let robots = if self.config.respect_robots_txt {
            RobotsPolicy::load(&self.client, &root, self.config.robots_token()).await
        } else {
            RobotsPolicy::allow_all()
        };

        self.crawl_with_robots(&root, &robots).await
    }

    /// Run a crawl against an already loaded robots policy.
    ///
    /// The render session is opened once and closed on every exit path.
    async fn crawl_with_robots(&self, root: &Url, robots: &RobotsPolicy) -> Result<Vec<Page>> {
        if !robots.is_allowed(root) {
            warn!("robots.txt disallows the root URL {}; nothing to crawl", root);
            return Ok(Vec::new());
        }

        let mut session = self.renderer.open_session().await?;
        let outcome = self.run(root, robots, session.as_mut()).await;

        if let Err(e) = session.close().await {
            warn!("Failed to close render session: {}", e);
        }

        outcome
    }

    async fn run(
        &self,
        root: &Url,
        robots: &RobotsPolicy,
        session: &mut dyn RenderSession,
    ) -> Result<Vec<Page>> {
        let scope = CrawlScope::new(root.clone());
        let links = LinkExtractor::new(&scope, robots);
        let delay = PolitenessDelay::new(self.config.request_delay())
            .with_crawl_delay(robots.crawl_delay());

        let mut frontier = Frontier::new();
        frontier.push(root.clone());

        let mut pages = Vec::new();
        let mut request_count = 0u32;

        while let Some(url) = frontier.pop() {
            if !frontier.mark_visited(&url) {
                continue;
            }

            request_count += 1;
            debug!(
                "[{}] Fetching: {} (visited: {}, queue: {})",
                request_count,
                url,
                frontier.visited_count(),
                frontier.pending_count()
            );

            delay.wait().await;

            let rendered = match session.render(&url).await {
                Ok(rendered) => rendered,
                Err(e) if e.is_navigation_failure()
                    && self.config.failure_policy == FailurePolicy::Skip =>
                {
                    warn!("[{}] Failed: {} ({}); skipping", request_count, url, e);
                    continue;
                }
                Err(e) => {
                    warn!(
                        "[{}] Failed: {} ({}); aborting crawl of {}",
                        request_count, url, e, root
                    );
                    return Err(e);
                }
            };

            if rendered.content.noindex {
                debug!("{} is marked noindex", url);
            }

            pages.push(Page {
                relative_path: relative_path(url.as_str(), root.as_str()),
                title: rendered.title,
                content: rendered.content.text,
                noindex: rendered.content.noindex,
            });

            for next in links.extract(&rendered.anchors, &rendered.url, frontier.visited()) {
                frontier.push(next);
            }
        }

        info!("Crawled {} pages from {}", pages.len(), root);
        Ok(pages)
    }
}

#[async_trait]
impl SiteFetcher for CrawlEngine {
    async fn fetch(&self, site: &Site) -> Result<Vec<Page>> {
        self.crawl_site(site).await
    }
}

/// Parse and validate a site's root URL; the fragment is dropped
pub fn parse_root_url(root_url: &str) -> Result<Url> {
    let url = Url::parse(root_url.trim())
        .map_err(|e| Error::InvalidRootUrl(format!("{}: {}", root_url, e)))?;

    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(Error::InvalidRootUrl(format!(
            "{}: only http(s) URLs with a host can be crawled",
            root_url
        )));
    }

    Ok(strip_fragment(url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Instant;

    /// In-memory site keyed by absolute URL
    #[derive(Default)]
    struct FakeSite {
        pages: HashMap<String, String>,
        broken: HashSet<String>,
    }

    impl FakeSite {
        fn page(mut self, url: &str, title: &str, links: &[&str]) -> Self {
            let anchors: String = links
                .iter()
                .map(|href| format!("<a href=\"{}\">{}</a>", href, href))
                .collect();
            self.pages.insert(
                url.to_string(),
                format!(
                    "<!DOCTYPE html><html><head><title>{}</title></head><body><p>{} body</p>{}</body></html>",
                    title, title, anchors
                ),
            );
            self
        }

        fn raw(mut self, url: &str, html: &str) -> Self {
            self.pages.insert(url.to_string(), html.to_string());
            self
        }

        fn broken(mut self, url: &str) -> Self {
            self.broken.insert(url.to_string());
            self
        }
    }

    #[derive(Clone, Default)]
    struct Counters {
        opened: Arc<AtomicUsize>,
        closed: Arc<AtomicUsize>,
        rendered: Arc<Mutex<Vec<String>>>,
        render_times: Arc<Mutex<Vec<Instant>>>,
    }

    impl Counters {
        fn rendered(&self) -> Vec<String> {
            self.rendered.lock().unwrap().clone()
        }

        fn render_times(&self) -> Vec<Instant> {
            self.render_times.lock().unwrap().clone()
        }
    }

    struct FakeRenderer {
        site: Arc<FakeSite>,
        counters: Counters,
        fail_open: bool,
    }

    struct FakeSession {
        site: Arc<FakeSite>,
        counters: Counters,
    }

    #[async_trait]
    impl Renderer for FakeRenderer {
        async fn open_session(&self) -> Result<Box<dyn RenderSession>> {
            if self.fail_open {
                return Err(Error::RendererUnavailable("no browser".to_string()));
            }
            self.counters.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeSession {
                site: self.site.clone(),
                counters: self.counters.clone(),
            }))
        }
    }

    #[async_trait]
    impl RenderSession for FakeSession {
        async fn render(&mut self, url: &Url) -> Result<RenderedPage> {
            self.counters.rendered.lock().unwrap().push(url.to_string());
            self.counters.render_times.lock().unwrap().push(Instant::now());
            if self.site.broken.contains(url.as_str()) {
                return Err(Error::Navigation(format!("{}: connection reset", url)));
            }
            let html = self.site.pages.get(url.as_str()).cloned().unwrap_or_default();
            Ok(RenderedPage::from_html(
                url.clone(),
                html,
                None,
                "watch-duty-crawler",
                Instant::now(),
            ))
        }

        async fn close(&mut self) -> Result<()> {
            self.counters.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn engine(site: FakeSite, policy: FailurePolicy) -> (CrawlEngine, Counters) {
        paced_engine(site, policy, 0)
    }

    fn paced_engine(
        site: FakeSite,
        policy: FailurePolicy,
        delay_ms: u64,
    ) -> (CrawlEngine, Counters) {
        let counters = Counters::default();
        let renderer = FakeRenderer {
            site: Arc::new(site),
            counters: counters.clone(),
            fail_open: false,
        };
        let mut config = CrawlConfig::default();
        config.request_delay_ms = delay_ms;
        config.failure_policy = policy;
        let engine = CrawlEngine::with_renderer(config, Arc::new(renderer)).unwrap();
        (engine, counters)
    }

    async fn crawl(engine: &CrawlEngine, root: &str, robots: &RobotsPolicy) -> Result<Vec<Page>> {
        let root = parse_root_url(root).unwrap();
        engine.crawl_with_robots(&root, robots).await
    }

    fn titles(pages: &[Page]) -> Vec<String> {
        let mut titles: Vec<String> = pages.iter().map(|p| p.title.clone()).collect();
        titles.sort();
        titles
    }

    #[tokio::test]
    async fn test_scenario_robots_nofollow_noindex() {
        let site = FakeSite::default()
            .page(
                "http://host/",
                "root",
                &["href", "forbidden", "googlebotForbidden", "wdcForbidden"],
            )
            .page("http://host/href", "href", &["hrefRecursive"])
            .page("http://host/hrefRecursive", "hrefRecursive", &["noindex"])
            .raw(
                "http://host/noindex",
                r#"<!DOCTYPE html><html><head><title>noindex</title></head><body><meta name="robots" content="noindex"><a href="nofollow" rel="nofollow">nofollow</a></body></html>"#,
            )
            .page("http://host/nofollow", "nofollow", &[])
            .page("http://host/forbidden", "forbidden", &[])
            .page("http://host/googlebotForbidden", "googlebotForbidden", &[])
            .page("http://host/wdcForbidden", "wdcForbidden", &[]);
        let robots = RobotsPolicy::parse(
            "User-agent: Googlebot\nDisallow: /googlebotForbidden\nUser-agent: watch-duty-crawler\nDisallow: /wdcForbidden\nDisallow: /forbidden\nUser-agent: *\nDisallow: /forbidden",
            "watch-duty-crawler",
        );

        let (engine, counters) = engine(site, FailurePolicy::FailFast);
        let pages = crawl(&engine, "http://host/", &robots).await.unwrap();

        assert_eq!(
            titles(&pages),
            vec!["googlebotForbidden", "href", "hrefRecursive", "noindex", "root"]
        );
        for page in &pages {
            assert_eq!(page.noindex, page.title == "noindex");
        }
        let root = pages.iter().find(|p| p.title == "root").unwrap();
        assert_eq!(root.relative_path, "/");
        assert!(root.content.contains("root body"));

        let rendered = counters.rendered();
        assert!(!rendered.iter().any(|u| u.ends_with("/forbidden")));
        assert!(!rendered.iter().any(|u| u.ends_with("/wdcForbidden")));
        assert!(!rendered.iter().any(|u| u.ends_with("/nofollow")));
    }

    #[tokio::test]
    async fn test_each_url_rendered_once_with_fragments() {
        let site = FakeSite::default()
            .page("http://host/", "root", &["a#one", "a#two", "a", "#top", "b"])
            .page("http://host/a", "a", &["/", "b#x", "a"])
            .page("http://host/b", "b", &["a", "./"]);

        let (engine, counters) = engine(site, FailurePolicy::FailFast);
        let pages = crawl(&engine, "http://host/", &RobotsPolicy::allow_all())
            .await
            .unwrap();

        let rendered = counters.rendered();
        let unique: HashSet<&String> = rendered.iter().collect();
        assert_eq!(rendered.len(), unique.len());
        assert_eq!(rendered.len(), 3);

        let paths: HashSet<String> = pages.iter().map(|p| p.relative_path.clone()).collect();
        assert_eq!(paths.len(), pages.len());
        assert_eq!(
            paths,
            ["/", "/a", "/b"].iter().map(|s| s.to_string()).collect()
        );
    }

    #[tokio::test]
    async fn test_root_without_slash_crawled_once() {
        let site = FakeSite::default()
            .page("http://host/docs", "docs", &["/docs/", "/docs/a", "docs/#top"])
            .page("http://host/docs/", "docs twin", &[])
            .page("http://host/docs/a", "a", &["/docs/"]);

        let (engine, counters) = engine(site, FailurePolicy::FailFast);
        let pages = crawl(&engine, "http://host/docs", &RobotsPolicy::allow_all())
            .await
            .unwrap();

        assert_eq!(
            counters.rendered(),
            vec!["http://host/docs", "http://host/docs/a"]
        );
        let paths: Vec<&str> = pages.iter().map(|p| p.relative_path.as_str()).collect();
        assert_eq!(paths, vec!["/", "/a"]);
    }

    #[tokio::test]
    async fn test_delay_precedes_every_navigation() {
        let site = FakeSite::default()
            .page("http://host/", "root", &["ok", "broken"])
            .page("http://host/ok", "ok", &[])
            .broken("http://host/broken");

        let (engine, counters) = paced_engine(site, FailurePolicy::Skip, 50);
        let start = Instant::now();
        crawl(&engine, "http://host/", &RobotsPolicy::allow_all())
            .await
            .unwrap();

        let delay = Duration::from_millis(50);
        let times = counters.render_times();
        assert_eq!(times.len(), 3);
        assert!(times[0] - start >= delay, "first navigation was not delayed");
        // broken is visited second; its failure must not shorten the next wait
        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= delay, "gap shorter than the delay");
        }
    }

    #[tokio::test]
    async fn test_depth_first_order() {
        let site = FakeSite::default()
            .page("http://host/", "root", &["a", "b"])
            .page("http://host/b", "b", &["b1"])
            .page("http://host/b1", "b1", &[])
            .page("http://host/a", "a", &[]);

        let (engine, counters) = engine(site, FailurePolicy::FailFast);
        crawl(&engine, "http://host/", &RobotsPolicy::allow_all())
            .await
            .unwrap();

        // b was pushed last so it is explored, with its child, before a
        assert_eq!(
            counters.rendered(),
            vec!["http://host/", "http://host/b", "http://host/b1", "http://host/a"]
        );
    }

    #[tokio::test]
    async fn test_scope_and_media() {
        let site = FakeSite::default()
            .page(
                "http://host/docs/",
                "docs",
                &["intro", "/blog/post", "http://other/docs/x", "diagram.PNG", "/docs/guide"],
            )
            .page("http://host/docs/intro", "intro", &[])
            .page("http://host/docs/guide", "guide", &[]);

        let (engine, counters) = engine(site, FailurePolicy::FailFast);
        let pages = crawl(&engine, "http://host/docs/", &RobotsPolicy::allow_all())
            .await
            .unwrap();

        assert_eq!(titles(&pages), vec!["docs", "guide", "intro"]);
        for url in counters.rendered() {
            assert!(url.starts_with("http://host/docs/"), "out of scope: {}", url);
        }
        let paths: HashSet<String> = pages.iter().map(|p| p.relative_path.clone()).collect();
        assert!(paths.contains("/intro"));
        assert!(paths.contains("/guide"));
    }

    #[tokio::test]
    async fn test_fail_fast_discards_pages_and_closes_session() {
        let site = FakeSite::default()
            .page("http://host/", "root", &["ok", "broken"])
            .page("http://host/ok", "ok", &[])
            .broken("http://host/broken");

        let (engine, counters) = engine(site, FailurePolicy::FailFast);
        let err = crawl(&engine, "http://host/", &RobotsPolicy::allow_all())
            .await
            .unwrap_err();

        assert_eq!(err.code(), "NAVIGATION_FAILED");
        assert_eq!(counters.opened.load(Ordering::SeqCst), 1);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
        // broken was pushed last, so the crawl stops before reaching ok
        assert!(!counters.rendered().contains(&"http://host/ok".to_string()));
    }

    #[tokio::test]
    async fn test_skip_policy_keeps_other_pages() {
        let site = FakeSite::default()
            .page("http://host/", "root", &["ok", "broken"])
            .page("http://host/ok", "ok", &[])
            .broken("http://host/broken");

        let (engine, counters) = engine(site, FailurePolicy::Skip);
        let pages = crawl(&engine, "http://host/", &RobotsPolicy::allow_all())
            .await
            .unwrap();

        assert_eq!(titles(&pages), vec!["ok", "root"]);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_session_opened_and_closed_once_on_success() {
        let site = FakeSite::default()
            .page("http://host/", "root", &["a"])
            .page("http://host/a", "a", &[]);

        let (engine, counters) = engine(site, FailurePolicy::FailFast);
        crawl(&engine, "http://host/", &RobotsPolicy::allow_all())
            .await
            .unwrap();

        assert_eq!(counters.opened.load(Ordering::SeqCst), 1);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_renderer_unavailable() {
        let renderer = FakeRenderer {
            site: Arc::new(FakeSite::default()),
            counters: Counters::default(),
            fail_open: true,
        };
        let engine = CrawlEngine::with_renderer(CrawlConfig::default(), Arc::new(renderer)).unwrap();

        let err = crawl(&engine, "http://host/", &RobotsPolicy::allow_all())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "RENDERER_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_root_disallowed_renders_nothing() {
        let site = FakeSite::default().page("http://host/", "root", &[]);
        let robots = RobotsPolicy::parse("User-agent: *\nDisallow: /\n", "watch-duty-crawler");

        let (engine, counters) = engine(site, FailurePolicy::FailFast);
        let pages = crawl(&engine, "http://host/", &robots).await.unwrap();

        assert!(pages.is_empty());
        assert_eq!(counters.opened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_root_url() {
        let (engine, counters) = engine(FakeSite::default(), FailurePolicy::FailFast);

        for root in ["not a url", "ftp://host/", "mailto:me@host"] {
            let err = engine
                .crawl_site(&Site::new("bad", root))
                .await
                .unwrap_err();
            assert_eq!(err.code(), "INVALID_ROOT_URL");
        }
        assert_eq!(counters.opened.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_parse_root_url_strips_fragment() {
        let root = parse_root_url("http://host/docs/#intro").unwrap();
        assert_eq!(root.as_str(), "http://host/docs/");
    }
}
