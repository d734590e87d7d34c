//! Page rendering
//!
//! A [`Renderer`] opens one [`RenderSession`] per crawl. The session renders
//! URLs one at a time under a navigation deadline and must be closed on every
//! exit path. Two backends are provided:
//! - [`HttpRenderer`]: the served HTML is taken as the rendered DOM
//! - `BrowserRenderer`: headless Chromium via the DevTools protocol
//!   (`js-rendering` feature)

use crate::config::{CrawlConfig, RendererKind};
use crate::error::{Error, Result};
use crate::parse::{parse_page, Anchor, ExtractedContent};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, warn};
use url::Url;

/// Configuration for renderers
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// User-Agent presented on navigation
    pub user_agent: String,
    /// Product token matched against crawler-specific meta tags
    pub robots_token: String,
    /// Deadline for one navigation
    pub navigation_timeout: Duration,
    /// Settle time after load when network-idle events are unavailable (browser only)
    pub render_wait: Duration,
    /// Run browser in headless mode
    pub headless: bool,
    /// Enable sandbox (disable for Docker/CI environments)
    pub sandbox: bool,
}

impl RendererConfig {
    pub fn from_crawl_config(config: &CrawlConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            robots_token: config.robots_token().to_string(),
            navigation_timeout: config.navigation_timeout(),
            render_wait: Duration::from_millis(config.js_render_wait_ms),
            headless: true,
            sandbox: !config.js_no_sandbox,
        }
    }
}

/// Rendered page result
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// Final URL after any redirects
    pub url: Url,
    /// Page title (empty if the page has none)
    pub title: String,
    /// Fully rendered HTML content
    pub html: String,
    /// Anchors in the rendered DOM, nofollow included
    pub anchors: Vec<Anchor>,
    /// Reader-mode text and the `noindex` flag
    pub content: ExtractedContent,
    /// Time taken to render (milliseconds)
    pub render_time_ms: u64,
}

impl RenderedPage {
    /// Build from rendered HTML, parsing it once.
    ///
    /// `title` overrides the document `<title>`.
    pub fn from_html(
        url: Url,
        html: String,
        title: Option<String>,
        robots_token: &str,
        started: Instant,
    ) -> Self {
        let parsed = parse_page(&html, robots_token);
        Self {
            url,
            title: title.unwrap_or(parsed.title),
            html,
            anchors: parsed.anchors,
            content: parsed.content,
            render_time_ms: started.elapsed().as_millis() as u64,
        }
    }
}

/// A session bound to one crawl
#[async_trait]
pub trait RenderSession: Send {
    /// Navigate to `url` and return the rendered page.
    ///
    /// Fails with [`Error::NavigationTimeout`] when the deadline expires (the
    /// navigation is aborted) or [`Error::Navigation`] otherwise.
    async fn render(&mut self, url: &Url) -> Result<RenderedPage>;

    /// Release the session. Safe to call more than once.
    async fn close(&mut self) -> Result<()>;
}

/// Opens render sessions
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Acquire a session; fails with [`Error::RendererUnavailable`]
    async fn open_session(&self) -> Result<Box<dyn RenderSession>>;
}

/// Create the renderer selected in configuration
pub fn create_renderer(config: &CrawlConfig) -> Result<Arc<dyn Renderer>> {
    let renderer_config = RendererConfig::from_crawl_config(config);
    match config.renderer {
        RendererKind::Http => Ok(Arc::new(HttpRenderer::new(renderer_config)?)),
        #[cfg(feature = "js-rendering")]
        RendererKind::Browser => Ok(Arc::new(BrowserRenderer::new(renderer_config))),
        #[cfg(not(feature = "js-rendering"))]
        RendererKind::Browser => Err(Error::Config(
            "Browser rendering not available. Compile with --features js-rendering".to_string(),
        )),
    }
}

/// Renders pages by fetching them over HTTP
pub struct HttpRenderer {
    client: Client,
    config: RendererConfig,
}

impl HttpRenderer {
    pub fn new(config: RendererConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .gzip(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| {
                Error::RendererUnavailable(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn open_session(&self) -> Result<Box<dyn RenderSession>> {
        Ok(Box::new(HttpSession {
            client: self.client.clone(),
            navigation_timeout: self.config.navigation_timeout,
            robots_token: self.config.robots_token.clone(),
            closed: false,
        }))
    }
}

struct HttpSession {
    client: Client,
    navigation_timeout: Duration,
    robots_token: String,
    closed: bool,
}

#[async_trait]
impl RenderSession for HttpSession {
    async fn render(&mut self, url: &Url) -> Result<RenderedPage> {
        if self.closed {
            return Err(Error::RendererUnavailable("session is closed".to_string()));
        }

        let start = Instant::now();
        let navigation = async {
            let response = self.client.get(url.clone()).send().await?;
            let final_url = response.url().clone();
            let status = response.status();
            if !status.is_success() {
                warn!("{} answered HTTP {}", url, status);
            }
            let html = response.text().await?;
            Ok::<_, reqwest::Error>((final_url, html))
        };

        // Dropping the future on expiry cancels the in-flight request
        let (final_url, html) = match timeout(self.navigation_timeout, navigation).await {
            Err(_) => return Err(Error::NavigationTimeout(url.to_string())),
            Ok(Err(e)) => return Err(Error::Navigation(format!("{}: {}", url, e))),
            Ok(Ok(fetched)) => fetched,
        };

        let page = RenderedPage::from_html(final_url, html, None, &self.robots_token, start);
        debug!("Rendered {} in {}ms", url, page.render_time_ms);
        Ok(page)
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(feature = "js-rendering")]
mod browser_impl {
    use super::*;
    use chromiumoxide::browser::{Browser, BrowserConfig};
    use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
    use chromiumoxide::cdp::browser_protocol::page::{
        EventLifecycleEvent, SetLifecycleEventsEnabledParams, StopLoadingParams,
    };
    use chromiumoxide::Page;
    use futures::StreamExt;
    use tokio::task::JoinHandle;
    use tracing::info;

    /// Headless Chromium renderer; one browser and one tab per session
    pub struct BrowserRenderer {
        config: RendererConfig,
    }

    impl BrowserRenderer {
        pub fn new(config: RendererConfig) -> Self {
            Self { config }
        }
    }

    #[async_trait]
    impl Renderer for BrowserRenderer {
        async fn open_session(&self) -> Result<Box<dyn RenderSession>> {
            info!("Launching headless Chrome browser...");

            let mut builder = BrowserConfig::builder();
            if !self.config.headless {
                builder = builder.with_head();
            }
            if !self.config.sandbox {
                builder = builder.no_sandbox();
            }
            builder = builder
                .arg("--disable-gpu")
                .arg("--disable-dev-shm-usage")
                .arg("--no-first-run")
                .arg("--disable-extensions");

            let browser_config = builder.build().map_err(|e| {
                Error::RendererUnavailable(format!("Failed to build browser config: {}", e))
            })?;

            let (browser, mut handler) = Browser::launch(browser_config)
                .await
                .map_err(|e| Error::RendererUnavailable(format!("Failed to launch browser: {}", e)))?;

            let handler_task = tokio::spawn(async move {
                while let Some(result) = handler.next().await {
                    if result.is_err() {
                        break;
                    }
                }
            });

            let mut session = BrowserSession {
                config: self.config.clone(),
                browser: Some(browser),
                page: None,
                lifecycle_events: false,
                handler_task: Some(handler_task),
            };

            if let Err(e) = session.open_tab().await {
                if let Err(close_err) = session.close().await {
                    warn!("Failed to close browser after launch error: {}", close_err);
                }
                return Err(e);
            }

            info!("Headless browser launched successfully");
            Ok(Box::new(session))
        }
    }

    struct BrowserSession {
        config: RendererConfig,
        browser: Option<Browser>,
        page: Option<Page>,
        /// Whether the tab reports CDP lifecycle events
        lifecycle_events: bool,
        handler_task: Option<JoinHandle<()>>,
    }

    impl BrowserSession {
        async fn open_tab(&mut self) -> Result<()> {
            let browser = self
                .browser
                .as_ref()
                .ok_or_else(|| Error::RendererUnavailable("Browser not initialized".to_string()))?;

            let page = browser
                .new_page("about:blank")
                .await
                .map_err(|e| Error::RendererUnavailable(format!("Failed to create page: {}", e)))?;

            page.set_user_agent(SetUserAgentOverrideParams::new(self.config.user_agent.clone()))
                .await
                .map_err(|e| {
                    Error::RendererUnavailable(format!("Failed to set user agent: {}", e))
                })?;

            // Without lifecycle events navigation falls back to a fixed settle delay
            self.lifecycle_events = match page
                .execute(SetLifecycleEventsEnabledParams::new(true))
                .await
            {
                Ok(_) => true,
                Err(e) => {
                    warn!("Lifecycle events unavailable, using fixed render wait: {}", e);
                    false
                }
            };

            self.page = Some(page);
            Ok(())
        }
    }

    #[async_trait]
    impl RenderSession for BrowserSession {
        async fn render(&mut self, url: &Url) -> Result<RenderedPage> {
            let page = self
                .page
                .as_ref()
                .ok_or_else(|| Error::RendererUnavailable("session is closed".to_string()))?;

            let start = Instant::now();
            debug!("Rendering page with headless browser: {}", url);

            // Subscribe before navigating so the new document's events are kept
            let mut lifecycle = if self.lifecycle_events {
                match page.event_listener::<EventLifecycleEvent>().await {
                    Ok(events) => Some(events),
                    Err(e) => {
                        warn!("Failed to listen for lifecycle events on {}: {}", url, e);
                        None
                    }
                }
            } else {
                None
            };

            // Resolves to whether network idle was observed
            let navigation = async {
                page.goto(url.as_str()).await?;
                page.wait_for_navigation().await?;

                let Some(events) = lifecycle.as_mut() else {
                    return Ok(false);
                };
                let main_frame = page.mainframe().await?;
                let mut document_started = false;
                while let Some(event) = events.next().await {
                    if main_frame.as_ref().is_some_and(|frame| *frame != event.frame_id) {
                        continue;
                    }
                    match event.name.as_str() {
                        "init" => document_started = true,
                        "networkIdle" if document_started => return Ok(true),
                        _ => {}
                    }
                }
                Ok::<_, chromiumoxide::error::CdpError>(false)
            };

            match timeout(self.config.navigation_timeout, navigation).await {
                Err(_) => {
                    // The dropped future only stops waiting; stop the tab too
                    if let Err(e) = page.execute(StopLoadingParams::default()).await {
                        warn!("Failed to stop loading {}: {}", url, e);
                    }
                    return Err(Error::NavigationTimeout(url.to_string()));
                }
                Ok(Err(e)) => return Err(Error::Navigation(format!("{}: {}", url, e))),
                Ok(Ok(true)) => {}
                Ok(Ok(false)) => {
                    if !self.config.render_wait.is_zero() {
                        tokio::time::sleep(self.config.render_wait).await;
                    }
                }
            }

            let html = page
                .content()
                .await
                .map_err(|e| Error::Navigation(format!("Failed to get content: {}", e)))?;

            let title = page.get_title().await.ok().flatten().unwrap_or_default();

            let final_url = page
                .url()
                .await
                .ok()
                .flatten()
                .and_then(|u| Url::parse(&u).ok())
                .unwrap_or_else(|| url.clone());

            let rendered = RenderedPage::from_html(
                final_url,
                html,
                Some(title),
                &self.config.robots_token,
                start,
            );
            debug!("Rendered {} in {}ms", url, rendered.render_time_ms);
            Ok(rendered)
        }

        async fn close(&mut self) -> Result<()> {
            if let Some(page) = self.page.take() {
                if let Err(e) = page.close().await {
                    warn!("Failed to close page: {}", e);
                }
            }

            let mut result = Ok(());
            if let Some(mut browser) = self.browser.take() {
                if let Err(e) = browser.close().await {
                    result = Err(Error::RendererUnavailable(format!(
                        "Failed to close browser: {}",
                        e
                    )));
                }
                if let Err(e) = browser.wait().await {
                    warn!("Failed to wait for browser exit: {}", e);
                }
            }

            if let Some(handle) = self.handler_task.take() {
                handle.abort();
            }

            result
        }
    }
}

#[cfg(feature = "js-rendering")]
pub use browser_impl::BrowserRenderer;
