//! Configuration management for watch-duty-crawler
//!
//! Handles loading, saving, and validating configuration from TOML files.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Web crawling configuration
    #[serde(default)]
    pub crawl: CrawlConfig,

    /// Paths configuration (internal, not user-editable)
    #[serde(skip)]
    pub paths: PathsConfig,
}

/// Which backend renders pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    /// Served HTML is taken as the rendered DOM
    Http,
    /// Headless Chromium (requires the `js-rendering` feature)
    Browser,
}

/// What the engine does when a page fails to render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Abort the crawl and discard every page collected so far
    FailFast,
    /// Log the failure, drop that page and keep crawling
    Skip,
}

/// Web crawling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// User-Agent header for robots.txt and page requests
    #[serde(default = "default_crawl_user_agent")]
    pub user_agent: String,

    /// Politeness delay before every navigation (milliseconds)
    #[serde(default = "default_request_delay")]
    pub request_delay_ms: u64,

    /// Navigation deadline (milliseconds)
    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout_ms: u64,

    /// robots.txt request timeout in seconds
    #[serde(default = "default_robots_timeout")]
    pub robots_timeout_secs: u64,

    /// Whether to respect robots.txt
    #[serde(default = "default_respect_robots")]
    pub respect_robots_txt: bool,

    /// Rendering backend
    #[serde(default = "default_renderer")]
    pub renderer: RendererKind,

    /// Settle time after load when the browser cannot report network idle (milliseconds)
    #[serde(default = "default_js_render_wait")]
    pub js_render_wait_ms: u64,

    /// Disable browser sandbox (required in some Docker/CI environments)
    #[serde(default)]
    pub js_no_sandbox: bool,

    /// Behavior on a page that fails to render
    #[serde(default = "default_failure_policy")]
    pub failure_policy: FailurePolicy,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            user_agent: default_crawl_user_agent(),
            request_delay_ms: default_request_delay(),
            navigation_timeout_ms: default_navigation_timeout(),
            robots_timeout_secs: default_robots_timeout(),
            respect_robots_txt: default_respect_robots(),
            renderer: default_renderer(),
            js_render_wait_ms: default_js_render_wait(),
            js_no_sandbox: false,
            failure_policy: default_failure_policy(),
        }
    }
}

impl CrawlConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    /// Product token used to match robots.txt groups and crawler-specific
    /// meta tags (`watch-duty-crawler` for `watch-duty-crawler/0.1 (...)`)
    pub fn robots_token(&self) -> &str {
        let ua = self.user_agent.trim_start();
        let end = ua
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
            .unwrap_or(ua.len());
        &ua[..end]
    }
}

/// Internal paths configuration
#[derive(Debug, Clone, Default)]
pub struct PathsConfig {
    /// Base directory for crawler data
    pub base_dir: PathBuf,

    /// Path to config file
    pub config_file: PathBuf,

    /// Path to SQLite database
    pub db_file: PathBuf,
}

impl Config {
    /// Get the default base directory (~/.watch-duty-crawler)
    pub fn default_base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".watch-duty-crawler")
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        Self::default_base_dir().join("config.toml")
    }

    /// Initialize paths configuration
    pub fn init_paths(&mut self, base_dir: Option<PathBuf>) {
        let base = base_dir.unwrap_or_else(Self::default_base_dir);
        self.paths = PathsConfig {
            config_file: base.join("config.toml"),
            db_file: base.join("pages.db"),
            base_dir: base,
        };
    }

    /// Load configuration from a specific file path
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        if !config_path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        let base = config_path.parent().unwrap_or(Path::new(".")).to_path_buf();
        config.paths = PathsConfig {
            config_file: config_path.to_path_buf(),
            db_file: base.join("pages.db"),
            base_dir: base,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a base directory, falling back to defaults
    pub fn load_from(base_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = Config::default();
        config.init_paths(base_dir);

        if config.paths.config_file.exists() {
            debug!("Loading config from {:?}", config.paths.config_file);
            let content = std::fs::read_to_string(&config.paths.config_file)?;
            let mut loaded: Config = toml::from_str(&content)?;
            loaded.paths = config.paths;
            config = loaded;
        } else {
            debug!("No config file found, using defaults");
        }

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.paths.config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&self.paths.config_file, content)?;
        info!("Saved config to {:?}", self.paths.config_file);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.crawl.user_agent.trim().is_empty() {
            return Err(Error::Config("crawl.user_agent must not be empty".to_string()));
        }

        if self.crawl.robots_token().is_empty() {
            return Err(Error::Config(
                "crawl.user_agent must start with a product token (e.g. mybot/1.0)".to_string(),
            ));
        }

        if self.crawl.navigation_timeout_ms == 0 {
            return Err(Error::Config(
                "crawl.navigation_timeout_ms must be positive".to_string(),
            ));
        }

        if self.crawl.robots_timeout_secs == 0 {
            return Err(Error::Config(
                "crawl.robots_timeout_secs must be positive".to_string(),
            ));
        }

        if self.crawl.renderer == RendererKind::Browser && !cfg!(feature = "js-rendering") {
            return Err(Error::Config(
                "crawl.renderer = \"browser\" requires building with --features js-rendering"
                    .to_string(),
            ));
        }

        Ok(())
    }
}
