//! Site and page storage using SQLite
//!
//! This module handles:
//! - Sites (registered crawl roots)
//! - Pages (crawled text, keyed by site and relative path)
//! - Text search over indexable pages

mod schema;

pub use schema::*;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{Page, Site};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

/// Storage for registered sites
#[async_trait]
pub trait SiteRepository: Send + Sync {
    /// Register a site; an existing root URL gets its title updated
    async fn add(&self, site: &Site) -> Result<()>;

    /// All registered sites, oldest first
    async fn get_all(&self) -> Result<Vec<Site>>;
}

/// Storage for crawled pages
#[async_trait]
pub trait PageRepository: Send + Sync {
    /// Insert or replace the page at `(site.root_url, page.relative_path)`
    async fn upsert(&self, site: &Site, page: &Page) -> Result<()>;

    /// Case-insensitive substring search over title and content.
    ///
    /// `noindex` pages are never returned; a blank query matches nothing.
    async fn find_by_query(&self, query: &str) -> Result<Vec<Page>>;
}

#[derive(Debug, FromRow)]
struct SiteRow {
    title: String,
    root_url: String,
}

impl From<SiteRow> for Site {
    fn from(row: SiteRow) -> Self {
        Site::new(row.title, row.root_url)
    }
}

#[derive(Debug, FromRow)]
struct PageRow {
    relative_path: String,
    title: String,
    content: String,
    noindex: bool,
}

impl From<PageRow> for Page {
    fn from(row: PageRow) -> Self {
        Page {
            relative_path: row.relative_path,
            title: row.title,
            content: row.content,
            noindex: row.noindex,
        }
    }
}

/// SQLite-backed site and page store
#[derive(Clone)]
pub struct MetaDb {
    pool: SqlitePool,
}

impl MetaDb {
    /// Connect to the database configured in `config`
    pub async fn connect(config: &Config) -> Result<Self> {
        Self::connect_path(&config.paths.db_file).await
    }

    /// Connect and create the schema if it is missing
    pub async fn open(config: &Config) -> Result<Self> {
        let db = Self::connect(config).await?;
        if !db.is_initialized().await? {
            db.init_schema().await?;
        }
        Ok(db)
    }

    async fn connect_path(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        debug!("Connecting to SQLite database at {:?}", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Initialize the database schema
    pub async fn init_schema(&self) -> Result<()> {
        info!("Initializing database schema");
        sqlx::raw_sql(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    /// Check if database is initialized
    pub async fn is_initialized(&self) -> Result<bool> {
        let result: Option<(i32,)> =
            sqlx::query_as("SELECT 1 FROM sqlite_master WHERE type='table' AND name='pages'")
                .fetch_optional(&self.pool)
                .await?;
        Ok(result.is_some())
    }

    async fn site_id(&self, root_url: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT id FROM sites WHERE root_url = ?")
            .bind(root_url)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(id,)| id))
    }

    /// Pages stored for one site, ordered by relative path
    pub async fn pages_for_site(&self, root_url: &str) -> Result<Vec<Page>> {
        let rows = sqlx::query_as::<_, PageRow>(
            r#"
            SELECT p.relative_path, p.title, p.content, p.noindex
            FROM pages p JOIN sites s ON s.id = p.site_id
            WHERE s.root_url = ?
            ORDER BY p.relative_path
            "#,
        )
        .bind(root_url)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Page::from).collect())
    }
}

#[async_trait]
impl SiteRepository for MetaDb {
    async fn add(&self, site: &Site) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sites (id, title, root_url, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(root_url) DO UPDATE SET
                title = excluded.title
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&site.title)
        .bind(&site.root_url)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!("Registered site {} ({})", site.title, site.root_url);
        Ok(())
    }

    async fn get_all(&self) -> Result<Vec<Site>> {
        let rows = sqlx::query_as::<_, SiteRow>(
            "SELECT title, root_url FROM sites ORDER BY created_at, root_url",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Site::from).collect())
    }
}

#[async_trait]
impl PageRepository for MetaDb {
    async fn upsert(&self, site: &Site, page: &Page) -> Result<()> {
        let site_id = self
            .site_id(&site.root_url)
            .await?
            .ok_or_else(|| Error::SiteNotFound(site.root_url.clone()))?;
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO pages (id, site_id, relative_path, title, content, noindex, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(site_id, relative_path) DO UPDATE SET
                title = excluded.title,
                content = excluded.content,
                noindex = excluded.noindex,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&site_id)
        .bind(&page.relative_path)
        .bind(&page.title)
        .bind(&page.content)
        .bind(page.noindex)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_query(&self, query: &str) -> Result<Vec<Page>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let pattern = format!("%{}%", escape_like(query));
        let rows = sqlx::query_as::<_, PageRow>(
            r#"
            SELECT relative_path, title, content, noindex
            FROM pages
            WHERE noindex = 0
              AND (title LIKE ? ESCAPE '\' OR content LIKE ? ESCAPE '\')
            ORDER BY title, relative_path
            "#,
        )
        .bind(&pattern)
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await?;

        debug!("Search {:?} matched {} pages", query, rows.len());
        Ok(rows.into_iter().map(Page::from).collect())
    }
}

/// Escape `LIKE` wildcards so the query matches literally
fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
