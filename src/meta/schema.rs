//! SQLite schema definition

/// SQL schema for the page database
pub const SCHEMA_SQL: &str = r#"
-- Sites: registered crawl roots
CREATE TABLE IF NOT EXISTS sites (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    root_url TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);

-- Pages: one row per crawled relative path
CREATE TABLE IF NOT EXISTS pages (
    id TEXT PRIMARY KEY,
    site_id TEXT NOT NULL REFERENCES sites(id),
    relative_path TEXT NOT NULL,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    noindex INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(site_id, relative_path)
);

CREATE INDEX IF NOT EXISTS idx_pages_site ON pages(site_id);
CREATE INDEX IF NOT EXISTS idx_pages_title ON pages(title);
"#;
