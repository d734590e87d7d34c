//! watch-duty-crawler CLI entry point

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::path::{Path, PathBuf};
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use watch_duty_crawler::{
    commands::{
        cmd_add_site, cmd_crawl_all, cmd_crawl_site, cmd_init, cmd_list_sites, cmd_search,
        print_crawl_reports, print_pages, print_sites, InitOptions,
    },
    config::Config,
    crawl::{parse_root_url, CrawlEngine, SiteFetcher},
    error::Result,
    meta::{MetaDb, SiteRepository},
    models::Site,
};

#[derive(Parser)]
#[command(name = "watch-duty-crawler")]
#[command(version, about = "Polite single-site crawler with text search", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config and create the page database
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Manage registered sites
    Site {
        #[command(subcommand)]
        action: SiteAction,
    },

    /// Crawl registered sites and store their pages
    Crawl {
        /// Crawl only this root URL (registered first if needed)
        #[arg(long)]
        site: Option<String>,
    },

    /// Crawl a site and print its pages without storing them
    Fetch {
        /// Root URL to crawl
        root_url: String,
    },

    /// Search stored pages by title or content
    Search {
        /// Text to look for
        query: String,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum SiteAction {
    /// Register a site for crawling
    Add {
        /// Root URL; only pages under it are crawled
        root_url: String,

        /// Display title (defaults to the host name)
        #[arg(short, long)]
        title: Option<String>,
    },

    /// List registered sites
    List,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{} ({})", e, e.code());
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; stdout is reserved for command output
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Commands::Init { force } = cli.command {
        return handle_init(cli.config.as_deref(), force, cli.json).await;
    }

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "watch-duty-crawler", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Init { .. } | Commands::Completions { .. } => unreachable!(),

        Commands::Site { action } => {
            let db = MetaDb::open(&config).await?;
            match action {
                SiteAction::Add { root_url, title } => {
                    let site =
                        cmd_add_site(&db, Site::new(title.unwrap_or_default(), root_url)).await?;
                    if cli.json {
                        println!("{}", serde_json::to_string_pretty(&site)?);
                    } else {
                        println!("✓ Added {} ({})", site.title, site.root_url);
                    }
                }
                SiteAction::List => {
                    let sites = cmd_list_sites(&db).await?;
                    if cli.json {
                        println!("{}", serde_json::to_string_pretty(&sites)?);
                    } else {
                        print_sites(&sites);
                    }
                }
            }
        }

        Commands::Crawl { site } => {
            let db = MetaDb::open(&config).await?;
            let engine = CrawlEngine::new(config.crawl.clone())?;

            let reports = match site {
                Some(root_url) => {
                    let site = registered_or_new(&db, &root_url).await?;
                    vec![cmd_crawl_site(&engine, &db, &site).await?]
                }
                None => cmd_crawl_all(&engine, &db, &db).await?,
            };

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                print_crawl_reports(&reports);
            }
        }

        Commands::Fetch { root_url } => {
            let engine = CrawlEngine::new(config.crawl.clone())?;
            let pages = engine.fetch(&Site::new("", root_url)).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&pages)?);
            } else {
                print_pages(&pages);
            }
        }

        Commands::Search { query } => {
            let db = MetaDb::open(&config).await?;
            let pages = cmd_search(&db, &query).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&pages)?);
            } else {
                print_pages(&pages);
            }
        }
    }

    Ok(())
}

/// Look up a registered site by root URL, registering it if unknown
async fn registered_or_new(db: &MetaDb, root_url: &str) -> Result<Site> {
    let root = parse_root_url(root_url)?;
    let existing = db
        .get_all()
        .await?
        .into_iter()
        .find(|s| s.root_url == root.as_str());

    match existing {
        Some(site) => Ok(site),
        None => cmd_add_site(db, Site::new("", root.as_str())).await,
    }
}

/// Resolve `--config` into a base directory; accepts a `.toml` file or a directory
fn base_dir_from(path: Option<&Path>) -> Option<PathBuf> {
    path.map(|path| {
        if path.extension().map_or(false, |e| e == "toml") {
            path.parent().unwrap_or(Path::new(".")).to_path_buf()
        } else {
            path.to_path_buf()
        }
    })
}

async fn handle_init(path: Option<&Path>, force: bool, json: bool) -> Result<()> {
    let result = cmd_init(InitOptions {
        base_dir: base_dir_from(path),
        force,
    })
    .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("✓ watch-duty-crawler initialized successfully");
        println!("  Config: {}", result.config_file.display());
        println!("  Database: {}", result.db_file.display());
        println!("\nNext steps:");
        println!("  1. Register a site: watch-duty-crawler site add https://example.com/");
        println!("  2. Crawl it: watch-duty-crawler crawl");
        println!("  3. Search: watch-duty-crawler search <text>");
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) if path.extension().map_or(false, |e| e == "toml") => Config::load(path),
        other => Config::load_from(base_dir_from(other)),
    }
}
