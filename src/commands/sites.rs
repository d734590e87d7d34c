//! Site registration commands

use crate::crawl::parse_root_url;
use crate::error::Result;
use crate::meta::SiteRepository;
use crate::models::Site;
use tracing::info;

/// Validate and register a site.
///
/// The stored root URL is the normalized form (fragment dropped, trailing
/// slash on a bare host), so later crawls compute relative paths against it.
pub async fn cmd_add_site(repo: &dyn SiteRepository, site: Site) -> Result<Site> {
    let root = parse_root_url(&site.root_url)?;
    let title = if site.title.trim().is_empty() {
        root.host_str().unwrap_or_default().to_string()
    } else {
        site.title.trim().to_string()
    };
    let site = Site::new(title, root.as_str());

    repo.add(&site).await?;
    info!("Added site {} ({})", site.title, site.root_url);
    Ok(site)
}

pub async fn cmd_list_sites(repo: &dyn SiteRepository) -> Result<Vec<Site>> {
    repo.get_all().await
}

/// Print registered sites to console
pub fn print_sites(sites: &[Site]) {
    println!("\nRegistered Sites\n");

    if sites.is_empty() {
        println!("No sites registered. Add one with 'watch-duty-crawler site add <url>'.");
        return;
    }

    for site in sites {
        println!("  {}  {}", site.title, site.root_url);
    }
}
