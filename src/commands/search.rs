//! Search command implementation

use crate::error::Result;
use crate::meta::PageRepository;
use crate::models::Page;
use tracing::info;

/// Find indexable pages whose title or content contains `query`
pub async fn cmd_search(repo: &dyn PageRepository, query: &str) -> Result<Vec<Page>> {
    info!("Searching: {}", query);
    repo.find_by_query(query).await
}

/// Print pages to console, one block per page
pub fn print_pages(pages: &[Page]) {
    if pages.is_empty() {
        println!("No pages found.");
        return;
    }

    for page in pages {
        let flag = if page.noindex { " [noindex]" } else { "" };
        println!("\n{}  {}{}", page.relative_path, page.title, flag);
        for line in page.content.lines().take(3) {
            println!("    {}", line);
        }
    }
    println!();
}
