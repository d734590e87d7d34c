//! CLI commands implementation

pub mod crawl;
pub mod init;
pub mod search;
pub mod sites;

pub use crawl::*;
pub use init::*;
pub use search::*;
pub use sites::*;
