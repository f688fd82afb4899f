//! Optional pre-step: harvest a remote directory index, download the
//! matching archives, and extract them into the base directory.

pub mod extract;
pub mod fetch;
pub mod scraper;

pub use extract::extract_zip_files;
pub use fetch::download_files;
pub use scraper::{filter_urls, scrape_directory_index};
