pub mod config;
pub mod credentials;
pub mod criteria;
pub mod download;
pub mod error;
pub mod results;
pub mod scene;
pub mod scrape;
pub mod session;
pub mod util;
