pub mod canonical;
pub mod config;
pub mod discoverer;
pub mod error;
pub mod feed;
pub mod fetch;
pub mod llms;
pub mod result;
pub mod robots;
pub mod sitemap;

pub use config::DiscoveryConfig;
pub use discoverer::{Discoverer, ProgressCallback};
pub use error::ScanError;
pub use result::{Diagnostic, DiscoveredSource, Discovery, FetchOutcome, PageUrl, SourceKind};
