pub mod discover;
pub mod filter;
pub mod report;

pub use discover::{DiscoverOptions, DiscoverProgressCallback, execute_discovery};
pub use filter::PageFilter;
pub use report::{ReportFormat, render_report};
