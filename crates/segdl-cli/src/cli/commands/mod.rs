//! CLI command handlers, one per file.

mod config;
mod get;
mod inspect;

pub use config::run_config;
pub use get::run_get;
pub use inspect::run_inspect;
