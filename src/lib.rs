pub mod config;
pub mod logging;
pub mod models;
pub mod monitor;
pub mod notification;
pub mod plugins;
pub mod scheduler;
pub mod scraper;
pub mod state_store;
pub mod target_loader;
pub mod utils;

// Re-export commonly used types
pub use config::AppConfig;
pub use monitor::{Monitor, RunMode, RunSummary};
pub use utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;
