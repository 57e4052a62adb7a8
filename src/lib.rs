// ScholarSeva - Core Library
// Catalog, filter engine, account store and report export for the CLI and API server

pub mod accounts;
pub mod catalog;
pub mod config;
pub mod export;
pub mod filter;
pub mod logging;
pub mod storage;

#[cfg(feature = "server")]
pub mod server;

// Re-export commonly used types
pub use accounts::{
    AccountStore, AuthError, Session, UserAccount, ValidationError, MIN_PASSWORD_LEN,
};
pub use catalog::{
    ApplyLink, Catalog, LoadError, Origin, ScholarshipId, ScholarshipRecord, HOME_PREVIEW_LIMIT,
};
pub use config::{AppConfig, ConfigError};
pub use export::{ExportError, Report, ReportFormat};
pub use filter::{
    filter, parse_income_ceiling, FilterCriteria, IncomeCeiling, ALL_CATEGORIES, ALL_INDIA,
};
pub use logging::LogError;
pub use storage::{KeyValueStore, MemoryStore, SqliteStore, StorageError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
