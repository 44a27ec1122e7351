// Job Code Catalog - Core Library
// Exposes the validation-and-mutation engine for use in the CLI, API server, and tests

pub mod audit;
pub mod catalog;
pub mod export;
pub mod index;
pub mod store;
pub mod validate;
pub mod workflow;

// Re-export commonly used types
pub use audit::{AuditEvent, AuditLog};
pub use catalog::{normalize_title, Catalog, CatalogEntry, ParseSiglumError, Siglum};
pub use index::LookupIndex;
pub use store::{open_store, CatalogStore, CsvStore, SqliteStore, StorageError, COLUMNS};
pub use validate::{
    validate_code, validate_title, CodeDecision, TitleDecision, MIN_CODE_LEN,
};
pub use workflow::{CatalogWorkflow, RemovalReport, WorkflowError, WorkflowState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
