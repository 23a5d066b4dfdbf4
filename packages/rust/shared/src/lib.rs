//! Shared types, error model, and configuration for Draftmill.
//!
//! This crate is the foundation depended on by all other Draftmill crates.
//! It provides:
//! - [`DraftmillError`] — the unified error type
//! - Domain types ([`JobRecord`], [`JobStatus`], [`DocumentRecord`], [`JobId`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, ServiceConfig, StorageConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from, resolve_db_path, service_api_key,
    validate_api_key,
};
pub use error::{DraftmillError, Result};
pub use types::{
    AuthorRecord, DocumentId, DocumentRecord, JobId, JobRecord, JobStatus, NewDocument,
};
