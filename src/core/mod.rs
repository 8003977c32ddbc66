//! Core business logic module
//!
//! Contains the batch job model, the download coordinator and its workers,
//! format selection, engine and transcoder integration, progress
//! aggregation, and settings persistence.

pub mod coordinator;
pub mod engine;
pub mod format_selector;
pub mod models;
pub mod progress;
pub mod settings;
pub mod transcoder;
pub mod worker;


// Re-export commonly used types
pub use coordinator::DownloadCoordinator;
pub use settings::Settings;
