// School-review directory - server-rendered CRUD core

// HTTP surface
pub mod api;

// Application wiring
pub mod app_state;
pub mod config;

// Directory core - aggregation, guards, follow graph, fanout
pub mod directory;

// Entities and storage
pub mod models;
pub mod store;

// Acting-user context supplied by the session layer
pub mod viewer;

// Common utilities
pub mod error;

// Re-exports for convenience
pub use error::{AppError, AppResult};
