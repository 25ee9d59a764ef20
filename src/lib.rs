pub mod config;
pub mod constants;
pub mod draft;
pub mod error;
pub mod idempotency;
pub mod logging;
pub mod sections;
pub mod storage;
pub mod validate;
pub mod wizard;

// Adapters for the hosted persistence/auth service
pub mod infra;

// Metrics and exporter setup
pub mod observability;
