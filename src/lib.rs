/// Basic application code
pub mod app;
/// REST clients for outside services
pub mod client;
/// Controllers for REST endpoints
pub mod controller;
/// Domain objects and derivation logic
pub mod domain;
/// Error taxonomy shared across layers
pub mod error;
/// Repositories
pub mod repo;
/// Application settings
pub mod settings;
/// Filesystem-backed blob store for uploaded media
pub mod storage;
/// Application telemetry for tracing and logging
pub mod telemetry;
