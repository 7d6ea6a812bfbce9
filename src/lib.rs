/// Basic application code
pub mod app;
/// Back-office authentication and authorization
pub mod auth;
/// REST clients for outside services
pub mod client;
/// Controllers for REST endpoints
pub mod controller;
/// Cryptography-related objects
pub mod crypto;
/// Domain objects
pub mod domain;
pub mod error;
/// Database rows and inputs
pub mod model;
/// Repositories
pub mod repo;
/// Business operations spanning several repositories
pub mod service;
/// Application settings
pub mod settings;
/// Application telemetry for tracing and logging
pub mod telemetry;
/// Background tasks
pub mod worker;
