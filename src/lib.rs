//! stockroom - bookstore inventory ingestion and reporting
//!
//! This crate provides:
//! - Streaming, batched CSV ingestion with per-row transactions
//! - Gateways over the store, author, book and stock tables
//! - Per-store PDF inventory reports
//! - An HTTP API and a CLI over both

pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod http;
pub mod ingest;
pub mod progress;
pub mod report;
pub mod validate;

pub use config::Config;
pub use error::{Error, Result};
