//! Core types and shared functionality for fetchkit.
//!
//! This crate provides:
//! - Disk-backed page cache with expiration and optional compression
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheEntry, DiskCache, PageCache};
pub use config::{AppConfig, CacheBackend, RequestDelay};
pub use error::{Error, FailureKind};
