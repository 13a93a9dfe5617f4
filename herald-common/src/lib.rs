//! Common types and utilities shared across Herald crates.
//!
//! This crate defines the shared error type and the observability helpers
//! used throughout the Herald workspace. It is intentionally lightweight so
//! that every crate can depend on it without pulling in the HTTP stack.
//!
//! # Overview
//!
//! - [`observability`]: Centralised tracing/logging initialisation
//! - [`HeraldError`] and [`Result`]: Shared error handling
//!
//! # Examples
//!
//! ```rust
//! use herald_common::HeraldError;
//!
//! let err = HeraldError::MissingCredential("BLUESKY_HANDLE");
//! assert_eq!(err.to_string(), "Missing credential: BLUESKY_HANDLE is not set");
//! ```

pub mod observability;

/// Error types used across the Herald system.
#[derive(thiserror::Error, Debug)]
pub enum HeraldError {
    /// A required credential was absent from the process environment.
    #[error("Missing credential: {0} is not set")]
    MissingCredential(&'static str),

    /// The publishing endpoint rejected or failed a request.
    #[error("Publish error: {0}")]
    Publish(String),
}

/// Convenient alias for results that use [`HeraldError`].
pub type Result<T> = std::result::Result<T, HeraldError>;
