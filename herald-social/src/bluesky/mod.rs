//! Bluesky (AT Protocol) publishing surface.
//!
//! [`compose`] builds the post text and facets, [`client`] logs in and writes
//! records, and [`types`] holds the XRPC request/response shapes.
pub mod client;
pub mod compose;
pub mod types;

pub use client::{BlueskyApi, BlueskySession};
pub use compose::{Facet, FacetFeature, MAX_CHARS, PostDraft, compose};
pub use types::PostRef;
