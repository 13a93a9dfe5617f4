//! ORCID registry access and recency filtering.
//!
//! - [`client::OrcidApi`]: person and works lookups against the public API
//! - [`types`]: the loosely typed ORCID payloads
//! - [`filter`]: turns work groups into dated, titled [`filter::FilteredWork`]s
//!
//! Registry calls never fail outright: a [`Registry`] returns a [`Lookup`]
//! that is either the fetched value or a fallback plus the reason.
pub mod client;
pub mod filter;
pub mod types;

pub use client::OrcidApi;
pub use filter::{FilteredWork, filter_recent, filter_recent_now};
pub use types::WorkGroup;

/// Outcome of a fail-soft registry call.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Fetched(T),
    Degraded { value: T, reason: String },
}

impl<T> Lookup<T> {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Lookup::Degraded { .. })
    }

    pub fn into_inner(self) -> T {
        match self {
            Lookup::Fetched(value) | Lookup::Degraded { value, .. } => value,
        }
    }
}

/// Source of researcher names and works.
#[async_trait::async_trait]
pub trait Registry: Send + Sync {
    /// Display name for `orcid_id`, or the identifier itself.
    async fn resolve_name(&self, orcid_id: &str) -> Lookup<String>;

    /// Raw work groups for `orcid_id`, or an empty list.
    async fn fetch_works(&self, orcid_id: &str) -> Lookup<Vec<WorkGroup>>;
}
