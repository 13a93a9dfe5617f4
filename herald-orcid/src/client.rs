//! Thin wrapper around the ORCID public API with Herald defaults.
//!
//! One request per call, `Accept: application/vnd.orcid+json`, and a bounded
//! timeout. The raw calls return [`HttpError`]; the [`Registry`] impl turns
//! those failures into degraded fallbacks.
use crate::types::{PersonResponse, WorkGroup, WorksResponse};
use crate::{Lookup, Registry};
use herald_http::{HttpClient, HttpError, RequestOpts};
use std::time::Duration;

const ORCID_JSON: &str = "application/vnd.orcid+json";

#[derive(Clone)]
pub struct OrcidApi {
    http: HttpClient,
}

impl OrcidApi {
    /// `base_url` is the versioned API root, e.g. `https://pub.orcid.org/v3.0/`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, HttpError> {
        let http = HttpClient::new(base_url)?.with_timeout(timeout);
        Ok(Self { http })
    }

    pub async fn person(&self, orcid_id: &str) -> Result<PersonResponse, HttpError> {
        tracing::info!(orcid_id, "orcid.person.request");
        self.http
            .get_json(&format!("{orcid_id}/person"), RequestOpts::accept(ORCID_JSON))
            .await
    }

    pub async fn works(&self, orcid_id: &str) -> Result<WorksResponse, HttpError> {
        tracing::info!(orcid_id, "orcid.works.request");
        self.http
            .get_json(&format!("{orcid_id}/works"), RequestOpts::accept(ORCID_JSON))
            .await
    }
}

#[async_trait::async_trait]
impl Registry for OrcidApi {
    async fn resolve_name(&self, orcid_id: &str) -> Lookup<String> {
        match self.person(orcid_id).await {
            Ok(person) => {
                let name = person.full_name().unwrap_or_else(|| orcid_id.to_string());
                tracing::info!(orcid_id, name = %name, "orcid.person.resolved");
                Lookup::Fetched(name)
            }
            Err(e) => {
                tracing::warn!(orcid_id, error = %e, "orcid.person.failed");
                Lookup::Degraded {
                    value: orcid_id.to_string(),
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn fetch_works(&self, orcid_id: &str) -> Lookup<Vec<WorkGroup>> {
        match self.works(orcid_id).await {
            Ok(resp) => {
                let groups = resp.group.unwrap_or_default();
                tracing::info!(orcid_id, groups = groups.len(), "orcid.works.fetched");
                Lookup::Fetched(groups)
            }
            Err(e) => {
                tracing::warn!(orcid_id, error = %e, "orcid.works.failed");
                Lookup::Degraded {
                    value: Vec::new(),
                    reason: e.to_string(),
                }
            }
        }
    }
}
