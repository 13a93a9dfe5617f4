//! Recency filtering of ORCID work summaries.
//!
//! Works are kept when their creation time (or, failing that, their
//! last-modification time) falls inside the lookback window. The cutoff is
//! inclusive and the result is ordered newest first.
use crate::types::{TitleValue, WorkGroup, WorkSummary};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

/// Placeholder used when a work has no usable title.
pub const NO_TITLE: &str = "(no title)";
/// Resolver prefix for DOI links.
pub const DOI_RESOLVER: &str = "https://doi.org/";

/// A work that qualified for announcement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilteredWork {
    pub title: String,
    pub doi_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Keep works dated within `lookback_days` of `now`, newest first.
///
/// Equal timestamps keep their input order.
pub fn filter_recent(
    groups: &[WorkGroup],
    lookback_days: u32,
    now: DateTime<Utc>,
) -> Vec<FilteredWork> {
    let cutoff = now
        .checked_sub_signed(TimeDelta::days(i64::from(lookback_days)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    tracing::debug!(cutoff = %cutoff.to_rfc3339(), lookback_days, "orcid.filter.cutoff");

    let mut results: Vec<FilteredWork> = groups
        .iter()
        .flat_map(|g| g.work_summary.as_deref().unwrap_or_default())
        .filter_map(|ws| to_filtered(ws, cutoff))
        .collect();

    results.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    tracing::debug!(kept = results.len(), "orcid.filter.done");
    results
}

/// [`filter_recent`] against the current UTC time.
pub fn filter_recent_now(groups: &[WorkGroup], lookback_days: u32) -> Vec<FilteredWork> {
    filter_recent(groups, lookback_days, Utc::now())
}

fn to_filtered(ws: &WorkSummary, cutoff: DateTime<Utc>) -> Option<FilteredWork> {
    let millis = ws.effective_millis()?;
    let created_at = DateTime::<Utc>::from_timestamp_millis(millis)?;
    if created_at < cutoff {
        return None;
    }
    Some(FilteredWork {
        title: resolve_title(ws.title_value()),
        doi_url: ws.first_doi().map(|doi| format!("{DOI_RESOLVER}{doi}")),
        created_at,
    })
}

/// Collapse the loosely typed title into display text.
pub fn resolve_title(title: Option<&TitleValue>) -> String {
    match title {
        Some(TitleValue::Plain(s)) => s.clone(),
        Some(TitleValue::Structured { value: Some(v) }) => v.clone(),
        Some(TitleValue::Structured { value: None }) | Some(TitleValue::Other(_)) | None => {
            NO_TITLE.to_string()
        }
    }
}
