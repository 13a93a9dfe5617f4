//! Announcement targets for Herald.
//!
//! Only Bluesky is implemented. A run publishes through the [`Publisher`]
//! trait so the posting side can be swapped for [`DryRunPublisher`] or a
//! test double.
pub mod bluesky;

pub use bluesky::{PostDraft, PostRef};

/// Destination for composed posts.
#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    fn name(&self) -> &'static str;

    async fn publish(&self, draft: &PostDraft) -> herald_common::Result<PostRef>;
}

/// Logs drafts instead of posting them.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunPublisher;

#[async_trait::async_trait]
impl Publisher for DryRunPublisher {
    fn name(&self) -> &'static str {
        "dry-run"
    }

    async fn publish(&self, draft: &PostDraft) -> herald_common::Result<PostRef> {
        tracing::info!(
            chars = draft.char_len(),
            facets = draft.facets.len(),
            text = %draft.text,
            "dry_run.post"
        );
        Ok(PostRef {
            uri: "dry-run".to_string(),
            cid: String::new(),
        })
    }
}
