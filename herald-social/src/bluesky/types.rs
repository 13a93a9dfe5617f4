use crate::bluesky::compose::{Facet, FacetFeature, PostDraft};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const POST_COLLECTION: &str = "app.bsky.feed.post";

// ==============================
// com.atproto.server.createSession
// ==============================

#[derive(Debug, Clone, Serialize)]
pub struct CreateSessionRequest<'a> {
    pub identifier: &'a str,
    pub password: &'a str,
}

#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub access_jwt: String,
    #[serde(default)]
    pub refresh_jwt: Option<String>,
    pub handle: String,
    pub did: String,
}

impl fmt::Debug for SessionResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionResponse")
            .field("access_jwt", &"<redacted>")
            .field("handle", &self.handle)
            .field("did", &self.did)
            .finish()
    }
}

// ==============================
// com.atproto.repo.createRecord
// ==============================

#[derive(Debug, Clone, Serialize)]
pub struct CreateRecordRequest<'a> {
    pub repo: &'a str,
    pub collection: &'static str,
    pub record: PostRecord,
}

/// `app.bsky.feed.post` record body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    #[serde(rename = "$type")]
    pub kind: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub facets: Vec<RichTextFacet>,
    /// RFC 3339 with millisecond precision and a `Z` suffix.
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichTextFacet {
    pub index: ByteSlice,
    pub features: Vec<FeatureRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ByteSlice {
    pub byte_start: usize,
    pub byte_end: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "$type")]
pub enum FeatureRecord {
    #[serde(rename = "app.bsky.richtext.facet#link")]
    Link { uri: String },
    #[serde(rename = "app.bsky.richtext.facet#tag")]
    Tag { tag: String },
}

/// `{uri, cid}` returned for a stored record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRef {
    pub uri: String,
    pub cid: String,
}

impl From<&Facet> for RichTextFacet {
    fn from(f: &Facet) -> Self {
        let feature = match &f.feature {
            FacetFeature::Link { uri } => FeatureRecord::Link { uri: uri.clone() },
            FacetFeature::Tag { tag } => FeatureRecord::Tag { tag: tag.clone() },
        };
        Self {
            index: ByteSlice {
                byte_start: f.byte_start,
                byte_end: f.byte_end,
            },
            features: vec![feature],
        }
    }
}

impl PostRecord {
    pub fn from_draft(draft: &PostDraft, created_at: String) -> Self {
        Self {
            kind: POST_COLLECTION.to_string(),
            text: draft.text.clone(),
            facets: draft.facets.iter().map(RichTextFacet::from).collect(),
            created_at,
        }
    }
}
