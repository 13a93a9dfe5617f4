//! Bluesky XRPC client: app-password login and post creation.
//!
//! [`BlueskyApi::login`] exchanges a handle and app password for a session;
//! the resulting [`BlueskySession`] carries the access token and the
//! account DID that records are written under.
use crate::Publisher;
use crate::bluesky::compose::PostDraft;
use crate::bluesky::types::{
    CreateRecordRequest, CreateSessionRequest, POST_COLLECTION, PostRecord, PostRef,
    SessionResponse,
};
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use herald_common::HeraldError;
use herald_http::{Auth, HttpClient, RequestOpts};
use std::time::Duration;

const CREATE_SESSION: &str = "xrpc/com.atproto.server.createSession";
const CREATE_RECORD: &str = "xrpc/com.atproto.repo.createRecord";

#[derive(Clone)]
pub struct BlueskyApi {
    http: HttpClient,
}

impl BlueskyApi {
    /// `service` is the PDS root, e.g. `https://bsky.social`.
    pub fn new(service: &str, timeout: Duration) -> Result<Self> {
        let http = HttpClient::new(service)
            .with_context(|| format!("invalid Bluesky service URL {service}"))?
            .with_timeout(timeout);
        Ok(Self { http })
    }

    pub async fn login(&self, handle: &str, app_password: &str) -> Result<BlueskySession> {
        tracing::info!(handle, "bluesky.login.request");
        let resp: SessionResponse = self
            .http
            .post_json(
                CREATE_SESSION,
                &CreateSessionRequest {
                    identifier: handle,
                    password: app_password,
                },
                RequestOpts::default(),
            )
            .await
            .with_context(|| format!("Bluesky login failed for {handle}"))?;
        tracing::info!(handle = %resp.handle, did = %resp.did, "bluesky.login.ok");
        Ok(BlueskySession {
            http: self.http.clone(),
            session: resp,
        })
    }
}

/// Authenticated session bound to one account.
#[derive(Clone)]
pub struct BlueskySession {
    http: HttpClient,
    session: SessionResponse,
}

impl BlueskySession {
    pub fn did(&self) -> &str {
        &self.session.did
    }

    pub fn handle(&self) -> &str {
        &self.session.handle
    }

    /// Store `draft` as an `app.bsky.feed.post` record stamped `created_at`.
    pub async fn create_post(&self, draft: &PostDraft, created_at: DateTime<Utc>) -> Result<PostRef> {
        let record = PostRecord::from_draft(
            draft,
            created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        );
        let body = CreateRecordRequest {
            repo: &self.session.did,
            collection: POST_COLLECTION,
            record,
        };
        let post: PostRef = self
            .http
            .post_json(
                CREATE_RECORD,
                &body,
                RequestOpts {
                    auth: Some(Auth::Bearer(&self.session.access_jwt)),
                    ..Default::default()
                },
            )
            .await
            .context("createRecord failed")?;
        tracing::info!(uri = %post.uri, cid = %post.cid, "bluesky.post.created");
        Ok(post)
    }
}

#[async_trait::async_trait]
impl Publisher for BlueskySession {
    fn name(&self) -> &'static str {
        "bluesky"
    }

    async fn publish(&self, draft: &PostDraft) -> herald_common::Result<PostRef> {
        self.create_post(draft, Utc::now())
            .await
            .map_err(|e| HeraldError::Publish(format!("{e:#}")))
    }
}
