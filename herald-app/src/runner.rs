//! One announcement pass over the configured researchers.
use herald_config::HeraldConfig;
use herald_orcid::{Lookup, Registry, filter_recent_now};
use herald_social::Publisher;
use herald_social::bluesky::compose;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

const PROFILE_BASE: &str = "https://orcid.org/";

#[derive(Debug, Clone)]
pub struct RunSettings {
    pub orcid_ids: Vec<String>,
    pub days_back: u32,
    pub max_posts_total: u32,
    pub hashtags: Vec<String>,
    /// Pause after a submission when more posts may follow.
    pub pace: Duration,
}

impl From<&HeraldConfig> for RunSettings {
    fn from(cfg: &HeraldConfig) -> Self {
        Self {
            orcid_ids: cfg.orcid_ids.clone(),
            days_back: cfg.days_back,
            max_posts_total: cfg.max_posts_total,
            hashtags: cfg.hashtags.clone(),
            pace: Duration::from_millis(cfg.post_interval_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub identifiers_checked: usize,
    pub posted: u32,
    pub failed: u32,
}

pub struct Runner<R, P> {
    registry: R,
    publisher: P,
    settings: RunSettings,
    names: HashMap<String, String>,
}

impl<R: Registry, P: Publisher> Runner<R, P> {
    pub fn new(registry: R, publisher: P, settings: RunSettings) -> Self {
        Self {
            registry,
            publisher,
            settings,
            names: HashMap::new(),
        }
    }

    pub async fn run(&mut self) -> RunSummary {
        let mut summary = RunSummary::default();
        let mut remaining = self.settings.max_posts_total;
        let ids = self.settings.orcid_ids.clone();
        tracing::info!(
            identifiers = ids.len(),
            budget = remaining,
            days_back = self.settings.days_back,
            publisher = self.publisher.name(),
            "run.start"
        );

        for orcid_id in &ids {
            if remaining == 0 {
                tracing::info!(orcid_id = %orcid_id, "run.budget_exhausted");
                break;
            }
            summary.identifiers_checked += 1;

            let name = self.name_for(orcid_id).await;
            let groups = self.registry.fetch_works(orcid_id).await.into_inner();
            let works = filter_recent_now(&groups, self.settings.days_back);
            if works.is_empty() {
                tracing::info!(orcid_id = %orcid_id, "run.no_recent_works");
                continue;
            }

            let profile_url = format!("{PROFILE_BASE}{orcid_id}");
            for work in &works {
                if remaining == 0 {
                    break;
                }
                let draft = compose(
                    &name,
                    &profile_url,
                    &work.title,
                    work.doi_url.as_deref(),
                    &self.settings.hashtags,
                );
                match self.publisher.publish(&draft).await {
                    Ok(post) => {
                        summary.posted += 1;
                        tracing::info!(orcid_id = %orcid_id, title = %work.title, uri = %post.uri, "run.posted");
                    }
                    Err(e) => {
                        summary.failed += 1;
                        tracing::error!(orcid_id = %orcid_id, title = %work.title, error = %e, "run.post_failed");
                    }
                }
                remaining -= 1;
                if remaining > 0 && !self.settings.pace.is_zero() {
                    tokio::time::sleep(self.settings.pace).await;
                }
            }
        }

        tracing::info!(
            checked = summary.identifiers_checked,
            posted = summary.posted,
            failed = summary.failed,
            "run.done"
        );
        summary
    }

    async fn name_for(&mut self, orcid_id: &str) -> String {
        if let Some(name) = self.names.get(orcid_id) {
            return name.clone();
        }
        let name = match self.registry.resolve_name(orcid_id).await {
            Lookup::Fetched(name) => name,
            Lookup::Degraded { value, reason } => {
                tracing::warn!(orcid_id, reason = %reason, "run.name_fallback");
                value
            }
        };
        self.names.insert(orcid_id.to_string(), name.clone());
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, Utc};
    use herald_common::HeraldError;
    use herald_orcid::WorkGroup;
    use herald_social::{PostDraft, PostRef};
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeRegistry {
        names: HashMap<String, String>,
        works: HashMap<String, serde_json::Value>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeRegistry {
        fn with(mut self, id: &str, name: &str, works: serde_json::Value) -> Self {
            self.names.insert(id.into(), name.into());
            self.works.insert(id.into(), works);
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl Registry for FakeRegistry {
        async fn resolve_name(&self, orcid_id: &str) -> Lookup<String> {
            self.calls.lock().unwrap().push(format!("person:{orcid_id}"));
            match self.names.get(orcid_id) {
                Some(n) => Lookup::Fetched(n.clone()),
                None => Lookup::Degraded {
                    value: orcid_id.to_string(),
                    reason: "404".into(),
                },
            }
        }

        async fn fetch_works(&self, orcid_id: &str) -> Lookup<Vec<WorkGroup>> {
            self.calls.lock().unwrap().push(format!("works:{orcid_id}"));
            match self.works.get(orcid_id) {
                Some(v) => Lookup::Fetched(serde_json::from_value(v.clone()).unwrap()),
                None => Lookup::Degraded {
                    value: Vec::new(),
                    reason: "404".into(),
                },
            }
        }
    }

    #[derive(Default)]
    struct Recorder {
        posts: Mutex<Vec<String>>,
        fail_all: bool,
    }

    #[async_trait::async_trait]
    impl Publisher for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        async fn publish(&self, draft: &PostDraft) -> herald_common::Result<PostRef> {
            self.posts.lock().unwrap().push(draft.text.clone());
            if self.fail_all {
                return Err(HeraldError::Publish("rejected".into()));
            }
            Ok(PostRef {
                uri: "at://x".into(),
                cid: "c".into(),
            })
        }
    }

    fn days_ago(days: i64) -> i64 {
        (Utc::now() - TimeDelta::days(days)).timestamp_millis()
    }

    fn works(titles_and_ages: &[(&str, i64)]) -> serde_json::Value {
        let summaries: Vec<_> = titles_and_ages
            .iter()
            .map(|(t, age)| {
                json!({"title": {"title": {"value": t}}, "created-date": {"value": days_ago(*age)}})
            })
            .collect();
        json!([{"work-summary": summaries}])
    }

    fn settings(ids: &[&str], budget: u32) -> RunSettings {
        RunSettings {
            orcid_ids: ids.iter().map(|s| s.to_string()).collect(),
            days_back: 30,
            max_posts_total: budget,
            hashtags: vec![],
            pace: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn budget_stops_across_identifiers() {
        let registry = FakeRegistry::default()
            .with("A", "Alice", works(&[("a1", 1), ("a2", 2), ("a3", 3)]))
            .with("B", "Bob", works(&[("b1", 1), ("b2", 2), ("b3", 3)]));
        let rec = Recorder::default();
        let mut runner = Runner::new(registry, rec, settings(&["A", "B"], 5));

        let summary = runner.run().await;
        assert_eq!(summary.posted, 5);
        assert_eq!(summary.identifiers_checked, 2);
        let posts = runner.publisher.posts.lock().unwrap().clone();
        let titles: Vec<_> = posts
            .iter()
            .map(|p| p.lines().nth(1).unwrap().to_string())
            .collect();
        assert_eq!(titles, vec!["a1", "a2", "a3", "b1", "b2"]);
        assert!(posts[0].starts_with("New paper from Alice (ORCID: https://orcid.org/A)"));
    }

    #[tokio::test]
    async fn single_post_budget_goes_to_first_identifier() {
        let registry = FakeRegistry::default()
            .with("0000-0001", "First", works(&[("first paper", 1)]))
            .with("0000-0002", "Second", works(&[("second paper", 1)]));
        let rec = Recorder::default();
        let mut runner = Runner::new(registry, rec, settings(&["0000-0001", "0000-0002"], 1));

        let summary = runner.run().await;
        assert_eq!(
            summary,
            RunSummary {
                identifiers_checked: 1,
                posted: 1,
                failed: 0
            }
        );
        let posts = runner.publisher.posts.lock().unwrap().clone();
        assert_eq!(posts.len(), 1);
        assert!(posts[0].starts_with("New paper from First (ORCID: https://orcid.org/0000-0001)"));
        assert!(posts[0].ends_with("\nfirst paper"));
        assert!(!runner.registry.calls().iter().any(|c| c.ends_with("0000-0002")));
    }

    #[tokio::test]
    async fn exhausted_budget_skips_remaining_registry_calls() {
        let registry = FakeRegistry::default()
            .with("A", "Alice", works(&[("a1", 1), ("a2", 2)]))
            .with("B", "Bob", works(&[("b1", 1)]));
        let rec = Recorder::default();
        let mut runner = Runner::new(registry, rec, settings(&["A", "B"], 2));

        let summary = runner.run().await;
        assert_eq!(summary.posted, 2);
        assert_eq!(summary.identifiers_checked, 1);
        assert_eq!(runner.registry.calls(), vec!["person:A", "works:A"]);
    }

    #[tokio::test]
    async fn zero_budget_makes_no_calls() {
        let registry = FakeRegistry::default().with("A", "Alice", works(&[("a1", 1)]));
        let rec = Recorder::default();
        let mut runner = Runner::new(registry, rec, settings(&["A"], 0));

        assert_eq!(runner.run().await, RunSummary::default());
        assert!(runner.registry.calls().is_empty());
    }

    #[tokio::test]
    async fn repeated_identifier_resolves_name_once() {
        let registry = FakeRegistry::default().with("A", "Alice", works(&[("a1", 1)]));
        let rec = Recorder::default();
        let mut runner = Runner::new(registry, rec, settings(&["A", "A"], 5));

        let summary = runner.run().await;
        assert_eq!(summary.posted, 2);
        assert_eq!(
            runner.registry.calls(),
            vec!["person:A", "works:A", "works:A"]
        );
    }

    #[tokio::test]
    async fn stale_and_unknown_identifiers_are_skipped() {
        let registry = FakeRegistry::default()
            .with("OLD", "Olga", works(&[("ancient", 40)]))
            .with("NEW", "Nina", works(&[("fresh", 1)]));
        let rec = Recorder::default();
        let mut runner = Runner::new(registry, rec, settings(&["OLD", "MISSING", "NEW"], 5));

        let summary = runner.run().await;
        assert_eq!(summary.identifiers_checked, 3);
        assert_eq!(summary.posted, 1);
        let posts = runner.publisher.posts.lock().unwrap().clone();
        assert_eq!(posts.len(), 1);
        assert!(posts[0].contains("Nina"));
    }

    #[tokio::test]
    async fn failed_publishes_are_counted_and_consume_budget() {
        let registry = FakeRegistry::default().with("A", "Alice", works(&[("a1", 1), ("a2", 2), ("a3", 3)]));
        let rec = Recorder {
            fail_all: true,
            ..Default::default()
        };
        let mut runner = Runner::new(registry, rec, settings(&["A"], 2));

        let summary = runner.run().await;
        assert_eq!(summary.posted, 0);
        assert_eq!(summary.failed, 2);
        assert_eq!(runner.publisher.posts.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn hashtags_flow_into_posts() {
        let registry = FakeRegistry::default().with("A", "Alice", works(&[("a1", 1)]));
        let rec = Recorder::default();
        let mut s = settings(&["A"], 1);
        s.hashtags = vec!["#openscience".into()];
        let mut runner = Runner::new(registry, rec, s);

        runner.run().await;
        let posts = runner.publisher.posts.lock().unwrap().clone();
        assert!(posts[0].ends_with("\n#openscience"), "{}", posts[0]);
    }
}
