use crate::config::PacingConfig;
use crate::models::Document;
use crate::store::SearchStore;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Result of the one-time index setup. Every variant lets the run continue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexSetup {
    AlreadyExists,
    Created,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Written,
    /// The document is dropped; nothing is retried.
    Failed { title: String, reason: String },
}

/// Sole writer to the search store, sleeping for `cooldown` after every
/// `interval` submissions.
pub struct SubmissionPacer<S> {
    store: S,
    index: String,
    pacing: PacingConfig,
    submitted: u64,
}

impl<S: SearchStore> SubmissionPacer<S> {
    pub fn new(store: S, index: impl Into<String>, pacing: PacingConfig) -> Self {
        Self {
            store,
            index: index.into(),
            pacing,
            submitted: 0,
        }
    }

    pub async fn ensure_index(&self, schema: &Value) -> IndexSetup {
        match self.store.index_exists(&self.index).await {
            Ok(true) => {
                info!(index = %self.index, "Index already exists");
                IndexSetup::AlreadyExists
            }
            Ok(false) => match self.store.create_index(&self.index, schema).await {
                Ok(()) => {
                    info!(index = %self.index, "Index created");
                    IndexSetup::Created
                }
                Err(e) => {
                    let reason = format!("{e:#}");
                    warn!(index = %self.index, error = %reason, "Index creation failed, continuing");
                    IndexSetup::Failed(reason)
                }
            },
            Err(e) => {
                let reason = format!("{e:#}");
                warn!(index = %self.index, error = %reason, "Index check failed, continuing");
                IndexSetup::Failed(reason)
            }
        }
    }

    pub async fn submit(&mut self, doc: Document) -> SubmitOutcome {
        if self.cooldown_due() {
            debug!(
                submitted = self.submitted,
                cooldown_ms = self.pacing.cooldown.as_millis() as u64,
                "Pacing cooldown"
            );
            tokio::time::sleep(self.pacing.cooldown).await;
        }
        self.submitted += 1;

        match self.store.write_document(&self.index, &doc).await {
            Ok(()) => {
                debug!(title = %doc.title, "Submitted");
                SubmitOutcome::Written
            }
            Err(e) => {
                let reason = format!("{e:#}");
                warn!(title = %doc.title, error = %reason, "Failed to index document");
                SubmitOutcome::Failed {
                    title: doc.title,
                    reason,
                }
            }
        }
    }

    fn cooldown_due(&self) -> bool {
        self.pacing.enabled
            && self.pacing.interval > 0
            && self.submitted > 0
            && self.submitted % self.pacing.interval == 0
    }

    /// Submission calls made so far, failed ones included.
    pub fn submitted(&self) -> u64 {
        self.submitted
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::Instant;

    #[derive(Default)]
    struct FakeStore {
        exists: bool,
        fail_exists: bool,
        fail_create: bool,
        fail_titles: Vec<String>,
        created: Mutex<Vec<Value>>,
        writes: Mutex<Vec<(String, Instant)>>,
    }

    #[async_trait]
    impl SearchStore for FakeStore {
        async fn index_exists(&self, _index: &str) -> Result<bool> {
            if self.fail_exists {
                bail!("connection refused");
            }
            Ok(self.exists)
        }

        async fn create_index(&self, _index: &str, schema: &Value) -> Result<()> {
            if self.fail_create {
                bail!("resource_already_exists_exception");
            }
            self.created.lock().unwrap().push(schema.clone());
            Ok(())
        }

        async fn write_document(&self, _index: &str, doc: &Document) -> Result<()> {
            if self.fail_titles.contains(&doc.title) {
                bail!("timeout");
            }
            self.writes
                .lock()
                .unwrap()
                .push((doc.title.clone(), Instant::now()));
            Ok(())
        }
    }

    fn doc(title: &str) -> Document {
        Document {
            title: title.to_string(),
            title_keyword: title.to_string(),
            wiki_id: "1".to_string(),
            short_description: None,
            coordinates: None,
            categories: Vec::new(),
            content: String::new(),
            complete_text: String::new(),
        }
    }

    fn pacing(interval: u64) -> PacingConfig {
        PacingConfig {
            enabled: true,
            interval,
            cooldown: Duration::from_secs(3),
        }
    }

    #[tokio::test]
    async fn creates_missing_index() {
        let pacer = SubmissionPacer::new(FakeStore::default(), "wiki", pacing(10));
        let schema = serde_json::json!({"mappings": {}});
        assert_eq!(pacer.ensure_index(&schema).await, IndexSetup::Created);
        assert_eq!(pacer.store().created.lock().unwrap().as_slice(), &[schema]);
    }

    #[tokio::test]
    async fn existing_index_is_left_alone() {
        let store = FakeStore {
            exists: true,
            ..FakeStore::default()
        };
        let pacer = SubmissionPacer::new(store, "wiki", pacing(10));
        let setup = pacer.ensure_index(&serde_json::json!({})).await;
        assert_eq!(setup, IndexSetup::AlreadyExists);
        assert!(pacer.store().created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn setup_failures_are_reported_not_raised() {
        let store = FakeStore {
            fail_create: true,
            ..FakeStore::default()
        };
        let pacer = SubmissionPacer::new(store, "wiki", pacing(10));
        match pacer.ensure_index(&serde_json::json!({})).await {
            IndexSetup::Failed(reason) => assert!(reason.contains("already_exists")),
            other => panic!("expected failure, got {other:?}"),
        }

        let store = FakeStore {
            fail_exists: true,
            ..FakeStore::default()
        };
        let pacer = SubmissionPacer::new(store, "wiki", pacing(10));
        assert!(matches!(
            pacer.ensure_index(&serde_json::json!({})).await,
            IndexSetup::Failed(_)
        ));
    }

    #[tokio::test]
    async fn write_failure_moves_on() {
        let store = FakeStore {
            fail_titles: vec!["Bad".to_string()],
            ..FakeStore::default()
        };
        let mut pacer = SubmissionPacer::new(store, "wiki", pacing(10));

        assert_eq!(pacer.submit(doc("Good")).await, SubmitOutcome::Written);
        match pacer.submit(doc("Bad")).await {
            SubmitOutcome::Failed { title, reason } => {
                assert_eq!(title, "Bad");
                assert!(reason.contains("timeout"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(pacer.submit(doc("Next")).await, SubmitOutcome::Written);
        assert_eq!(pacer.submitted(), 3);

        let titles: Vec<String> = pacer
            .store()
            .writes
            .lock()
            .unwrap()
            .iter()
            .map(|(t, _)| t.clone())
            .collect();
        assert_eq!(titles, vec!["Good", "Next"]);
    }

    #[tokio::test(start_paused = true)]
    async fn cooldown_after_each_interval() {
        let mut pacer = SubmissionPacer::new(FakeStore::default(), "wiki", pacing(3));
        let start = Instant::now();
        for i in 0..7 {
            pacer.submit(doc(&format!("D{i}"))).await;
        }

        let writes = pacer.store().writes.lock().unwrap();
        let offsets: Vec<u64> = writes
            .iter()
            .map(|(_, at)| at.duration_since(start).as_secs())
            .collect();
        // D0..D2 immediately, D3..D5 after one cooldown, D6 after two
        assert_eq!(offsets, vec![0, 0, 0, 3, 3, 3, 6]);
    }

    #[tokio::test(start_paused = true)]
    async fn no_cooldown_below_interval() {
        let mut pacer = SubmissionPacer::new(FakeStore::default(), "wiki", pacing(3));
        let start = Instant::now();
        for i in 0..3 {
            pacer.submit(doc(&format!("D{i}"))).await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_pacing_never_sleeps() {
        let config = PacingConfig {
            enabled: false,
            ..pacing(2)
        };
        let mut pacer = SubmissionPacer::new(FakeStore::default(), "wiki", config);
        let start = Instant::now();
        for i in 0..10 {
            pacer.submit(doc(&format!("D{i}"))).await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
