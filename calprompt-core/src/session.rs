//! One user's calendar session.
//!
//! `ReconciliationSession` owns the event snapshot and runs the pipeline:
//! normalize, assemble context, generate, parse, then check and apply each
//! operation in order. Batches take `&mut self`, so two batches can never
//! interleave on the same snapshot.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::timeout;
use tracing::{info, warn};

use crate::apply::DiffApplier;
use crate::context::{ContextAssembler, GenerationRequest};
use crate::diff::{DiffParser, IndexedOperation, Rejection};
use crate::error::{CalPromptError, CalPromptResult};
use crate::event::Snapshot;
use crate::generator::Generator;
use crate::intent::{NormalizedIntent, RequestNormalizer};
use crate::store::EventStore;
use crate::timezone::TimeZoneNormalizer;
use crate::validate::{ConstraintValidator, ScheduleRules};

pub use crate::diff::BatchReport;

const DEFAULT_GENERATOR_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub tz: TimeZoneNormalizer,
    pub rules: ScheduleRules,
    pub generator_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        SessionSettings {
            tz: TimeZoneNormalizer::default(),
            rules: ScheduleRules::default(),
            generator_timeout: DEFAULT_GENERATOR_TIMEOUT,
        }
    }
}

/// What a batch would do, computed without touching the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preview {
    pub accepted: Vec<IndexedOperation>,
    pub rejected: Vec<Rejection>,
}

pub struct ReconciliationSession {
    snapshot: Snapshot,
    store: Arc<dyn EventStore>,
    settings: SessionSettings,
}

impl ReconciliationSession {
    /// Start a session seeded with everything the store currently holds.
    pub async fn load(
        store: Arc<dyn EventStore>,
        settings: SessionSettings,
    ) -> CalPromptResult<Self> {
        let snapshot: Snapshot = store.list_all().await?.into_iter().collect();
        info!(events = snapshot.len(), "Loaded calendar snapshot");

        Ok(ReconciliationSession {
            snapshot,
            store,
            settings,
        })
    }

    pub fn with_snapshot(
        store: Arc<dyn EventStore>,
        snapshot: Snapshot,
        settings: SessionSettings,
    ) -> Self {
        ReconciliationSession {
            snapshot,
            store,
            settings,
        }
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn normalize(&self, text: &str, now: DateTime<Utc>) -> NormalizedIntent {
        RequestNormalizer::normalize(text, self.settings.tz.to_civil_zone(now))
    }

    pub fn context(
        &self,
        text: &str,
        intent: &NormalizedIntent,
        now: DateTime<Utc>,
    ) -> CalPromptResult<GenerationRequest> {
        ContextAssembler::new(self.settings.tz, &self.settings.rules).assemble(
            text,
            intent,
            &self.snapshot,
            now,
        )
    }

    /// Run the whole pipeline for one request.
    ///
    /// Generator failures, timeouts and malformed replies abort the batch
    /// before anything is applied. Everything else is reported per operation.
    pub async fn reconcile(
        &mut self,
        generator: &dyn Generator,
        text: &str,
        now: DateTime<Utc>,
    ) -> CalPromptResult<BatchReport> {
        let (intent, raw) = self.generate(generator, text, now).await?;
        self.apply_reply(&intent, &raw).await
    }

    /// Like `reconcile`, but stops after validation against a scratch copy.
    pub async fn dry_run(
        &self,
        generator: &dyn Generator,
        text: &str,
        now: DateTime<Utc>,
    ) -> CalPromptResult<Preview> {
        let (intent, raw) = self.generate(generator, text, now).await?;
        self.preview(&intent, &raw)
    }

    async fn generate(
        &self,
        generator: &dyn Generator,
        text: &str,
        now: DateTime<Utc>,
    ) -> CalPromptResult<(NormalizedIntent, String)> {
        let intent = self.normalize(text, now);
        info!(
            action = ?intent.action,
            subject = %intent.subject,
            events = self.snapshot.len(),
            "Reconciling request"
        );

        let request = self.context(text, &intent, now)?;
        let limit = self.settings.generator_timeout;

        let raw = timeout(limit, generator.generate(&request))
            .await
            .map_err(|_| CalPromptError::GeneratorTimeout(limit))??;

        Ok((intent, raw))
    }

    /// Parse, check and apply a generator reply.
    ///
    /// Each operation is checked against the snapshot as it stands after
    /// every earlier operation in the batch, then committed before the next
    /// one is looked at.
    pub async fn apply_reply(
        &mut self,
        intent: &NormalizedIntent,
        raw: &str,
    ) -> CalPromptResult<BatchReport> {
        let parsed = DiffParser::new(self.settings.tz).parse(raw)?;

        let validator = ConstraintValidator::new(self.settings.tz, &self.settings.rules);
        let applier = DiffApplier::new(self.store.as_ref());

        let mut report = BatchReport {
            applied: Vec::new(),
            rejected: parsed.rejected,
        };

        for item in parsed.operations {
            let kind = item.operation.kind();

            if let Err(violation) = validator.check(&item.operation, intent, &self.snapshot) {
                report
                    .rejected
                    .push(Rejection::new(item.index, Some(kind), violation.into()));
                continue;
            }

            match applier
                .apply(item.index, &item.operation, &mut self.snapshot)
                .await
            {
                Ok(applied) => report.applied.push(applied),
                Err(reason) => report
                    .rejected
                    .push(Rejection::new(item.index, Some(kind), reason)),
            }
        }

        for rejection in report.rejections() {
            warn!(
                index = rejection.index,
                rule = rejection.reason.rule(),
                reason = %rejection.reason,
                "Rejected operation"
            );
        }
        info!(summary = %report.summary(), "Batch finished");

        Ok(report)
    }

    /// Parse and validate a reply against a scratch copy of the snapshot.
    pub fn preview(&self, intent: &NormalizedIntent, raw: &str) -> CalPromptResult<Preview> {
        let parsed = DiffParser::new(self.settings.tz).parse(raw)?;
        let validator = ConstraintValidator::new(self.settings.tz, &self.settings.rules);

        let (accepted, mut rejected) =
            validator.validate_batch(parsed.operations, intent, &self.snapshot);
        rejected.extend(parsed.rejected);
        rejected.sort_by_key(|r| r.index);

        Ok(Preview { accepted, rejected })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::DiffKind;
    use crate::error::{ParseError, RejectReason, Violation};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use chrono::TimeZone;

    struct Canned(&'static str);

    #[async_trait]
    impl Generator for Canned {
        async fn generate(&self, _request: &GenerationRequest) -> CalPromptResult<String> {
            Ok(self.0.to_string())
        }
    }

    struct Stalled;

    #[async_trait]
    impl Generator for Stalled {
        async fn generate(&self, _request: &GenerationRequest) -> CalPromptResult<String> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("[]".into())
        }
    }

    // Saturday 2025-07-05, 10:00 in New York.
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 5, 14, 0, 0).unwrap()
    }

    async fn session(store: Arc<MemoryStore>) -> ReconciliationSession {
        ReconciliationSession::load(store, SessionSettings::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn later_operations_see_earlier_ones() {
        let store = Arc::new(MemoryStore::new());
        let mut session = session(store.clone()).await;

        // Saturday afternoon slots, both personal; the second overlaps the first.
        let reply = r#"[
            {"action":"add","title":"Lunch","start":"2025-07-05T16:00:00Z","end":"2025-07-05T17:00:00Z","type":"Personal","priority":"Normal"},
            {"action":"add","title":"Call","start":"2025-07-05T16:30:00Z","end":"2025-07-05T17:30:00Z","type":"Personal","priority":"Normal"}
        ]"#;
        let report = session
            .reconcile(&Canned(reply), "add lunch saturday", now())
            .await
            .unwrap();

        assert_eq!(report.applied.len(), 1);
        assert_eq!(
            report.rejected[0].reason,
            RejectReason::Violation(Violation::Overlap {
                with: "Lunch".into()
            })
        );
        assert_eq!(store.list_all().await.unwrap().len(), 1);
        assert!(session.snapshot().is_overlap_free());
    }

    #[tokio::test]
    async fn persistence_failure_does_not_stop_the_batch() {
        let store = Arc::new(MemoryStore::new());
        let mut session = session(store.clone()).await;
        store.fail_next(1);

        let reply = r#"[
            {"action":"add","title":"A","start":"2025-07-05T16:00:00Z","end":"2025-07-05T17:00:00Z","type":"Personal","priority":"Normal"},
            {"action":"add","title":"B","start":"2025-07-05T16:00:00Z","end":"2025-07-05T17:00:00Z","type":"Personal","priority":"Normal"}
        ]"#;
        let report = session
            .apply_reply(&NormalizedIntent::default(), reply)
            .await
            .unwrap();

        // A failed to persist, so B does not overlap anything.
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].index, 0);
        assert_eq!(report.rejected[0].reason.rule(), "PersistenceFailure");
        assert_eq!(report.applied.len(), 1);
        assert_eq!(session.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn slow_generator_times_out_before_anything_changes() {
        let store = Arc::new(MemoryStore::new());
        let settings = SessionSettings {
            generator_timeout: Duration::from_millis(20),
            ..Default::default()
        };
        let mut session = ReconciliationSession::load(store, settings).await.unwrap();

        let err = session
            .reconcile(&Stalled, "add a workout", now())
            .await
            .unwrap_err();

        assert!(matches!(err, CalPromptError::GeneratorTimeout(_)));
        assert_eq!(err.to_string(), "Generator request timed out after 20ms");
        assert!(session.snapshot().is_empty());
    }

    #[tokio::test]
    async fn malformed_reply_is_fatal() {
        let store = Arc::new(MemoryStore::new());
        let mut session = session(store).await;

        let err = session
            .reconcile(&Canned("Sure! []"), "add a workout", now())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CalPromptError::Parse(ParseError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn preview_leaves_store_and_snapshot_alone() {
        let store = Arc::new(MemoryStore::new());
        let session = session(store.clone()).await;

        let reply = r#"[
            {"action":"add","title":"A","start":"2025-07-05T16:00:00Z","end":"2025-07-05T17:00:00Z","type":"Personal","priority":"Normal"},
            {"action":"teleport"}
        ]"#;
        let preview = session
            .dry_run(&Canned(reply), "add something saturday", now())
            .await
            .unwrap();

        assert_eq!(preview.accepted.len(), 1);
        assert_eq!(preview.accepted[0].operation.kind(), DiffKind::Add);
        assert_eq!(preview.rejected.len(), 1);
        assert_eq!(preview.rejected[0].reason.rule(), "UnknownAction");
        assert!(session.snapshot().is_empty());
        assert!(store.list_all().await.unwrap().is_empty());
    }
}
