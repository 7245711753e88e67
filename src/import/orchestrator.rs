//! Import session state machine.
//!
//! `Idle → Parsed → PreflightRunning → {PreflightFailed | Importing} → Completed`.
//! The orchestrator is the only writer of its [`ImportSession`]; readers get
//! snapshots through a watch channel, one per record boundary.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::{
    merge, preflight, select_best_candidate, CatalogStore, ImportError, MatchKind,
    MergeDefaults, PreflightChecks, RecordError,
};
use crate::{
    import::parse_upload,
    models::{Game, ImportSession, ImportStatus, ImportSummary, LogEntry, LogOutcome, UploadedRecord},
    provider::ProviderClient,
};

pub struct ImportOrchestrator {
    provider: Arc<dyn ProviderClient>,
    store: Arc<dyn CatalogStore>,
    defaults: MergeDefaults,
    checks: PreflightChecks,
    session: ImportSession,
    records: Vec<UploadedRecord>,
    updates: watch::Sender<ImportSession>,
}

impl ImportOrchestrator {
    pub fn new(
        provider: Arc<dyn ProviderClient>,
        store: Arc<dyn CatalogStore>,
        defaults: MergeDefaults,
        checks: PreflightChecks,
    ) -> Self {
        let session = ImportSession::new();
        let (updates, _) = watch::channel(session.clone());
        Self {
            provider,
            store,
            defaults,
            checks,
            session,
            records: Vec::new(),
            updates,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ImportSession> {
        self.updates.subscribe()
    }

    pub fn session(&self) -> &ImportSession {
        &self.session
    }

    /// Parse an uploaded file into a fresh session.
    ///
    /// A parse failure leaves the fresh session `Idle` with `error` set.
    pub fn accept_upload(&mut self, file_name: Option<String>, bytes: &[u8]) -> Result<(), ImportError> {
        if self.session.status.is_running() {
            return Err(ImportError::InvalidState {
                action: "replace",
                status: self.session.status,
            });
        }

        self.session = ImportSession::new();
        self.session.file_name = file_name;
        self.records.clear();

        match parse_upload(bytes) {
            Ok(parsed) => {
                self.session.fields = parsed.fields;
                self.session.total = parsed.records.len();
                self.records = parsed.records;
                tracing::info!(
                    session = %self.session.id,
                    rows = self.session.total,
                    "Upload parsed"
                );
                self.transition(ImportStatus::Parsed);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(session = %self.session.id, "Upload rejected: {}", e);
                self.session.error = Some(e.to_string());
                self.publish();
                Err(e.into())
            }
        }
    }

    /// Run preflight and then every record, in file order.
    ///
    /// Cancellation is observed between records; a record already started
    /// always finishes.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<ImportSummary, ImportError> {
        if self.session.status != ImportStatus::Parsed {
            return Err(ImportError::InvalidState {
                action: "start",
                status: self.session.status,
            });
        }

        self.session.started_at = Some(Utc::now());
        self.transition(ImportStatus::PreflightRunning);

        let check = preflight(self.provider.as_ref(), &self.checks).await;
        self.session.preflight = Some(check.clone());
        if !check.ok {
            self.session.error = Some(format!("{}: {}", check.classification, check.detail));
            self.session.finished_at = Some(Utc::now());
            self.transition(ImportStatus::PreflightFailed);
            return Err(ImportError::Preflight(check));
        }

        self.transition(ImportStatus::Importing);

        let records = std::mem::take(&mut self.records);
        for (index, record) in records.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::info!(
                    session = %self.session.id,
                    processed = self.session.processed,
                    "Import cancelled"
                );
                self.session.cancelled = true;
                break;
            }

            let entry = self.process_record(index + 1, record).await;
            self.record_outcome(entry);
        }

        self.session.finished_at = Some(Utc::now());
        self.transition(ImportStatus::Completed);

        tracing::info!(
            session = %self.session.id,
            success = self.session.success_count,
            failed = self.session.failure_count,
            "Import finished"
        );
        Ok(self.session.summary())
    }

    async fn process_record(&self, row: usize, record: &UploadedRecord) -> LogEntry {
        let record_label = record.label(row);

        match self.reconcile(record).await {
            Ok((game, notes)) if notes.is_empty() => LogEntry {
                row,
                record_label,
                outcome: LogOutcome::Success,
                message: format!("imported as #{}", game.id),
            },
            Ok((game, notes)) => LogEntry {
                row,
                record_label,
                outcome: LogOutcome::Warning,
                message: format!("imported as #{} ({})", game.id, notes.join("; ")),
            },
            Err(e) => {
                tracing::warn!(
                    session = %self.session.id,
                    row,
                    record = %record_label,
                    "Import record failed: {}",
                    e
                );
                LogEntry {
                    row,
                    record_label,
                    outcome: LogOutcome::Error,
                    message: e.to_string(),
                }
            }
        }
    }

    /// search → select → details → merge → persist
    async fn reconcile(&self, record: &UploadedRecord) -> Result<(Game, Vec<String>), RecordError> {
        let name = record.name().ok_or(RecordError::NoIdentity)?;

        let candidates = self
            .provider
            .search(name)
            .await
            .map_err(RecordError::ProviderFailed)?;
        let (candidate, kind) =
            select_best_candidate(name, &candidates).ok_or(RecordError::NotFoundInProvider)?;

        let mut notes = Vec::new();
        if kind == MatchKind::Closest {
            notes.push(format!("no exact match, used '{}'", candidate.name));
        }

        let details = match self.provider.details(candidate.external_id).await {
            Ok(details) => Some(details),
            Err(e) => {
                notes.push(format!("details unavailable: {}", e));
                None
            }
        };

        let merged = merge(record, details.as_ref(), Some(candidate), &self.defaults)
            .map_err(RecordError::MergeRejected)?;
        notes.extend(merged.warnings);

        let game = self.store.create_record(&merged.record).await?;
        Ok((game, notes))
    }

    fn record_outcome(&mut self, entry: LogEntry) {
        match entry.outcome {
            LogOutcome::Success | LogOutcome::Warning => self.session.success_count += 1,
            LogOutcome::Error => self.session.failure_count += 1,
        }
        self.session.processed += 1;
        self.session.log.push(entry);
        self.publish();
    }

    fn transition(&mut self, status: ImportStatus) {
        tracing::info!(
            session = %self.session.id,
            from = %self.session.status,
            to = %status,
            "Import session transition"
        );
        self.session.status = status;
        self.publish();
    }

    fn publish(&self) {
        self.updates.send_replace(self.session.clone());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::{
        import::{MockCatalogStore, StoreError},
        models::{MergedRecord, PreflightClassification, ProviderCandidate, ProviderDetails},
        provider::{MockProviderClient, ProviderError},
    };

    const LIVENESS: &str = "a";
    const REFERENCE: &str = "Grand Theft Auto V";

    fn checks() -> PreflightChecks {
        PreflightChecks {
            liveness_query: LIVENESS.to_string(),
            reference_title: REFERENCE.to_string(),
        }
    }

    fn candidate(id: i64, name: &str) -> ProviderCandidate {
        ProviderCandidate {
            external_id: id,
            name: name.to_string(),
            platform_names: vec!["PC".to_string()],
            genre_names: vec!["Action".to_string()],
            ..Default::default()
        }
    }

    fn details(id: i64) -> ProviderDetails {
        ProviderDetails {
            external_id: id,
            description: "From the provider".to_string(),
            publisher_names: vec!["Publisher".to_string()],
            genre_names: vec![],
        }
    }

    fn stored(record: &MergedRecord, id: i32) -> Game {
        let now = Utc::now();
        Game {
            id,
            name: record.name.clone(),
            platforms: record.platforms.clone(),
            media_types: record.media_types.clone(),
            cover_url: record.cover_url.clone(),
            release_date: record.release_date,
            score: record.score,
            genres: record.genres.clone(),
            publishers: record.publishers.clone(),
            description: record.description.clone(),
            completed: record.completed,
            status: record.status.clone(),
            external_id: record.external_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Provider that passes preflight and knows the given titles.
    fn provider_knowing(titles: &'static [(&'static str, i64)]) -> MockProviderClient {
        let mut provider = MockProviderClient::new();
        provider.expect_search().returning(move |query| {
            if query == LIVENESS || query == REFERENCE {
                return Ok(vec![candidate(1, REFERENCE)]);
            }
            Ok(titles
                .iter()
                .filter(|(title, _)| title.eq_ignore_ascii_case(query))
                .map(|(title, id)| candidate(*id, title))
                .collect())
        });
        provider.expect_details().returning(|id| Ok(details(id)));
        provider
    }

    fn orchestrator(provider: MockProviderClient, store: MockCatalogStore) -> ImportOrchestrator {
        ImportOrchestrator::new(
            Arc::new(provider),
            Arc::new(store),
            MergeDefaults::default(),
            checks(),
        )
    }

    const THREE_ROWS: &[u8] = b"name,platforms\nHalo,xbox\nNonexistent Game,PC\n,PS4\n";

    #[tokio::test]
    async fn test_mixed_rows_scenario() {
        let mut store = MockCatalogStore::new();
        store
            .expect_create_record()
            .withf(|record| record.name == "Halo")
            .times(1)
            .returning(|record| Ok(stored(record, 10)));

        let mut importer = orchestrator(provider_knowing(&[("Halo", 42)]), store);
        importer.accept_upload(Some("games.csv".to_string()), THREE_ROWS).unwrap();
        assert_eq!(importer.session().status, ImportStatus::Parsed);
        assert_eq!(importer.session().total, 3);

        let summary = importer.run(CancellationToken::new()).await.unwrap();

        assert_eq!(summary.total, 3);
        assert_eq!(summary.success_count, 1);
        assert_eq!(summary.failure_count, 2);
        assert!(!summary.cancelled);

        let rows: Vec<usize> = summary.log.iter().map(|e| e.row).collect();
        assert_eq!(rows, vec![1, 2, 3]);
        assert_eq!(summary.log[0].outcome, LogOutcome::Success);
        assert_eq!(summary.log[0].message, "imported as #10");
        assert_eq!(summary.log[1].outcome, LogOutcome::Error);
        assert_eq!(summary.log[1].message, "not found in provider");
        assert_eq!(summary.log[2].outcome, LogOutcome::Error);
        assert_eq!(summary.log[2].message, "no identity");
        assert_eq!(summary.log[2].record_label, "Row 3");

        assert_eq!(importer.session().status, ImportStatus::Completed);
        assert_eq!(importer.session().processed, 3);
        assert!(importer.session().finished_at.is_some());
    }

    #[tokio::test]
    async fn test_preflight_failure_processes_nothing() {
        let mut provider = MockProviderClient::new();
        provider
            .expect_search()
            .withf(|query| query == LIVENESS || query == REFERENCE)
            .times(2)
            .returning(|query| {
                if query == LIVENESS {
                    Ok(vec![candidate(1, "Anything")])
                } else {
                    Ok(vec![])
                }
            });
        provider.expect_details().never();

        let mut store = MockCatalogStore::new();
        store.expect_create_record().never();

        let mut importer = orchestrator(provider, store);
        importer.accept_upload(None, THREE_ROWS).unwrap();

        let err = importer.run(CancellationToken::new()).await.unwrap_err();
        match err {
            ImportError::Preflight(result) => {
                assert!(!result.ok);
                assert_eq!(result.classification, PreflightClassification::NoResults);
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let session = importer.session();
        assert_eq!(session.status, ImportStatus::PreflightFailed);
        assert_eq!(session.processed, 0);
        assert!(session.log.is_empty());
        assert!(session.error.is_some());
    }

    #[tokio::test]
    async fn test_blocked_provider_fails_preflight_on_first_check() {
        let mut provider = MockProviderClient::new();
        provider.expect_search().times(1).returning(|_| {
            Err(ProviderError::Blocked {
                status: 403,
                message: "origin not allowed".to_string(),
            })
        });

        let mut importer = orchestrator(provider, MockCatalogStore::new());
        importer.accept_upload(None, THREE_ROWS).unwrap();

        let err = importer.run(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(
            err,
            ImportError::Preflight(ref r) if r.classification == PreflightClassification::CrossOriginBlocked
        ));
    }

    #[tokio::test]
    async fn test_store_rejection_is_local_to_the_row() {
        let mut store = MockCatalogStore::new();
        store.expect_create_record().times(3).returning(|record| {
            if record.name == "Celeste" {
                Err(StoreError::Rejected {
                    reason: "A game named 'Celeste' already exists".to_string(),
                })
            } else {
                Ok(stored(record, 1))
            }
        });

        let provider = provider_knowing(&[("Hades", 2), ("Celeste", 3), ("Inside", 4)]);
        let mut importer = orchestrator(provider, store);
        importer
            .accept_upload(None, b"name,platforms\nHades,PC\nCeleste,Switch\nInside,PC\n")
            .unwrap();

        let summary = importer.run(CancellationToken::new()).await.unwrap();

        assert_eq!(summary.success_count, 2);
        assert_eq!(summary.failure_count, 1);
        assert_eq!(summary.log[1].outcome, LogOutcome::Error);
        assert_eq!(
            summary.log[1].message,
            "store rejected: A game named 'Celeste' already exists"
        );
        assert_eq!(summary.log[2].outcome, LogOutcome::Success);
    }

    #[tokio::test]
    async fn test_snapshot_published_per_record() {
        let probe: Arc<Mutex<Option<watch::Receiver<ImportSession>>>> = Arc::new(Mutex::new(None));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let mut store = MockCatalogStore::new();
        let (store_probe, store_seen) = (probe.clone(), seen.clone());
        store.expect_create_record().returning(move |record| {
            if let Some(rx) = store_probe.lock().unwrap().as_ref() {
                store_seen.lock().unwrap().push(rx.borrow().processed);
            }
            Ok(stored(record, 1))
        });

        let provider = provider_knowing(&[("Hades", 2), ("Celeste", 3), ("Inside", 4)]);
        let mut importer = orchestrator(provider, store);
        importer
            .accept_upload(None, b"name,platforms\nHades,PC\nCeleste,Switch\nInside,PC\n")
            .unwrap();
        *probe.lock().unwrap() = Some(importer.subscribe());

        importer.run(CancellationToken::new()).await.unwrap();

        // Each write sees the snapshot published after the previous record.
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
        let last = importer.subscribe().borrow().clone();
        assert_eq!(last.status, ImportStatus::Completed);
        assert_eq!(last.processed, 3);
        assert_eq!(last.log.len(), 3);
    }

    #[tokio::test]
    async fn test_cancellation_stops_at_record_boundary() {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let mut store = MockCatalogStore::new();
        store.expect_create_record().times(1).returning(move |record| {
            token.cancel();
            Ok(stored(record, 1))
        });

        let provider = provider_knowing(&[("Hades", 2), ("Celeste", 3), ("Inside", 4)]);
        let mut importer = orchestrator(provider, store);
        importer
            .accept_upload(None, b"name,platforms\nHades,PC\nCeleste,Switch\nInside,PC\n")
            .unwrap();

        let summary = importer.run(cancel).await.unwrap();

        assert!(summary.cancelled);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.success_count, 1);
        assert_eq!(summary.log.len(), 1);
        assert_eq!(importer.session().status, ImportStatus::Completed);
        assert_eq!(importer.session().processed, 1);
    }

    #[tokio::test]
    async fn test_inexact_match_and_missing_details_warn() {
        let mut provider = MockProviderClient::new();
        provider.expect_search().returning(|query| {
            if query == LIVENESS || query == REFERENCE {
                Ok(vec![candidate(1, REFERENCE)])
            } else {
                Ok(vec![candidate(7, "Halo: Combat Evolved")])
            }
        });
        provider
            .expect_details()
            .returning(|_| Err(ProviderError::Timeout("deadline".to_string())));

        let mut store = MockCatalogStore::new();
        store
            .expect_create_record()
            .withf(|record| record.name == "Halo" && record.external_id == Some(7))
            .returning(|record| Ok(stored(record, 5)));

        let mut importer = orchestrator(provider, store);
        importer.accept_upload(None, b"name,platforms\nHalo,PC\n").unwrap();

        let summary = importer.run(CancellationToken::new()).await.unwrap();

        assert_eq!(summary.success_count, 1);
        let entry = &summary.log[0];
        assert_eq!(entry.outcome, LogOutcome::Warning);
        assert!(entry.message.contains("Halo: Combat Evolved"));
        assert!(entry.message.contains("details unavailable"));
    }

    #[tokio::test]
    async fn test_search_failure_is_a_record_error() {
        let mut provider = MockProviderClient::new();
        provider.expect_search().returning(|query| {
            if query == LIVENESS || query == REFERENCE {
                Ok(vec![candidate(1, REFERENCE)])
            } else {
                Err(ProviderError::Network("connection reset".to_string()))
            }
        });

        let mut store = MockCatalogStore::new();
        store.expect_create_record().never();

        let mut importer = orchestrator(provider, store);
        importer.accept_upload(None, b"name\nHalo\n").unwrap();

        let summary = importer.run(CancellationToken::new()).await.unwrap();
        assert_eq!(summary.failure_count, 1);
        assert!(summary.log[0].message.starts_with("provider error:"));
    }

    #[tokio::test]
    async fn test_completed_session_cannot_rerun() {
        let mut store = MockCatalogStore::new();
        store.expect_create_record().returning(|record| Ok(stored(record, 1)));

        let mut importer = orchestrator(provider_knowing(&[("Hades", 2)]), store);
        importer.accept_upload(None, b"name,platforms\nHades,PC\n").unwrap();
        importer.run(CancellationToken::new()).await.unwrap();

        let err = importer.run(CancellationToken::new()).await.unwrap_err();
        assert_eq!(
            err,
            ImportError::InvalidState {
                action: "start",
                status: ImportStatus::Completed
            }
        );
    }

    #[tokio::test]
    async fn test_start_requires_parsed_upload() {
        let mut importer = orchestrator(MockProviderClient::new(), MockCatalogStore::new());
        let err = importer.run(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, ImportError::InvalidState { status: ImportStatus::Idle, .. }));
    }

    #[test]
    fn test_bad_upload_keeps_session_idle() {
        let mut importer = orchestrator(MockProviderClient::new(), MockCatalogStore::new());
        let rx = importer.subscribe();

        let err = importer.accept_upload(Some("empty.csv".to_string()), b"").unwrap_err();

        assert!(matches!(err, ImportError::Parse(_)));
        assert_eq!(importer.session().status, ImportStatus::Idle);
        assert!(importer.session().error.is_some());
        assert_eq!(rx.borrow().file_name.as_deref(), Some("empty.csv"));
    }
}
