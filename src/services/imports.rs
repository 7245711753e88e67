//! Bulk import service.
//!
//! Owns the single import session of this server. While a run is in flight the
//! orchestrator lives inside the worker task and is handed back when it ends;
//! readers only ever see watch-channel snapshots.

use std::sync::Arc;

use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use crate::{
    config::ImportConfig,
    error::{AppError, AppResult},
    import::{preflight, CatalogStore, ImportError, ImportOrchestrator, MergeDefaults, PreflightChecks},
    models::{ImportSession, ImportStatus, PreflightResult},
    provider::ProviderClient,
};

struct ActiveRun {
    cancel: CancellationToken,
    handle: JoinHandle<ImportOrchestrator>,
}

struct ImportSlot {
    /// `None` while a run holds it
    orchestrator: Option<ImportOrchestrator>,
    updates: watch::Receiver<ImportSession>,
    run: Option<ActiveRun>,
}

#[derive(Clone)]
pub struct ImportService {
    provider: Arc<dyn ProviderClient>,
    store: Arc<dyn CatalogStore>,
    defaults: MergeDefaults,
    checks: PreflightChecks,
    slot: Arc<Mutex<ImportSlot>>,
}

impl ImportService {
    pub fn new(
        provider: Arc<dyn ProviderClient>,
        store: Arc<dyn CatalogStore>,
        config: &ImportConfig,
    ) -> Self {
        let defaults = MergeDefaults::from(config);
        let checks = PreflightChecks::from(config);
        let orchestrator =
            ImportOrchestrator::new(provider.clone(), store.clone(), defaults.clone(), checks.clone());

        Self {
            slot: Arc::new(Mutex::new(ImportSlot {
                updates: orchestrator.subscribe(),
                orchestrator: Some(orchestrator),
                run: None,
            })),
            provider,
            store,
            defaults,
            checks,
        }
    }

    fn fresh_orchestrator(&self) -> ImportOrchestrator {
        ImportOrchestrator::new(
            self.provider.clone(),
            self.store.clone(),
            self.defaults.clone(),
            self.checks.clone(),
        )
    }

    /// Take the orchestrator back from a finished worker task.
    async fn reap(&self, slot: &mut ImportSlot) {
        let finished = slot
            .run
            .as_ref()
            .is_some_and(|run| run.handle.is_finished());
        if !finished {
            return;
        }

        if let Some(run) = slot.run.take() {
            match run.handle.await {
                Ok(orchestrator) => slot.orchestrator = Some(orchestrator),
                Err(e) => {
                    tracing::error!("Import worker failed: {}", e);
                    let orchestrator = self.fresh_orchestrator();
                    slot.updates = orchestrator.subscribe();
                    slot.orchestrator = Some(orchestrator);
                }
            }
        }
    }

    fn busy(slot: &ImportSlot, action: &'static str) -> AppError {
        ImportError::InvalidState {
            action,
            status: slot.updates.borrow().status,
        }
        .into()
    }

    /// Replace the session with a freshly parsed upload
    pub async fn upload(&self, file_name: Option<String>, bytes: &[u8]) -> AppResult<ImportSession> {
        let mut slot = self.slot.lock().await;
        self.reap(&mut slot).await;
        if slot.run.is_some() {
            return Err(Self::busy(&slot, "replace"));
        }

        let mut orchestrator = self.fresh_orchestrator();
        let parsed = orchestrator.accept_upload(file_name, bytes);
        slot.updates = orchestrator.subscribe();
        let snapshot = orchestrator.session().clone();
        slot.orchestrator = Some(orchestrator);

        parsed?;
        Ok(snapshot)
    }

    /// Spawn the worker for a parsed session
    pub async fn start(&self) -> AppResult<ImportSession> {
        let mut slot = self.slot.lock().await;
        self.reap(&mut slot).await;
        if slot.run.is_some() {
            return Err(Self::busy(&slot, "start"));
        }

        let mut orchestrator = match slot.orchestrator.take() {
            Some(orchestrator) => orchestrator,
            None => self.fresh_orchestrator(),
        };
        if orchestrator.session().status != ImportStatus::Parsed {
            let status = orchestrator.session().status;
            slot.orchestrator = Some(orchestrator);
            return Err(ImportError::InvalidState { action: "start", status }.into());
        }

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = orchestrator.run(token).await {
                tracing::warn!("Import stopped: {}", e);
            }
            orchestrator
        });

        slot.run = Some(ActiveRun { cancel, handle });
        let snapshot = slot.updates.borrow().clone();
        Ok(snapshot)
    }

    /// Current snapshot
    pub async fn status(&self) -> ImportSession {
        let slot = self.slot.lock().await;
        let snapshot = slot.updates.borrow().clone();
        snapshot
    }

    /// Receiver of per-record snapshots for the current session
    pub async fn subscribe(&self) -> watch::Receiver<ImportSession> {
        self.slot.lock().await.updates.clone()
    }

    /// Request cooperative cancellation; the record in flight still completes.
    pub async fn cancel(&self) -> AppResult<ImportSession> {
        let mut slot = self.slot.lock().await;
        self.reap(&mut slot).await;

        match slot.run {
            Some(ref run) => {
                tracing::info!("Import cancellation requested");
                run.cancel.cancel();
                let snapshot = slot.updates.borrow().clone();
                Ok(snapshot)
            }
            None => Err(Self::busy(&slot, "cancel")),
        }
    }

    /// Discard the current session
    pub async fn reset(&self) -> AppResult<ImportSession> {
        let mut slot = self.slot.lock().await;
        self.reap(&mut slot).await;
        if slot.run.is_some() {
            return Err(Self::busy(&slot, "reset"));
        }

        let orchestrator = self.fresh_orchestrator();
        slot.updates = orchestrator.subscribe();
        let snapshot = orchestrator.session().clone();
        slot.orchestrator = Some(orchestrator);
        Ok(snapshot)
    }

    /// Run the provider preflight outside of a session
    pub async fn preflight(&self) -> PreflightResult {
        preflight(self.provider.as_ref(), &self.checks).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;
    use tokio_test::assert_ok;

    use super::*;
    use crate::{
        import::MockCatalogStore,
        models::{Game, MergedRecord, ProviderCandidate, ProviderDetails},
        provider::MockProviderClient,
    };

    fn stored(record: &MergedRecord) -> Game {
        let now = Utc::now();
        Game {
            id: 1,
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

    fn service() -> ImportService {
        let mut provider = MockProviderClient::new();
        provider.expect_search().returning(|query| {
            Ok(vec![ProviderCandidate {
                external_id: 9,
                name: query.to_string(),
                platform_names: vec!["PC".to_string()],
                ..Default::default()
            }])
        });
        provider
            .expect_details()
            .returning(|id| Ok(ProviderDetails { external_id: id, ..Default::default() }));

        let mut store = MockCatalogStore::new();
        store.expect_create_record().returning(|record| Ok(stored(record)));

        ImportService::new(Arc::new(provider), Arc::new(store), &ImportConfig::default())
    }

    async fn wait_until_done(service: &ImportService) -> ImportSession {
        let mut rx = service.subscribe().await;
        let session = tokio::time::timeout(
            Duration::from_secs(5),
            rx.wait_for(|s| !s.status.is_running() && s.status != ImportStatus::Parsed),
        )
        .await
        .expect("import did not finish")
        .expect("channel closed")
        .clone();
        session
    }

    #[tokio::test]
    async fn test_upload_start_and_complete() {
        let service = service();

        let parsed = assert_ok!(service.upload(Some("list.csv".to_string()), b"name\nHades\nCeleste\n").await);
        assert_eq!(parsed.status, ImportStatus::Parsed);
        assert_eq!(parsed.total, 2);

        assert_ok!(service.start().await);
        let done = wait_until_done(&service).await;

        assert_eq!(done.status, ImportStatus::Completed);
        assert_eq!(done.success_count, 2);
        assert_eq!(service.status().await.processed, 2);
    }

    #[tokio::test]
    async fn test_start_without_upload_conflicts() {
        let service = service();
        let err = service.start().await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_bad_upload_is_reported_and_kept_idle() {
        let service = service();
        let err = service.upload(None, b"   ").await.unwrap_err();

        assert!(matches!(err, AppError::Upload(_)));
        let session = service.status().await;
        assert_eq!(session.status, ImportStatus::Idle);
        assert!(session.error.is_some());
    }

    #[tokio::test]
    async fn test_cancel_without_run_conflicts() {
        let service = service();
        assert!(matches!(service.cancel().await, Err(AppError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_reset_after_completion() {
        let service = service();
        assert_ok!(service.upload(None, b"name\nHades\n").await);
        assert_ok!(service.start().await);
        wait_until_done(&service).await;

        let session = assert_ok!(service.reset().await);
        assert_eq!(session.status, ImportStatus::Idle);
        assert_eq!(session.total, 0);
    }
}
