use crate::error::{ExportError, Result};
use crate::export::quota::QUOTA_KEYS;
use crate::export::{
    HistoryEntry, HistoryKind, HistoryLog, QuotaState, DEFAULT_HISTORY_CAPACITY,
    DEFAULT_MONTHLY_LIMIT,
};
use crate::mapping::{
    map_record, map_records, migrate, ExportData, ExtractionOutcome, FieldMapping,
    MigrationOutcome, RawRecord,
};
use crate::service::clock::{Clock, SystemClock};
use crate::service::messages::*;
use crate::storage::{self, put_key, read_key, Snapshot, Store};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

const MAPPING_FAILURE_MESSAGE: &str = "Error mapping data. Please check your field settings.";
const UNKNOWN_REQUEST_MESSAGE: &str = "Unknown request type.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceSettings {
    pub monthly_limit: u32,
    pub history_capacity: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            monthly_limit: DEFAULT_MONTHLY_LIMIT,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

/// Handles export, status and mapping requests against a [`Store`].
///
/// Each operation holds `gate` for its whole body, so the rollover, gate
/// check and counter update of one request never interleave with another.
pub struct ExportService<S, C = SystemClock> {
    store: S,
    clock: C,
    settings: ServiceSettings,
    gate: Mutex<()>,
}

impl<S: Store> ExportService<S, SystemClock> {
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<S: Store, C: Clock> ExportService<S, C> {
    pub fn with_clock(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
            settings: ServiceSettings::default(),
            gate: Mutex::new(()),
        }
    }

    pub fn with_settings(mut self, settings: ServiceSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn settings(&self) -> ServiceSettings {
        self.settings
    }

    /// Decodes one raw message and answers it. Never fails: every problem
    /// becomes an unsuccessful [`Ack`].
    pub async fn handle_json(&self, raw: &str) -> Response {
        match Request::parse(raw) {
            Ok(request) => self.handle(request).await,
            Err(e) => failure_response(&e),
        }
    }

    pub async fn handle(&self, request: Request) -> Response {
        debug!("Handling {} request", request.request_type);
        match self.dispatch(&request).await {
            Ok(response) => response,
            Err(e) => failure_response(&e),
        }
    }

    async fn dispatch(&self, request: &Request) -> Result<Response> {
        match request.request_type.as_str() {
            EXPORT_PROFILE => {
                let outcome = request.payload_as()?;
                self.export_profile(outcome).await.map(Response::from)
            }
            EXPORT_SEARCH_RESULTS => {
                let outcome = request.payload_as()?;
                self.export_search_results(outcome).await.map(Response::from)
            }
            GET_STATUS => self.status().await.map(Response::from),
            UPDATE_FIELD_MAPPING => {
                let mapping = request.payload_as()?;
                self.update_field_mapping(mapping).await.map(Response::from)
            }
            SET_PRO_STATUS => {
                let is_pro_user = request.payload_as()?;
                self.set_pro_status(is_pro_user).await.map(Response::from)
            }
            other => Err(ExportError::UnknownRequestType {
                request_type: other.to_string(),
            }),
        }
    }

    pub async fn export_profile(&self, outcome: ExtractionOutcome<RawRecord>) -> Result<Ack> {
        self.run_export(EXPORT_PROFILE, HistoryKind::Profile, |mapping| {
            let raw = outcome.into_result()?;
            map_record(&raw, &mapping.profile).map(ExportData::Single)
        })
        .await
    }

    /// Maps a whole batch; the batch costs one quota unit.
    pub async fn export_search_results(
        &self,
        outcome: ExtractionOutcome<Vec<RawRecord>>,
    ) -> Result<Ack> {
        self.run_export(EXPORT_SEARCH_RESULTS, HistoryKind::SearchResults, |mapping| {
            let raws = outcome.into_result()?;
            map_records(&raws, &mapping.search_result).map(ExportData::Batch)
        })
        .await
    }

    async fn run_export<F>(&self, request_type: &str, kind: HistoryKind, produce: F) -> Result<Ack>
    where
        F: FnOnce(&FieldMapping) -> Result<ExportData>,
    {
        let _guard = self.gate.lock().await;

        let mut quota = self.current_quota().await?;
        quota.check(self.settings.monthly_limit)?;

        let snapshot = self
            .store
            .get(&[storage::FIELD_MAPPING, storage::EXPORT_HISTORY])
            .await?;
        let mapping: FieldMapping = read_key(&snapshot, storage::FIELD_MAPPING)?.unwrap_or_default();
        let data = produce(&mapping)?;

        let entries: Vec<HistoryEntry> =
            read_key(&snapshot, storage::EXPORT_HISTORY)?.unwrap_or_default();
        let mut history = HistoryLog::from_entries(entries, self.settings.history_capacity);
        let at = self.clock.now_utc();
        history.record(match &data {
            ExportData::Single(record) => HistoryEntry::profile(record.clone(), at),
            ExportData::Batch(records) => HistoryEntry::search_results(records.clone(), at),
        });
        quota.record_export();

        let mut patch = quota.period_patch()?;
        put_key(&mut patch, storage::EXPORT_HISTORY, &history.list())?;
        self.store.set(patch).await?;

        info!(
            "{} successful ({} record(s), {} export(s) this month)",
            request_type,
            data.record_count(),
            quota.export_count
        );
        debug!("History now holds {} {} entries", history.len(), kind.display_name());

        Ok(Ack::ok(format!("{} successful!", request_type.replacen('_', " ", 1))).with_data(data))
    }

    pub async fn status(&self) -> Result<StatusReport> {
        let _guard = self.gate.lock().await;

        let quota = self.current_quota().await?;
        let snapshot = self
            .store
            .get(&[storage::FIELD_MAPPING, storage::EXPORT_HISTORY])
            .await?;

        Ok(StatusReport {
            export_count: quota.export_count,
            export_limit: quota.export_limit(self.settings.monthly_limit),
            is_pro_user: quota.is_pro_user,
            export_history: read_key(&snapshot, storage::EXPORT_HISTORY)?.unwrap_or_default(),
            field_mapping: read_key(&snapshot, storage::FIELD_MAPPING)?.unwrap_or_default(),
        })
    }

    /// Stores `mapping` as given. No checks beyond its shape are made.
    pub async fn update_field_mapping(&self, mapping: FieldMapping) -> Result<Ack> {
        let _guard = self.gate.lock().await;

        self.current_quota().await?;
        let mut patch = Snapshot::new();
        put_key(&mut patch, storage::FIELD_MAPPING, &mapping)?;
        self.store.set(patch).await?;

        info!("Field mapping updated");
        Ok(Ack::ok("Field mapping updated."))
    }

    pub async fn set_pro_status(&self, is_pro_user: bool) -> Result<Ack> {
        let _guard = self.gate.lock().await;

        self.current_quota().await?;
        let mut patch = Snapshot::new();
        put_key(&mut patch, storage::IS_PRO_USER, &is_pro_user)?;
        self.store.set(patch).await?;

        info!("PRO status set to {}", is_pro_user);
        Ok(Ack::ok(if is_pro_user {
            "Upgraded to PRO. Exports are now unlimited."
        } else {
            "PRO status removed. Monthly export limit applies."
        }))
    }

    /// Brings the store up to the current schema; run once before serving.
    pub async fn migrate(&self) -> Result<MigrationOutcome> {
        let _guard = self.gate.lock().await;
        migrate(&self.store, self.clock.current_month()).await
    }

    /// Loads the quota and persists a month rollover before anyone looks at it.
    async fn current_quota(&self) -> Result<QuotaState> {
        let snapshot = self.store.get(&QUOTA_KEYS).await?;
        let mut quota = QuotaState::from_snapshot(&snapshot)?;

        if quota.roll_over(self.clock.current_month()) {
            debug!("New month, export counter reset");
            self.store.set(quota.period_patch()?).await?;
        }

        Ok(quota)
    }
}

/// The single response a failed request gets.
pub fn failure_response(error: &ExportError) -> Response {
    let message = match error {
        ExportError::QuotaExceeded { .. } => {
            warn!("{}", error);
            error.to_string()
        }
        ExportError::ExtractionFailed { .. } => {
            warn!("{}", error);
            error.to_string()
        }
        ExportError::InvalidData { .. } => {
            error!("Error mapping data: {}", error);
            MAPPING_FAILURE_MESSAGE.to_string()
        }
        ExportError::UnknownRequestType { request_type } => {
            error!("{} {:?}", UNKNOWN_REQUEST_MESSAGE, request_type);
            UNKNOWN_REQUEST_MESSAGE.to_string()
        }
        other => {
            error!("Error processing request: {}", other);
            format!("Internal error occurred: {}. Please try again.", other)
        }
    };

    Response::Ack(Ack::failed(message))
}
