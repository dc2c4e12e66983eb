//! StateStore — redb-backed persistence for application records.
//!
//! Provides typed operations over applications, deploy events, and
//! registries. All records are JSON-serialized into redb's `&[u8]` value
//! columns. The store supports both on-disk and in-memory backends (the
//! latter for testing).

use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use crate::error::{Stage, StateError, StateResult};
use crate::repository::Repository;
use crate::tables::*;
use crate::types::*;

/// Closure factory turning any `Display` error into a `StateError`.
///
/// `map_err!(Open)` for open failures, `map_err!(Read)` and friends for a
/// redb [`Stage`], and `map_err!(codec "event")` for JSON row failures.
macro_rules! map_err {
    (Open) => {
        |e| StateError::Open(e.to_string())
    };
    (codec $record:literal) => {
        |e| StateError::Codec {
            record: $record,
            reason: e.to_string(),
        }
    };
    ($stage:ident) => {
        |e| StateError::storage(Stage::$stage, e.to_string())
    };
}

/// Thread-safe state store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(APPLICATIONS).map_err(map_err!(Table))?;
        txn.open_table(EVENTS).map_err(map_err!(Table))?;
        txn.open_table(REGISTRIES).map_err(map_err!(Table))?;
        txn.open_table(SEQUENCES).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── Applications ───────────────────────────────────────────────

    /// Insert or update an application row.
    ///
    /// A row with `id == 0` is assigned the next id and a creation time.
    pub fn put_application(&self, mut app: ApplicationSpec) -> StateResult<ApplicationSpec> {
        let now = epoch_secs();
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            if app.id == 0 {
                let mut seq = txn.open_table(SEQUENCES).map_err(map_err!(Table))?;
                let last = seq
                    .get(APPLICATION_SEQ)
                    .map_err(map_err!(Read))?
                    .map(|guard| guard.value())
                    .unwrap_or(0);
                app.id = last + 1;
                seq.insert(APPLICATION_SEQ, app.id).map_err(map_err!(Write))?;
                if app.created_at == 0 {
                    app.created_at = now;
                }
            }
            app.updated_at = now;

            let key = app.table_key();
            let value = serde_json::to_vec(&app).map_err(map_err!(codec "application"))?;
            let mut table = txn.open_table(APPLICATIONS).map_err(map_err!(Table))?;
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(id = app.id, key = %app.table_key(), "application stored");
        Ok(app)
    }

    /// Get an application by cluster and name.
    pub fn get_application(
        &self,
        cluster_id: ClusterId,
        name: &str,
    ) -> StateResult<Option<ApplicationSpec>> {
        let key = application_key(cluster_id, name);
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(APPLICATIONS).map_err(map_err!(Table))?;
        match table.get(key.as_str()).map_err(map_err!(Read))? {
            Some(guard) => {
                let app: ApplicationSpec =
                    serde_json::from_slice(guard.value()).map_err(map_err!(codec "application"))?;
                Ok(Some(app))
            }
            None => Ok(None),
        }
    }

    /// List all applications in a cluster.
    pub fn list_applications(&self, cluster_id: ClusterId) -> StateResult<Vec<ApplicationSpec>> {
        let prefix = format!("{cluster_id}/");
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(APPLICATIONS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            if key.value().starts_with(&prefix) {
                let app: ApplicationSpec =
                    serde_json::from_slice(value.value()).map_err(map_err!(codec "application"))?;
                results.push(app);
            }
        }
        Ok(results)
    }

    // ── Events ─────────────────────────────────────────────────────

    /// Append a deploy event. Events are never updated or removed.
    pub fn put_event(&self, event: &DeployEvent) -> StateResult<()> {
        let key = event.table_key();
        let value = serde_json::to_vec(event).map_err(map_err!(codec "event"))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(EVENTS).map_err(map_err!(Table))?;
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, revision = event.revision, "deploy event appended");
        Ok(())
    }

    /// List deploy events for an application, oldest first.
    pub fn list_events_for_application(
        &self,
        application_id: ApplicationId,
    ) -> StateResult<Vec<DeployEvent>> {
        let prefix = event_prefix(application_id);
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(EVENTS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            if key.value().starts_with(&prefix) {
                let event: DeployEvent =
                    serde_json::from_slice(value.value()).map_err(map_err!(codec "event"))?;
                results.push(event);
            }
        }
        // Keys only order by second; revisions break ties.
        results.sort_by_key(|event| (event.timestamp, event.revision));
        Ok(results)
    }

    // ── Registries ─────────────────────────────────────────────────

    /// Insert or update a registry. A registry with `id == 0` gets a fresh id.
    pub fn put_registry(&self, mut registry: Registry) -> StateResult<Registry> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            if registry.id == 0 {
                let mut seq = txn.open_table(SEQUENCES).map_err(map_err!(Table))?;
                let last = seq
                    .get(REGISTRY_SEQ)
                    .map_err(map_err!(Read))?
                    .map(|guard| guard.value())
                    .unwrap_or(0);
                registry.id = last + 1;
                seq.insert(REGISTRY_SEQ, registry.id).map_err(map_err!(Write))?;
            }
            let key = registry.table_key();
            let value = serde_json::to_vec(&registry).map_err(map_err!(codec "registry"))?;
            let mut table = txn.open_table(REGISTRIES).map_err(map_err!(Table))?;
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(registry)
    }

    /// List registries for a project.
    pub fn list_registries_for_project(&self, project_id: ProjectId) -> StateResult<Vec<Registry>> {
        let prefix = registry_prefix(project_id);
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(REGISTRIES).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            if key.value().starts_with(&prefix) {
                let registry: Registry =
                    serde_json::from_slice(value.value()).map_err(map_err!(codec "registry"))?;
                results.push(registry);
            }
        }
        Ok(results)
    }
}

impl Repository for StateStore {
    fn read_by_name(&self, cluster_id: ClusterId, name: &str) -> StateResult<Option<ApplicationSpec>> {
        self.get_application(cluster_id, name)
    }

    fn upsert(&self, app: ApplicationSpec) -> StateResult<ApplicationSpec> {
        self.put_application(app)
    }

    fn append_event(&self, event: &DeployEvent) -> StateResult<()> {
        self.put_event(event)
    }

    fn list_registries(&self, project_id: ProjectId) -> StateResult<Vec<Registry>> {
        self.list_registries_for_project(project_id)
    }
}

/// Current Unix epoch in seconds.
pub fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
