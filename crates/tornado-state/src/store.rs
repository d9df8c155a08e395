//! StateStore: redb-backed persistence for deployment state.
//!
//! One JSON-serialized [`DeploymentState`] per project. The store supports
//! both on-disk and in-memory backends (the latter for testing).

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
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

    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(DEPLOYMENTS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Insert or replace the state of a project.
    pub fn put_deployment(&self, state: &DeploymentState) -> StateResult<()> {
        let key = state.table_key();
        let value = serde_json::to_vec(state).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(DEPLOYMENTS).map_err(map_err!(Table))?;
            table
                .insert(key, value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(project = %key, "deployment state stored");
        Ok(())
    }

    pub fn get_deployment(&self, project: &str) -> StateResult<Option<DeploymentState>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(DEPLOYMENTS).map_err(map_err!(Table))?;
        match table.get(project).map_err(map_err!(Read))? {
            Some(guard) => {
                let state: DeploymentState =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    /// List all persisted deployments, ordered by project name.
    pub fn list_deployments(&self) -> StateResult<Vec<DeploymentState>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(DEPLOYMENTS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let state: DeploymentState =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(state);
        }
        Ok(results)
    }

    /// Delete the state of a project. Returns true if it existed.
    pub fn delete_deployment(&self, project: &str) -> StateResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut table = txn.open_table(DEPLOYMENTS).map_err(map_err!(Table))?;
            existed = table.remove(project).map_err(map_err!(Write))?.is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%project, existed, "deployment state deleted");
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn test_state(project: &str) -> DeploymentState {
        DeploymentState {
            project: project.to_string(),
            regions: vec!["ap-guangzhou".to_string(), "ap-shanghai".to_string()],
            client_remark: "tencent-tornado".to_string(),
            function: FunctionResourceRef {
                name: format!("{project}-fn"),
                namespace: None,
                regions: BTreeMap::from([
                    ("ap-guangzhou".to_string(), "fn-gz".to_string()),
                    ("ap-shanghai".to_string(), "fn-sh".to_string()),
                ]),
            },
            gateway: GatewayResourceRef {
                regions: BTreeMap::from([(
                    "ap-guangzhou".to_string(),
                    GatewayRegionRef {
                        service_id: "service-gz".to_string(),
                        sub_domain: "service-gz.gz.apigw.example".to_string(),
                        environment: "release".to_string(),
                    },
                )]),
            },
            dns_domains: vec!["example.com".to_string()],
            dns_id: Some("dns-1".to_string()),
            created_at: 1000,
            updated_at: 1000,
        }
    }

    #[test]
    fn deployment_put_and_get() {
        let store = StateStore::open_in_memory().unwrap();
        let state = test_state("demo");
        store.put_deployment(&state).unwrap();

        let loaded = store.get_deployment("demo").unwrap().unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn deployment_get_nonexistent_returns_none() {
        let store = StateStore::open_in_memory().unwrap();
        assert!(store.get_deployment("nope").unwrap().is_none());
    }

    #[test]
    fn deployment_list_all() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_deployment(&test_state("beta")).unwrap();
        store.put_deployment(&test_state("alpha")).unwrap();

        let all = store.list_deployments().unwrap();
        let names: Vec<_> = all.iter().map(|s| s.project.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta"]);
    }

    #[test]
    fn deployment_update_in_place() {
        let store = StateStore::open_in_memory().unwrap();
        let mut state = test_state("demo");
        store.put_deployment(&state).unwrap();

        state.dns_domains.clear();
        state.updated_at = 2000;
        store.put_deployment(&state).unwrap();

        let loaded = store.get_deployment("demo").unwrap().unwrap();
        assert!(loaded.dns_domains.is_empty());
        assert_eq!(loaded.updated_at, 2000);
        assert_eq!(store.list_deployments().unwrap().len(), 1);
    }

    #[test]
    fn deployment_delete() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_deployment(&test_state("demo")).unwrap();

        assert!(store.delete_deployment("demo").unwrap());
        assert!(!store.delete_deployment("demo").unwrap());
        assert!(store.get_deployment("demo").unwrap().is_none());
    }

    #[test]
    fn persistence_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.redb");

        {
            let store = StateStore::open(&path).unwrap();
            store.put_deployment(&test_state("demo")).unwrap();
        }

        let store = StateStore::open(&path).unwrap();
        let loaded = store.get_deployment("demo").unwrap().unwrap();
        assert_eq!(loaded.function.regions.len(), 2);
        assert_eq!(loaded.dns_id.as_deref(), Some("dns-1"));
    }

    #[test]
    fn clones_share_the_database() {
        let store = StateStore::open_in_memory().unwrap();
        let other = store.clone();
        store.put_deployment(&test_state("demo")).unwrap();
        assert!(other.get_deployment("demo").unwrap().is_some());
    }

    #[test]
    fn empty_store_operations() {
        let store = StateStore::open_in_memory().unwrap();
        assert!(store.list_deployments().unwrap().is_empty());
        assert!(!store.delete_deployment("nothing").unwrap());
    }
}
