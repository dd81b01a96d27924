/// Denormalized grant-matrix mirror.
///
/// A single settings row holds a JSON object mapping permission code
/// to role code to granted flag. The relational grant table is the
/// source of truth; this snapshot is rebuildable at any time and is
/// allowed to be briefly stale. A missing or malformed payload is a
/// cache miss, never an error.
use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use warden_core::WardenError;

use crate::store::RbacStore;

/// Well-known settings key for the matrix snapshot.
pub const MATRIX_CACHE_KEY: &str = "rbac.permission_matrix";

/// `{ permission_code: { role_code: granted } }`.
pub type MatrixSnapshot = BTreeMap<String, BTreeMap<String, bool>>;

pub struct MatrixCache {
    store: Arc<dyn RbacStore>,
}

impl MatrixCache {
    pub fn new(store: Arc<dyn RbacStore>) -> Self {
        Self { store }
    }

    /// Derive a fresh snapshot from the grant table and write it under
    /// the well-known key. Last-writer-wins; losing a race with another
    /// rebuild is harmless since both derive from the same truth.
    pub async fn rebuild(&self) -> Result<(), WardenError> {
        let rows = self.store.grant_matrix().await?;
        let mut matrix = MatrixSnapshot::new();
        for (permission_code, role_code, granted) in rows {
            matrix.entry(permission_code).or_default().insert(role_code, granted);
        }
        let payload =
            serde_json::to_string(&matrix).map_err(|e| WardenError::Storage(e.to_string()))?;
        self.store.write_setting(MATRIX_CACHE_KEY, &payload).await?;
        debug!("matrix cache rebuilt: {} permission entries", matrix.len());
        Ok(())
    }

    /// Read the current snapshot. Returns `None` on a missing key, a
    /// malformed payload, or a storage failure; callers fall back to
    /// the relational path.
    pub async fn try_read(&self) -> Option<MatrixSnapshot> {
        let raw = match self.store.read_setting(MATRIX_CACHE_KEY).await {
            Ok(value) => value?,
            Err(e) => {
                warn!("matrix cache read failed, treating as miss: {}", e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!("matrix cache payload corrupt, treating as miss: {}", e);
                None
            }
        }
    }

    /// Drop the snapshot entirely. The next resolver miss repopulates it.
    pub async fn invalidate(&self) -> Result<(), WardenError> {
        self.store.delete_setting(MATRIX_CACHE_KEY).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite_store::SqliteStore;
    use warden_core::{GrantState, NewPermission, NewRole};

    async fn seeded_store() -> Arc<SqliteStore> {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let (p, _) = store
            .upsert_permission(NewPermission {
                code: "view_todo".into(),
                name: "View todos".into(),
                localized_name: "Ver tareas".into(),
                description: String::new(),
                category: "todo".into(),
            })
            .await
            .unwrap();
        let (r, _) = store
            .upsert_role(NewRole {
                code: "VIEWER".into(),
                name: "Viewer".into(),
                description: String::new(),
            })
            .await
            .unwrap();
        store.set_grant(r.id, p.id, GrantState::Granted).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_rebuild_then_read() {
        let store = seeded_store().await;
        let cache = MatrixCache::new(store.clone());

        assert!(cache.try_read().await.is_none());
        cache.rebuild().await.unwrap();

        let snapshot = cache.try_read().await.expect("snapshot after rebuild");
        assert_eq!(snapshot["view_todo"]["VIEWER"], true);
    }

    #[tokio::test]
    async fn test_corrupt_payload_is_a_miss() {
        let store = seeded_store().await;
        let cache = MatrixCache::new(store.clone());
        store.write_setting(MATRIX_CACHE_KEY, "{not json").await.unwrap();
        assert!(cache.try_read().await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_drops_snapshot() {
        let store = seeded_store().await;
        let cache = MatrixCache::new(store);
        cache.rebuild().await.unwrap();
        cache.invalidate().await.unwrap();
        assert!(cache.try_read().await.is_none());
    }
}
