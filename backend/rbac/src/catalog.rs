/// Administrative façade over the permission and role catalogs.
///
/// No deletes are exposed. Deactivation is the only destructive
/// operation: it cascades into resolution immediately (via a cache
/// rebuild) but leaves every grant row in place for audit history.
use std::sync::Arc;

use warden_core::{NewPermission, NewRole, Permission, Role, WardenError};

use crate::cache::MatrixCache;
use crate::store::RbacStore;

pub struct Catalog {
    store: Arc<dyn RbacStore>,
    cache: MatrixCache,
}

impl Catalog {
    pub fn new(store: Arc<dyn RbacStore>) -> Self {
        let cache = MatrixCache::new(store.clone());
        Self { store, cache }
    }

    /// Idempotent on `code`; an existing row is returned untouched.
    pub async fn upsert_permission(&self, new: NewPermission) -> Result<Permission, WardenError> {
        let (permission, _) = self.store.upsert_permission(new).await?;
        Ok(permission)
    }

    /// Idempotent on `code`.
    pub async fn upsert_role(&self, new: NewRole) -> Result<Role, WardenError> {
        let (role, _) = self.store.upsert_role(new).await?;
        Ok(role)
    }

    pub async fn list_active_permissions(&self) -> Result<Vec<Permission>, WardenError> {
        self.store.list_active_permissions().await
    }

    pub async fn list_active_roles(&self) -> Result<Vec<Role>, WardenError> {
        self.store.list_active_roles().await
    }

    pub async fn deactivate_permission(&self, code: &str) -> Result<(), WardenError> {
        self.store.deactivate_permission(code).await?;
        self.cache.rebuild().await
    }

    pub async fn deactivate_role(&self, code: &str) -> Result<(), WardenError> {
        self.store.deactivate_role(code).await?;
        self.cache.rebuild().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::Resolver;
    use crate::sqlite_store::SqliteStore;
    use warden_core::GrantState;

    #[tokio::test]
    async fn test_deactivation_cascades_into_resolution_not_grants() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let catalog = Catalog::new(store.clone());

        let p = catalog
            .upsert_permission(NewPermission {
                code: "delete_todo".into(),
                name: "Delete todos".into(),
                localized_name: "Eliminar tareas".into(),
                description: String::new(),
                category: "todo".into(),
            })
            .await
            .unwrap();
        let r = catalog
            .upsert_role(NewRole {
                code: "ADMIN".into(),
                name: "Administrator".into(),
                description: String::new(),
            })
            .await
            .unwrap();
        store.set_grant(r.id, p.id, GrantState::Granted).await.unwrap();

        // Warm the cache so the deactivation has a stale mirror to beat.
        let resolver = Resolver::new(store.clone());
        MatrixCache::new(store.clone()).rebuild().await.unwrap();
        assert!(resolver.has_permission("ADMIN", "delete_todo").await.unwrap());

        catalog.deactivate_permission("delete_todo").await.unwrap();
        assert!(!resolver.has_permission("ADMIN", "delete_todo").await.unwrap());
        // The grant row itself is untouched.
        assert_eq!(store.counts().await.unwrap().granted, 1);
    }
}
