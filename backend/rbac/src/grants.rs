/// Grant-matrix maintenance.
///
/// Unlike resolution, grant management is an administrative operation
/// and requires exact catalog codes; there is no fallback matching
/// here. Unknown codes fail with `NotFound`. Every successful mutation
/// rebuilds the matrix cache synchronously so readers never see the
/// stale mirror outlive the relational change for long.
use std::sync::Arc;

use tracing::info;

use warden_core::{EntityKind, GrantDecision, GrantState, WardenError};

use crate::cache::MatrixCache;
use crate::store::RbacStore;

pub struct GrantManager {
    store: Arc<dyn RbacStore>,
    cache: MatrixCache,
}

impl GrantManager {
    pub fn new(store: Arc<dyn RbacStore>) -> Self {
        let cache = MatrixCache::new(store.clone());
        Self { store, cache }
    }

    /// Idempotent: granting an already-granted pair is a no-op.
    pub async fn grant(&self, role_code: &str, permission_code: &str) -> Result<(), WardenError> {
        self.set(role_code, permission_code, GrantState::Granted).await
    }

    /// Idempotent; the row is flipped to revoked, never deleted.
    pub async fn revoke(&self, role_code: &str, permission_code: &str) -> Result<(), WardenError> {
        self.set(role_code, permission_code, GrantState::Revoked).await
    }

    pub async fn decision(
        &self,
        role_code: &str,
        permission_code: &str,
    ) -> Result<GrantDecision, WardenError> {
        let (role_id, permission_id) = self.resolve_pair(role_code, permission_code).await?;
        self.store.grant_decision(role_id, permission_id).await
    }

    async fn set(
        &self,
        role_code: &str,
        permission_code: &str,
        state: GrantState,
    ) -> Result<(), WardenError> {
        let (role_id, permission_id) = self.resolve_pair(role_code, permission_code).await?;
        self.store.set_grant(role_id, permission_id, state).await?;
        self.cache.rebuild().await?;
        info!("grant {} -> {} set to {:?}", role_code, permission_code, state);
        Ok(())
    }

    async fn resolve_pair(
        &self,
        role_code: &str,
        permission_code: &str,
    ) -> Result<(uuid::Uuid, uuid::Uuid), WardenError> {
        let role = self
            .store
            .find_role(role_code)
            .await?
            .ok_or_else(|| WardenError::not_found(EntityKind::Role, role_code))?;
        let permission = self
            .store
            .find_permission(permission_code)
            .await?
            .ok_or_else(|| WardenError::not_found(EntityKind::Permission, permission_code))?;
        Ok((role.id, permission.id))
    }
}
