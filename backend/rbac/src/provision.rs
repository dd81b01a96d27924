/// Provisioning engine: brings the catalogs and grant matrix to the
/// declared baseline. Every step is independently idempotent, so a run
/// aborted mid-way leaves valid state and a re-run completes it.
use std::sync::Arc;

use tracing::info;

use warden_core::{EntityKind, GrantState, RoleSummary, SetupReport, VerifyReport, WardenError};

use crate::baseline::{DEFAULT_GRANTS, DEFAULT_PERMISSIONS, DEFAULT_ROLES};
use crate::cache::MatrixCache;
use crate::store::RbacStore;

pub struct Provisioner {
    store: Arc<dyn RbacStore>,
    cache: MatrixCache,
}

impl Provisioner {
    pub fn new(store: Arc<dyn RbacStore>) -> Self {
        let cache = MatrixCache::new(store.clone());
        Self { store, cache }
    }

    /// Seed the baseline catalogs and grants, then rebuild the matrix
    /// cache. Safe to run any number of times; the report counts rows
    /// created by this run only, so a second run reports zeros.
    pub async fn setup_complete(&self) -> Result<SetupReport, WardenError> {
        let mut report = SetupReport::default();

        for def in DEFAULT_PERMISSIONS {
            let (_, created) = self.store.upsert_permission(def.to_new()).await?;
            if created {
                report.permissions_created += 1;
            }
        }

        for def in DEFAULT_ROLES {
            let (_, created) = self.store.upsert_role(def.to_new()).await?;
            if created {
                report.roles_created += 1;
            }
        }

        for entry in DEFAULT_GRANTS {
            let role = self
                .store
                .find_role(entry.role)
                .await?
                .ok_or_else(|| WardenError::not_found(EntityKind::Role, entry.role))?;
            for code in entry.permissions {
                let permission = self
                    .store
                    .find_permission(code)
                    .await?
                    .ok_or_else(|| WardenError::not_found(EntityKind::Permission, *code))?;
                if self.store.set_grant(role.id, permission.id, GrantState::Granted).await? {
                    report.grants_created += 1;
                }
            }
        }

        self.cache.rebuild().await?;
        info!(
            "permission system provisioned: {} permissions, {} roles, {} grants created",
            report.permissions_created, report.roles_created, report.grants_created
        );
        Ok(report)
    }

    /// Revoke every grant row (rows are flipped, never deleted, to
    /// preserve the audit trail), rebuild the cache to the
    /// fully-revoked state, then reseed the baseline. The two-phase
    /// order guarantees stale grants outside the baseline are removed
    /// rather than merely supplemented.
    pub async fn reset_permission_system(&self) -> Result<(), WardenError> {
        let revoked = self.store.revoke_all_grants().await?;
        self.cache.rebuild().await?;
        info!("revoked {} grant rows, reseeding baseline", revoked);
        self.setup_complete().await?;
        Ok(())
    }

    /// Read-only report of the current state: row counts plus, per
    /// active role, the granted permission names grouped by category.
    pub async fn verify(&self) -> Result<VerifyReport, WardenError> {
        let counts = self.store.counts().await?;
        let mut roles = Vec::new();
        for role in self.store.list_active_roles().await? {
            let permissions_by_category =
                self.store.granted_names_by_category(role.id).await?;
            roles.push(RoleSummary {
                code: role.code,
                name: role.name,
                permissions_by_category,
            });
        }
        Ok(VerifyReport {
            permission_count: counts.permissions,
            role_count: counts.roles,
            granted_count: counts.granted,
            roles,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grants::GrantManager;
    use crate::resolver::Resolver;
    use crate::sqlite_store::SqliteStore;
    use std::collections::BTreeMap;

    fn provisioned() -> (Arc<SqliteStore>, Provisioner) {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let provisioner = Provisioner::new(store.clone());
        (store, provisioner)
    }

    #[tokio::test]
    async fn test_setup_is_idempotent() {
        let (store, provisioner) = provisioned();

        let first = provisioner.setup_complete().await.unwrap();
        assert_eq!(first.permissions_created, DEFAULT_PERMISSIONS.len() as u64);
        assert_eq!(first.roles_created, DEFAULT_ROLES.len() as u64);
        assert!(first.grants_created > 0);
        let counts_after_first = store.counts().await.unwrap();

        let second = provisioner.setup_complete().await.unwrap();
        assert_eq!(second, SetupReport::default());
        assert_eq!(store.counts().await.unwrap(), counts_after_first);
    }

    #[tokio::test]
    async fn test_reset_restores_baseline_sets() {
        let (store, provisioner) = provisioned();
        provisioner.setup_complete().await.unwrap();

        let resolver = Resolver::new(store.clone());
        let mut baseline = BTreeMap::new();
        for entry in DEFAULT_GRANTS {
            baseline.insert(entry.role, resolver.resolve_permissions(entry.role).await.unwrap());
        }

        // Drift: an out-of-baseline grant and a missing baseline grant.
        let grants = GrantManager::new(store.clone());
        grants.grant("VIEWER", "delete_todo").await.unwrap();
        grants.revoke("PROJECT_MANAGER", "view_todo").await.unwrap();

        provisioner.reset_permission_system().await.unwrap();
        for entry in DEFAULT_GRANTS {
            let resolved = resolver.resolve_permissions(entry.role).await.unwrap();
            assert_eq!(&resolved, &baseline[entry.role], "role {}", entry.role);
        }
    }

    #[tokio::test]
    async fn test_reset_removes_grants_outside_the_baseline() {
        let (store, provisioner) = provisioned();
        provisioner.setup_complete().await.unwrap();

        let grants = GrantManager::new(store.clone());
        grants.grant("VIEWER", "manage_users").await.unwrap();

        provisioner.reset_permission_system().await.unwrap();
        let resolver = Resolver::new(store.clone());
        assert!(!resolver.has_permission("VIEWER", "manage_users").await.unwrap());
        // The drifted row survives as a revoked audit record.
        let baseline_rows: u64 =
            DEFAULT_GRANTS.iter().map(|g| g.permissions.len() as u64).sum();
        assert_eq!(store.counts().await.unwrap().grant_rows, baseline_rows + 1);
    }

    #[tokio::test]
    async fn test_verify_reports_without_mutating() {
        let (store, provisioner) = provisioned();
        provisioner.setup_complete().await.unwrap();
        let before = store.counts().await.unwrap();

        let report = provisioner.verify().await.unwrap();
        assert_eq!(report.permission_count, DEFAULT_PERMISSIONS.len() as u64);
        assert_eq!(report.role_count, DEFAULT_ROLES.len() as u64);
        assert_eq!(report.roles.len(), DEFAULT_ROLES.len());

        let viewer = report.roles.iter().find(|r| r.code == "VIEWER").expect("VIEWER summary");
        assert_eq!(viewer.permissions_by_category["todo"], vec!["View todos"]);
        assert_eq!(viewer.permissions_by_category["report"], vec!["View reports"]);

        assert_eq!(store.counts().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_admin_resolves_to_full_active_catalog() {
        let (store, provisioner) = provisioned();
        provisioner.setup_complete().await.unwrap();

        let resolver = Resolver::new(store.clone());
        let expected: std::collections::BTreeSet<String> =
            DEFAULT_PERMISSIONS.iter().map(|p| p.code.to_string()).collect();
        for reference in ["ADMIN", "Administrator", "admin"] {
            assert_eq!(
                resolver.resolve_permissions(reference).await.unwrap(),
                expected,
                "reference {:?}",
                reference
            );
        }
    }
}
