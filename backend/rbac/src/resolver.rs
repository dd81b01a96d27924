/// Effective-permission resolution with fallback role matching.
///
/// Principal role references were historically entered inconsistently:
/// a reference SHOULD be a role code but may be a role name, or differ
/// from either only in letter case. Matching relaxes progressively and
/// stops at the first tier that yields a match; a reference no tier
/// matches resolves to the empty set (fail-closed).
///
/// Resolution is a pure read. The grant lookup goes through the matrix
/// cache when a snapshot is present and falls back to the relational
/// path on a miss, scheduling a best-effort background rebuild.
use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, warn};

use warden_core::{Role, WardenError};

use crate::cache::MatrixCache;
use crate::store::RbacStore;

pub struct Resolver {
    store: Arc<dyn RbacStore>,
    cache: MatrixCache,
}

impl Resolver {
    pub fn new(store: Arc<dyn RbacStore>) -> Self {
        let cache = MatrixCache::new(store.clone());
        Self { store, cache }
    }

    /// Resolve a principal role reference to its effective set of
    /// permission codes. Unknown references yield the empty set.
    pub async fn resolve_permissions(
        &self,
        reference: &str,
    ) -> Result<BTreeSet<String>, WardenError> {
        let Some(role) = self.match_role(reference).await? else {
            debug!("role reference '{}' matched no active role, resolving to empty set", reference);
            return Ok(BTreeSet::new());
        };

        if let Some(matrix) = self.cache.try_read().await {
            let set = matrix
                .iter()
                .filter(|(_, row)| row.get(&role.code).copied().unwrap_or(false))
                .map(|(code, _)| code.clone())
                .collect();
            return Ok(set);
        }

        let codes = self.store.granted_codes(role.id).await?;
        self.spawn_cache_rebuild();
        Ok(codes.into_iter().collect())
    }

    pub async fn has_permission(&self, reference: &str, code: &str) -> Result<bool, WardenError> {
        Ok(self.resolve_permissions(reference).await?.contains(code))
    }

    pub async fn has_any(&self, reference: &str, codes: &[&str]) -> Result<bool, WardenError> {
        let effective = self.resolve_permissions(reference).await?;
        Ok(codes.iter().any(|code| effective.contains(*code)))
    }

    pub async fn has_all(&self, reference: &str, codes: &[&str]) -> Result<bool, WardenError> {
        let effective = self.resolve_permissions(reference).await?;
        Ok(codes.iter().all(|code| effective.contains(*code)))
    }

    /// Three-tier progressive relaxation over the active roles: exact
    /// code, exact name, then case-insensitive code-or-name. The first
    /// non-empty tier wins. Ties within a tier pick the
    /// lexicographically-smallest role code, deterministically.
    async fn match_role(&self, reference: &str) -> Result<Option<Role>, WardenError> {
        let roles = self.store.list_active_roles().await?;
        let reference_lower = reference.to_lowercase();

        let by_code = |role: &Role| role.code == reference;
        let by_name = |role: &Role| role.name == reference;
        let relaxed = |role: &Role| {
            role.code.to_lowercase() == reference_lower
                || role.name.to_lowercase() == reference_lower
        };
        let tiers: [&dyn Fn(&Role) -> bool; 3] = [&by_code, &by_name, &relaxed];

        for tier in tiers {
            let mut matches: Vec<&Role> = roles.iter().filter(|role| tier(role)).collect();
            if matches.is_empty() {
                continue;
            }
            matches.sort_by(|a, b| a.code.cmp(&b.code));
            if matches.len() > 1 {
                warn!(
                    "role reference '{}' matches {} active roles, using '{}'",
                    reference,
                    matches.len(),
                    matches[0].code
                );
            }
            return Ok(Some(matches[0].clone()));
        }
        Ok(None)
    }

    fn spawn_cache_rebuild(&self) {
        let store = self.store.clone();
        tokio::spawn(async move {
            if let Err(e) = MatrixCache::new(store).rebuild().await {
                warn!("background matrix cache rebuild failed: {}", e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MATRIX_CACHE_KEY;
    use crate::sqlite_store::SqliteStore;
    use warden_core::{GrantState, NewPermission, NewRole};

    fn perm(code: &str, category: &str) -> NewPermission {
        NewPermission {
            code: code.to_string(),
            name: code.replace('_', " "),
            localized_name: code.to_string(),
            description: String::new(),
            category: category.to_string(),
        }
    }

    fn named_role(code: &str, name: &str) -> NewRole {
        NewRole {
            code: code.to_string(),
            name: name.to_string(),
            description: String::new(),
        }
    }

    /// Catalog of five todo permissions; VIEWER holds only view_todo,
    /// PROJECT_MANAGER holds everything.
    async fn seeded() -> Arc<SqliteStore> {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let codes = ["view_todo", "create_todo", "edit_todo", "delete_todo", "complete_todo"];
        let mut perms = Vec::new();
        for code in codes {
            let (p, _) = store.upsert_permission(perm(code, "todo")).await.unwrap();
            perms.push(p);
        }
        let (viewer, _) =
            store.upsert_role(named_role("VIEWER", "Viewer")).await.unwrap();
        let (manager, _) = store
            .upsert_role(named_role("PROJECT_MANAGER", "Project Manager"))
            .await
            .unwrap();
        store.set_grant(viewer.id, perms[0].id, GrantState::Granted).await.unwrap();
        for p in &perms {
            store.set_grant(manager.id, p.id, GrantState::Granted).await.unwrap();
        }
        store
    }

    fn set(codes: &[&str]) -> BTreeSet<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    #[tokio::test]
    async fn test_unknown_reference_resolves_to_empty_set() {
        let resolver = Resolver::new(seeded().await);
        assert!(resolver.resolve_permissions("NO_SUCH_ROLE").await.unwrap().is_empty());
        assert!(!resolver.has_permission("NO_SUCH_ROLE", "view_todo").await.unwrap());
    }

    #[tokio::test]
    async fn test_all_three_tiers_reach_the_same_role() {
        let resolver = Resolver::new(seeded().await);
        let expected =
            set(&["view_todo", "create_todo", "edit_todo", "delete_todo", "complete_todo"]);

        // Tier 1: exact code. Tier 2: exact name. Tier 3: case folded.
        for reference in ["PROJECT_MANAGER", "Project Manager", "project_manager"] {
            let resolved = resolver.resolve_permissions(reference).await.unwrap();
            assert_eq!(resolved, expected, "reference {:?}", reference);
        }
    }

    #[tokio::test]
    async fn test_viewer_scenario() {
        let resolver = Resolver::new(seeded().await);
        assert_eq!(resolver.resolve_permissions("VIEWER").await.unwrap(), set(&["view_todo"]));
        assert!(!resolver.has_permission("VIEWER", "edit_todo").await.unwrap());
        assert!(resolver.has_any("VIEWER", &["edit_todo", "view_todo"]).await.unwrap());
        assert!(!resolver.has_all("VIEWER", &["view_todo", "edit_todo"]).await.unwrap());
    }

    #[tokio::test]
    async fn test_exact_code_wins_over_name_of_another_role() {
        let store = seeded().await;
        // A role whose *name* collides with another role's code must
        // lose to the tier-1 exact-code match.
        let (decoy, _) = store
            .upsert_role(named_role("LEGACY_VIEWER", "VIEWER"))
            .await
            .unwrap();
        let (p, _) = store.upsert_permission(perm("export_reports", "report")).await.unwrap();
        store.set_grant(decoy.id, p.id, GrantState::Granted).await.unwrap();

        let resolver = Resolver::new(store);
        assert_eq!(resolver.resolve_permissions("VIEWER").await.unwrap(), set(&["view_todo"]));
    }

    #[tokio::test]
    async fn test_ambiguous_case_insensitive_match_is_deterministic() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let (p, _) = store.upsert_permission(perm("view_todo", "todo")).await.unwrap();
        let (a, _) = store.upsert_role(named_role("AUDITOR", "auditor")).await.unwrap();
        let (z, _) = store.upsert_role(named_role("Auditor", "ops auditor")).await.unwrap();
        store.set_grant(a.id, p.id, GrantState::Granted).await.unwrap();
        store.set_grant(z.id, p.id, GrantState::Revoked).await.unwrap();

        // "aUdItOr" matches both roles only under tier 3; the
        // lexicographically-smaller code "AUDITOR" must win.
        let resolver = Resolver::new(store);
        assert_eq!(resolver.resolve_permissions("aUdItOr").await.unwrap(), set(&["view_todo"]));
    }

    #[tokio::test]
    async fn test_inactive_role_resolves_to_empty_set() {
        let store = seeded().await;
        store.deactivate_role("VIEWER").await.unwrap();
        let resolver = Resolver::new(store);
        assert!(resolver.resolve_permissions("VIEWER").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_cache_falls_back_to_relational_truth() {
        let store = seeded().await;
        store.write_setting(MATRIX_CACHE_KEY, "][ definitely not json").await.unwrap();

        let resolver = Resolver::new(store);
        assert_eq!(resolver.resolve_permissions("VIEWER").await.unwrap(), set(&["view_todo"]));
    }

    #[tokio::test]
    async fn test_cache_hit_serves_resolution() {
        let store = seeded().await;
        let cache = MatrixCache::new(store.clone());
        cache.rebuild().await.unwrap();

        let resolver = Resolver::new(store);
        assert_eq!(resolver.resolve_permissions("VIEWER").await.unwrap(), set(&["view_todo"]));
    }

    #[tokio::test]
    async fn test_revoked_grant_denies_like_absent_grant() {
        let store = seeded().await;
        let viewer = store.find_role("VIEWER").await.unwrap().unwrap();
        let p = store.find_permission("view_todo").await.unwrap().unwrap();
        store.set_grant(viewer.id, p.id, GrantState::Revoked).await.unwrap();

        let resolver = Resolver::new(store);
        assert!(resolver.resolve_permissions("VIEWER").await.unwrap().is_empty());
    }
}
