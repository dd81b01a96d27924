use std::collections::BTreeMap;

use async_trait::async_trait;
use uuid::Uuid;

use warden_core::{
    GrantDecision, GrantState, NewPermission, NewRole, Permission, Role, WardenError,
};

/// Row counts for observability and verification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCounts {
    pub permissions: u64,
    pub roles: u64,
    /// All grant rows, granted or revoked.
    pub grant_rows: u64,
    /// Grant rows currently in the granted state.
    pub granted: u64,
}

/// Abstract interface to the relational backing store.
///
/// Handles are passed explicitly (`Arc<dyn RbacStore>`) to every
/// component; there is no process-wide singleton. The store is the
/// single source of truth; the matrix cache in the settings table is
/// a derived mirror.
#[async_trait]
pub trait RbacStore: Send + Sync {
    /// Insert a permission if no row with its `code` exists. Existing
    /// rows are left untouched. Returns the row and whether it was
    /// created by this call.
    async fn upsert_permission(
        &self,
        new: NewPermission,
    ) -> Result<(Permission, bool), WardenError>;

    /// Insert a role if no row with its `code` exists.
    async fn upsert_role(&self, new: NewRole) -> Result<(Role, bool), WardenError>;

    async fn list_active_permissions(&self) -> Result<Vec<Permission>, WardenError>;

    async fn list_active_roles(&self) -> Result<Vec<Role>, WardenError>;

    /// Exact-code lookup, including inactive rows.
    async fn find_permission(&self, code: &str) -> Result<Option<Permission>, WardenError>;

    /// Exact-code lookup, including inactive rows.
    async fn find_role(&self, code: &str) -> Result<Option<Role>, WardenError>;

    /// Soft-deactivate; grant rows are untouched. `NotFound` if the
    /// code is absent from the catalog.
    async fn deactivate_permission(&self, code: &str) -> Result<(), WardenError>;

    async fn deactivate_role(&self, code: &str) -> Result<(), WardenError>;

    /// Transactional upsert of the unique (role, permission) row.
    /// Returns true when a new row was inserted (as opposed to an
    /// existing row being left as-is or flipped).
    async fn set_grant(
        &self,
        role_id: Uuid,
        permission_id: Uuid,
        state: GrantState,
    ) -> Result<bool, WardenError>;

    async fn grant_decision(
        &self,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> Result<GrantDecision, WardenError>;

    /// Codes of permissions granted to the role, restricted to active
    /// permissions, sorted ascending.
    async fn granted_codes(&self, role_id: Uuid) -> Result<Vec<String>, WardenError>;

    /// Granted permission display names for the role, grouped by
    /// category (active permissions only).
    async fn granted_names_by_category(
        &self,
        role_id: Uuid,
    ) -> Result<BTreeMap<String, Vec<String>>, WardenError>;

    /// Flip every grant row to revoked. Returns the number of rows
    /// that changed state. No row is ever deleted.
    async fn revoke_all_grants(&self) -> Result<u64, WardenError>;

    async fn counts(&self) -> Result<StoreCounts, WardenError>;

    /// `(permission_code, role_code, granted)` for every grant row
    /// whose permission and role are both active. Cache rebuild input.
    async fn grant_matrix(&self) -> Result<Vec<(String, String, bool)>, WardenError>;

    async fn read_setting(&self, key: &str) -> Result<Option<String>, WardenError>;

    /// Last-writer-wins upsert of a settings row.
    async fn write_setting(&self, key: &str, value: &str) -> Result<(), WardenError>;

    async fn delete_setting(&self, key: &str) -> Result<(), WardenError>;
}
