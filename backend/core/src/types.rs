use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Soft-delete state for catalog rows. Rows are never physically
/// deleted once referenced by grants; deactivation is the only
/// destructive operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogState {
    Active,
    Inactive,
}

impl CatalogState {
    pub fn is_active(self) -> bool {
        matches!(self, CatalogState::Active)
    }
}

/// State of an existing grant row. Absence of a row is a separate
/// condition, see [`GrantDecision`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrantState {
    Granted,
    Revoked,
}

/// Outcome of looking up a (role, permission) pair in the grant table.
///
/// `Revoked` is a recorded, explicit denial with an audit trail;
/// `Absent` is an implicit denial with none. Both deny.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantDecision {
    Granted,
    Revoked,
    Absent,
}

/// A named capability (e.g. `view_todo`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Permission {
    pub id: Uuid,
    /// Unique stable identifier; immutable once referenced by grants.
    pub code: String,
    pub name: String,
    pub localized_name: String,
    pub description: String,
    /// Grouping tag for reporting (e.g. `todo`).
    pub category: String,
    pub state: CatalogState,
    pub created_at: i64,
}

/// A named principal class (e.g. `PROJECT_MANAGER`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    /// Unique stable identifier; the primary resolution key stored on
    /// principal records.
    pub code: String,
    pub name: String,
    pub description: String,
    pub state: CatalogState,
    pub created_at: i64,
}

/// Insert payload for [`Permission`]; `id`/`state`/`created_at` are
/// assigned by the store.
#[derive(Debug, Clone)]
pub struct NewPermission {
    pub code: String,
    pub name: String,
    pub localized_name: String,
    pub description: String,
    pub category: String,
}

/// Insert payload for [`Role`].
#[derive(Debug, Clone)]
pub struct NewRole {
    pub code: String,
    pub name: String,
    pub description: String,
}

/// Rows created (not mutated) by a provisioning run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupReport {
    pub permissions_created: u64,
    pub roles_created: u64,
    pub grants_created: u64,
}

/// Per-role slice of a [`VerifyReport`]: granted permission names
/// grouped by category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleSummary {
    pub code: String,
    pub name: String,
    pub permissions_by_category: BTreeMap<String, Vec<String>>,
}

/// Read-only snapshot of the current catalog and grant state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyReport {
    pub permission_count: u64,
    pub role_count: u64,
    pub granted_count: u64,
    pub roles: Vec<RoleSummary>,
}
