pub mod error;
pub mod types;

pub use error::{EntityKind, WardenError};
pub use types::{
    CatalogState, GrantDecision, GrantState, NewPermission, NewRole, Permission, Role,
    RoleSummary, SetupReport, VerifyReport,
};
