//! `warden-rbac` — role-based access control for Warden.
//!
//! Provides:
//! - Permission and role catalogs with soft-deactivation
//! - The grant matrix (role ↔ permission relation) and its
//!   denormalized cache mirror
//! - An effective-permission resolver with three-tier fallback role
//!   matching (fail-closed)
//! - An idempotent provisioning engine (seed / reset / verify)
//!
//! All components take an explicit `Arc<dyn RbacStore>` handle; the
//! SQLite implementation is [`SqliteStore`].

pub mod baseline;
pub mod cache;
pub mod catalog;
pub mod grants;
pub mod provision;
pub mod resolver;
pub mod sqlite_store;
pub mod store;

pub use cache::{MatrixCache, MatrixSnapshot, MATRIX_CACHE_KEY};
pub use catalog::Catalog;
pub use grants::GrantManager;
pub use provision::Provisioner;
pub use resolver::Resolver;
pub use sqlite_store::SqliteStore;
pub use store::{RbacStore, StoreCounts};
