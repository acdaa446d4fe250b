//! Database module: the `schools` table and its storage.
//!
//! Layout:
//! - `models.rs`: row and insert structs
//! - `schema.rs`: DDL per backend (MySQL in production, SQLite for tests)
//! - `storage.rs`: the pooled `SchoolsStorage`

pub mod models;
pub mod schema;
pub mod storage;

pub use models::{NewSchool, School};
pub use storage::SchoolsStorage;
