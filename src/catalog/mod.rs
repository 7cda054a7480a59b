//! Catalog Module
//!
//! The bookmark/folder catalog: record types, a data layer over the libsql
//! connection, ready-to-mount HTTP handlers and routes, and the schema
//! migrations for both relations.
//!
//! Folders form a forest via `parent_id`; deleting a folder orphans its
//! bookmarks and promotes child folders to roots (`ON DELETE SET NULL`).

mod handler;
mod lib;
mod routes;

pub use lib::*;

pub use routes::routes;

/// Returns the migrations for the catalog module.
///
/// These should be run during application startup to ensure the database
/// schema is up to date.
pub fn migrations() -> &'static [(&'static str, &'static str)] {
    &[(
        "catalog_001_schema.sql",
        include_str!("migrations/001_schema.sql"),
    )]
}
