//! SQL builders for the container tables (SQLite dialect)
//!
//! Reads and DDL return complete statements for `sqlx::query(&sql)`. Inserts
//! return the statement with `?` placeholders plus its values, to be bound
//! with [`crate::db::execute_built`].

pub mod assets;
pub mod ddl;
pub mod metadata;
pub mod steps;
