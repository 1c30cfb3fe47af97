use sea_query::{Alias, Asterisk, ColumnDef, Expr, Func, Query, SqliteQueryBuilder, Table};

use crate::schema::{Asset, Metadata, Step};

/// CREATE TABLE metadata (
///     title TEXT NOT NULL,
///     description TEXT,
///     lang TEXT NOT NULL
/// )
pub fn create_metadata_table() -> String {
    Table::create()
        .table(Metadata::Table)
        .col(ColumnDef::new(Metadata::Title).text().not_null())
        .col(ColumnDef::new(Metadata::Description).text())
        .col(ColumnDef::new(Metadata::Lang).text().not_null())
        .to_string(SqliteQueryBuilder)
}

/// CREATE TABLE step (
///     id INTEGER PRIMARY KEY,
///     title TEXT NOT NULL,
///     description TEXT,
///     sound INTEGER,
///     duration_seconds INTEGER,
///     "index" INTEGER NOT NULL UNIQUE
/// )
pub fn create_step_table() -> String {
    Table::create()
        .table(Step::Table)
        .col(ColumnDef::new(Step::Id).integer().primary_key())
        .col(ColumnDef::new(Step::Title).text().not_null())
        .col(ColumnDef::new(Step::Description).text())
        .col(ColumnDef::new(Step::Sound).integer())
        .col(ColumnDef::new(Step::DurationSeconds).integer())
        .col(
            ColumnDef::new(Step::Index)
                .integer()
                .not_null()
                .unique_key(),
        )
        .to_string(SqliteQueryBuilder)
}

/// CREATE TABLE asset (
///     id INTEGER PRIMARY KEY,
///     name TEXT NOT NULL,
///     mime TEXT NOT NULL,
///     data BLOB NOT NULL,
///     notice TEXT
/// )
pub fn create_asset_table() -> String {
    Table::create()
        .table(Asset::Table)
        .col(ColumnDef::new(Asset::Id).integer().primary_key())
        .col(ColumnDef::new(Asset::Name).text().not_null())
        .col(ColumnDef::new(Asset::Mime).text().not_null())
        .col(ColumnDef::new(Asset::Data).blob().not_null())
        .col(ColumnDef::new(Asset::Notice).text())
        .to_string(SqliteQueryBuilder)
}

/// SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
pub fn count_tables() -> String {
    Query::select()
        .expr(Func::count(Expr::col(Asterisk)))
        .from(Alias::new("sqlite_master"))
        .and_where(Expr::col(Alias::new("type")).eq("table"))
        .to_string(SqliteQueryBuilder)
}
