use sea_query::{Asterisk, Expr, Func, Query, SqliteQueryBuilder, Values};

use crate::model;
use crate::schema::Metadata;

/// SELECT title, description, lang FROM metadata
pub fn select_all() -> String {
    Query::select()
        .columns([Metadata::Title, Metadata::Description, Metadata::Lang])
        .from(Metadata::Table)
        .to_string(SqliteQueryBuilder)
}

/// INSERT INTO metadata (title, description, lang) VALUES (?, ?, ?)
pub fn insert(metadata: &model::Metadata) -> (String, Values) {
    Query::insert()
        .into_table(Metadata::Table)
        .columns([Metadata::Title, Metadata::Description, Metadata::Lang])
        .values_panic([
            metadata.title.clone().into(),
            metadata.description.clone().into(),
            metadata.lang.clone().into(),
        ])
        .build(SqliteQueryBuilder)
}

/// SELECT COUNT(*) FROM metadata
pub fn count() -> String {
    Query::select()
        .expr(Func::count(Expr::col(Asterisk)))
        .from(Metadata::Table)
        .to_string(SqliteQueryBuilder)
}
