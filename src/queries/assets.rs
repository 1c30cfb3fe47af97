use sea_query::{Order, Query, SqliteQueryBuilder, Values};

use crate::model;
use crate::schema::Asset;

/// SELECT id, name, mime, data, notice FROM asset ORDER BY id ASC
pub fn select_all() -> String {
    Query::select()
        .columns([
            Asset::Id,
            Asset::Name,
            Asset::Mime,
            Asset::Data,
            Asset::Notice,
        ])
        .from(Asset::Table)
        .order_by(Asset::Id, Order::Asc)
        .to_string(SqliteQueryBuilder)
}

/// INSERT INTO asset (id, name, mime, data, notice) VALUES (?, ?, ?, ?, ?)
pub fn insert(asset: &model::Asset) -> (String, Values) {
    Query::insert()
        .into_table(Asset::Table)
        .columns([
            Asset::Id,
            Asset::Name,
            Asset::Mime,
            Asset::Data,
            Asset::Notice,
        ])
        .values_panic([
            i64::from(asset.id).into(),
            asset.name.clone().into(),
            asset.mime.clone().into(),
            asset.data.clone().into(),
            asset.notice.clone().into(),
        ])
        .build(SqliteQueryBuilder)
}
