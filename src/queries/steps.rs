use sea_query::{Order, Query, SqliteQueryBuilder, Values};

use crate::model;
use crate::schema::Step;

/// SELECT id, title, description, sound, duration_seconds, "index" FROM step ORDER BY "index" ASC
pub fn select_ordered() -> String {
    Query::select()
        .columns([
            Step::Id,
            Step::Title,
            Step::Description,
            Step::Sound,
            Step::DurationSeconds,
            Step::Index,
        ])
        .from(Step::Table)
        .order_by(Step::Index, Order::Asc)
        .to_string(SqliteQueryBuilder)
}

/// INSERT INTO step (id, title, description, sound, duration_seconds, "index")
/// VALUES (?, ?, ?, ?, ?, ?)
pub fn insert(step: &model::Step) -> (String, Values) {
    Query::insert()
        .into_table(Step::Table)
        .columns([
            Step::Id,
            Step::Title,
            Step::Description,
            Step::Sound,
            Step::DurationSeconds,
            Step::Index,
        ])
        .values_panic([
            i64::from(step.id).into(),
            step.title.clone().into(),
            step.description.clone().into(),
            step.sound.map(i64::from).into(),
            step.duration_seconds.map(i64::from).into(),
            step.index.into(),
        ])
        .build(SqliteQueryBuilder)
}
