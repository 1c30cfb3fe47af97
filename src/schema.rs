use sea_query::Iden;

/// Metadata table - exactly one row describing the timer
#[derive(Iden)]
pub enum Metadata {
    Table,
    Title,
    Description,
    Lang,
}

/// Step table - ordered units of the timer sequence
#[derive(Iden)]
pub enum Step {
    Table,
    Id,
    Title,
    Description,
    Sound,
    DurationSeconds,
    Index,
}

/// Asset table - embedded binary resources
#[derive(Iden)]
pub enum Asset {
    Table,
    Id,
    Name,
    Mime,
    Data,
    Notice,
}
