use sea_query::{Value, Values};
use sqlx::query::Query;
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
};
use sqlx::{Executor, Sqlite};
use std::path::Path;

use crate::constants::CONTAINER_PAGE_SIZE;
use crate::error::{PtimerError, Result};
use crate::queries::ddl;

/// Open a container for writing, creating the file if needed
/// A container is a single file, so the rollback journal is used instead of WAL
pub async fn open_database_connection(db_path: &Path) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Delete)
        .page_size(CONTAINER_PAGE_SIZE)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Open a container read-only
/// Fails if the file does not exist instead of creating an empty database
pub async fn open_readonly_connection(db_path: &Path) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .read_only(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Create the container tables on an empty database
/// A database that already holds any table is refused
pub async fn init_database_schema(pool: &SqlitePool) -> Result<()> {
    let existing: i64 = sqlx::query_scalar(&ddl::count_tables())
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        return Err(PtimerError::constraint(format!(
            "Container schema can only be applied to an empty file ({} tables found)",
            existing
        )));
    }

    sqlx::query(&ddl::create_metadata_table())
        .execute(pool)
        .await?;
    sqlx::query(&ddl::create_step_table()).execute(pool).await?;
    sqlx::query(&ddl::create_asset_table()).execute(pool).await?;

    Ok(())
}

/// Bind the values produced by a sea-query `build` call onto an sqlx query
pub fn bind_values<'q>(
    sql: &'q str,
    values: &'q Values,
) -> Result<Query<'q, Sqlite, SqliteArguments<'q>>> {
    let mut query = sqlx::query(sql);
    for value in values.0.iter() {
        query = match value {
            Value::Int(v) => query.bind(*v),
            Value::BigInt(v) => query.bind(*v),
            Value::Unsigned(v) => query.bind(*v),
            Value::String(v) => query.bind(v.as_ref().map(|s| s.as_str())),
            Value::Bytes(v) => query.bind(v.as_ref().map(|b| b.as_slice())),
            other => {
                return Err(PtimerError::Database(sqlx::Error::Encode(
                    format!("Unsupported bind value {:?}", other).into(),
                )))
            }
        };
    }
    Ok(query)
}

/// Execute a built statement with its bound values
pub async fn execute_built<'e, E>(executor: E, built: &(String, Values)) -> Result<u64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let (sql, values) = built;
    let result = bind_values(sql, values)?.execute(executor).await?;
    Ok(result.rows_affected())
}
