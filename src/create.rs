//! Importer: JSON descriptor + asset files -> container file
//!
//! The container is written into a temporary file next to the target and
//! published with a rename once the transaction has committed and the
//! connection is closed. A failed import leaves the target path as it was.

use log::{debug, info};
use sqlx::sqlite::SqlitePool;
use std::path::Path;

use crate::config::CreateOptions;
use crate::db;
use crate::descriptor::Descriptor;
use crate::error::{PtimerError, Result};
use crate::model::Ptimer;
use crate::queries::{assets, metadata, steps};

/// Build a container at `out_path` from a descriptor whose asset paths are relative to `base_dir`
pub async fn create_container(
    descriptor: &Descriptor,
    base_dir: &Path,
    out_path: &Path,
    options: &CreateOptions,
) -> Result<()> {
    ensure_target_is_free(out_path, options)?;
    descriptor.validate(options.check_sound_references)?;

    let timer = descriptor.load_assets(base_dir)?;
    write_container(&timer, out_path, options).await
}

/// Write a decoded model into a new container file at `out_path`
pub async fn write_container(timer: &Ptimer, out_path: &Path, options: &CreateOptions) -> Result<()> {
    ensure_target_is_free(out_path, options)?;
    timer.validate(options.check_sound_references)?;

    let staging = staging_file(out_path)?;
    debug!("Staging container at {}", staging.display());

    let pool = db::open_database_connection(&staging).await?;
    let result = populate(&pool, timer).await;
    pool.close().await;
    result?;

    let published = if options.overwrite {
        staging.persist(out_path)
    } else {
        staging.persist_noclobber(out_path)
    };
    published.map_err(|e| {
        PtimerError::io(
            format!("Failed to publish container to {}", out_path.display()),
            e.error,
        )
    })?;

    info!(
        "Created {} ({} steps, {} assets)",
        out_path.display(),
        timer.steps.len(),
        timer.assets.len()
    );
    Ok(())
}

fn ensure_target_is_free(out_path: &Path, options: &CreateOptions) -> Result<()> {
    if out_path.is_dir() || (out_path.exists() && !options.overwrite) {
        return Err(PtimerError::io(
            format!("Cannot create container at {}", out_path.display()),
            std::io::Error::new(std::io::ErrorKind::AlreadyExists, "file exists"),
        ));
    }
    Ok(())
}

/// Empty temporary file in the target's directory, removed on drop unless persisted
fn staging_file(out_path: &Path) -> Result<tempfile::TempPath> {
    let parent = match out_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let file = tempfile::Builder::new()
        .prefix(".ptimer-")
        .suffix(".tmp")
        .tempfile_in(parent)
        .map_err(|e| {
            PtimerError::io(
                format!("Failed to create temporary file in {}", parent.display()),
                e,
            )
        })?;
    Ok(file.into_temp_path())
}

/// Create the schema and insert every row in one transaction
async fn populate(pool: &SqlitePool, timer: &Ptimer) -> Result<()> {
    db::init_database_schema(pool).await?;

    let mut tx = pool.begin().await?;

    let existing: i64 = sqlx::query_scalar(&metadata::count())
        .fetch_one(&mut *tx)
        .await?;
    if existing > 0 {
        return Err(PtimerError::constraint("Container already has a metadata record"));
    }
    db::execute_built(&mut *tx, &metadata::insert(&timer.metadata))
        .await
        .map_err(|e| with_context(e, "Failed to write metadata"))?;

    for step in &timer.steps {
        db::execute_built(&mut *tx, &steps::insert(step))
            .await
            .map_err(|e| with_context(e, &format!("Failed to write step (id={})", step.id)))?;
        debug!("Inserted step (id={}, index={})", step.id, step.index);
    }

    for asset in &timer.assets {
        db::execute_built(&mut *tx, &assets::insert(asset))
            .await
            .map_err(|e| with_context(e, &format!("Failed to write asset (id={})", asset.id)))?;
        debug!("Inserted asset (id={}) {} bytes", asset.id, asset.data.len());
    }

    tx.commit().await?;
    Ok(())
}

fn with_context(err: PtimerError, context: &str) -> PtimerError {
    match err {
        PtimerError::ConstraintViolation(msg) => {
            PtimerError::ConstraintViolation(format!("{}: {}", context, msg))
        }
        other => other,
    }
}
