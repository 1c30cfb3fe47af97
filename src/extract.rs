//! Container reader and exporter
//!
//! [`read_container`] decodes a container into the in-memory model.
//! [`extract_container`] writes that model back out as a descriptor plus one
//! file per asset, staged in a temporary directory and renamed into place.

use log::{debug, info, warn};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::config::ExtractOptions;
use crate::constants::FORMAT_VERSION;
use crate::db;
use crate::descriptor::{AssetEntry, Descriptor};
use crate::error::{PtimerError, Result};
use crate::model::{Asset, Metadata, Ptimer, Step};
use crate::path_guard;
use crate::queries::{assets, metadata, steps};

/// Decode a container file into the in-memory model
pub async fn read_container(db_path: &Path) -> Result<Ptimer> {
    let pool = db::open_readonly_connection(db_path).await?;
    let result = read_all(&pool).await;
    pool.close().await;
    result
}

async fn read_all(pool: &SqlitePool) -> Result<Ptimer> {
    let metadata = retrieve_metadata(pool).await?;
    let steps = retrieve_steps(pool).await?;
    let assets = retrieve_assets(pool).await?;
    debug!(
        "Read container '{}' ({} steps, {} assets)",
        metadata.title,
        steps.len(),
        assets.len()
    );

    Ok(Ptimer {
        metadata,
        steps,
        assets,
    })
}

async fn retrieve_metadata(pool: &SqlitePool) -> Result<Metadata> {
    let rows = sqlx::query(&metadata::select_all()).fetch_all(pool).await?;

    match rows.as_slice() {
        [] => Err(PtimerError::MissingRecord(
            "No metadata record found".to_string(),
        )),
        [row] => Ok(Metadata {
            title: row.try_get("title").map_err(decode_error("metadata"))?,
            description: row.try_get("description").map_err(decode_error("metadata"))?,
            lang: row.try_get("lang").map_err(decode_error("metadata"))?,
        }),
        _ => Err(PtimerError::invalid_record(format!(
            "Container holds {} metadata records, expected exactly one",
            rows.len()
        ))),
    }
}

async fn retrieve_steps(pool: &SqlitePool) -> Result<Vec<Step>> {
    let rows = sqlx::query(&steps::select_ordered()).fetch_all(pool).await?;
    rows.iter().map(decode_step).collect()
}

fn decode_step(row: &SqliteRow) -> Result<Step> {
    let id: i64 = row.try_get("id").map_err(decode_error("step"))?;
    let context = format!("step (id={})", id);

    Ok(Step {
        id: to_u32(id, &context, "id")?,
        title: row.try_get("title").map_err(decode_error(&context))?,
        description: row.try_get("description").map_err(decode_error(&context))?,
        sound: optional_u32(row, "sound", &context)?,
        duration_seconds: optional_u32(row, "duration_seconds", &context)?,
        index: row.try_get("index").map_err(decode_error(&context))?,
    })
}

async fn retrieve_assets(pool: &SqlitePool) -> Result<Vec<Asset>> {
    let rows = sqlx::query(&assets::select_all()).fetch_all(pool).await?;
    rows.iter().map(decode_asset).collect()
}

fn decode_asset(row: &SqliteRow) -> Result<Asset> {
    let id: i64 = row.try_get("id").map_err(decode_error("asset"))?;
    let context = format!("asset (id={})", id);

    Ok(Asset {
        id: to_u32(id, &context, "id")?,
        name: row.try_get("name").map_err(decode_error(&context))?,
        mime: row.try_get("mime").map_err(decode_error(&context))?,
        data: row.try_get("data").map_err(decode_error(&context))?,
        notice: row.try_get("notice").map_err(decode_error(&context))?,
    })
}

fn decode_error(context: &str) -> impl Fn(sqlx::Error) -> PtimerError + '_ {
    move |e| PtimerError::invalid_record(format!("Failed to decode {}: {}", context, e))
}

fn to_u32(value: i64, context: &str, column: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| {
        PtimerError::invalid_record(format!("{} has out-of-range {} {}", context, column, value))
    })
}

fn optional_u32(row: &SqliteRow, column: &str, context: &str) -> Result<Option<u32>> {
    let value: Option<i64> = row.try_get(column).map_err(decode_error(context))?;
    value.map(|v| to_u32(v, context, column)).transpose()
}

/// Extract a container into `out_dir` as a descriptor plus asset files
///
/// `out_dir` must not exist or be an empty directory, unless `options.clean`
/// is set, in which case it is removed first. Returns the written descriptor.
pub async fn extract_container(
    db_path: &Path,
    out_dir: &Path,
    options: &ExtractOptions,
) -> Result<Descriptor> {
    prepare_out_dir(out_dir, options.clean)?;

    let timer = read_container(db_path).await?;
    let descriptor = save_extracted(&timer, out_dir, &options.descriptor_file_name)?;

    info!(
        "Extracted {} into {} ({} steps, {} assets)",
        db_path.display(),
        out_dir.display(),
        descriptor.steps.len(),
        descriptor.assets.len()
    );
    Ok(descriptor)
}

/// Write a decoded model into `out_dir` through a staging directory
pub fn save_extracted(timer: &Ptimer, out_dir: &Path, descriptor_file_name: &str) -> Result<Descriptor> {
    let parent = match out_dir.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let staging = tempfile::Builder::new()
        .prefix(".ptimer-extract-")
        .tempdir_in(parent)
        .map_err(|e| {
            PtimerError::io(
                format!("Failed to create staging directory in {}", parent.display()),
                e,
            )
        })?;
    debug!("Extract under {}", staging.path().display());

    let descriptor = write_tree(timer, staging.path(), descriptor_file_name)?;

    if out_dir.exists() {
        std::fs::remove_dir(out_dir).map_err(|e| {
            PtimerError::io(
                format!("Failed to replace output directory {}", out_dir.display()),
                e,
            )
        })?;
    }
    std::fs::rename(staging.path(), out_dir).map_err(|e| {
        PtimerError::io(
            format!("Failed to move extracted files to {}", out_dir.display()),
            e,
        )
    })?;

    Ok(descriptor)
}

fn prepare_out_dir(out_dir: &Path, clean: bool) -> Result<()> {
    if !out_dir.exists() {
        return Ok(());
    }

    if clean {
        debug!("Removing {} before extracting", out_dir.display());
        return std::fs::remove_dir_all(out_dir).map_err(|e| {
            PtimerError::io(format!("Failed to clean {}", out_dir.display()), e)
        });
    }

    let is_empty_dir = out_dir.is_dir()
        && std::fs::read_dir(out_dir)
            .map_err(|e| PtimerError::io(format!("Unable to open {}", out_dir.display()), e))?
            .next()
            .is_none();
    if is_empty_dir {
        return Ok(());
    }

    Err(PtimerError::io(
        format!("Cannot extract into {}", out_dir.display()),
        std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "file or non-empty directory exists",
        ),
    ))
}

/// Write asset files and the descriptor under `root`
fn write_tree(timer: &Ptimer, root: &Path, descriptor_file_name: &str) -> Result<Descriptor> {
    let descriptor_path = path_guard::resolve_within(root, descriptor_file_name)?;
    let mut targets: HashSet<PathBuf> = HashSet::new();
    targets.insert(descriptor_path.clone());

    let mut entries = Vec::with_capacity(timer.assets.len());
    for asset in &timer.assets {
        let target = path_guard::resolve_within(root, &asset.name).inspect_err(|_| {
            warn!(
                "Asset (id={}) contains illegal parent traversal: {}",
                asset.id, asset.name
            );
        })?;

        if !targets.insert(target.clone()) {
            return Err(PtimerError::constraint(format!(
                "Asset (id={}) name '{}' collides with another extracted file",
                asset.id, asset.name
            )));
        }

        if let Some(dir) = target.parent() {
            std::fs::create_dir_all(dir).map_err(|e| {
                PtimerError::io(
                    format!("Failed to create directory for asset (id={})", asset.id),
                    e,
                )
            })?;
        }
        std::fs::write(&target, &asset.data).map_err(|e| {
            PtimerError::io(format!("Failed to write asset (id={})", asset.id), e)
        })?;
        debug!("Wrote asset (id={}) to {}", asset.id, target.display());

        entries.push(AssetEntry {
            id: asset.id,
            name: asset.name.clone(),
            mime: asset.mime.clone(),
            path: path_guard::relative_path(root, &target)?,
            notice: asset.notice.clone(),
        });
    }

    let descriptor = Descriptor {
        version: FORMAT_VERSION.to_string(),
        metadata: timer.metadata.clone(),
        steps: timer.steps.clone(),
        assets: entries,
    };

    std::fs::write(&descriptor_path, descriptor.to_json()?)
        .map_err(|e| PtimerError::io("Failed to write JSON file", e))?;

    Ok(descriptor)
}
