//! Decoded in-memory model of a container
//!
//! [`Metadata`] and [`Step`] serialize to the same JSON shape the descriptor
//! uses. [`Asset`] carries its bytes; the descriptor form replaces them with a
//! path (see [`crate::descriptor::AssetEntry`]).

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{PtimerError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub title: String,
    pub description: Option<String>,
    pub lang: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub id: u32,
    pub title: String,
    pub description: Option<String>,
    /// Asset id of a sound played when the step becomes active
    pub sound: Option<u32>,
    /// `None` means the step waits for a manual advance
    pub duration_seconds: Option<u32>,
    /// Playback order key, unique within a container, not necessarily contiguous
    pub index: i64,
}

impl Step {
    pub fn is_timed(&self) -> bool {
        self.duration_seconds.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub id: u32,
    pub name: String,
    pub mime: String,
    pub data: Vec<u8>,
    pub notice: Option<String>,
}

/// A decoded container: metadata, steps sorted by `index`, and assets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ptimer {
    pub metadata: Metadata,
    pub steps: Vec<Step>,
    pub assets: Vec<Asset>,
}

impl Ptimer {
    pub fn asset(&self, id: u32) -> Option<&Asset> {
        self.assets.iter().find(|asset| asset.id == id)
    }

    /// Sound asset of a step, if it has one and it resolves
    pub fn sound_of(&self, step: &Step) -> Option<&Asset> {
        step.sound.and_then(|id| self.asset(id))
    }

    pub fn validate(&self, check_sound_references: bool) -> Result<()> {
        validate(
            &self.metadata,
            &self.steps,
            self.assets.iter().map(|a| AssetKey {
                id: a.id,
                name: &a.name,
                mime: &a.mime,
            }),
            check_sound_references,
        )
    }
}

/// The fields of an asset that take part in invariant checks
#[derive(Debug, Clone, Copy)]
pub struct AssetKey<'a> {
    pub id: u32,
    pub name: &'a str,
    pub mime: &'a str,
}

/// Check the write-time invariants of a container
///
/// Shared by the descriptor (before any asset file is read) and the decoded
/// model (before it is written).
pub fn validate<'a>(
    metadata: &Metadata,
    steps: &[Step],
    assets: impl IntoIterator<Item = AssetKey<'a>>,
    check_sound_references: bool,
) -> Result<()> {
    if metadata.title.is_empty() {
        return Err(PtimerError::constraint("metadata.title must not be empty"));
    }
    if metadata.lang.is_empty() {
        return Err(PtimerError::constraint("metadata.lang must not be empty"));
    }

    let mut asset_ids = HashSet::new();
    let mut asset_names = HashSet::new();
    for asset in assets {
        if asset.name.is_empty() {
            return Err(PtimerError::constraint(format!(
                "Asset (id={}) has an empty name",
                asset.id
            )));
        }
        if asset.mime.is_empty() {
            return Err(PtimerError::constraint(format!(
                "Asset (id={}) has an empty mime type",
                asset.id
            )));
        }
        if !asset_ids.insert(asset.id) {
            return Err(PtimerError::constraint(format!(
                "Duplicate asset id {}",
                asset.id
            )));
        }
        if !asset_names.insert(asset.name) {
            return Err(PtimerError::constraint(format!(
                "Duplicate asset name '{}' (id={})",
                asset.name, asset.id
            )));
        }
    }

    let mut step_ids = HashSet::new();
    let mut step_indices = HashSet::new();
    for step in steps {
        if step.title.is_empty() {
            return Err(PtimerError::constraint(format!(
                "Step (id={}) has an empty title",
                step.id
            )));
        }
        if !step_ids.insert(step.id) {
            return Err(PtimerError::constraint(format!("Duplicate step id {}", step.id)));
        }
        if !step_indices.insert(step.index) {
            return Err(PtimerError::constraint(format!(
                "Duplicate step index {} (step id={})",
                step.index, step.id
            )));
        }
        if check_sound_references {
            if let Some(sound) = step.sound {
                if !asset_ids.contains(&sound) {
                    return Err(PtimerError::constraint(format!(
                        "Step (id={}) refers to missing sound asset {}",
                        step.id, sound
                    )));
                }
            }
        }
    }

    Ok(())
}
