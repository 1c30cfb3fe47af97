//! Portable JSON descriptor
//!
//! ```json
//! {
//!   "version": "1",
//!   "metadata": {"title": "...", "description": null, "lang": "en-US"},
//!   "steps": [{"id": 1, "title": "...", "description": null,
//!              "sound": null, "duration_seconds": 30, "index": 0}],
//!   "assets": [{"id": 1, "name": "beep.wav", "mime": "audio/wav",
//!               "path": "beep.wav", "notice": null}]
//! }
//! ```

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{PtimerError, Result};
use crate::model::{self, Asset, AssetKey, Metadata, Ptimer, Step};
use crate::path_guard;

/// An asset as listed in a descriptor: its bytes live in a file next to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetEntry {
    pub id: u32,
    pub name: String,
    pub mime: String,
    /// Relative to the descriptor's directory
    pub path: String,
    pub notice: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    pub version: String,
    pub metadata: Metadata,
    pub steps: Vec<Step>,
    pub assets: Vec<AssetEntry>,
}

impl Descriptor {
    /// Parse descriptor JSON; syntax and schema errors are [`PtimerError::MalformedInput`]
    pub fn parse(json: &str) -> Result<Self> {
        let descriptor: Descriptor = serde_json::from_str(json)?;
        debug!(
            "Parsed descriptor version={} steps={} assets={}",
            descriptor.version,
            descriptor.steps.len(),
            descriptor.assets.len()
        );
        Ok(descriptor)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| PtimerError::malformed(format!("Failed to generate JSON data: {}", e)))
    }

    pub fn validate(&self, check_sound_references: bool) -> Result<()> {
        model::validate(
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

    /// Read every asset file through the path guard and build the decoded model
    ///
    /// Each `path` is checked against `base_dir` before its file is opened,
    /// first lexically and then after symlinks are resolved.
    pub fn load_assets(&self, base_dir: &Path) -> Result<Ptimer> {
        let mut assets = Vec::with_capacity(self.assets.len());
        if self.assets.is_empty() {
            return Ok(Ptimer {
                metadata: self.metadata.clone(),
                steps: self.steps.clone(),
                assets,
            });
        }

        let canonical_base = base_dir.canonicalize().map_err(|e| {
            PtimerError::io(
                format!("Failed to resolve base directory {}", base_dir.display()),
                e,
            )
        })?;

        for entry in &self.assets {
            let reject = || {
                warn!(
                    "Asset (id={}) path '{}' refers outside of {}",
                    entry.id,
                    entry.path,
                    base_dir.display()
                );
            };

            let source =
                path_guard::resolve_within(base_dir, &entry.path).inspect_err(|_| reject())?;

            let source = source.canonicalize().map_err(|e| {
                PtimerError::io(
                    format!(
                        "Failed to read asset file (id={}) at {}",
                        entry.id,
                        source.display()
                    ),
                    e,
                )
            })?;
            if !source.starts_with(&canonical_base) {
                reject();
                return Err(PtimerError::PathTraversal {
                    root: base_dir.to_path_buf(),
                    path: entry.path.clone().into(),
                });
            }

            let data = std::fs::read(&source).map_err(|e| {
                PtimerError::io(
                    format!(
                        "Failed to read asset file (id={}) at {}",
                        entry.id,
                        source.display()
                    ),
                    e,
                )
            })?;
            debug!("Loaded asset (id={}) {} bytes", entry.id, data.len());

            assets.push(Asset {
                id: entry.id,
                name: entry.name.clone(),
                mime: entry.mime.clone(),
                data,
                notice: entry.notice.clone(),
            });
        }

        Ok(Ptimer {
            metadata: self.metadata.clone(),
            steps: self.steps.clone(),
            assets,
        })
    }
}
