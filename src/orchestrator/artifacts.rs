use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::plan::plan_model::ActionPlan;
use crate::tree::tree_model::TreeSnapshot;

/// Raw oracle reply plus what was made of it, saved for humans.
#[derive(Debug, Serialize)]
struct MappingArtifact<'a> {
    form_index: usize,
    raw_reply: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    plan: Option<&'a ActionPlan>,
}

/// Writes per-form debugging documents under one directory:
/// `form-<n>-snapshot.json` and `form-<n>-mapping.json`.
///
/// Failures are logged and otherwise ignored; artifacts never affect a fill.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    dir: Option<PathBuf>,
}

impl ArtifactWriter {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref().to_path_buf();
        if let Err(e) = fs::create_dir_all(&dir) {
            warn!(dir = %dir.display(), error = %e, "could not create artifacts directory");
            return Self { dir: None };
        }
        Self { dir: Some(dir) }
    }

    pub fn disabled() -> Self {
        Self { dir: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.dir.is_some()
    }

    pub fn snapshot_path(&self, form_index: usize) -> Option<PathBuf> {
        self.dir
            .as_ref()
            .map(|d| d.join(format!("form-{}-snapshot.json", form_index + 1)))
    }

    pub fn mapping_path(&self, form_index: usize) -> Option<PathBuf> {
        self.dir
            .as_ref()
            .map(|d| d.join(format!("form-{}-mapping.json", form_index + 1)))
    }

    pub fn write_snapshot(&self, form_index: usize, snapshot: &TreeSnapshot) {
        if let Some(path) = self.snapshot_path(form_index) {
            write_json(&path, snapshot);
        }
    }

    pub fn write_mapping(&self, form_index: usize, raw_reply: &str, plan: Option<&ActionPlan>) {
        if let Some(path) = self.mapping_path(form_index) {
            let artifact = MappingArtifact {
                form_index,
                raw_reply,
                plan,
            };
            write_json(&path, &artifact);
        }
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) {
    let json = match serde_json::to_string_pretty(value) {
        Ok(j) => j,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to serialize artifact");
            return;
        }
    };
    match fs::write(path, json) {
        Ok(()) => debug!(path = %path.display(), "artifact written"),
        Err(e) => warn!(path = %path.display(), error = %e, "failed to write artifact"),
    }
}
