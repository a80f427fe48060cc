use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use walkdir::WalkDir;

use crate::error::Warning;
use crate::tree::PropertyMap;

/// Which rendering paradigm the emitted source targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutputMode {
    /// Output constructs a UI tree anew from current data.
    Declarative,
    /// Output mutates fields of already-live view instances on data change.
    Imperative,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileOptions {
    pub mode: OutputMode,
    /// Ordered style search path. The first directory that exists wins and
    /// is used for every lookup of the run.
    #[serde(default)]
    pub style_roots: Vec<PathBuf>,
    /// Enables the on-disk output cache when set.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

impl CompileOptions {
    pub fn new(mode: OutputMode) -> CompileOptions {
        CompileOptions {
            mode,
            style_roots: Vec::new(),
            cache_dir: None,
        }
    }

    pub fn with_style_root(mut self, root: impl Into<PathBuf>) -> CompileOptions {
        self.style_roots.push(root.into());
        self
    }
}

/// Run-scoped compilation state, threaded explicitly through every phase.
/// Files compiling in parallel share one context; everything mutable behind
/// it is a Mutex, everything else is read-only for the whole run.
pub struct CompileContext {
    options: CompileOptions,
    style_dir: OnceLock<Option<PathBuf>>,
    style_digest: OnceLock<String>,
    style_cache: Mutex<HashMap<String, Option<Arc<PropertyMap>>>>,
    warnings: Mutex<Vec<Warning>>,
}

impl CompileContext {
    pub fn new(options: CompileOptions) -> CompileContext {
        CompileContext {
            options,
            style_dir: OnceLock::new(),
            style_digest: OnceLock::new(),
            style_cache: Mutex::new(HashMap::new()),
            warnings: Mutex::new(Vec::new()),
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.options.mode
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// First existing directory on the search path, chosen once per run.
    /// A fully missing search path is warned about exactly once.
    pub fn style_dir(&self) -> Option<&Path> {
        self.style_dir
            .get_or_init(|| {
                let found = self
                    .options
                    .style_roots
                    .iter()
                    .find(|root| root.is_dir())
                    .cloned();
                if found.is_none() && !self.options.style_roots.is_empty() {
                    self.warn(Warning::MissingStyleDirectory);
                }
                found
            })
            .as_deref()
    }

    /// Content digest of the chosen style directory, computed once per run.
    /// Emitted text depends on the style documents a layout pulls in, so
    /// the output cache folds this into its key; editing any style file
    /// invalidates entries for otherwise unchanged layout files.
    pub fn style_digest(&self) -> &str {
        self.style_digest.get_or_init(|| {
            let Some(dir) = self.style_dir() else {
                return String::new();
            };
            let mut files: Vec<PathBuf> = WalkDir::new(dir)
                .into_iter()
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.into_path())
                .filter(|path| {
                    path.is_file() && path.extension().map_or(false, |ext| ext == "json")
                })
                .collect();
            files.sort();

            let mut hasher = Sha256::new();
            for file in &files {
                hasher.update(file.to_string_lossy().as_bytes());
                if let Ok(content) = fs::read(file) {
                    hasher.update(&content);
                }
            }
            format!("{:x}", hasher.finalize())
        })
    }

    /// Memoized style lookup. `populate` runs under the cache lock, so a
    /// style file is parsed at most once per run even when multiple files
    /// compile concurrently. Negative results are cached too.
    pub fn style_cached(
        &self,
        name: &str,
        populate: impl FnOnce() -> Option<PropertyMap>,
    ) -> Option<Arc<PropertyMap>> {
        let mut cache = self.style_cache.lock().unwrap();
        cache
            .entry(name.to_string())
            .or_insert_with(|| populate().map(Arc::new))
            .clone()
    }

    pub fn warn(&self, warning: Warning) {
        log::warn!("{}", warning);
        self.warnings.lock().unwrap().push(warning);
    }

    /// Everything collected so far. The enclosing CLI aggregates these and
    /// picks the exit code.
    pub fn warnings(&self) -> Vec<Warning> {
        self.warnings.lock().unwrap().clone()
    }
}
