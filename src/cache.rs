use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::PathBuf;

use crate::compile::CompiledOutput;
use crate::context::OutputMode;

#[derive(Serialize, Deserialize)]
pub struct CacheEntry {
    pub hash: String,
    pub output: CompiledOutput,
}

/// On-disk cache of emitted text, keyed by input path and content hash.
/// A duplicate change notification for an unchanged file hits the cache
/// and hands back byte-identical output, so re-notification is harmless.
pub struct OutputCache {
    cache_dir: PathBuf,
}

impl OutputCache {
    pub fn new(cache_dir: PathBuf) -> Self {
        if !cache_dir.exists() {
            fs::create_dir_all(&cache_dir).ok();
        }
        Self { cache_dir }
    }

    /// The output mode and the consulted style documents both change the
    /// emitted text, so they are part of the hash alongside the source.
    /// `style_digest` is the run's digest of the style directory; an edit
    /// to any style file misses every entry written before it.
    pub fn compute_hash(source: &str, mode: OutputMode, style_digest: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(source.as_bytes());
        hasher.update(match mode {
            OutputMode::Declarative => b"declarative".as_slice(),
            OutputMode::Imperative => b"imperative".as_slice(),
        });
        hasher.update(style_digest.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn entry_path(&self, file_path: &str) -> PathBuf {
        // Stable file name per input path.
        let safe_name = file_path
            .replace("/", "_")
            .replace("\\", "_")
            .replace(":", "_");
        self.cache_dir.join(format!("{}.json", safe_name))
    }

    pub fn get(
        &self,
        file_path: &str,
        source: &str,
        mode: OutputMode,
        style_digest: &str,
    ) -> Option<CompiledOutput> {
        let entry_path = self.entry_path(file_path);
        if !entry_path.exists() {
            return None;
        }

        let data = match fs::read_to_string(&entry_path) {
            Ok(d) => d,
            Err(_) => return None,
        };

        let entry: CacheEntry = match serde_json::from_str(&data) {
            Ok(e) => e,
            Err(e) => {
                log::warn!("cache entry for {} is corrupt, discarding: {}", file_path, e);
                fs::remove_file(entry_path).ok();
                return None;
            }
        };

        if entry.hash == Self::compute_hash(source, mode, style_digest) {
            Some(entry.output)
        } else {
            None
        }
    }

    pub fn set(
        &self,
        file_path: &str,
        source: &str,
        mode: OutputMode,
        style_digest: &str,
        output: &CompiledOutput,
    ) {
        let entry = CacheEntry {
            hash: Self::compute_hash(source, mode, style_digest),
            output: output.clone(),
        };

        if let Ok(data) = serde_json::to_string(&entry) {
            fs::write(self.entry_path(file_path), data).ok();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(text: &str) -> CompiledOutput {
        CompiledOutput {
            units: Vec::new(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_round_trip_and_mode_separation() {
        let dir = tempfile::tempdir().unwrap();
        let cache = OutputCache::new(dir.path().to_path_buf());

        cache.set("a.json", "{}", OutputMode::Declarative, "", &output("Text()"));
        let hit = cache.get("a.json", "{}", OutputMode::Declarative, "").unwrap();
        assert_eq!(hit.text, "Text()");

        // Same source, other mode: different hash, so a miss.
        assert!(cache.get("a.json", "{}", OutputMode::Imperative, "").is_none());
    }

    #[test]
    fn test_stale_source_misses() {
        let dir = tempfile::tempdir().unwrap();
        let cache = OutputCache::new(dir.path().to_path_buf());
        cache.set("a.json", "{}", OutputMode::Declarative, "", &output("Text()"));
        assert!(cache
            .get("a.json", "{\"x\":1}", OutputMode::Declarative, "")
            .is_none());
    }

    #[test]
    fn test_changed_style_digest_misses() {
        let dir = tempfile::tempdir().unwrap();
        let cache = OutputCache::new(dir.path().to_path_buf());
        cache.set("a.json", "{}", OutputMode::Declarative, "d1", &output("Text()"));
        assert!(cache.get("a.json", "{}", OutputMode::Declarative, "d2").is_none());
        assert!(cache.get("a.json", "{}", OutputMode::Declarative, "d1").is_some());
    }

    #[test]
    fn test_corrupt_entry_is_invalidated() {
        let dir = tempfile::tempdir().unwrap();
        let cache = OutputCache::new(dir.path().to_path_buf());
        cache.set("a.json", "{}", OutputMode::Declarative, "", &output("Text()"));
        fs::write(cache.entry_path("a.json"), "not json").unwrap();
        assert!(cache.get("a.json", "{}", OutputMode::Declarative, "").is_none());
        assert!(!cache.entry_path("a.json").exists());
    }
}
