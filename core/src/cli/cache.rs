use crate::error::{DosePoliceError, Result};
use crate::reconcile::{ReconciliationAnswer, ReconciliationPrompt, ReconciliationRequest};
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Reconciliation answers saved per DVH export
///
/// Each answer lives in `<dir>/<PLAN>_<PATIENT>.json`, so loading the same
/// export again does not prompt a second time.
#[derive(Debug, Clone)]
pub struct MappingCache {
    dir: PathBuf,
}

impl MappingCache {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File an answer for `key` is stored in
    pub fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", name))
    }

    /// Reads the answer stored for `key`, `None` if there is none
    pub fn load(&self, key: &str) -> Result<Option<ReconciliationAnswer>> {
        let path = self.path_for(key);
        if !path.is_file() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)?;
        let answer = serde_json::from_str(&text).map_err(|e| {
            DosePoliceError::Cache(format!("{}: {}", path.display(), e))
        })?;
        debug!("Loaded cached mapping {}", path.display());
        Ok(Some(answer))
    }

    /// Writes the answer for `key`, creating the cache directory if needed
    pub fn store(&self, key: &str, answer: &ReconciliationAnswer) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        fs::write(&path, serde_json::to_string_pretty(answer)?)?;
        info!("Saved mapping to {}", path.display());
        Ok(())
    }
}

/// Prompt that replays a cached answer before asking `inner`
pub struct CachedPrompt<'a, P> {
    cache: &'a MappingCache,
    key: String,
    inner: P,
}

impl<'a, P: ReconciliationPrompt> CachedPrompt<'a, P> {
    pub fn new(cache: &'a MappingCache, key: String, inner: P) -> Self {
        Self { cache, key, inner }
    }
}

impl<'a, P: ReconciliationPrompt> ReconciliationPrompt for CachedPrompt<'a, P> {
    fn resolve(&mut self, request: &ReconciliationRequest) -> Result<Option<ReconciliationAnswer>> {
        match self.cache.load(&self.key) {
            Ok(Some(answer)) => {
                info!("Using cached mapping for {}", self.key);
                return Ok(Some(answer));
            }
            Ok(None) => {}
            Err(e) => warn!("Ignoring unreadable cache entry: {}", e),
        }

        let answer = self.inner.resolve(request)?;
        if let Some(answer) = &answer {
            if let Err(e) = self.cache.store(&self.key, answer) {
                warn!("Could not save mapping: {}", e);
            }
        }
        Ok(answer)
    }
}
