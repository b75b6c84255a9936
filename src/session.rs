use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use log::debug;

use crate::data::filter::{apply_filter, AccidentFilter};
use crate::data::loader::{load_file, LoadError};
use crate::data::model::Dataset;

// ---------------------------------------------------------------------------
// Dataset cache
// ---------------------------------------------------------------------------

/// On-disk identity of a source: length plus modification time.  Either
/// changing means the cached dataset no longer represents the file.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SourceSignature {
    len: u64,
    modified: Option<SystemTime>,
}

fn signature_of(path: &Path) -> Result<SourceSignature, LoadError> {
    let meta = std::fs::metadata(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(SourceSignature {
        len: meta.len(),
        modified: meta.modified().ok(),
    })
}

/// Cache of loaded datasets keyed by canonical source path.
///
/// A hit requires the stored signature to match the file's current one;
/// any mismatch reloads deterministically.  Entries never expire on their
/// own, only through [`DatasetCache::invalidate`] / [`DatasetCache::clear`]
/// or a signature change.
#[derive(Debug, Default)]
pub struct DatasetCache {
    entries: HashMap<PathBuf, (SourceSignature, Arc<Dataset>)>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a source through the cache, sharing the parsed dataset across
    /// callers until the file changes on disk.
    pub fn load(&mut self, path: &Path) -> Result<Arc<Dataset>, LoadError> {
        let canonical = path.canonicalize().map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let signature = signature_of(&canonical)?;

        if let Some((cached, dataset)) = self.entries.get(&canonical) {
            if *cached == signature {
                debug!("dataset cache hit for {}", canonical.display());
                return Ok(Arc::clone(dataset));
            }
            debug!("source changed on disk, reloading {}", canonical.display());
        }

        let dataset = Arc::new(load_file(&canonical)?);
        self.entries
            .insert(canonical, (signature, Arc::clone(&dataset)));
        Ok(dataset)
    }

    /// Drop one cached source; the next load re-reads it.
    pub fn invalidate(&mut self, path: &Path) {
        match path.canonicalize() {
            Ok(canonical) => {
                self.entries.remove(&canonical);
            }
            Err(_) => {
                self.entries.remove(path);
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Analysis session
// ---------------------------------------------------------------------------

/// One user's analysis state: a shared read-only base dataset, the
/// session's private filter, and the filtered subset kept in step with it.
///
/// Sessions never share filter state; the base dataset is shared through
/// the `Arc` handed out by [`DatasetCache`].
#[derive(Debug, Clone)]
pub struct AnalysisSession {
    base: Arc<Dataset>,
    filter: AccidentFilter,
    filtered: Dataset,
}

impl AnalysisSession {
    /// Start a session with the neutral filter, so the filtered view is
    /// the whole base dataset.
    pub fn new(base: Arc<Dataset>) -> Self {
        let filtered = (*base).clone();
        Self {
            base,
            filter: AccidentFilter::default(),
            filtered,
        }
    }

    pub fn base(&self) -> &Dataset {
        &self.base
    }

    pub fn filter(&self) -> &AccidentFilter {
        &self.filter
    }

    /// The records passing the current filter, in base order.
    pub fn filtered(&self) -> &Dataset {
        &self.filtered
    }

    /// Swap in a new filter and recompute the filtered subset.
    pub fn set_filter(&mut self, filter: AccidentFilter) {
        if filter == self.filter {
            return;
        }
        self.filter = filter;
        self.refilter();
    }

    /// Back to the neutral filter.
    pub fn reset_filter(&mut self) {
        self.set_filter(AccidentFilter::default());
    }

    /// Replace the base dataset (e.g. after a cache reload) and re-apply
    /// the current filter to it.
    pub fn set_base(&mut self, base: Arc<Dataset>) {
        self.base = base;
        self.refilter();
    }

    fn refilter(&mut self) {
        self.filtered = apply_filter(&self.base, &self.filter);
        debug!(
            "filter keeps {} of {} records",
            self.filtered.len(),
            self.base.len()
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
