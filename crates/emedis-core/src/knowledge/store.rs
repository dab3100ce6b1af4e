//! Shared holder for the current knowledge base.

use std::path::Path;
use std::sync::{Arc, RwLock};

use tracing::{info, warn};

use super::{KnowledgeBase, LoadResult, ReferenceTables, TablePaths};
use crate::db::{Database, DbResult};

/// Holds the knowledge base that case evaluations read from.
///
/// Evaluations take an `Arc` snapshot and keep it for the whole case. A
/// reload builds the replacement completely before swapping the pointer, so
/// a case sees either the old tables or the new ones, never a mix.
#[derive(Debug, Default)]
pub struct KnowledgeStore {
    current: RwLock<Option<Arc<KnowledgeBase>>>,
}

impl KnowledgeStore {
    /// A store with nothing loaded yet.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A store holding `knowledge_base`.
    pub fn new(knowledge_base: KnowledgeBase) -> Self {
        Self {
            current: RwLock::new(Some(Arc::new(knowledge_base))),
        }
    }

    /// Current knowledge base, or `None` if nothing has been loaded.
    pub fn snapshot(&self) -> Option<Arc<KnowledgeBase>> {
        // The lock only guards a pointer swap, so a poisoned lock holds a valid value
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        guard.clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.snapshot().is_some()
    }

    /// Swap in a new knowledge base, returning the previous one.
    pub fn replace(&self, knowledge_base: KnowledgeBase) -> Option<Arc<KnowledgeBase>> {
        self.swap(Arc::new(knowledge_base))
    }

    fn swap(&self, next: Arc<KnowledgeBase>) -> Option<Arc<KnowledgeBase>> {
        info!(fingerprint = %next.fingerprint(), "Swapping knowledge base");
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        guard.replace(next)
    }

    /// Build a knowledge base from `load` and swap it in.
    ///
    /// On error the current knowledge base stays in place.
    pub fn reload_with<E, F>(&self, load: F) -> Result<Arc<KnowledgeBase>, E>
    where
        E: std::fmt::Display,
        F: FnOnce() -> Result<ReferenceTables, E>,
    {
        let tables = load().map_err(|e| {
            warn!(error = %e, "Reload failed; keeping current knowledge base");
            e
        })?;
        let next = Arc::new(KnowledgeBase::new(tables));
        self.swap(Arc::clone(&next));
        Ok(next)
    }

    /// Reload from CSV files under `data_dir`.
    pub fn reload_from_dir(
        &self,
        data_dir: &Path,
        paths: &TablePaths,
    ) -> LoadResult<Arc<KnowledgeBase>> {
        self.reload_with(|| ReferenceTables::load(data_dir, paths))
    }

    /// Reload from a SQLite reference store.
    pub fn reload_from_db(&self, path: &Path) -> DbResult<Arc<KnowledgeBase>> {
        self.reload_with(|| Database::open_read_only(path)?.load_reference_tables())
    }
}
