//! Shared parse results
//!
//! Cells filled by copying a formula hold the same text (identical in R1C1,
//! where relative references are offsets). The cache parses each distinct
//! text once and hands out the same tree to every caller.

use crate::ast::{ParsedFormula, ReferenceStyle};
use crate::error::FormulaResult;
use crate::parser::{FormulaParser, ParseOptions};
use crate::registry::FunctionRegistry;
use ahash::AHashMap;
use std::sync::{Arc, PoisonError, RwLock};

type CacheKey = (String, ReferenceStyle);

/// Parse cache keyed by formula text and notation
///
/// Without a limit the cache keeps every distinct text until [`clear`] is
/// called. With [`with_limit`] it empties itself whenever a new text would
/// take it past the limit.
///
/// [`clear`]: FormulaCache::clear
/// [`with_limit`]: FormulaCache::with_limit
#[derive(Debug)]
pub struct FormulaCache<'r> {
    registry: &'r FunctionRegistry,
    limit: Option<usize>,
    entries: RwLock<AHashMap<CacheKey, Arc<ParsedFormula>>>,
}

impl Default for FormulaCache<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl FormulaCache<'static> {
    /// A cache parsing against the built-in functions
    pub fn new() -> Self {
        Self::with_registry(FunctionRegistry::builtin())
    }
}

impl<'r> FormulaCache<'r> {
    pub fn with_registry(registry: &'r FunctionRegistry) -> Self {
        Self {
            registry,
            limit: None,
            entries: RwLock::new(AHashMap::new()),
        }
    }

    /// Hold at most `limit` distinct formulas
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit.max(1));
        self
    }

    /// Parse `text`, or return the tree from an earlier identical call
    ///
    /// Failures are not cached.
    pub fn get_or_parse(
        &self,
        text: &str,
        style: ReferenceStyle,
    ) -> FormulaResult<Arc<ParsedFormula>> {
        let key = (text.strip_prefix('=').unwrap_or(text).to_string(), style);
        if let Some(hit) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Ok(Arc::clone(hit));
        }

        let parser = FormulaParser::new(self.registry, ParseOptions { style });
        let parsed = Arc::new(parser.parse(text)?);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(limit) = self.limit {
            if entries.len() >= limit && !entries.contains_key(&key) {
                log::debug!("formula cache reached {} entries; clearing", entries.len());
                entries.clear();
            }
        }
        // Another thread may have parsed the same text meanwhile; keep the first
        let shared = entries.entry(key).or_insert(parsed);
        Ok(Arc::clone(shared))
    }

    /// Number of distinct formulas held
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
