//! Recalculation cache.
//!
//! Interactive callers re-evaluate the same transform on every redraw. The
//! cache keeps the last solved [`CoefficientSet`] together with the canonical
//! key of the parameters it was solved from, and only re-runs the solver when
//! the key changes.
//!
//! One cache belongs to one session. It takes `&mut self`, so callers that
//! share a cache across threads must serialize access themselves; usually
//! each worker simply owns its own cache.

use log::{debug, trace};

use crate::params::StretchParameters;
use crate::solver::{solve, CoefficientSet};

#[derive(Debug, Clone)]
struct CacheEntry {
    key: String,
    coefficients: CoefficientSet,
}

/// Memoizes the coefficient set of the most recent parameters.
#[derive(Debug, Clone, Default)]
pub struct StretchCache {
    entry: Option<CacheEntry>,
    hits: u64,
    misses: u64,
}

impl StretchCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the coefficients for `params`, solving only on a key change.
    ///
    /// The screen transfer function is always re-solved since its
    /// coefficients follow live image statistics.
    pub fn get_or_solve(&mut self, params: &StretchParameters) -> &CoefficientSet {
        let key = params.canonical_key();
        let bypass = params.family.depends_on_statistics();

        let entry = match self.entry.take() {
            Some(entry) if !bypass && entry.key == key => {
                self.hits += 1;
                trace!("stretch cache hit ({})", self.hits);
                entry
            }
            _ => {
                self.misses += 1;
                debug!("stretch cache miss ({}), solving {}", self.misses, key);
                let coefficients = solve(params);
                CacheEntry { key, coefficients }
            }
        };

        &self.entry.insert(entry).coefficients
    }

    /// Canonical key of the cached entry, if any.
    pub fn key(&self) -> Option<&str> {
        self.entry.as_ref().map(|e| e.key.as_str())
    }

    /// Drop the cached entry so the next call re-solves.
    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}
