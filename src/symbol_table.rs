//! The label table: names mapped to resolved absolute addresses.

use std::collections::HashMap;

use edit_distance::edit_distance;

/// Map from label name to the absolute address recorded at its definition
/// (origin in effect plus bytes emitted so far).
///
/// Definitions overwrite silently; the table keeps only the latest address
/// for a name. During the emission pass the table grows, during the
/// resolution pass it is only read.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    inner: HashMap<String, u64>,
}

/// Names farther than this from any defined label are unlikely to be
/// misspellings of one, so no suggestion is offered.
const SUGGESTION_DISTANCE: usize = 2;

impl SymbolTable {
    pub fn new() -> SymbolTable {
        SymbolTable {
            inner: HashMap::new(),
        }
    }

    /// Records `name` at `address`, returning the previously recorded
    /// address if the name was already defined.
    pub fn define<S: Into<String>>(&mut self, name: S, address: u64) -> Option<u64> {
        self.inner.insert(name.into(), address)
    }

    pub fn get(&self, name: &str) -> Option<u64> {
        self.inner.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.inner.iter().map(|(name, address)| (name.as_str(), *address))
    }

    /// The defined name closest to `name` by edit distance, if any is close
    /// enough to be a plausible misspelling.
    pub fn closest(&self, name: &str) -> Option<&str> {
        self.inner
            .keys()
            .map(|candidate| (edit_distance(name, candidate), candidate))
            .filter(|(distance, _)| *distance <= SUGGESTION_DISTANCE)
            .min_by_key(|(distance, _)| *distance)
            .map(|(_, candidate)| candidate.as_str())
    }
}
