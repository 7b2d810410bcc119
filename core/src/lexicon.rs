use crate::TermId;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Aggregate statistics of one term, also used as the delta applied by [`Lexicon::term`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermStats {
    pub document_frequency: u64,
    pub total_frequency: u64,
}

impl TermStats {
    pub fn new(document_frequency: u64, total_frequency: u64) -> Self {
        Self { document_frequency, total_frequency }
    }

    fn add(&mut self, delta: TermStats) {
        self.document_frequency += delta.document_frequency;
        self.total_frequency += delta.total_frequency;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LexiconEntry {
    pub term_id: TermId,
    pub stats: TermStats,
}

#[derive(Default)]
struct Inner {
    ids: HashMap<String, TermId>,
    // indexed by term id, which is also insertion order
    entries: Vec<(String, TermStats)>,
}

/// Term dictionary assigning dense ids in order of first occurrence.
#[derive(Default)]
pub struct Lexicon {
    inner: RwLock<Inner>,
}

impl Lexicon {
    pub fn new() -> Self { Self::default() }

    /// Add `delta` to `term`'s statistics, creating the term with the next id if absent.
    pub fn term(&self, term: &str, delta: TermStats) -> TermId {
        let mut inner = self.inner.write();
        let existing = inner.ids.get(term).copied();
        if let Some(id) = existing {
            inner.entries[id as usize].1.add(delta);
            return id;
        }
        let id = inner.entries.len() as TermId;
        inner.ids.insert(term.to_string(), id);
        inner.entries.push((term.to_string(), delta));
        id
    }

    pub fn get(&self, term: &str) -> Option<LexiconEntry> {
        let inner = self.inner.read();
        let &term_id = inner.ids.get(term)?;
        Some(LexiconEntry { term_id, stats: inner.entries[term_id as usize].1 })
    }

    pub fn get_by_id(&self, term_id: TermId) -> Option<(String, LexiconEntry)> {
        let inner = self.inner.read();
        inner
            .entries
            .get(term_id as usize)
            .map(|(term, stats)| (term.clone(), LexiconEntry { term_id, stats: *stats }))
    }

    /// Snapshot of all entries in term id order.
    pub fn entries(&self) -> Vec<(String, LexiconEntry)> {
        let inner = self.inner.read();
        inner
            .entries
            .iter()
            .enumerate()
            .map(|(i, (term, stats))| (term.clone(), LexiconEntry { term_id: i as TermId, stats: *stats }))
            .collect()
    }

    pub fn len(&self) -> u64 { self.inner.read().entries.len() as u64 }

    pub fn is_empty(&self) -> bool { self.inner.read().entries.is_empty() }
}
