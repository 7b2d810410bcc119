//! Inverted (term → documents) and direct (document → terms) posting stores.

use crate::{DirectPosting, DocId, Posting, TermId};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Term id → postings in insertion order.
#[derive(Default)]
pub struct InvertedIndex {
    // indexed by term id; grown on demand
    postings: RwLock<Vec<Vec<Posting>>>,
}

impl InvertedIndex {
    pub fn new() -> Self { Self::default() }

    fn slot(postings: &mut Vec<Vec<Posting>>, term_id: TermId) -> &mut Vec<Posting> {
        let idx = term_id as usize;
        if postings.len() <= idx {
            postings.resize_with(idx + 1, Vec::new);
        }
        &mut postings[idx]
    }

    /// Append a posting. The caller guarantees `(term_id, doc_id)` is not present yet.
    pub fn add(&self, term_id: TermId, doc_id: DocId, frequency: u32) {
        let mut postings = self.postings.write();
        Self::slot(&mut postings, term_id).push(Posting { doc_id, frequency });
    }

    /// Merge `frequency` into an existing posting or create one.
    /// Returns `true` when a new posting was created.
    pub fn add_or_update(&self, term_id: TermId, doc_id: DocId, frequency: u32) -> bool {
        let mut postings = self.postings.write();
        let list = Self::slot(&mut postings, term_id);
        // recent documents sit at the tail
        match list.iter_mut().rev().find(|p| p.doc_id == doc_id) {
            Some(p) => {
                p.frequency = p.frequency.saturating_add(frequency);
                false
            }
            None => {
                list.push(Posting { doc_id, frequency });
                true
            }
        }
    }

    /// Snapshot of a term's postings; empty for unknown terms.
    pub fn postings_of(&self, term_id: TermId) -> Vec<Posting> {
        self.postings.read().get(term_id as usize).cloned().unwrap_or_default()
    }

    /// Number of term slots, including terms that never received a posting.
    pub fn num_terms(&self) -> usize { self.postings.read().len() }

    /// Total number of postings held.
    pub fn num_postings(&self) -> u64 {
        self.postings.read().iter().map(|l| l.len() as u64).sum()
    }

    /// Snapshot of every term's postings in term id order.
    pub fn snapshot(&self) -> Vec<(TermId, Vec<Posting>)> {
        self.postings
            .read()
            .iter()
            .enumerate()
            .map(|(i, l)| (i as TermId, l.clone()))
            .collect()
    }
}

/// Document id → term postings. Append-only.
#[derive(Default)]
pub struct DirectIndex {
    postings: RwLock<BTreeMap<DocId, Vec<DirectPosting>>>,
}

impl DirectIndex {
    pub fn new() -> Self { Self::default() }

    pub fn add(&self, doc_id: DocId, term_id: TermId, frequency: u32) {
        self.postings.write().entry(doc_id).or_default().push(DirectPosting { term_id, frequency });
    }

    pub fn postings_of(&self, doc_id: DocId) -> Vec<DirectPosting> {
        self.postings.read().get(&doc_id).cloned().unwrap_or_default()
    }

    pub fn num_documents(&self) -> usize { self.postings.read().len() }

    pub fn snapshot(&self) -> Vec<(DocId, Vec<DirectPosting>)> {
        self.postings.read().iter().map(|(d, l)| (*d, l.clone())).collect()
    }
}
