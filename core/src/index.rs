use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type TermId = u32;
pub type DocId = u32;

/// Arbitrary per-document properties, e.g. `docno`, `title`, `url`.
pub type DocProperties = BTreeMap<String, String>;

/// One (document, frequency) entry of a term's inverted postings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub frequency: u32,
}

/// One (term, frequency) entry of a document's direct postings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectPosting {
    pub term_id: TermId,
    pub frequency: u32,
}

/// A document-index record as exchanged with on-disk indices.
///
/// `doc_id` is only present when the source assigned ids non-incrementally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentEntry {
    pub doc_id: Option<DocId>,
    pub length: u32,
}
