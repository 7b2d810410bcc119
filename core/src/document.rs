use crate::error::{IndexError, Result};
use crate::{DocId, DocumentEntry};
use parking_lot::RwLock;
use std::collections::BTreeMap;

enum Lengths {
    /// Id is the position; ids are handed out incrementally.
    Contiguous(Vec<u32>),
    /// Ids supplied by the source index and kept verbatim.
    IdPreserving(BTreeMap<DocId, u32>),
}

/// Per-document lengths.
pub struct DocumentIndex {
    lengths: RwLock<Lengths>,
}

impl Default for DocumentIndex {
    fn default() -> Self { Self::contiguous() }
}

impl DocumentIndex {
    pub fn contiguous() -> Self {
        Self { lengths: RwLock::new(Lengths::Contiguous(Vec::new())) }
    }

    pub fn id_preserving() -> Self {
        Self { lengths: RwLock::new(Lengths::IdPreserving(BTreeMap::new())) }
    }

    pub fn is_id_preserving(&self) -> bool {
        matches!(*self.lengths.read(), Lengths::IdPreserving(_))
    }

    /// Record a new document and return its id.
    pub fn add_document(&self, length: u32) -> Result<DocId> {
        let mut lengths = self.lengths.write();
        let id = Self::allocate(&lengths)?;
        match &mut *lengths {
            Lengths::Contiguous(v) => v.push(length),
            Lengths::IdPreserving(m) => {
                m.insert(id, length);
            }
        }
        Ok(id)
    }

    /// The id the next [`add_document`](Self::add_document) call would hand out.
    pub fn next_id(&self) -> Result<DocId> {
        Self::allocate(&self.lengths.read())
    }

    /// Id-preserving indices hand out the document count when that id is free,
    /// otherwise one past the largest id held.
    fn allocate(lengths: &Lengths) -> Result<DocId> {
        match lengths {
            Lengths::Contiguous(v) => DocId::try_from(v.len()).map_err(|_| IndexError::DocumentIdsExhausted),
            Lengths::IdPreserving(m) => {
                let id = DocId::try_from(m.len()).map_err(|_| IndexError::DocumentIdsExhausted)?;
                if !m.contains_key(&id) {
                    return Ok(id);
                }
                m.keys()
                    .next_back()
                    .and_then(|max| max.checked_add(1))
                    .ok_or(IndexError::DocumentIdsExhausted)
            }
        }
    }

    /// Record a document under an explicit id.
    pub fn add_document_with_id(&self, length: u32, doc_id: DocId) -> Result<()> {
        match &mut *self.lengths.write() {
            Lengths::Contiguous(v) => {
                if doc_id as usize != v.len() {
                    return Err(IndexError::DuplicateDocument(doc_id));
                }
                v.push(length);
            }
            Lengths::IdPreserving(m) => {
                if m.contains_key(&doc_id) {
                    return Err(IndexError::DuplicateDocument(doc_id));
                }
                m.insert(doc_id, length);
            }
        }
        Ok(())
    }

    pub fn get_length(&self, doc_id: DocId) -> Option<u32> {
        match &*self.lengths.read() {
            Lengths::Contiguous(v) => v.get(doc_id as usize).copied(),
            Lengths::IdPreserving(m) => m.get(&doc_id).copied(),
        }
    }

    pub fn set_length(&self, doc_id: DocId, length: u32) -> Result<()> {
        let mut lengths = self.lengths.write();
        let slot = match &mut *lengths {
            Lengths::Contiguous(v) => v.get_mut(doc_id as usize),
            Lengths::IdPreserving(m) => m.get_mut(&doc_id),
        }
        .ok_or(IndexError::UnknownDocument(doc_id))?;
        *slot = length;
        Ok(())
    }

    pub fn contains(&self, doc_id: DocId) -> bool { self.get_length(doc_id).is_some() }

    pub fn len(&self) -> usize {
        match &*self.lengths.read() {
            Lengths::Contiguous(v) => v.len(),
            Lengths::IdPreserving(m) => m.len(),
        }
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Snapshot in id order; explicit ids are only reported for id-preserving indices.
    pub fn entries(&self) -> Vec<DocumentEntry> {
        match &*self.lengths.read() {
            Lengths::Contiguous(v) => v.iter().map(|&length| DocumentEntry { doc_id: None, length }).collect(),
            Lengths::IdPreserving(m) => m
                .iter()
                .map(|(&id, &length)| DocumentEntry { doc_id: Some(id), length })
                .collect(),
        }
    }

    /// `(id, length)` pairs in id order.
    pub fn lengths(&self) -> Vec<(DocId, u32)> {
        match &*self.lengths.read() {
            Lengths::Contiguous(v) => v.iter().enumerate().map(|(i, &l)| (i as DocId, l)).collect(),
            Lengths::IdPreserving(m) => m.iter().map(|(&id, &l)| (id, l)).collect(),
        }
    }
}
