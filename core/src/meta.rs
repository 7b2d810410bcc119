//! Per-document property storage.
//!
//! Entries are stored either as plain maps or as zstd-compressed bincode, and
//! addressed either by position (incremental ids) or by explicit id.

use crate::error::{IndexError, Result};
use crate::{DocId, DocProperties};
use parking_lot::RwLock;
use std::collections::BTreeMap;

const ZSTD_LEVEL: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaEncoding {
    Plain,
    Compressed,
}

enum Stored {
    Plain(DocProperties),
    Compressed(Box<[u8]>),
}

/// Properties already encoded for a particular [`MetaIndex`].
pub struct EncodedEntry(Stored);

enum Slots {
    // unwritten ids (partially indexed documents) stay `None`
    Contiguous(Vec<Option<Stored>>),
    IdPreserving(BTreeMap<DocId, Stored>),
}

pub struct MetaIndex {
    encoding: MetaEncoding,
    slots: RwLock<Slots>,
}

impl Default for MetaIndex {
    fn default() -> Self { Self::contiguous(MetaEncoding::Plain) }
}

impl MetaIndex {
    pub fn contiguous(encoding: MetaEncoding) -> Self {
        Self { encoding, slots: RwLock::new(Slots::Contiguous(Vec::new())) }
    }

    pub fn id_preserving(encoding: MetaEncoding) -> Self {
        Self { encoding, slots: RwLock::new(Slots::IdPreserving(BTreeMap::new())) }
    }

    pub fn encoding(&self) -> MetaEncoding { self.encoding }

    pub fn is_id_preserving(&self) -> bool {
        matches!(*self.slots.read(), Slots::IdPreserving(_))
    }

    /// Encode `properties` without storing them.
    pub fn encode(&self, properties: DocProperties) -> Result<EncodedEntry> {
        Ok(EncodedEntry(match self.encoding {
            MetaEncoding::Plain => Stored::Plain(properties),
            MetaEncoding::Compressed => {
                let bytes = bincode::serialize(&properties)?;
                Stored::Compressed(zstd::stream::encode_all(&bytes[..], ZSTD_LEVEL)?.into_boxed_slice())
            }
        }))
    }

    fn decode(doc_id: DocId, stored: &Stored) -> Result<DocProperties> {
        match stored {
            Stored::Plain(p) => Ok(p.clone()),
            Stored::Compressed(bytes) => {
                let raw = zstd::stream::decode_all(&bytes[..])
                    .map_err(|e| IndexError::CorruptMeta { doc_id, reason: e.to_string() })?;
                bincode::deserialize(&raw).map_err(|e| IndexError::CorruptMeta { doc_id, reason: e.to_string() })
            }
        }
    }

    /// Store `properties` for `doc_id`. Each id can be written once.
    pub fn write_entry(&self, doc_id: DocId, properties: DocProperties) -> Result<()> {
        let entry = self.encode(properties)?;
        self.write_encoded(doc_id, entry)
    }

    /// Store an entry produced by [`encode`](Self::encode). Each id can be written once.
    pub fn write_encoded(&self, doc_id: DocId, entry: EncodedEntry) -> Result<()> {
        let EncodedEntry(stored) = entry;
        match &mut *self.slots.write() {
            Slots::Contiguous(v) => {
                let idx = doc_id as usize;
                if v.len() <= idx {
                    v.resize_with(idx + 1, || None);
                }
                if v[idx].is_some() {
                    return Err(IndexError::DuplicateDocument(doc_id));
                }
                v[idx] = Some(stored);
            }
            Slots::IdPreserving(m) => {
                if m.contains_key(&doc_id) {
                    return Err(IndexError::DuplicateDocument(doc_id));
                }
                m.insert(doc_id, stored);
            }
        }
        Ok(())
    }

    pub fn read_entry(&self, doc_id: DocId) -> Result<Option<DocProperties>> {
        let slots = self.slots.read();
        let stored = match &*slots {
            Slots::Contiguous(v) => v.get(doc_id as usize).and_then(Option::as_ref),
            Slots::IdPreserving(m) => m.get(&doc_id),
        };
        stored.map(|s| Self::decode(doc_id, s)).transpose()
    }

    pub fn contains(&self, doc_id: DocId) -> bool {
        match &*self.slots.read() {
            Slots::Contiguous(v) => v.get(doc_id as usize).is_some_and(Option::is_some),
            Slots::IdPreserving(m) => m.contains_key(&doc_id),
        }
    }

    /// Number of documents with stored properties.
    pub fn len(&self) -> usize {
        match &*self.slots.read() {
            Slots::Contiguous(v) => v.iter().filter(|s| s.is_some()).count(),
            Slots::IdPreserving(m) => m.len(),
        }
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Decoded snapshot of every stored entry in id order.
    pub fn entries(&self) -> Result<Vec<(DocId, DocProperties)>> {
        let slots = self.slots.read();
        match &*slots {
            Slots::Contiguous(v) => v
                .iter()
                .enumerate()
                .filter_map(|(i, s)| s.as_ref().map(|s| (i as DocId, s)))
                .map(|(id, s)| Self::decode(id, s).map(|p| (id, p)))
                .collect(),
            Slots::IdPreserving(m) => m.iter().map(|(&id, s)| Self::decode(id, s).map(|p| (id, p))).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(docno: &str) -> DocProperties {
        let mut p = DocProperties::new();
        p.insert("docno".into(), docno.into());
        p
    }

    #[test]
    fn compressed_entries_decode() {
        let meta = MetaIndex::contiguous(MetaEncoding::Compressed);
        meta.write_entry(0, props("d0")).unwrap();
        meta.write_entry(1, props("d1")).unwrap();
        assert_eq!(meta.read_entry(1).unwrap(), Some(props("d1")));
        assert_eq!(meta.entries().unwrap().len(), 2);
    }

    #[test]
    fn contiguous_gaps_read_as_absent() {
        let meta = MetaIndex::contiguous(MetaEncoding::Plain);
        meta.write_entry(0, props("d0")).unwrap();
        meta.write_entry(2, props("d2")).unwrap();
        assert_eq!(meta.read_entry(1).unwrap(), None);
        assert_eq!(meta.len(), 2);
        let ids: Vec<DocId> = meta.entries().unwrap().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![0, 2]);
    }

    #[test]
    fn entries_are_written_once() {
        for meta in [MetaIndex::contiguous(MetaEncoding::Plain), MetaIndex::id_preserving(MetaEncoding::Compressed)] {
            meta.write_entry(12, props("a")).unwrap();
            assert!(matches!(meta.write_entry(12, props("b")), Err(IndexError::DuplicateDocument(12))));
            assert_eq!(meta.read_entry(12).unwrap(), Some(props("a")));
        }
    }
}
