//! The updatable in-memory index.
//!
//! All mutating calls (`index_*`, `add_to_document`, `write`) run under one
//! indexing lock so the lexicon, postings, document index, meta index and
//! statistics change together. Readers do not take that lock; each structure
//! guards its own container and may be observed mid-way through a call.

use crate::config::IndexConfig;
use crate::document::DocumentIndex;
use crate::error::{IndexError, Result};
use crate::lexicon::{Lexicon, TermStats};
use crate::meta::{MetaEncoding, MetaIndex};
use crate::persist::{DiskIndex, DiskIndexWriter, IndexPaths, SourceIndex};
use crate::pipeline::{Document, DocumentPostingList, TermPipeline};
use crate::postings::{DirectIndex, InvertedIndex};
use crate::stats::{CollectionStatistics, StatisticsSnapshot};
use crate::structure::{IndexStructure, StructureRef, StructureStream};
use crate::{DocId, DocProperties};
use parking_lot::{Mutex, MutexGuard};
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

/// Proof that the indexing lock is held.
type IndexingGuard<'a> = MutexGuard<'a, ()>;

pub struct MemoryIndex {
    lexicon: Lexicon,
    inverted: InvertedIndex,
    direct: DirectIndex,
    document: DocumentIndex,
    meta: MetaIndex,
    stats: CollectionStatistics,
    pipeline: TermPipeline,
    indexing: Mutex<()>,
}

impl Default for MemoryIndex {
    fn default() -> Self { Self::new(&IndexConfig::default()) }
}

impl MemoryIndex {
    pub fn new(config: &IndexConfig) -> Self {
        let index = Self {
            lexicon: Lexicon::new(),
            inverted: InvertedIndex::new(),
            direct: DirectIndex::new(),
            document: DocumentIndex::contiguous(),
            meta: MetaIndex::contiguous(MetaEncoding::Plain),
            stats: CollectionStatistics::new(config.field_names.clone()),
            pipeline: TermPipeline::from_names(&config.term_pipelines, &config.skip_terms),
            indexing: Mutex::new(()),
        };
        tracing::info!(stages = index.pipeline.stages().len(), "created empty memory index");
        index
    }

    pub fn lexicon(&self) -> &Lexicon { &self.lexicon }
    pub fn inverted_index(&self) -> &InvertedIndex { &self.inverted }
    pub fn direct_index(&self) -> &DirectIndex { &self.direct }
    pub fn document_index(&self) -> &DocumentIndex { &self.document }
    pub fn meta_index(&self) -> &MetaIndex { &self.meta }
    pub fn collection_statistics(&self) -> &CollectionStatistics { &self.stats }
    pub fn pipeline(&self) -> &TermPipeline { &self.pipeline }

    pub fn num_documents(&self) -> u64 { self.stats.num_documents() }

    /// Run `doc` through the term pipeline and index it as a retrievable document.
    pub fn index_document(&self, doc: &mut dyn Document) -> Result<DocId> {
        let guard = self.indexing.lock();
        let postings = self.pipeline.postings_for(doc);
        self.insert(&guard, Some(doc.properties().clone()), &postings)
    }

    /// Index already-processed postings with their properties.
    pub fn index_postings(&self, properties: DocProperties, postings: &DocumentPostingList) -> Result<DocId> {
        let guard = self.indexing.lock();
        self.insert(&guard, Some(properties), postings)
    }

    /// Count `doc` in the term and collection statistics without making it retrievable.
    ///
    /// No properties and no inverted or direct postings are stored.
    pub fn index_undocument(&self, doc: &mut dyn Document) -> Result<DocId> {
        let guard = self.indexing.lock();
        let postings = self.pipeline.postings_for(doc);
        self.insert(&guard, None, &postings)
    }

    pub fn index_unpostings(&self, postings: &DocumentPostingList) -> Result<DocId> {
        let guard = self.indexing.lock();
        self.insert(&guard, None, postings)
    }

    fn insert(
        &self,
        _guard: &IndexingGuard<'_>,
        properties: Option<DocProperties>,
        postings: &DocumentPostingList,
    ) -> Result<DocId> {
        let length = postings.document_length();
        let retrievable = properties.is_some();
        let entry = properties.map(|p| self.meta.encode(p)).transpose()?;
        let doc_id = self.document.next_id()?;
        if retrievable && self.meta.contains(doc_id) {
            return Err(IndexError::DuplicateDocument(doc_id));
        }
        // nothing below fails for an id taken from `next_id` under the indexing lock
        self.document.add_document_with_id(length, doc_id)?;
        if let Some(entry) = entry {
            self.meta.write_encoded(doc_id, entry)?;
        }

        for (term, tf) in postings.terms() {
            let term_id = self.lexicon.term(term, TermStats::new(1, tf as u64));
            if retrievable {
                self.inverted.add(term_id, doc_id, tf);
                self.direct.add(doc_id, term_id, tf);
            }
        }

        self.stats.update(1, length as u64, postings.len() as u64);
        self.stats.set_unique_terms(self.lexicon.len());
        tracing::debug!(doc_id, retrievable, num_documents = self.stats.num_documents(), "indexed document");
        Ok(doc_id)
    }

    /// Run `doc` through the pipeline and append its terms to an existing document.
    pub fn add_document_terms(&self, doc_id: DocId, doc: &mut dyn Document) -> Result<bool> {
        let guard = self.indexing.lock();
        let postings = self.pipeline.postings_for(doc);
        self.extend(&guard, doc_id, &postings)
    }

    /// Append `postings` to an already indexed document.
    ///
    /// Fails without touching the index when `doc_id` is at or above the
    /// document count, or falls in a gap left by externally assigned ids.
    /// Returns `false` when `postings` is empty. Every term is credited one more
    /// document in the lexicon, even when the document already contained it.
    pub fn add_to_document(&self, doc_id: DocId, postings: &DocumentPostingList) -> Result<bool> {
        let guard = self.indexing.lock();
        self.extend(&guard, doc_id, postings)
    }

    fn extend(&self, _guard: &IndexingGuard<'_>, doc_id: DocId, postings: &DocumentPostingList) -> Result<bool> {
        let num_documents = self.stats.num_documents();
        if doc_id as u64 >= num_documents {
            return Err(IndexError::DocumentOutOfRange { doc_id, num_documents });
        }
        // external ids can leave holes below the document count
        if !self.document.contains(doc_id) {
            return Err(IndexError::UnknownDocument(doc_id));
        }
        if postings.is_empty() {
            return Ok(false);
        }

        let added = postings.document_length();
        let current = self.document.get_length(doc_id).ok_or(IndexError::UnknownDocument(doc_id))?;
        self.document.set_length(doc_id, current.saturating_add(added))?;

        let mut pointers = 0u64;
        for (term, tf) in postings.terms() {
            let term_id = self.lexicon.term(term, TermStats::new(1, tf as u64));
            if self.inverted.add_or_update(term_id, doc_id, tf) {
                pointers += 1;
            }
        }

        self.stats.update(0, added as u64, pointers);
        self.stats.set_unique_terms(self.lexicon.len());
        tracing::debug!(doc_id, added, pointers, "extended document");
        Ok(true)
    }

    /// Documents cannot be removed; always `false`.
    pub fn remove_document(&self, doc_id: DocId) -> bool {
        tracing::debug!(doc_id, "document removal is not supported");
        false
    }

    /// Persist the index under `path` with file prefix `prefix`.
    ///
    /// Returns `None` without writing anything while the index holds no documents.
    pub fn write<P: AsRef<Path>>(&self, path: P, prefix: &str) -> Result<Option<DiskIndex>> {
        let _guard = self.indexing.lock();
        let path = path.as_ref();
        tracing::info!(path = %path.display(), prefix, "writing memory index");
        if self.stats.num_documents() == 0 {
            tracing::info!("write aborted, index has no documents in it yet");
            return Ok(None);
        }
        let disk = DiskIndexWriter::new(IndexPaths::new(path, prefix)).write(self)?;
        tracing::debug!(prefix, "memory index written");
        Ok(Some(disk))
    }

    /// Rebuild an in-memory index from `source`.
    ///
    /// Term statistics are recomputed from the source postings. Terms whose
    /// postings cannot be read are logged and kept with empty statistics.
    /// Terms left without postings receive one zero-frequency posting for
    /// document 0. The pointer count is not recomputed and starts at 0.
    pub fn restore_from(source: &dyn SourceIndex, config: &IndexConfig) -> Result<Self> {
        let lexicon = Lexicon::new();
        let inverted = InvertedIndex::new();

        tracing::info!("reading out inverted");
        let started = Instant::now();
        let mut num_terms = 0u64;
        for (term, entry) in source.lexicon() {
            num_terms += 1;
            let Some(entry) = entry else {
                tracing::warn!(term = %term, "term did not have a lexicon entry, inserting empty term");
                lexicon.term(&term, TermStats::default());
                continue;
            };
            let term_id = lexicon.term(&term, TermStats::default());
            let mut recomputed = TermStats::default();
            match source.postings(&entry) {
                Ok(postings) => {
                    for p in postings {
                        inverted.add(term_id, p.doc_id, p.frequency);
                        recomputed.document_frequency += 1;
                        recomputed.total_frequency += p.frequency as u64;
                    }
                }
                Err(err) => tracing::error!(term = %term, error = %err, "failed to get the posting list for term"),
            }
            lexicon.term(&term, recomputed);
            if recomputed.document_frequency == 0 {
                inverted.add(term_id, 0, 0);
            }
        }
        tracing::info!(num_terms, elapsed_ms = started.elapsed().as_millis() as u64, "loaded lexicon and inverted");

        tracing::info!("reading out document and meta indices");
        let started = Instant::now();
        let mut documents = source.documents().peekable();
        let non_incremental = documents.peek().is_some_and(|d| d.doc_id.is_some());
        let encoding = if config.compressed_meta { MetaEncoding::Compressed } else { MetaEncoding::Plain };
        let (document, meta) = if non_incremental {
            (DocumentIndex::id_preserving(), MetaIndex::id_preserving(encoding))
        } else {
            (DocumentIndex::contiguous(), MetaIndex::contiguous(encoding))
        };

        let mut properties: HashMap<DocId, DocProperties> = source.meta().collect();
        let mut num_documents = 0u64;
        let mut num_tokens = 0u64;
        for entry in documents {
            let doc_id = match entry.doc_id {
                Some(id) if non_incremental => {
                    document.add_document_with_id(entry.length, id)?;
                    id
                }
                _ => document.add_document(entry.length)?,
            };
            if let Some(props) = properties.remove(&doc_id) {
                meta.write_entry(doc_id, props)?;
            }
            num_documents += 1;
            num_tokens += entry.length as u64;
        }
        tracing::info!(
            num_documents,
            non_incremental,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "loaded document and meta"
        );

        let stats = CollectionStatistics::from_snapshot(&StatisticsSnapshot {
            num_documents,
            num_unique_terms: num_terms,
            num_tokens,
            num_pointers: 0,
            field_tokens: vec![0; config.field_names.len()],
            field_names: config.field_names.clone(),
        });

        Ok(Self {
            lexicon,
            inverted,
            direct: DirectIndex::new(),
            document,
            meta,
            stats,
            pipeline: TermPipeline::from_names(&config.term_pipelines, &config.skip_terms),
            indexing: Mutex::new(()),
        })
    }

    pub fn structure(&self, kind: IndexStructure) -> StructureRef<'_> {
        match kind {
            IndexStructure::Lexicon => StructureRef::Lexicon(&self.lexicon),
            IndexStructure::Inverted => StructureRef::Inverted(&self.inverted),
            IndexStructure::Direct => StructureRef::Direct(&self.direct),
            IndexStructure::Document => StructureRef::Document(&self.document),
            IndexStructure::Meta => StructureRef::Meta(&self.meta),
            IndexStructure::CollectionStatistics => StructureRef::CollectionStatistics(&self.stats),
        }
    }

    pub fn structure_by_name(&self, name: &str) -> Option<StructureRef<'_>> {
        IndexStructure::from_name(name).map(|kind| self.structure(kind))
    }

    /// Snapshot stream over a structure; `None` for collection statistics.
    pub fn structure_stream(&self, kind: IndexStructure) -> Result<Option<StructureStream>> {
        Ok(Some(match kind {
            IndexStructure::Lexicon => StructureStream::Lexicon(self.lexicon.entries().into_iter()),
            IndexStructure::Inverted => StructureStream::Inverted(self.inverted.snapshot().into_iter()),
            IndexStructure::Direct => StructureStream::Direct(self.direct.snapshot().into_iter()),
            IndexStructure::Document => StructureStream::Document(self.document.entries().into_iter()),
            IndexStructure::Meta => StructureStream::Meta(self.meta.entries()?.into_iter()),
            IndexStructure::CollectionStatistics => return Ok(None),
        }))
    }

    /// Accepts the streamable structure names and their `-inputstream` forms.
    ///
    /// Collection statistics are reachable through [`structure_by_name`](Self::structure_by_name)
    /// but are not reported here.
    pub fn has_structure(&self, name: &str) -> bool {
        let base = name.strip_suffix("-inputstream").unwrap_or(name);
        IndexStructure::from_name(base).is_some_and(IndexStructure::has_stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::TextDocument;

    fn raw_index() -> MemoryIndex {
        MemoryIndex::new(&IndexConfig { term_pipelines: Vec::new(), ..IndexConfig::default() })
    }

    #[test]
    fn indexes_one_document() {
        let index = raw_index();
        let mut doc = TextDocument::from_terms(["a", "b", "a"], DocProperties::new());
        assert_eq!(index.index_document(&mut doc).unwrap(), 0);

        let a = index.lexicon().get("a").unwrap();
        assert_eq!(a.stats, TermStats::new(1, 2));
        assert_eq!(index.lexicon().get("b").unwrap().stats, TermStats::new(1, 1));
        assert_eq!(index.document_index().get_length(0), Some(3));
        assert_eq!(index.collection_statistics().num_pointers(), 2);
        assert_eq!(index.num_documents(), 1);
        assert_eq!(index.direct_index().postings_of(0).len(), 2);
    }

    #[test]
    fn undocument_has_no_postings() {
        let index = raw_index();
        let mut doc = TextDocument::from_terms(["x"], DocProperties::new());
        let id = index.index_undocument(&mut doc).unwrap();
        let x = index.lexicon().get("x").unwrap();
        assert_eq!(index.num_documents(), 1);
        assert_eq!(index.document_index().get_length(id), Some(1));
        assert!(index.inverted_index().postings_of(x.term_id).is_empty());
        assert!(index.direct_index().postings_of(id).is_empty());
        assert_eq!(index.meta_index().read_entry(id).unwrap(), None);
    }

    #[test]
    fn remove_is_unsupported() {
        let index = raw_index();
        index.index_postings(DocProperties::new(), &["a"].into_iter().collect()).unwrap();
        assert!(!index.remove_document(0));
        assert_eq!(index.num_documents(), 1);
    }

    #[test]
    fn structure_names() {
        let index = raw_index();
        assert!(matches!(index.structure_by_name("Lexicon"), Some(StructureRef::Lexicon(_))));
        assert!(index.structure_by_name("blocks").is_none());
        assert!(index.has_structure("inverted-inputstream"));
        assert!(index.has_structure("Meta"));
        assert!(!index.has_structure("collectionstatistics"));
        assert!(!index.has_structure("collectionstatistics-inputstream"));
        assert!(index.structure_by_name("collectionstatistics").is_some());
        assert!(index.structure_stream(IndexStructure::CollectionStatistics).unwrap().is_none());
    }

    #[test]
    fn taken_meta_slot_leaves_the_index_untouched() {
        let index = raw_index();
        index.meta.write_entry(0, DocProperties::from([("docno".to_string(), "stray".to_string())])).unwrap();

        let err = index.index_postings(DocProperties::new(), &["a", "b"].into_iter().collect()).unwrap_err();
        assert!(matches!(err, IndexError::DuplicateDocument(0)));
        assert!(index.document_index().is_empty());
        assert_eq!(index.num_documents(), 0);
        assert!(index.lexicon().is_empty());
        assert!(index.inverted_index().postings_of(0).is_empty());
    }

    #[test]
    fn extended_length_saturates() {
        let index = raw_index();
        index.index_postings(DocProperties::new(), &["a"].into_iter().collect()).unwrap();
        index.document.set_length(0, u32::MAX - 1).unwrap();
        assert!(index.add_to_document(0, &["a", "b"].into_iter().collect()).unwrap());
        assert_eq!(index.document_index().get_length(0), Some(u32::MAX));
    }
}
