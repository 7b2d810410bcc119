use rtindex_core::{
    DocId, DocProperties, DocumentEntry, DocumentPostingList, IndexConfig, IndexError, IndexPaths, LexiconEntry,
    MemoryIndex, Posting, Result, SourceIndex, TermStats, TextDocument,
};
use rtindex_core::meta::MetaEncoding;
use std::fs;
use tempfile::tempdir;

fn props(docno: &str) -> DocProperties {
    DocProperties::from([("docno".to_string(), docno.to_string())])
}

fn raw_config() -> IndexConfig {
    IndexConfig { term_pipelines: Vec::new(), ..IndexConfig::default() }
}

fn bag(terms: &[&str]) -> DocumentPostingList {
    terms.iter().copied().collect()
}

fn populated() -> MemoryIndex {
    let index = MemoryIndex::default();
    let texts = [
        "Real-time indexing keeps statistics exact",
        "Statistics drive ranking models and ranking needs exact counts",
        "Indexes are written to disk on demand",
    ];
    for (i, text) in texts.iter().enumerate() {
        let mut doc = TextDocument::new(text, props(&format!("doc{i}")));
        index.index_document(&mut doc).unwrap();
    }
    index
}

#[test]
fn writing_an_empty_index_creates_nothing() {
    let dir = tempdir().unwrap();
    let index = MemoryIndex::default();
    assert!(index.write(dir.path(), "data").unwrap().is_none());
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn write_then_restore_preserves_term_statistics() {
    let dir = tempdir().unwrap();
    let index = populated();
    let disk = index.write(dir.path(), "data").unwrap().expect("index has documents");
    assert_eq!(disk.statistics(), &index.collection_statistics().snapshot());

    let restored = MemoryIndex::restore_from(&disk, &IndexConfig::default()).unwrap();
    for (term, entry) in index.lexicon().entries() {
        let r = restored.lexicon().get(&term).unwrap();
        assert_eq!(r.stats, entry.stats, "term {term}");
        assert_eq!(
            restored.inverted_index().postings_of(r.term_id),
            index.inverted_index().postings_of(entry.term_id)
        );
    }

    let stats = restored.collection_statistics();
    assert_eq!(stats.num_documents(), 3);
    assert_eq!(stats.num_tokens(), index.collection_statistics().num_tokens());
    assert_eq!(stats.num_unique_terms(), index.lexicon().len());
    assert_eq!(stats.num_pointers(), 0);

    assert!(!restored.document_index().is_id_preserving());
    assert_eq!(restored.meta_index().encoding(), MetaEncoding::Compressed);
    assert_eq!(restored.meta_index().read_entry(1).unwrap(), Some(props("doc1")));
    assert_eq!(restored.document_index().lengths(), index.document_index().lengths());
    assert_eq!(restored.direct_index().num_documents(), 0);
}

#[test]
fn writing_twice_gives_identical_copies() {
    let dir = tempdir().unwrap();
    let index = populated();
    let before = index.collection_statistics().snapshot();
    let first = index.write(dir.path(), "first").unwrap().unwrap();
    let second = index.write(dir.path(), "second").unwrap().unwrap();
    assert_eq!(first.lexicon_entries(), second.lexicon_entries());
    assert_eq!(first.statistics(), second.statistics());
    assert_eq!(index.collection_statistics().snapshot(), before);
    assert_eq!(first.direct_postings().len(), 3);
}

#[test]
fn terms_without_postings_get_a_sentinel() {
    let dir = tempdir().unwrap();
    let index = MemoryIndex::new(&raw_config());
    index.index_unpostings(&bag(&["ghost"])).unwrap();
    index.index_postings(props("d1"), &bag(&["real", "real"])).unwrap();
    let disk = index.write(dir.path(), "data").unwrap().unwrap();

    let restored = MemoryIndex::restore_from(&disk, &raw_config()).unwrap();
    let ghost = restored.lexicon().get("ghost").unwrap();
    assert_eq!(ghost.stats, TermStats::default());
    assert_eq!(restored.inverted_index().postings_of(ghost.term_id), vec![Posting { doc_id: 0, frequency: 0 }]);
    let real = restored.lexicon().get("real").unwrap();
    assert_eq!(real.stats, TermStats::new(1, 2));
    assert_eq!(restored.meta_index().read_entry(0).unwrap(), None);
    assert_eq!(restored.meta_index().read_entry(1).unwrap(), Some(props("d1")));
}

#[test]
fn unreadable_postings_skip_only_that_term() {
    let dir = tempdir().unwrap();
    let index = MemoryIndex::new(&raw_config());
    index.index_postings(props("d0"), &bag(&["a", "b", "a"])).unwrap();
    let disk = index.write(dir.path(), "data").unwrap().unwrap();
    let a = disk.lexicon_entry("a").unwrap().term_id;
    fs::remove_file(IndexPaths::new(dir.path(), "data").postings_for_term(a)).unwrap();

    let restored = MemoryIndex::restore_from(&disk, &raw_config()).unwrap();
    assert_eq!(restored.lexicon().get("a").unwrap().stats, TermStats::default());
    assert_eq!(restored.lexicon().get("b").unwrap().stats, TermStats::new(1, 1));
    assert_eq!(restored.collection_statistics().num_unique_terms(), 2);
}

/// An index whose documents carry externally assigned ids.
struct ExternalIds;

impl SourceIndex for ExternalIds {
    fn lexicon(&self) -> Box<dyn Iterator<Item = (String, Option<LexiconEntry>)> + '_> {
        let entry = |term_id| Some(LexiconEntry { term_id, stats: TermStats::new(99, 99) });
        Box::new(vec![("alpha".to_string(), entry(0)), ("beta".to_string(), entry(1)), ("orphan".to_string(), None)].into_iter())
    }

    fn postings(&self, entry: &LexiconEntry) -> Result<Vec<Posting>> {
        Ok(match entry.term_id {
            0 => vec![Posting { doc_id: 10, frequency: 2 }, Posting { doc_id: 35, frequency: 1 }],
            _ => vec![Posting { doc_id: 20, frequency: 4 }],
        })
    }

    fn documents(&self) -> Box<dyn Iterator<Item = DocumentEntry> + '_> {
        Box::new(
            [(10, 2), (20, 4), (35, 1)]
                .into_iter()
                .map(|(id, length)| DocumentEntry { doc_id: Some(id), length }),
        )
    }

    fn meta(&self) -> Box<dyn Iterator<Item = (DocId, DocProperties)> + '_> {
        Box::new([10, 20, 35].into_iter().map(|id| (id, props(&format!("ext{id}")))))
    }
}

#[test]
fn restore_preserves_external_document_ids() {
    let cfg = IndexConfig { compressed_meta: false, ..raw_config() };
    let restored = MemoryIndex::restore_from(&ExternalIds, &cfg).unwrap();

    assert!(restored.document_index().is_id_preserving());
    assert!(restored.meta_index().is_id_preserving());
    assert_eq!(restored.meta_index().encoding(), MetaEncoding::Plain);
    assert_eq!(restored.document_index().get_length(20), Some(4));
    assert_eq!(restored.meta_index().read_entry(35).unwrap(), Some(props("ext35")));
    assert_eq!(restored.lexicon().get("alpha").unwrap().stats, TermStats::new(2, 3));
    assert_eq!(restored.lexicon().get("orphan").unwrap().stats, TermStats::default());

    let stats = restored.collection_statistics();
    assert_eq!((stats.num_documents(), stats.num_tokens(), stats.num_unique_terms()), (3, 7, 3));

    // restored ids at or above the document count cannot be extended
    assert!(matches!(
        restored.add_to_document(35, &bag(&["beta"])),
        Err(IndexError::DocumentOutOfRange { doc_id: 35, num_documents: 3 })
    ));
    assert!(matches!(restored.add_to_document(1, &bag(&["beta"])), Err(IndexError::UnknownDocument(1))));
    assert_eq!(restored.document_index().get_length(35), Some(1));
    assert_eq!(restored.lexicon().get("beta").unwrap().stats, TermStats::new(1, 4));

    let new_id = restored.index_postings(props("fresh"), &bag(&["gamma"])).unwrap();
    assert_eq!(new_id, 3);
    assert_eq!(restored.meta_index().read_entry(3).unwrap(), Some(props("fresh")));
    assert!(restored.add_to_document(3, &bag(&["beta"])).unwrap());
    assert_eq!(restored.document_index().get_length(3), Some(2));
}

/// One document restored far above the document count.
struct SingleHighId;

impl SourceIndex for SingleHighId {
    fn lexicon(&self) -> Box<dyn Iterator<Item = (String, Option<LexiconEntry>)> + '_> {
        Box::new(std::iter::once(("solo".to_string(), Some(LexiconEntry { term_id: 0, stats: TermStats::new(1, 1) }))))
    }

    fn postings(&self, _entry: &LexiconEntry) -> Result<Vec<Posting>> {
        Ok(vec![Posting { doc_id: 100, frequency: 1 }])
    }

    fn documents(&self) -> Box<dyn Iterator<Item = DocumentEntry> + '_> {
        Box::new(std::iter::once(DocumentEntry { doc_id: Some(100), length: 1 }))
    }

    fn meta(&self) -> Box<dyn Iterator<Item = (DocId, DocProperties)> + '_> {
        Box::new(std::iter::once((100, props("ext100"))))
    }
}

#[test]
fn extending_an_id_above_the_document_count_is_rejected() {
    let restored = MemoryIndex::restore_from(&SingleHighId, &raw_config()).unwrap();
    assert_eq!(restored.num_documents(), 1);

    let err = restored.add_to_document(100, &bag(&["solo", "extra"])).unwrap_err();
    assert!(matches!(err, IndexError::DocumentOutOfRange { doc_id: 100, num_documents: 1 }));

    let stats = restored.collection_statistics();
    assert_eq!((stats.num_tokens(), stats.num_pointers(), stats.num_unique_terms()), (1, 0, 1));
    assert_eq!(restored.document_index().get_length(100), Some(1));
    assert!(restored.lexicon().get("extra").is_none());
}

#[test]
fn external_ids_survive_a_second_round_trip() {
    let dir = tempdir().unwrap();
    let restored = MemoryIndex::restore_from(&ExternalIds, &raw_config()).unwrap();
    let disk = restored.write(dir.path(), "again").unwrap().unwrap();
    assert!(disk.is_non_incremental());

    let again = MemoryIndex::restore_from(&disk, &raw_config()).unwrap();
    assert!(again.document_index().is_id_preserving());
    assert_eq!(again.document_index().lengths(), vec![(10, 2), (20, 4), (35, 1)]);
    assert_eq!(again.meta_index().read_entry(20).unwrap(), Some(props("ext20")));
    assert_eq!(again.lexicon().get("alpha").unwrap().stats, TermStats::new(2, 3));
}
