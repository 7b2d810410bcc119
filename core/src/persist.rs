use crate::error::Result;
use crate::lexicon::LexiconEntry;
use crate::stats::StatisticsSnapshot;
use crate::{DirectPosting, DocId, DocProperties, DocumentEntry, MemoryIndex, Posting, TermId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{create_dir_all, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 1;

/// Read-only view of a persisted index, consumed by [`MemoryIndex::restore_from`].
pub trait SourceIndex {
    /// Terms in lexicon order. A term may come without an entry.
    fn lexicon(&self) -> Box<dyn Iterator<Item = (String, Option<LexiconEntry>)> + '_>;
    fn postings(&self, entry: &LexiconEntry) -> Result<Vec<Posting>>;
    fn documents(&self) -> Box<dyn Iterator<Item = DocumentEntry> + '_>;
    fn meta(&self) -> Box<dyn Iterator<Item = (DocId, DocProperties)> + '_>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertiesFile {
    pub version: u32,
    pub created_at: String,
    pub statistics: StatisticsSnapshot,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentFile {
    pub non_incremental: bool,
    pub entries: Vec<DocumentEntry>,
}

#[derive(Debug, Clone)]
pub struct IndexPaths {
    pub root: PathBuf,
    pub prefix: String,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P, prefix: &str) -> Self {
        Self { root: root.as_ref().to_path_buf(), prefix: prefix.to_string() }
    }
    fn file(&self, name: &str) -> PathBuf { self.root.join(format!("{}.{name}", self.prefix)) }
    pub fn lexicon(&self) -> PathBuf { self.file("lexicon.bin") }
    pub fn document(&self) -> PathBuf { self.file("document.bin") }
    pub fn meta(&self) -> PathBuf { self.file("meta.bin") }
    pub fn direct(&self) -> PathBuf { self.file("direct.bin") }
    pub fn properties(&self) -> PathBuf { self.file("properties.json") }
    pub fn postings_dir(&self) -> PathBuf { self.file("inverted") }
    pub fn postings_for_term(&self, term_id: TermId) -> PathBuf {
        self.postings_dir().join(format!("{term_id:08}.postings.bin"))
    }
}

fn save_bin<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut f = BufWriter::new(File::create(path)?);
    bincode::serialize_into(&mut f, value)?;
    f.flush()?;
    Ok(())
}

fn load_bin<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let f = BufReader::new(File::open(path)?);
    Ok(bincode::deserialize_from(f)?)
}

pub fn save_postings_for_term(paths: &IndexPaths, term_id: TermId, postings: &[Posting]) -> Result<()> {
    save_bin(&paths.postings_for_term(term_id), postings)
}

pub fn load_postings_for_term(paths: &IndexPaths, term_id: TermId) -> Result<Vec<Posting>> {
    load_bin(&paths.postings_for_term(term_id))
}

pub fn save_properties(paths: &IndexPaths, props: &PropertiesFile) -> Result<()> {
    let mut f = File::create(paths.properties())?;
    let json = serde_json::to_string_pretty(props)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_properties(paths: &IndexPaths) -> Result<PropertiesFile> {
    let f = BufReader::new(File::open(paths.properties())?);
    Ok(serde_json::from_reader(f)?)
}

/// Serializes a [`MemoryIndex`] into the on-disk layout described by [`IndexPaths`].
pub struct DiskIndexWriter {
    paths: IndexPaths,
}

impl DiskIndexWriter {
    pub fn new(paths: IndexPaths) -> Self { Self { paths } }

    pub fn write(&self, index: &MemoryIndex) -> Result<DiskIndex> {
        let paths = &self.paths;
        create_dir_all(paths.postings_dir())?;

        let lexicon = index.lexicon().entries();
        for (_, entry) in &lexicon {
            let postings = index.inverted_index().postings_of(entry.term_id);
            save_postings_for_term(paths, entry.term_id, &postings)?;
        }
        save_bin(&paths.lexicon(), &lexicon)?;

        let documents = DocumentFile {
            non_incremental: index.document_index().is_id_preserving(),
            entries: index.document_index().entries(),
        };
        save_bin(&paths.document(), &documents)?;
        save_bin(&paths.meta(), &index.meta_index().entries()?)?;
        save_bin(&paths.direct(), &index.direct_index().snapshot())?;

        let props = PropertiesFile {
            version: FORMAT_VERSION,
            created_at: time::OffsetDateTime::now_utc()
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_else(|_| "".into()),
            statistics: index.collection_statistics().snapshot(),
        };
        save_properties(paths, &props)?;

        tracing::info!(
            root = %paths.root.display(),
            prefix = %paths.prefix,
            num_terms = lexicon.len(),
            num_documents = documents.entries.len(),
            "index written to disk"
        );
        DiskIndex::open(paths.clone())
    }
}

/// A persisted index. Header structures are loaded eagerly, postings per term on demand.
pub struct DiskIndex {
    paths: IndexPaths,
    properties: PropertiesFile,
    lexicon: Vec<(String, LexiconEntry)>,
    term_ids: HashMap<String, usize>,
    documents: DocumentFile,
    meta: Vec<(DocId, DocProperties)>,
    direct: Vec<(DocId, Vec<DirectPosting>)>,
}

impl DiskIndex {
    pub fn open(paths: IndexPaths) -> Result<Self> {
        let properties = load_properties(&paths)?;
        let lexicon: Vec<(String, LexiconEntry)> = load_bin(&paths.lexicon())?;
        let term_ids = lexicon.iter().enumerate().map(|(i, (t, _))| (t.clone(), i)).collect();
        let documents = load_bin(&paths.document())?;
        let meta = load_bin(&paths.meta())?;
        let direct = load_bin(&paths.direct())?;
        Ok(Self { paths, properties, lexicon, term_ids, documents, meta, direct })
    }

    pub fn paths(&self) -> &IndexPaths { &self.paths }
    pub fn properties(&self) -> &PropertiesFile { &self.properties }
    pub fn statistics(&self) -> &StatisticsSnapshot { &self.properties.statistics }
    pub fn lexicon_entries(&self) -> &[(String, LexiconEntry)] { &self.lexicon }
    pub fn document_entries(&self) -> &[DocumentEntry] { &self.documents.entries }
    pub fn is_non_incremental(&self) -> bool { self.documents.non_incremental }
    pub fn direct_postings(&self) -> &[(DocId, Vec<DirectPosting>)] { &self.direct }

    pub fn lexicon_entry(&self, term: &str) -> Option<&LexiconEntry> {
        self.term_ids.get(term).map(|&i| &self.lexicon[i].1)
    }

    pub fn postings_for_term(&self, term_id: TermId) -> Result<Vec<Posting>> {
        load_postings_for_term(&self.paths, term_id)
    }
}

impl SourceIndex for DiskIndex {
    fn lexicon(&self) -> Box<dyn Iterator<Item = (String, Option<LexiconEntry>)> + '_> {
        Box::new(self.lexicon.iter().map(|(t, e)| (t.clone(), Some(*e))))
    }

    fn postings(&self, entry: &LexiconEntry) -> Result<Vec<Posting>> {
        self.postings_for_term(entry.term_id)
    }

    fn documents(&self) -> Box<dyn Iterator<Item = DocumentEntry> + '_> {
        let non_incremental = self.documents.non_incremental;
        Box::new(self.documents.entries.iter().map(move |e| DocumentEntry {
            doc_id: if non_incremental { e.doc_id } else { None },
            length: e.length,
        }))
    }

    fn meta(&self) -> Box<dyn Iterator<Item = (DocId, DocProperties)> + '_> {
        Box::new(self.meta.iter().cloned())
    }
}
