//! Typed addressing of the engine's structures, with name lookup at the boundary.

use crate::error::IndexError;
use crate::lexicon::{Lexicon, LexiconEntry};
use crate::document::DocumentIndex;
use crate::meta::MetaIndex;
use crate::postings::{DirectIndex, InvertedIndex};
use crate::stats::CollectionStatistics;
use crate::{DirectPosting, DocId, DocProperties, DocumentEntry, Posting, TermId};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexStructure {
    Lexicon,
    Inverted,
    Direct,
    Document,
    Meta,
    CollectionStatistics,
}

impl IndexStructure {
    pub const ALL: [IndexStructure; 6] = [
        IndexStructure::Lexicon,
        IndexStructure::Inverted,
        IndexStructure::Direct,
        IndexStructure::Document,
        IndexStructure::Meta,
        IndexStructure::CollectionStatistics,
    ];

    pub fn name(self) -> &'static str {
        match self {
            IndexStructure::Lexicon => "lexicon",
            IndexStructure::Inverted => "inverted",
            IndexStructure::Direct => "direct",
            IndexStructure::Document => "document",
            IndexStructure::Meta => "meta",
            IndexStructure::CollectionStatistics => "collectionstatistics",
        }
    }

    /// Case-insensitive lookup; `None` for names that are not structures.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name().eq_ignore_ascii_case(name))
    }

    /// Whether [`crate::MemoryIndex::structure_stream`] can produce a stream for this structure.
    pub fn has_stream(self) -> bool { self != IndexStructure::CollectionStatistics }
}

impl FromStr for IndexStructure {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| IndexError::UnknownStructure(s.to_string()))
    }
}

/// Borrowed handle on a live structure.
pub enum StructureRef<'a> {
    Lexicon(&'a Lexicon),
    Inverted(&'a InvertedIndex),
    Direct(&'a DirectIndex),
    Document(&'a DocumentIndex),
    Meta(&'a MetaIndex),
    CollectionStatistics(&'a CollectionStatistics),
}

impl StructureRef<'_> {
    pub fn kind(&self) -> IndexStructure {
        match self {
            StructureRef::Lexicon(_) => IndexStructure::Lexicon,
            StructureRef::Inverted(_) => IndexStructure::Inverted,
            StructureRef::Direct(_) => IndexStructure::Direct,
            StructureRef::Document(_) => IndexStructure::Document,
            StructureRef::Meta(_) => IndexStructure::Meta,
            StructureRef::CollectionStatistics(_) => IndexStructure::CollectionStatistics,
        }
    }
}

/// Owned snapshot stream over a structure's contents.
pub enum StructureStream {
    Lexicon(std::vec::IntoIter<(String, LexiconEntry)>),
    Inverted(std::vec::IntoIter<(TermId, Vec<Posting>)>),
    Direct(std::vec::IntoIter<(DocId, Vec<DirectPosting>)>),
    Document(std::vec::IntoIter<DocumentEntry>),
    Meta(std::vec::IntoIter<(DocId, DocProperties)>),
}

impl StructureStream {
    /// Number of items left in the stream.
    pub fn len(&self) -> usize {
        match self {
            StructureStream::Lexicon(it) => it.len(),
            StructureStream::Inverted(it) => it.len(),
            StructureStream::Direct(it) => it.len(),
            StructureStream::Document(it) => it.len(),
            StructureStream::Meta(it) => it.len(),
        }
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_resolve_case_insensitively() {
        assert_eq!(IndexStructure::from_name("LEXICON"), Some(IndexStructure::Lexicon));
        assert_eq!(IndexStructure::from_name("CollectionStatistics"), Some(IndexStructure::CollectionStatistics));
        assert_eq!(IndexStructure::from_name("fields"), None);
        for s in IndexStructure::ALL {
            assert_eq!(IndexStructure::from_name(s.name()), Some(s));
        }
    }

    #[test]
    fn parses_from_str() {
        assert_eq!("Inverted".parse::<IndexStructure>().unwrap(), IndexStructure::Inverted);
        let err = "fields".parse::<IndexStructure>().unwrap_err();
        assert!(matches!(err, IndexError::UnknownStructure(ref name) if name == "fields"));
        assert_eq!(err.to_string(), "unknown index structure: fields");
    }
}
