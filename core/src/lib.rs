//! Updatable in-memory inverted index with on-demand persistence.

pub mod config;
pub mod document;
pub mod error;
pub mod index;
pub mod lexicon;
pub mod memory;
pub mod meta;
pub mod persist;
pub mod pipeline;
pub mod postings;
pub mod stats;
pub mod structure;
pub mod tokenizer;

pub use config::IndexConfig;
pub use error::{IndexError, Result};
pub use index::{DirectPosting, DocId, DocProperties, DocumentEntry, Posting, TermId};
pub use lexicon::{Lexicon, LexiconEntry, TermStats};
pub use memory::MemoryIndex;
pub use persist::{DiskIndex, DiskIndexWriter, IndexPaths, SourceIndex};
pub use pipeline::{Document, DocumentPostingList, TermPipeline, TextDocument};
pub use stats::{CollectionStatistics, StatisticsSnapshot};
pub use structure::{IndexStructure, StructureRef, StructureStream};
