use crate::DocId;
use thiserror::Error;

/// Errors raised by the in-memory index and its persistence layer.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("docid {doc_id} too large (index holds {num_documents} documents)")]
    DocumentOutOfRange { doc_id: DocId, num_documents: u64 },

    #[error("document {0} already exists")]
    DuplicateDocument(DocId),

    #[error("document {0} does not exist")]
    UnknownDocument(DocId),

    #[error("no document ids left to allocate")]
    DocumentIdsExhausted,

    #[error("unknown index structure: {0}")]
    UnknownStructure(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corrupt meta entry for document {doc_id}: {reason}")]
    CorruptMeta { doc_id: DocId, reason: String },
}

pub type Result<T> = std::result::Result<T, IndexError>;
