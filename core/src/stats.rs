use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Running collection-wide counters read by ranking code.
#[derive(Debug, Default)]
pub struct CollectionStatistics {
    num_documents: AtomicU64,
    num_unique_terms: AtomicU64,
    num_tokens: AtomicU64,
    num_pointers: AtomicU64,
    field_tokens: Vec<AtomicU64>,
    field_names: Vec<String>,
}

/// Point-in-time copy of [`CollectionStatistics`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    pub num_documents: u64,
    pub num_unique_terms: u64,
    pub num_tokens: u64,
    pub num_pointers: u64,
    pub field_tokens: Vec<u64>,
    pub field_names: Vec<String>,
}

impl StatisticsSnapshot {
    pub fn average_document_length(&self) -> f64 {
        if self.num_documents == 0 {
            0.0
        } else {
            self.num_tokens as f64 / self.num_documents as f64
        }
    }
}

impl CollectionStatistics {
    pub fn new(field_names: Vec<String>) -> Self {
        Self {
            field_tokens: field_names.iter().map(|_| AtomicU64::new(0)).collect(),
            field_names,
            ..Self::default()
        }
    }

    pub(crate) fn from_snapshot(s: &StatisticsSnapshot) -> Self {
        Self {
            num_documents: AtomicU64::new(s.num_documents),
            num_unique_terms: AtomicU64::new(s.num_unique_terms),
            num_tokens: AtomicU64::new(s.num_tokens),
            num_pointers: AtomicU64::new(s.num_pointers),
            field_tokens: s.field_tokens.iter().map(|&t| AtomicU64::new(t)).collect(),
            field_names: s.field_names.clone(),
        }
    }

    /// Add each delta to its counter.
    pub fn update(&self, doc_delta: u64, token_delta: u64, pointer_delta: u64) {
        self.num_documents.fetch_add(doc_delta, Ordering::AcqRel);
        self.num_tokens.fetch_add(token_delta, Ordering::AcqRel);
        self.num_pointers.fetch_add(pointer_delta, Ordering::AcqRel);
    }

    pub fn set_unique_terms(&self, n: u64) {
        self.num_unique_terms.store(n, Ordering::Release);
    }

    pub fn num_documents(&self) -> u64 { self.num_documents.load(Ordering::Acquire) }
    pub fn num_unique_terms(&self) -> u64 { self.num_unique_terms.load(Ordering::Acquire) }
    pub fn num_tokens(&self) -> u64 { self.num_tokens.load(Ordering::Acquire) }
    pub fn num_pointers(&self) -> u64 { self.num_pointers.load(Ordering::Acquire) }
    pub fn field_names(&self) -> &[String] { &self.field_names }

    pub fn field_tokens(&self) -> Vec<u64> {
        self.field_tokens.iter().map(|t| t.load(Ordering::Acquire)).collect()
    }

    pub fn average_document_length(&self) -> f64 { self.snapshot().average_document_length() }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            num_documents: self.num_documents(),
            num_unique_terms: self.num_unique_terms(),
            num_tokens: self.num_tokens(),
            num_pointers: self.num_pointers(),
            field_tokens: self.field_tokens(),
            field_names: self.field_names.clone(),
        }
    }
}
