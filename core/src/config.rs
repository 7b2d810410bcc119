use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Construction-time settings for a [`crate::MemoryIndex`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Ordered term pipeline stage names, resolved against the stage registry.
    pub term_pipelines: Vec<String>,
    /// Terms that bypass every pipeline stage.
    pub skip_terms: Vec<String>,
    /// Field names carried in the collection statistics.
    pub field_names: Vec<String>,
    /// Whether restored indices keep document properties compressed.
    pub compressed_meta: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            term_pipelines: vec!["Stopwords".into(), "PorterStemmer".into()],
            skip_terms: Vec::new(),
            field_names: Vec::new(),
            compressed_meta: true,
        }
    }
}

impl IndexConfig {
    /// Defaults overlaid with `TERMPIPELINES` and `TERMPIPELINES_SKIP`.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(val) = std::env::var("TERMPIPELINES") {
            cfg.term_pipelines = split_list(&val);
        }
        if let Ok(val) = std::env::var("TERMPIPELINES_SKIP") {
            cfg.skip_terms = split_list(&val);
        }
        cfg
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

fn split_list(val: &str) -> Vec<String> {
    val.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_list_trims_and_drops_empty() {
        assert_eq!(split_list(" Stopwords , ,PorterStemmer "), vec!["Stopwords", "PorterStemmer"]);
        assert!(split_list("").is_empty());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg: IndexConfig = serde_json::from_str(r#"{"skip_terms":["C++"]}"#).unwrap();
        assert_eq!(cfg.skip_terms, vec!["C++"]);
        assert_eq!(cfg.term_pipelines, IndexConfig::default().term_pipelines);
        assert!(cfg.compressed_meta);
    }

    #[test]
    fn reads_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        std::fs::write(&path, r#"{"term_pipelines":["LowerCase"],"compressed_meta":false}"#).unwrap();
        let cfg = IndexConfig::from_json_file(&path).unwrap();
        assert_eq!(cfg.term_pipelines, vec!["LowerCase"]);
        assert!(!cfg.compressed_meta);
    }
}
