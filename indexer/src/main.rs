use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rtindex_core::{DiskIndex, DocProperties, IndexConfig, IndexPaths, MemoryIndex, TextDocument};
use serde::Deserialize;
use tracing_subscriber::{EnvFilter, fmt};
use walkdir::WalkDir;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct InputDoc {
    id: String,
    title: String,
    body: String,
    url: Option<String>,
    timestamp: Option<String>,
    /// Index the document for statistics only; it will not be retrievable.
    #[serde(default)]
    statistics_only: bool,
}

impl InputDoc {
    fn properties(&self) -> DocProperties {
        let mut props = DocProperties::new();
        props.insert("docno".into(), self.id.clone());
        props.insert("title".into(), self.title.clone());
        if let Some(url) = &self.url {
            props.insert("url".into(), url.clone());
        }
        if let Some(ts) = &self.timestamp {
            props.insert("timestamp".into(), ts.clone());
        }
        props
    }
}

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build, restore and inspect real-time inverted indices", long_about = None)]
struct Cli {
    /// JSON index configuration; defaults come from TERMPIPELINES / TERMPIPELINES_SKIP
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index JSON/JSONL files (or a directory of them) and write the index to disk
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Output index directory
        #[arg(long)]
        output: String,
        #[arg(long, default_value = "data")]
        prefix: String,
    },
    /// Load an on-disk index into memory, optionally writing it back out
    Restore {
        #[arg(long)]
        index: String,
        #[arg(long, default_value = "data")]
        prefix: String,
        /// Write the restored index under this prefix
        #[arg(long)]
        out_prefix: Option<String>,
        /// Keep restored document properties uncompressed
        #[arg(long, default_value_t = false)]
        plain_meta: bool,
    },
    /// Print the collection statistics of an on-disk index
    Stats {
        #[arg(long)]
        index: String,
        #[arg(long, default_value = "data")]
        prefix: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => IndexConfig::from_json_file(path).with_context(|| format!("reading {}", path.display()))?,
        None => IndexConfig::from_env(),
    };

    match cli.command {
        Commands::Build { input, output, prefix } => build_index(&config, &input, &output, &prefix),
        Commands::Restore { index, prefix, out_prefix, plain_meta } => {
            let config = IndexConfig { compressed_meta: !plain_meta, ..config };
            restore_index(&config, &index, &prefix, out_prefix.as_deref())
        }
        Commands::Stats { index, prefix } => print_stats(&index, &prefix),
    }
}

fn build_index(config: &IndexConfig, input: &str, output: &str, prefix: &str) -> Result<()> {
    let input_path = Path::new(input);
    let index = MemoryIndex::new(config);

    let mut files: Vec<PathBuf> = Vec::new();
    if input_path.is_dir() {
        for entry in WalkDir::new(input_path).into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "json" | "jsonl") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
    } else if input_path.is_file() {
        files.push(input_path.to_path_buf());
    }
    files.sort();

    for file in files {
        if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            index_jsonl(&index, &file)?;
        } else {
            index_json(&index, &file)?;
        }
    }

    let stats = index.collection_statistics();
    tracing::info!(
        num_docs = stats.num_documents(),
        num_terms = stats.num_unique_terms(),
        num_tokens = stats.num_tokens(),
        "ingested documents"
    );

    match index.write(output, prefix)? {
        Some(disk) => tracing::info!(output, prefix, num_terms = disk.lexicon_entries().len(), "index build complete"),
        None => tracing::warn!(input, "no documents found, nothing written"),
    }
    Ok(())
}

fn index_jsonl(index: &MemoryIndex, file: &Path) -> Result<()> {
    let f = File::open(file)?;
    let reader = BufReader::new(f);
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        let doc: InputDoc = serde_json::from_str(&line).with_context(|| format!("parsing {}", file.display()))?;
        ingest_doc(index, doc)?;
    }
    Ok(())
}

fn index_json(index: &MemoryIndex, file: &Path) -> Result<()> {
    let f = File::open(file)?;
    let reader = BufReader::new(f);
    let json: serde_json::Value = serde_json::from_reader(reader)?;
    match json {
        serde_json::Value::Array(arr) => {
            for v in arr {
                let doc: InputDoc = serde_json::from_value(v)?;
                ingest_doc(index, doc)?;
            }
        }
        serde_json::Value::Object(_) => {
            let doc: InputDoc = serde_json::from_value(json)?;
            ingest_doc(index, doc)?;
        }
        _ => {}
    }
    Ok(())
}

fn ingest_doc(index: &MemoryIndex, doc: InputDoc) -> Result<()> {
    let mut text = TextDocument::new(&format!("{}\n{}", doc.title, doc.body), doc.properties());
    let doc_id = if doc.statistics_only {
        index.index_undocument(&mut text)?
    } else {
        index.index_document(&mut text)?
    };
    tracing::debug!(doc_id, external_id = %doc.id, "ingested");
    Ok(())
}

fn restore_index(config: &IndexConfig, root: &str, prefix: &str, out_prefix: Option<&str>) -> Result<()> {
    let disk = DiskIndex::open(IndexPaths::new(root, prefix)).with_context(|| format!("opening {root}/{prefix}"))?;
    let index = MemoryIndex::restore_from(&disk, config)?;
    let stats = index.collection_statistics().snapshot();
    println!("{}", serde_json::to_string_pretty(&stats)?);
    if let Some(out_prefix) = out_prefix {
        index.write(root, out_prefix)?;
        tracing::info!(root, out_prefix, "restored index written");
    }
    Ok(())
}

fn print_stats(root: &str, prefix: &str) -> Result<()> {
    let disk = DiskIndex::open(IndexPaths::new(root, prefix)).with_context(|| format!("opening {root}/{prefix}"))?;
    println!("{}", serde_json::to_string_pretty(disk.properties())?);
    Ok(())
}
