use rtindex_core::pipeline::TermPipeline;
use rtindex_core::tokenizer::tokenize;

fn processed(text: &str) -> Vec<String> {
    let pipeline = TermPipeline::from_names(&["Stopwords", "PorterStemmer"], &[]);
    tokenize(text).iter().filter_map(|t| pipeline.process(t)).collect()
}

#[test]
fn it_normalizes_and_stems() {
    let words = processed("Running Runners RUN! The café's menu.");
    // Stemming to "run" should appear
    assert!(words.contains(&"run".to_string()));
    // NFKC keeps the accent but lowercases
    assert!(tokenize("CAFÉ").contains(&"café".to_string()));
}

#[test]
fn it_filters_stopwords() {
    let words = processed("The quick brown fox and the lazy dog");
    assert!(!words.contains(&"the".to_string()));
    assert!(!words.contains(&"and".to_string()));
    assert!(words.contains(&"quick".to_string()));
}
