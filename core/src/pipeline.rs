//! Term processing between the tokenizer and the index.
//!
//! A [`TermPipeline`] is an ordered list of [`Stage`]s resolved by name from a
//! fixed registry. Each stage either rewrites a term or drops it.

use crate::index::DocProperties;
use crate::tokenizer::tokenize;
use lazy_static::lazy_static;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::{HashMap, HashSet};
use std::fmt;

lazy_static! {
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","can't","cannot","could","couldn't",
            "did","didn't","do","does","doesn't","doing","don't","down","during",
            "each","few","for","from","further",
            "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
            "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
            "let's","me","more","most","mustn't","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
            "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
            "under","until","up","very",
            "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
            "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

/// A single term transformation.
pub enum Stage {
    Stopwords,
    Stemmer(Stemmer),
    LowerCase,
}

impl Stage {
    fn process(&self, term: String) -> Option<String> {
        match self {
            Stage::Stopwords => (!STOPWORDS.contains(term.as_str())).then_some(term),
            Stage::Stemmer(stemmer) => Some(stemmer.stem(&term).into_owned()),
            Stage::LowerCase => Some(term.to_lowercase()),
        }
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Stopwords => f.write_str("Stopwords"),
            Stage::Stemmer(_) => f.write_str("Stemmer"),
            Stage::LowerCase => f.write_str("LowerCase"),
        }
    }
}

/// Registry of stage names to constructors.
const REGISTRY: &[(&str, fn() -> Stage)] = &[
    ("Stopwords", stopwords),
    ("PorterStemmer", english_stemmer),
    ("EnglishSnowballStemmer", english_stemmer),
    ("LowerCase", lower_case),
];

fn stopwords() -> Stage { Stage::Stopwords }
fn english_stemmer() -> Stage { Stage::Stemmer(Stemmer::create(Algorithm::English)) }
fn lower_case() -> Stage { Stage::LowerCase }

fn resolve(name: &str) -> Option<Stage> {
    REGISTRY.iter().find(|(n, _)| *n == name).map(|(_, make)| make())
}

/// Ordered chain of stages with an optional skip list in front.
#[derive(Debug, Default)]
pub struct TermPipeline {
    stages: Vec<Stage>,
    skip: HashSet<String>,
}

impl TermPipeline {
    /// Resolve `names` in order. Unknown names are logged and left out.
    pub fn from_names<S: AsRef<str>>(names: &[S], skip_terms: &[S]) -> Self {
        let mut stages = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty() {
                continue;
            }
            match resolve(name) {
                Some(stage) => stages.push(stage),
                None => tracing::warn!(stage = name, "term pipeline stage not found, skipping"),
            }
        }
        let skip = skip_terms.iter().map(|t| t.as_ref().to_string()).collect();
        Self { stages, skip }
    }

    pub fn stages(&self) -> &[Stage] { &self.stages }

    /// Run `term` through the pipeline, returning `None` if a stage dropped it.
    pub fn process(&self, term: &str) -> Option<String> {
        if self.skip.contains(term) {
            return Some(term.to_string());
        }
        self.stages.iter().try_fold(term.to_string(), |t, stage| stage.process(t))
    }

    /// Drain `doc` through the pipeline into a fresh bag of terms.
    pub fn postings_for(&self, doc: &mut dyn Document) -> DocumentPostingList {
        let mut postings = DocumentPostingList::new();
        while let Some(term) = doc.next_term() {
            if let Some(term) = self.process(&term) {
                postings.insert(term);
            }
        }
        postings
    }
}

/// A source of raw terms. `next_term` returning `None` marks the end of the document.
pub trait Document {
    fn next_term(&mut self) -> Option<String>;
    fn properties(&self) -> &DocProperties;
}

/// A plain-text document split by [`tokenize`].
#[derive(Debug, Clone)]
pub struct TextDocument {
    terms: std::vec::IntoIter<String>,
    properties: DocProperties,
}

impl TextDocument {
    pub fn new(text: &str, properties: DocProperties) -> Self {
        Self { terms: tokenize(text).into_iter(), properties }
    }

    /// A document whose terms are used verbatim.
    pub fn from_terms<I, S>(terms: I, properties: DocProperties) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let terms: Vec<String> = terms.into_iter().map(Into::into).collect();
        Self { terms: terms.into_iter(), properties }
    }
}

impl Document for TextDocument {
    fn next_term(&mut self) -> Option<String> { self.terms.next() }
    fn properties(&self) -> &DocProperties { &self.properties }
}

/// Term frequencies of one document, kept in first-occurrence order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentPostingList {
    terms: Vec<(String, u32)>,
    positions: HashMap<String, usize>,
    length: u32,
}

impl DocumentPostingList {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&mut self, term: impl Into<String>) {
        let term = term.into();
        match self.positions.get(&term) {
            Some(&i) => self.terms[i].1 = self.terms[i].1.saturating_add(1),
            None => {
                self.positions.insert(term.clone(), self.terms.len());
                self.terms.push((term, 1));
            }
        }
        self.length = self.length.saturating_add(1);
    }

    pub fn frequency(&self, term: &str) -> u32 {
        self.positions.get(term).map_or(0, |&i| self.terms[i].1)
    }

    /// Distinct terms with their frequencies.
    pub fn terms(&self) -> impl Iterator<Item = (&str, u32)> + '_ {
        self.terms.iter().map(|(t, f)| (t.as_str(), *f))
    }

    /// Total number of tokens.
    pub fn document_length(&self) -> u32 { self.length }

    /// Number of distinct terms.
    pub fn len(&self) -> usize { self.terms.len() }

    pub fn is_empty(&self) -> bool { self.terms.is_empty() }
}

impl<S: Into<String>> FromIterator<S> for DocumentPostingList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut postings = Self::new();
        for term in iter {
            postings.insert(term);
        }
        postings
    }
}
