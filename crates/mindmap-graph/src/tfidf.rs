//! TF-IDF vectorizer over the topic registry.
//!
//! The vocabulary and document frequencies come from every topic label seen
//! so far, so the corpus must be refit whenever the registry grows and every
//! cached vector recomputed afterwards.

use std::collections::{BTreeSet, HashMap, HashSet};

/// L2-normalised sparse term vector, entries sorted by term index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    entries: Vec<(usize, f64)>,
}

impl SparseVector {
    fn from_weights(mut entries: Vec<(usize, f64)>) -> Self {
        entries.sort_unstable_by_key(|(idx, _)| *idx);
        let norm = entries.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, w) in entries.iter_mut() {
                *w /= norm;
            }
        }
        Self { entries }
    }

    /// Number of non-zero terms.
    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Weight of a term index, 0.0 when absent.
    pub fn get(&self, index: usize) -> f64 {
        self.entries
            .binary_search_by_key(&index, |(idx, _)| *idx)
            .map(|pos| self.entries[pos].1)
            .unwrap_or(0.0)
    }

    /// Cosine similarity with another vector of the same vocabulary.
    ///
    /// Both vectors are unit length, so this is a merge-join dot product.
    /// An empty vector is unrelated to everything (0.0).
    pub fn cosine(&self, other: &SparseVector) -> f64 {
        let (mut i, mut j) = (0, 0);
        let mut dot = 0.0;
        while i < self.entries.len() && j < other.entries.len() {
            let (a_idx, a_w) = self.entries[i];
            let (b_idx, b_w) = other.entries[j];
            match a_idx.cmp(&b_idx) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    dot += a_w * b_w;
                    i += 1;
                    j += 1;
                }
            }
        }
        dot
    }
}

/// Growable TF-IDF corpus.
///
/// Weights are raw term counts times the smoothed IDF
/// `ln((1 + n) / (1 + df)) + 1`, with rows L2-normalised.
#[derive(Debug, Clone, Default)]
pub struct TfIdfCorpus {
    /// Term -> column index (terms sorted lexicographically)
    vocabulary: HashMap<String, usize>,
    /// Column index -> IDF
    idf: Vec<f64>,
    /// Documents in the last fit
    doc_count: usize,
}

impl TfIdfCorpus {
    /// An unfitted corpus; every transform is empty until [`refit`](Self::refit).
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit a corpus from scratch.
    pub fn fit<S: AsRef<str>>(documents: &[S]) -> Self {
        let mut corpus = Self::new();
        corpus.refit(documents);
        corpus
    }

    /// Replace vocabulary and IDF with statistics over `documents`.
    pub fn refit<S: AsRef<str>>(&mut self, documents: &[S]) {
        let mut doc_frequencies: HashMap<String, usize> = HashMap::new();
        for doc in documents {
            let unique: HashSet<String> = tokenize(doc.as_ref()).into_iter().collect();
            for term in unique {
                *doc_frequencies.entry(term).or_insert(0) += 1;
            }
        }

        let terms: BTreeSet<&String> = doc_frequencies.keys().collect();
        let n = documents.len() as f64;

        let mut vocabulary = HashMap::with_capacity(terms.len());
        let mut idf = Vec::with_capacity(terms.len());
        for (idx, term) in terms.into_iter().enumerate() {
            let df = doc_frequencies[term] as f64;
            vocabulary.insert(term.clone(), idx);
            idf.push(((1.0 + n) / (1.0 + df)).ln() + 1.0);
        }

        self.vocabulary = vocabulary;
        self.idf = idf;
        self.doc_count = documents.len();
    }

    /// Vectorize text against the current vocabulary.
    ///
    /// Out-of-vocabulary terms are ignored.
    pub fn transform(&self, text: &str) -> SparseVector {
        let mut counts: HashMap<usize, f64> = HashMap::new();
        for term in tokenize(text) {
            if let Some(&idx) = self.vocabulary.get(&term) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }

        let weights = counts
            .into_iter()
            .map(|(idx, tf)| (idx, tf * self.idf[idx]))
            .collect();
        SparseVector::from_weights(weights)
    }

    pub fn doc_count(&self) -> usize {
        self.doc_count
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    /// Column index of a (lowercase) term.
    pub fn term_index(&self, term: &str) -> Option<usize> {
        self.vocabulary.get(term).copied()
    }

    pub fn idf(&self, term: &str) -> Option<f64> {
        self.term_index(term).map(|idx| self.idf[idx])
    }
}

/// Lowercase word tokens of at least two characters.
///
/// Word characters are alphanumerics and `_`; everything else separates.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|s| s.chars().count() > 1)
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_basic() {
        assert_eq!(tokenize("Hello World"), vec!["hello", "world"]);
    }

    #[test]
    fn test_tokenize_drops_single_chars_keeps_numbers() {
        assert_eq!(tokenize("a b 2024 season"), vec!["2024", "season"]);
    }

    #[test]
    fn test_tokenize_punctuation_and_underscore() {
        assert_eq!(
            tokenize("club's new_signing, (loan)!"),
            vec!["club", "new_signing", "loan"]
        );
    }

    #[test]
    fn test_unfitted_transform_is_empty() {
        let corpus = TfIdfCorpus::new();
        assert!(corpus.transform("anything at all").is_empty());
        assert_eq!(corpus.doc_count(), 0);
    }

    #[test]
    fn test_fit_vocabulary_and_idf() {
        let corpus = TfIdfCorpus::fit(&["rust programming", "python programming"]);
        assert_eq!(corpus.doc_count(), 2);
        assert_eq!(corpus.vocabulary_size(), 3);

        // programming in both docs: ln(3/3) + 1
        assert!((corpus.idf("programming").unwrap() - 1.0).abs() < 1e-12);
        // rust in one doc: ln(3/2) + 1
        assert!((corpus.idf("rust").unwrap() - ((1.5f64).ln() + 1.0)).abs() < 1e-12);
        assert_eq!(corpus.idf("java"), None);
    }

    #[test]
    fn test_vocabulary_is_sorted() {
        let corpus = TfIdfCorpus::fit(&["zebra apple mango"]);
        assert_eq!(corpus.term_index("apple"), Some(0));
        assert_eq!(corpus.term_index("mango"), Some(1));
        assert_eq!(corpus.term_index("zebra"), Some(2));
    }

    #[test]
    fn test_transform_is_unit_length() {
        let corpus = TfIdfCorpus::fit(&["transfer window news", "stadium expansion news"]);
        let v = corpus.transform("transfer news news");
        let norm: f64 = (0..corpus.vocabulary_size())
            .map(|i| v.get(i).powi(2))
            .sum::<f64>()
            .sqrt();
        assert!((norm - 1.0).abs() < 1e-12);
        assert_eq!(v.nnz(), 2);
    }

    #[test]
    fn test_self_cosine_is_one() {
        let corpus = TfIdfCorpus::fit(&["Manchester United finances", "Old Trafford"]);
        let v = corpus.transform("Manchester United finances");
        assert!((v.cosine(&v) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_disjoint_cosine_is_zero() {
        let corpus = TfIdfCorpus::fit(&["youth academy", "stadium roof"]);
        let a = corpus.transform("youth academy");
        let b = corpus.transform("stadium roof");
        assert_eq!(a.cosine(&b), 0.0);
    }

    #[test]
    fn test_shared_rare_term_scores_between() {
        let corpus = TfIdfCorpus::fit(&[
            "club finances",
            "club transfer policy",
            "player transfer fees",
        ]);
        let a = corpus.transform("club transfer policy");
        let b = corpus.transform("player transfer fees");
        let sim = a.cosine(&b);
        assert!(sim > 0.0 && sim < 1.0);
    }

    #[test]
    fn test_refit_changes_vocabulary() {
        let mut corpus = TfIdfCorpus::fit(&["alpha beta"]);
        assert!(corpus.transform("gamma").is_empty());
        corpus.refit(&["alpha beta", "gamma delta"]);
        assert!(!corpus.transform("gamma").is_empty());
        assert_eq!(corpus.doc_count(), 2);
    }
}
