//! Lexical and hybrid retrieval.
//!
//! Semantic search lives in the vector store; this module adds the lexical
//! side and the fusion:
//!
//! - [`Bm25Index`]: sparse BM25 scoring over an inverted index
//! - [`FuzzyIndex`]: Levenshtein matching with query typo correction
//! - [`RrfFusion`]: weighted reciprocal-rank fusion of ranked lists
//! - [`SearchEngine`]: the three combined, with directory persistence
//!
//! Both indices serialize to JSON so they survive restarts without
//! re-indexing (`save()` / `load()`).

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::{AppError, Document, Result};

// ============================================================================
// Strategy
// ============================================================================

/// Available search strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SearchStrategy {
    /// Dense vector similarity.
    #[default]
    Semantic,
    /// BM25 lexical scoring.
    Bm25,
    /// Approximate string matching.
    Fuzzy,
    /// RRF fusion of semantic, BM25, and fuzzy.
    Hybrid,
}

impl FromStr for SearchStrategy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "semantic" | "dense" | "vector" => Ok(Self::Semantic),
            "bm25" | "lexical" | "sparse" => Ok(Self::Bm25),
            "fuzzy" | "approximate" => Ok(Self::Fuzzy),
            "hybrid" | "combined" | "rrf" => Ok(Self::Hybrid),
            _ => Err(AppError::InvalidInput(format!(
                "Unknown search strategy: {}. Use: semantic, bm25, fuzzy, hybrid",
                s
            ))),
        }
    }
}

impl std::fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Semantic => "semantic",
            Self::Bm25 => "bm25",
            Self::Fuzzy => "fuzzy",
            Self::Hybrid => "hybrid",
        };
        write!(f, "{}", name)
    }
}

/// A typo correction applied to a query word.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryCorrection {
    pub original: String,
    pub corrected: String,
    /// Edit distance between the two.
    pub distance: usize,
}

/// Weights for the hybrid strategy's components.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HybridWeights {
    pub semantic: f32,
    pub bm25: f32,
    pub fuzzy: f32,
}

impl Default for HybridWeights {
    fn default() -> Self {
        Self {
            semantic: 0.6,
            bm25: 0.3,
            fuzzy: 0.1,
        }
    }
}

// ============================================================================
// BM25
// ============================================================================

/// BM25 index for lexical matching.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Bm25Index {
    /// Document ID -> tokenized content.
    documents: HashMap<String, Vec<String>>,
    /// Term -> IDs of documents containing it.
    inverted_index: HashMap<String, HashSet<String>>,
    /// Term -> number of documents containing it.
    document_frequencies: HashMap<String, usize>,
    doc_count: usize,
    avg_doc_length: f32,
    /// Term-frequency saturation.
    k1: f32,
    /// Length normalization.
    b: f32,
}

impl Bm25Index {
    /// Index with standard parameters (k1=1.2, b=0.75).
    pub fn new() -> Self {
        Self {
            k1: 1.2,
            b: 0.75,
            ..Default::default()
        }
    }

    /// Index with custom BM25 parameters.
    pub fn with_params(k1: f32, b: f32) -> Self {
        Self {
            k1,
            b,
            ..Default::default()
        }
    }

    fn tokenize(text: &str) -> Vec<String> {
        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|s| s.len() > 1)
            .map(String::from)
            .collect()
    }

    /// Add a document.
    pub fn add_document(&mut self, id: &str, content: &str) {
        let tokens = Self::tokenize(content);

        let unique_terms: HashSet<_> = tokens.iter().cloned().collect();
        for term in &unique_terms {
            *self.document_frequencies.entry(term.clone()).or_insert(0) += 1;
            self.inverted_index
                .entry(term.clone())
                .or_default()
                .insert(id.to_string());
        }

        self.documents.insert(id.to_string(), tokens);
        self.doc_count += 1;

        let total_tokens: usize = self.documents.values().map(|v| v.len()).sum();
        self.avg_doc_length = total_tokens as f32 / self.doc_count as f32;
    }

    /// Remove a document.
    pub fn remove_document(&mut self, id: &str) {
        let Some(tokens) = self.documents.remove(id) else {
            return;
        };

        let unique_terms: HashSet<_> = tokens.into_iter().collect();
        for term in unique_terms {
            if let Some(df) = self.document_frequencies.get_mut(&term) {
                *df = df.saturating_sub(1);
                if *df == 0 {
                    self.document_frequencies.remove(&term);
                }
            }
            if let Some(docs) = self.inverted_index.get_mut(&term) {
                docs.remove(id);
                if docs.is_empty() {
                    self.inverted_index.remove(&term);
                }
            }
        }
        self.doc_count = self.doc_count.saturating_sub(1);

        if self.doc_count > 0 {
            let total_tokens: usize = self.documents.values().map(|v| v.len()).sum();
            self.avg_doc_length = total_tokens as f32 / self.doc_count as f32;
        } else {
            self.avg_doc_length = 0.0;
        }
    }

    fn idf(&self, term: &str) -> f32 {
        let df = self.document_frequencies.get(term).copied().unwrap_or(0) as f32;
        let n = self.doc_count as f32;
        if df == 0.0 || n == 0.0 {
            return 0.0;
        }
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    fn score_document(&self, doc_id: &str, query_terms: &[String]) -> f32 {
        let Some(doc_tokens) = self.documents.get(doc_id) else {
            return 0.0;
        };

        let doc_len = doc_tokens.len() as f32;
        let mut term_freq: HashMap<&str, usize> = HashMap::new();
        for token in doc_tokens {
            *term_freq.entry(token.as_str()).or_insert(0) += 1;
        }

        let mut score = 0.0;
        for term in query_terms {
            let tf = term_freq.get(term.as_str()).copied().unwrap_or(0) as f32;
            let idf = self.idf(term);

            let numerator = tf * (self.k1 + 1.0);
            let denominator =
                tf + self.k1 * (1.0 - self.b + self.b * doc_len / self.avg_doc_length);
            score += idf * numerator / denominator;
        }
        score
    }

    /// Top-k results as (id, score), best first.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<(String, f32)> {
        let query_terms = Self::tokenize(query);
        if query_terms.is_empty() {
            return Vec::new();
        }

        // Only documents sharing at least one term can score.
        let mut candidates: HashSet<&String> = HashSet::new();
        for term in &query_terms {
            if let Some(docs) = self.inverted_index.get(term) {
                candidates.extend(docs.iter());
            }
        }

        let mut results: Vec<(String, f32)> = candidates
            .into_iter()
            .map(|id| (id.clone(), self.score_document(id, &query_terms)))
            .filter(|(_, score)| *score > 0.0)
            .collect();

        results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(top_k);
        results
    }

    pub fn len(&self) -> usize {
        self.doc_count
    }

    pub fn is_empty(&self) -> bool {
        self.doc_count == 0
    }

    pub fn clear(&mut self) {
        self.documents.clear();
        self.inverted_index.clear();
        self.document_frequencies.clear();
        self.doc_count = 0;
        self.avg_doc_length = 0.0;
    }

    /// Write the index to a JSON file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string(self)
            .map_err(|e| AppError::Internal(format!("Failed to serialize BM25 index: {}", e)))?;
        std::fs::write(path, json)
            .map_err(|e| AppError::Internal(format!("Failed to write BM25 index file: {}", e)))?;
        Ok(())
    }

    /// Read an index from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| AppError::Internal(format!("Failed to read BM25 index file: {}", e)))?;
        serde_json::from_str(&json)
            .map_err(|e| AppError::Internal(format!("Failed to deserialize BM25 index: {}", e)))
    }

    /// Load from disk if present, else start empty.
    pub fn load_or_new<P: AsRef<Path>>(path: P) -> Self {
        if path.as_ref().exists() {
            Self::load(path).unwrap_or_else(|_| Self::new())
        } else {
            Self::new()
        }
    }
}

// ============================================================================
// Fuzzy
// ============================================================================

/// Fuzzy index using Levenshtein distance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FuzzyIndex {
    /// Document ID -> lowercased content.
    documents: HashMap<String, String>,
    /// Every unique word seen, for query correction.
    vocabulary: HashSet<String>,
    max_distance: usize,
}

impl FuzzyIndex {
    pub fn new() -> Self {
        Self {
            max_distance: 2,
            ..Default::default()
        }
    }

    pub fn with_max_distance(max_distance: usize) -> Self {
        Self {
            max_distance,
            ..Default::default()
        }
    }

    fn tokenize(text: &str) -> Vec<String> {
        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|s| s.len() > 1)
            .map(String::from)
            .collect()
    }

    /// Add a document.
    pub fn add_document(&mut self, id: &str, content: &str) {
        let lower = content.to_lowercase();
        for word in Self::tokenize(&lower) {
            self.vocabulary.insert(word);
        }
        self.documents.insert(id.to_string(), lower);
    }

    /// Remove a document. Vocabulary keeps the words; other documents may
    /// still contain them, and it is rebuilt on clear().
    pub fn remove_document(&mut self, id: &str) {
        self.documents.remove(id);
    }

    fn levenshtein_distance(s1: &str, s2: &str) -> usize {
        let len1 = s1.chars().count();
        let len2 = s2.chars().count();

        if len1 == 0 {
            return len2;
        }
        if len2 == 0 {
            return len1;
        }

        let s1_chars: Vec<char> = s1.chars().collect();
        let s2_chars: Vec<char> = s2.chars().collect();

        let mut prev_row: Vec<usize> = (0..=len2).collect();
        let mut curr_row = vec![0; len2 + 1];

        for (i, c1) in s1_chars.iter().enumerate() {
            curr_row[0] = i + 1;

            for (j, c2) in s2_chars.iter().enumerate() {
                let cost = usize::from(c1 != c2);
                curr_row[j + 1] = (prev_row[j + 1] + 1)
                    .min(curr_row[j] + 1)
                    .min(prev_row[j] + cost);
            }

            std::mem::swap(&mut prev_row, &mut curr_row);
        }

        prev_row[len2]
    }

    /// Closest vocabulary word for `word` within max_distance, with its
    /// edit distance. Exact matches return distance 0.
    pub fn correct_word(&self, word: &str) -> Option<(String, usize)> {
        let word_lower = word.to_lowercase();

        if self.vocabulary.contains(&word_lower) {
            return Some((word_lower, 0));
        }

        let mut best: Option<(String, usize)> = None;
        for vocab_word in &self.vocabulary {
            // Length difference alone can rule a word out.
            let len_diff = (word_lower.len() as isize - vocab_word.len() as isize).unsigned_abs();
            if len_diff > self.max_distance {
                continue;
            }

            let distance = Self::levenshtein_distance(&word_lower, vocab_word);
            if distance <= self.max_distance {
                match &best {
                    Some((_, best_dist)) if distance >= *best_dist => {}
                    _ => best = Some((vocab_word.clone(), distance)),
                }
            }
        }
        best
    }

    /// Correct every word of a query against the vocabulary.
    pub fn correct_query(&self, query: &str) -> (String, Vec<QueryCorrection>) {
        let words = Self::tokenize(query);
        let mut corrected_words = Vec::with_capacity(words.len());
        let mut corrections = Vec::new();

        for word in &words {
            match self.correct_word(word) {
                Some((corrected, distance)) => {
                    if distance > 0 {
                        corrections.push(QueryCorrection {
                            original: word.clone(),
                            corrected: corrected.clone(),
                            distance,
                        });
                    }
                    corrected_words.push(corrected);
                }
                None => corrected_words.push(word.clone()),
            }
        }

        (corrected_words.join(" "), corrections)
    }

    fn fuzzy_score(query: &str, text: &str, max_distance: usize) -> f32 {
        let query_lower = query.to_lowercase();
        let query_words: Vec<&str> = query_lower.split_whitespace().collect();

        let mut total_score = 0.0;
        let mut matched_words = 0;

        for query_word in &query_words {
            let mut best_score = 0.0f32;

            for text_word in text.split_whitespace() {
                if text_word.len() < 2 {
                    continue;
                }

                let distance = Self::levenshtein_distance(query_word, text_word);
                if distance <= max_distance {
                    let max_len = query_word.len().max(text_word.len());
                    best_score = best_score.max(1.0 - (distance as f32 / max_len as f32));
                }
            }

            if best_score > 0.0 {
                total_score += best_score;
                matched_words += 1;
            }
        }

        if matched_words > 0 {
            (total_score / query_words.len() as f32)
                * (matched_words as f32 / query_words.len() as f32)
        } else {
            0.0
        }
    }

    /// Top-k fuzzy matches as (id, score).
    pub fn search(&self, query: &str, top_k: usize) -> Vec<(String, f32)> {
        let mut results: Vec<(String, f32)> = self
            .documents
            .iter()
            .filter_map(|(id, content)| {
                let score = Self::fuzzy_score(query, content, self.max_distance);
                (score > 0.0).then(|| (id.clone(), score))
            })
            .collect();

        results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(top_k);
        results
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn clear(&mut self) {
        self.documents.clear();
        self.vocabulary.clear();
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    /// Write the index to a JSON file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string(self)
            .map_err(|e| AppError::Internal(format!("Failed to serialize fuzzy index: {}", e)))?;
        std::fs::write(path, json)
            .map_err(|e| AppError::Internal(format!("Failed to write fuzzy index file: {}", e)))?;
        Ok(())
    }

    /// Read an index from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| AppError::Internal(format!("Failed to read fuzzy index file: {}", e)))?;
        serde_json::from_str(&json)
            .map_err(|e| AppError::Internal(format!("Failed to deserialize fuzzy index: {}", e)))
    }

    /// Load from disk if present, else start empty.
    pub fn load_or_new<P: AsRef<Path>>(path: P) -> Self {
        if path.as_ref().exists() {
            Self::load(path).unwrap_or_else(|_| Self::new())
        } else {
            Self::new()
        }
    }
}

// ============================================================================
// Reciprocal Rank Fusion
// ============================================================================

/// Weighted reciprocal-rank fusion of ranked lists.
#[derive(Debug, Clone)]
pub struct RrfFusion {
    /// RRF constant, conventionally 60.
    k: f32,
}

impl Default for RrfFusion {
    fn default() -> Self {
        Self { k: 60.0 }
    }
}

impl RrfFusion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_k(k: f32) -> Self {
        Self { k }
    }

    /// Fuse ranked lists, each weighted. Input scores are ignored; only
    /// ranks matter: contribution is `weight / (k + rank)`.
    pub fn fuse(&self, ranked_lists: &[(&[(String, f32)], f32)]) -> Vec<(String, f32)> {
        let mut fused: HashMap<String, f32> = HashMap::new();

        for (results, weight) in ranked_lists {
            for (rank, (doc_id, _)) in results.iter().enumerate() {
                let rrf_score = weight / (self.k + rank as f32 + 1.0);
                *fused.entry(doc_id.clone()).or_insert(0.0) += rrf_score;
            }
        }

        let mut results: Vec<_> = fused.into_iter().collect();
        results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        results
    }
}

// ============================================================================
// Search Engine
// ============================================================================

/// Lexical indices plus fusion, persisted together.
#[derive(Debug, Default)]
pub struct SearchEngine {
    pub bm25: Bm25Index,
    pub fuzzy: FuzzyIndex,
    pub rrf: RrfFusion,
}

impl SearchEngine {
    pub fn new() -> Self {
        Self {
            bm25: Bm25Index::new(),
            fuzzy: FuzzyIndex::new(),
            rrf: RrfFusion::new(),
        }
    }

    /// Index a document for both lexical strategies.
    pub fn index_document(&mut self, doc: &Document) {
        self.bm25.add_document(&doc.id, &doc.content);
        self.fuzzy.add_document(&doc.id, &doc.content);
    }

    pub fn index_documents(&mut self, docs: &[Document]) {
        for doc in docs {
            self.index_document(doc);
        }
    }

    pub fn remove_document(&mut self, id: &str) {
        self.bm25.remove_document(id);
        self.fuzzy.remove_document(id);
    }

    pub fn search_bm25(&self, query: &str, top_k: usize) -> Vec<(String, f32)> {
        self.bm25.search(query, top_k)
    }

    pub fn search_fuzzy(&self, query: &str, top_k: usize) -> Vec<(String, f32)> {
        self.fuzzy.search(query, top_k)
    }

    /// Hybrid search. `semantic_results` come from the vector store.
    pub fn search_hybrid(
        &self,
        query: &str,
        semantic_results: &[(String, f32)],
        weights: &HybridWeights,
        top_k: usize,
    ) -> Vec<(String, f32)> {
        let bm25_results = self.bm25.search(query, top_k * 2);
        let fuzzy_results = self.fuzzy.search(query, top_k * 2);

        let ranked_lists: Vec<(&[(String, f32)], f32)> = vec![
            (semantic_results, weights.semantic),
            (&bm25_results, weights.bm25),
            (&fuzzy_results, weights.fuzzy),
        ];

        let mut fused = self.rrf.fuse(&ranked_lists);
        fused.truncate(top_k);
        fused
    }

    /// BM25 with typo correction against the indexed vocabulary.
    ///
    /// Returns (results, corrected_query, corrections).
    pub fn search_bm25_with_correction(
        &self,
        query: &str,
        top_k: usize,
    ) -> (Vec<(String, f32)>, String, Vec<QueryCorrection>) {
        let (corrected_query, corrections) = self.fuzzy.correct_query(query);
        let results = self.bm25.search(&corrected_query, top_k);
        (results, corrected_query, corrections)
    }

    pub fn clear(&mut self) {
        self.bm25.clear();
        self.fuzzy.clear();
    }

    pub fn len(&self) -> usize {
        self.bm25.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bm25.is_empty()
    }

    /// Persist both indices into a directory.
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|e| {
            AppError::Internal(format!("Failed to create search index directory: {}", e))
        })?;

        self.bm25.save(dir.join("bm25_index.json"))?;
        self.fuzzy.save(dir.join("fuzzy_index.json"))?;
        Ok(())
    }

    /// Load both indices from a directory.
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        Ok(Self {
            bm25: Bm25Index::load(dir.join("bm25_index.json"))?,
            fuzzy: FuzzyIndex::load(dir.join("fuzzy_index.json"))?,
            rrf: RrfFusion::default(),
        })
    }

    /// Load from a directory if it exists, else start empty.
    pub fn load_or_new<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        if dir.exists() {
            Self::load(dir).unwrap_or_else(|_| Self::new())
        } else {
            Self::new()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
