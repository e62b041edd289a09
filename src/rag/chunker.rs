//! Text chunking.
//!
//! Splits document text into overlapping chunks sized for embedding.
//! Three strategies:
//!
//! - **word**: fixed window of whitespace tokens with overlap (default)
//! - **character**: character-budgeted chunks via text-splitter, which
//!   prefers natural boundaries inside the budget
//! - **sentence**: whole sentences packed up to the size budget

use crate::types::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::OnceLock;
use text_splitter::{ChunkConfig, TextSplitter};

/// Available chunking strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ChunkingStrategy {
    /// Window of words with overlap.
    #[default]
    Word,
    /// Character-budgeted, boundary-aware.
    Character,
    /// Sentence-packed.
    Sentence,
}

impl FromStr for ChunkingStrategy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "word" | "words" => Ok(Self::Word),
            "character" | "char" | "chars" => Ok(Self::Character),
            "sentence" | "sentences" | "semantic" => Ok(Self::Sentence),
            _ => Err(AppError::InvalidInput(format!(
                "Unknown chunking strategy: {}. Use: word, character, sentence",
                s
            ))),
        }
    }
}

impl std::fmt::Display for ChunkingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Word => "word",
            Self::Character => "character",
            Self::Sentence => "sentence",
        };
        write!(f, "{}", name)
    }
}

/// One chunk of a source text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    /// Position of this chunk in the source's chunk sequence.
    pub index: usize,
    /// Byte offset of the chunk start in the source text.
    pub offset: usize,
}

/// Configurable text chunker.
#[derive(Debug, Clone)]
pub struct TextChunker {
    strategy: ChunkingStrategy,
    /// Words for the word strategy, characters otherwise.
    chunk_size: usize,
    /// Overlap in the same unit as `chunk_size`. Ignored by `sentence`.
    chunk_overlap: usize,
}

impl TextChunker {
    /// Word chunker with the given window and overlap.
    ///
    /// # Errors
    ///
    /// Overlap must be smaller than the window.
    pub fn with_word_chunking(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        Self::new(ChunkingStrategy::Word, chunk_size, chunk_overlap)
    }

    /// Character chunker with the given budget and overlap.
    pub fn with_character_chunking(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        Self::new(ChunkingStrategy::Character, chunk_size, chunk_overlap)
    }

    /// Sentence chunker with the given character budget.
    pub fn with_sentence_chunking(chunk_size: usize) -> Result<Self> {
        Self::new(ChunkingStrategy::Sentence, chunk_size, 0)
    }

    /// Build a chunker.
    pub fn new(strategy: ChunkingStrategy, chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(AppError::InvalidInput("Chunk size must be > 0".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(AppError::InvalidInput(format!(
                "Chunk overlap ({}) must be smaller than chunk size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            strategy,
            chunk_size,
            chunk_overlap,
        })
    }

    /// The strategy this chunker uses.
    pub fn strategy(&self) -> ChunkingStrategy {
        self.strategy
    }

    /// Split `text` into chunks. Empty or whitespace-only input yields none.
    pub fn chunk(&self, text: &str) -> Result<Vec<Chunk>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        match self.strategy {
            ChunkingStrategy::Word => Ok(self.chunk_words(text)),
            ChunkingStrategy::Character => self.chunk_characters(text),
            ChunkingStrategy::Sentence => Ok(self.chunk_sentences(text)),
        }
    }

    fn chunk_words(&self, text: &str) -> Vec<Chunk> {
        let words: Vec<(usize, &str)> = word_pattern()
            .find_iter(text)
            .map(|m| (m.start(), m.as_str()))
            .collect();

        let step = self.chunk_size - self.chunk_overlap;
        let mut chunks = Vec::new();

        let mut start = 0;
        while start < words.len() {
            let end = (start + self.chunk_size).min(words.len());
            let content = words[start..end]
                .iter()
                .map(|(_, w)| *w)
                .collect::<Vec<_>>()
                .join(" ");
            chunks.push(Chunk {
                content,
                index: chunks.len(),
                offset: words[start].0,
            });
            if end == words.len() {
                break;
            }
            start += step;
        }

        chunks
    }

    fn chunk_characters(&self, text: &str) -> Result<Vec<Chunk>> {
        let config = ChunkConfig::new(self.chunk_size)
            .with_overlap(self.chunk_overlap)
            .map_err(|e| AppError::InvalidInput(format!("Invalid chunk config: {}", e)))?;
        let splitter = TextSplitter::new(config);

        Ok(splitter
            .chunk_indices(text)
            .enumerate()
            .map(|(index, (offset, content))| Chunk {
                content: content.to_string(),
                index,
                offset,
            })
            .collect())
    }

    fn chunk_sentences(&self, text: &str) -> Vec<Chunk> {
        let mut chunks: Vec<Chunk> = Vec::new();
        let mut current = String::new();
        let mut current_offset = 0;
        let mut last_end = 0;

        for m in sentence_pattern().find_iter(text) {
            let sentence = m.as_str().trim();
            if sentence.is_empty() {
                last_end = m.end();
                continue;
            }

            // Flush when adding this sentence would bust the budget.
            if !current.is_empty() && current.len() + sentence.len() + 1 > self.chunk_size {
                chunks.push(Chunk {
                    content: std::mem::take(&mut current),
                    index: chunks.len(),
                    offset: current_offset,
                });
            }

            if current.is_empty() {
                // Skip the whitespace between the previous sentence end and
                // this one so the offset lands on the first character.
                current_offset =
                    m.start() + (m.as_str().len() - m.as_str().trim_start().len());
                current.push_str(sentence);
            } else {
                current.push(' ');
                current.push_str(sentence);
            }
            last_end = m.end();
        }

        // Trailing text without sentence punctuation.
        let tail = text[last_end..].trim();
        if !tail.is_empty() {
            let tail_start =
                last_end + (text[last_end..].len() - text[last_end..].trim_start().len());
            if !current.is_empty() && current.len() + tail.len() + 1 > self.chunk_size {
                chunks.push(Chunk {
                    content: std::mem::take(&mut current),
                    index: chunks.len(),
                    offset: current_offset,
                });
            }
            if current.is_empty() {
                current_offset = tail_start;
                current.push_str(tail);
            } else {
                current.push(' ');
                current.push_str(tail);
            }
        }

        if !current.is_empty() {
            chunks.push(Chunk {
                content: current,
                index: chunks.len(),
                offset: current_offset,
            });
        }

        chunks
    }
}

fn word_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| regex::Regex::new(r"\S+").expect("static regex"))
}

fn sentence_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    // A sentence: text up to terminal punctuation (with trailing quotes),
    // or to end of input.
    PATTERN.get_or_init(|| regex::Regex::new(r#"[^.!?]*[.!?]+["')\]]*"#).expect("static regex"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_chunks_have_overlap() {
        let chunker = TextChunker::with_word_chunking(4, 1).unwrap();
        let text = "one two three four five six seven";
        let chunks = chunker.chunk(text).unwrap();

        assert_eq!(chunks[0].content, "one two three four");
        // Overlap of one word: next chunk starts at "four".
        assert_eq!(chunks[1].content, "four five six seven");
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[1].index, 1);
    }

    #[test]
    fn word_chunk_offsets_point_into_source() {
        let chunker = TextChunker::with_word_chunking(2, 0).unwrap();
        let text = "alpha beta gamma delta";
        let chunks = chunker.chunk(text).unwrap();

        assert_eq!(chunks[0].offset, 0);
        assert_eq!(&text[chunks[1].offset..chunks[1].offset + 5], "gamma");
    }

    #[test]
    fn short_tail_is_kept() {
        let chunker = TextChunker::with_word_chunking(3, 0).unwrap();
        let chunks = chunker.chunk("one two three four").unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].content, "four");
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        let chunker = TextChunker::with_word_chunking(10, 2).unwrap();
        assert!(chunker.chunk("").unwrap().is_empty());
        assert!(chunker.chunk("   \n\t ").unwrap().is_empty());
    }

    #[test]
    fn overlap_must_be_smaller_than_size() {
        assert!(TextChunker::with_word_chunking(10, 10).is_err());
        assert!(TextChunker::with_word_chunking(0, 0).is_err());
    }

    #[test]
    fn character_chunks_respect_budget() {
        let chunker = TextChunker::with_character_chunking(20, 0).unwrap();
        let text = "The quick brown fox jumps over the lazy dog near the river bank.";
        let chunks = chunker.chunk(text).unwrap();

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.content.len() <= 20);
        }
    }

    #[test]
    fn sentence_chunks_keep_sentences_whole() {
        let chunker = TextChunker::with_sentence_chunking(40).unwrap();
        let text = "First sentence here. Second one follows. A third closes it.";
        let chunks = chunker.chunk(text).unwrap();

        assert!(chunks.len() >= 2);
        assert!(chunks[0].content.starts_with("First sentence"));
        for chunk in &chunks {
            assert!(chunk.content.ends_with('.'));
        }
    }

    #[test]
    fn sentence_chunker_keeps_unpunctuated_tail() {
        let chunker = TextChunker::with_sentence_chunking(100).unwrap();
        let chunks = chunker.chunk("A sentence. trailing fragment").unwrap();
        let combined: String = chunks.iter().map(|c| c.content.as_str()).collect::<Vec<_>>().join(" ");
        assert!(combined.contains("trailing fragment"));
    }

    #[test]
    fn strategy_parses_aliases() {
        assert_eq!(
            "semantic".parse::<ChunkingStrategy>().unwrap(),
            ChunkingStrategy::Sentence
        );
        assert_eq!(
            "char".parse::<ChunkingStrategy>().unwrap(),
            ChunkingStrategy::Character
        );
        assert!("token".parse::<ChunkingStrategy>().is_err());
    }
}
