//! Retrieval-augmented generation components.
//!
//! The pipeline stages, in the order content flows through them:
//!
//! 1. **Chunking** ([`chunker`]) - documents split into embedding-sized
//!    pieces
//! 2. **Embedding** ([`embeddings`], cached via [`cache`]) - chunks mapped
//!    to vectors
//! 3. **Storage** - vectors land in a [`crate::store::VectorStore`]
//! 4. **Retrieval** ([`search`]) - semantic, BM25, fuzzy, or hybrid
//! 5. **Generation** ([`pipeline`]) - an LLM answers from retrieved context

pub mod cache;
pub mod chunker;
pub mod embeddings;
pub mod pipeline;
pub mod search;

pub use cache::{CacheConfig, CacheStats, EmbeddingCache, LruEmbeddingCache, NoOpCache};
pub use chunker::{Chunk, ChunkingStrategy, TextChunker};
pub use embeddings::{CachedEmbedder, EmbeddingProvider, GeminiEmbedder};
pub use pipeline::{IngestOutcome, IngestReport, PromptBuilder, RagAnswer, RagPipeline};
pub use search::{Bm25Index, FuzzyIndex, HybridWeights, RrfFusion, SearchEngine, SearchStrategy};
