//! The RAG pipeline.
//!
//! Ties the stages together: load documents, chunk, embed, store; then at
//! query time embed the question, retrieve similar chunks, build a context
//! prompt, and generate an answer with source attributions.

use crate::ingest::DocumentLoader;
use crate::llm::LlmClient;
use crate::rag::chunker::TextChunker;
use crate::rag::embeddings::EmbeddingProvider;
use crate::rag::search::{HybridWeights, SearchEngine, SearchStrategy};
use crate::store::VectorStore;
use crate::types::{
    AppError, Document, DocumentMetadata, Result, SearchResult, SourceAttribution,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Outcome of ingesting one piece of content.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub chunks_created: usize,
    pub document_ids: Vec<String>,
}

/// Outcome of ingesting a directory.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub documents_loaded: usize,
    pub chunks_created: usize,
    /// (path, reason) for every file that failed to load.
    pub skipped: Vec<(String, String)>,
}

/// A generated answer with its supporting sources.
#[derive(Debug, Clone)]
pub struct RagAnswer {
    pub answer: String,
    pub model: String,
    pub sources: Vec<SourceAttribution>,
}

/// Retrieval-augmented generation over a vector store and an LLM.
pub struct RagPipeline {
    chunker: TextChunker,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    llm: Arc<dyn LlmClient>,
    top_k: usize,
    threshold: f32,
}

impl RagPipeline {
    pub fn new(
        chunker: TextChunker,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        llm: Arc<dyn LlmClient>,
    ) -> Self {
        Self {
            chunker,
            embedder,
            store,
            llm,
            top_k: 5,
            threshold: 0.0,
        }
    }

    /// Override the default retrieval depth.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Override the default score threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// The vector store this pipeline writes to.
    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// The embedding provider in use.
    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    async fn ensure_collection(&self, collection: &str) -> Result<()> {
        if !self.store.collection_exists(collection).await? {
            self.store
                .create_collection(collection, self.embedder.dimensions())
                .await?;
        }
        Ok(())
    }

    /// Chunk, embed, and store one piece of content.
    pub async fn ingest_text(
        &self,
        content: &str,
        metadata: DocumentMetadata,
        collection: &str,
        chunker: Option<&TextChunker>,
    ) -> Result<IngestOutcome> {
        let chunks = chunker.unwrap_or(&self.chunker).chunk(content)?;
        if chunks.is_empty() {
            return Err(AppError::InvalidInput(
                "Content too small to chunk".to_string(),
            ));
        }

        self.ensure_collection(collection).await?;

        let chunk_texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&chunk_texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(AppError::Embedding(format!(
                "Got {} embeddings for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let base_id = Uuid::new_v4().to_string();
        let mut documents = Vec::with_capacity(chunks.len());
        let mut document_ids = Vec::with_capacity(chunks.len());

        for (chunk, embedding) in chunks.iter().zip(embeddings) {
            let doc_id = format!("{}_{}", base_id, chunk.index);
            document_ids.push(doc_id.clone());
            documents.push(Document {
                id: doc_id,
                content: chunk.content.clone(),
                metadata: metadata.clone(),
                embedding: Some(embedding),
            });
        }

        let chunks_created = self.store.upsert(collection, &documents).await?;

        info!(
            collection,
            source = %metadata.source,
            chunks = chunks_created,
            "ingested document"
        );

        Ok(IngestOutcome {
            chunks_created,
            document_ids,
        })
    }

    /// Load every document under `dir` and ingest it into `collection`.
    pub async fn ingest_directory(
        &self,
        dir: impl AsRef<Path>,
        collection: &str,
    ) -> Result<IngestReport> {
        let load_report = DocumentLoader::load_from_directory(dir)?;

        let mut report = IngestReport {
            skipped: load_report
                .skipped
                .iter()
                .map(|s| (s.path.display().to_string(), s.reason.clone()))
                .collect(),
            ..Default::default()
        };

        for doc in load_report.documents {
            // Detected captions ride along as tags so figure/table chunks
            // stay discoverable after retrieval.
            let mut metadata = doc.metadata.clone();
            for caption in &doc.captions {
                let tag = format!("{}-{}", caption.kind, caption.number.to_lowercase());
                if !metadata.tags.contains(&tag) {
                    metadata.tags.push(tag);
                }
            }

            match self
                .ingest_text(&doc.content, metadata, collection, None)
                .await
            {
                Ok(outcome) => {
                    report.documents_loaded += 1;
                    report.chunks_created += outcome.chunks_created;
                }
                Err(e) => {
                    warn!(source = %doc.metadata.source, error = %e, "skipping document");
                    report.skipped.push((doc.metadata.source, e.to_string()));
                }
            }
        }

        info!(
            collection,
            documents = report.documents_loaded,
            chunks = report.chunks_created,
            skipped = report.skipped.len(),
            "directory ingested"
        );

        Ok(report)
    }

    /// Embed the query and fetch the most similar chunks.
    pub async fn retrieve(
        &self,
        query: &str,
        collection: &str,
        top_k: usize,
        threshold: f32,
    ) -> Result<Vec<SearchResult>> {
        let query_embedding = self.embedder.embed(query).await?;
        self.store
            .search(collection, &query_embedding, top_k, threshold)
            .await
    }

    /// Retrieve with a selectable strategy.
    ///
    /// Lexical strategies re-rank the semantic candidate set: the store
    /// returns `top_k * 2` candidates and BM25/fuzzy/RRF order them.
    pub async fn retrieve_with_strategy(
        &self,
        query: &str,
        collection: &str,
        strategy: SearchStrategy,
        top_k: usize,
        threshold: f32,
    ) -> Result<Vec<SearchResult>> {
        if matches!(strategy, SearchStrategy::Semantic) {
            return self.retrieve(query, collection, top_k, threshold).await;
        }

        let candidates = self
            .retrieve(query, collection, top_k * 2, threshold)
            .await?;
        if candidates.is_empty() {
            return Ok(candidates);
        }

        let mut engine = SearchEngine::new();
        for result in &candidates {
            engine.index_document(&result.document);
        }

        let ranked = match strategy {
            SearchStrategy::Bm25 => engine.search_bm25(query, top_k),
            SearchStrategy::Fuzzy => engine.search_fuzzy(query, top_k),
            SearchStrategy::Hybrid => {
                let semantic: Vec<(String, f32)> = candidates
                    .iter()
                    .map(|r| (r.document.id.clone(), r.score))
                    .collect();
                engine.search_hybrid(query, &semantic, &HybridWeights::default(), top_k)
            }
            SearchStrategy::Semantic => unreachable!(),
        };

        Ok(ranked
            .into_iter()
            .filter_map(|(id, score)| {
                candidates
                    .iter()
                    .find(|r| r.document.id == id)
                    .map(|r| SearchResult {
                        document: r.document.clone(),
                        score,
                    })
            })
            .collect())
    }

    /// Answer a question from the collection's content.
    ///
    /// When nothing relevant is retrieved the pipeline does not guess: it
    /// returns a fixed no-context answer and no sources.
    pub async fn answer(&self, query: &str, collection: &str) -> Result<RagAnswer> {
        self.answer_with(query, collection, self.top_k, self.threshold)
            .await
    }

    /// `answer` with explicit retrieval parameters.
    pub async fn answer_with(
        &self,
        query: &str,
        collection: &str,
        top_k: usize,
        threshold: f32,
    ) -> Result<RagAnswer> {
        let results = self.retrieve(query, collection, top_k, threshold).await?;

        if results.is_empty() {
            warn!(collection, query, "no relevant context retrieved");
            return Ok(RagAnswer {
                answer: NO_CONTEXT_ANSWER.to_string(),
                model: self.llm.model_name().to_string(),
                sources: Vec::new(),
            });
        }

        let prompt = PromptBuilder::default().build(query, &results);
        let answer = self
            .llm
            .generate_with_system(PromptBuilder::SYSTEM_PROMPT, &prompt)
            .await?;

        let sources = results
            .iter()
            .map(|r| SourceAttribution {
                id: r.document.id.clone(),
                title: r.document.metadata.title.clone(),
                source: r.document.metadata.source.clone(),
                score: r.score,
            })
            .collect();

        Ok(RagAnswer {
            answer,
            model: self.llm.model_name().to_string(),
            sources,
        })
    }
}

/// Answer returned when retrieval comes back empty.
pub const NO_CONTEXT_ANSWER: &str =
    "I could not find any relevant content in the indexed documents to answer this question.";

/// Assembles the context prompt handed to the LLM.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    /// Hard cap on context passages, independent of retrieval depth.
    max_context_chunks: usize,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self {
            max_context_chunks: 10,
        }
    }
}

impl PromptBuilder {
    pub const SYSTEM_PROMPT: &'static str = "You are a careful assistant answering questions \
        from provided document excerpts. Use only the numbered context passages to answer. \
        If the passages do not contain the answer, say so. Cite passage numbers like [1] \
        where relevant.";

    pub fn new(max_context_chunks: usize) -> Self {
        Self { max_context_chunks }
    }

    /// Build the user prompt: numbered passages, then the question.
    pub fn build(&self, query: &str, results: &[SearchResult]) -> String {
        let mut prompt = String::from("Context passages:\n\n");

        for (i, result) in results.iter().take(self.max_context_chunks).enumerate() {
            let title = &result.document.metadata.title;
            if title.is_empty() {
                prompt.push_str(&format!("[{}] {}\n\n", i + 1, result.document.content));
            } else {
                prompt.push_str(&format!(
                    "[{}] ({}) {}\n\n",
                    i + 1,
                    title,
                    result.document.content
                ));
            }
        }

        prompt.push_str(&format!("Question: {}\n\nAnswer:", query));
        prompt
    }
}
