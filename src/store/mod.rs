//! Vector store backends.
//!
//! The [`VectorStore`] trait abstracts over the supported vector databases;
//! [`VectorStoreProvider`] selects one at runtime or from the environment.
//! The embedded store is the local-first default; Qdrant and ChromaDB cover
//! server deployments.

/// Trait, provider selection, and the in-memory test store.
pub mod vectorstore;

#[cfg(feature = "chromadb")]
pub mod chroma;

#[cfg(feature = "embedded-store")]
pub mod embedded;

#[cfg(feature = "qdrant")]
pub mod qdrant;

pub use vectorstore::{
    CollectionInfo, CollectionStats, InMemoryStore, VectorStore, VectorStoreProvider,
};

#[cfg(feature = "embedded-store")]
pub use embedded::EmbeddedStore;
