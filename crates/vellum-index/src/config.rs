//! Configuration for vellum-index.

use std::path::PathBuf;

/// Database configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Config {
    /// Directory to store data on disk. `None` keeps everything in memory.
    pub data_path: Option<PathBuf>,

    /// HNSW parameters applied to new collections.
    pub hnsw: HnswConfig,

    /// Persist automatically after mutating operations.
    pub auto_persist: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: None,
            hnsw: HnswConfig::default(),
            auto_persist: false,
        }
    }
}

impl Config {
    /// In-memory configuration. Data is lost when the process exits.
    pub fn memory() -> Self {
        Self::default()
    }

    /// Persistent configuration. Collections are reloaded from `path` on open.
    pub fn persistent<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            data_path: Some(path.into()),
            auto_persist: true,
            ..Self::default()
        }
    }

    /// Override the HNSW parameters.
    pub fn with_hnsw(mut self, hnsw: HnswConfig) -> Self {
        self.hnsw = hnsw;
        self
    }
}

/// HNSW index parameters.
///
/// These trade search accuracy against speed and memory.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HnswConfig {
    /// Maximum connections per element per layer. Typical 12-48.
    pub m: usize,

    /// Candidate list size during construction. Typical 100-500.
    pub ef_construction: usize,

    /// Candidate list size during search. Must be >= the requested k.
    pub ef_search: usize,

    /// Use multiple threads for batch insertion.
    pub parallel_construction: bool,
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self {
            m: 16,
            ef_construction: 200,
            ef_search: 100,
            parallel_construction: true,
        }
    }
}

impl HnswConfig {
    /// Lower accuracy, faster construction and search.
    pub fn fast() -> Self {
        Self {
            m: 8,
            ef_construction: 100,
            ef_search: 50,
            parallel_construction: true,
        }
    }

    /// Higher accuracy at the cost of memory and speed.
    pub fn accurate() -> Self {
        Self {
            m: 32,
            ef_construction: 400,
            ef_search: 200,
            parallel_construction: true,
        }
    }

    /// Set the M parameter.
    pub fn with_m(mut self, m: usize) -> Self {
        self.m = m;
        self
    }

    /// Set ef_construction.
    pub fn with_ef_construction(mut self, ef: usize) -> Self {
        self.ef_construction = ef;
        self
    }

    /// Set ef_search.
    pub fn with_ef_search(mut self, ef: usize) -> Self {
        self.ef_search = ef;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_config_has_no_path() {
        let config = Config::memory();
        assert!(config.data_path.is_none());
        assert!(!config.auto_persist);
    }

    #[test]
    fn persistent_config_enables_auto_persist() {
        let config = Config::persistent("/tmp/vellum");
        assert!(config.data_path.is_some());
        assert!(config.auto_persist);
    }

    #[test]
    fn hnsw_presets_ordering() {
        assert!(HnswConfig::fast().m < HnswConfig::accurate().m);
        assert!(HnswConfig::fast().ef_construction < HnswConfig::accurate().ef_construction);
    }
}
