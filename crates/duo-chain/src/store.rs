//! Directory-backed chain store with a TTL cache (§5, §9 "Global chain
//! cache"). The cache holds the most recently loaded instance per chain
//! UUID; writers must invalidate explicitly rather than rely on the TTL
//! alone, since a stale cached instance would silently discard an append.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use duo_core::{ChainId, DuoError};
use parking_lot::RwLock;

use crate::chain::Chain;
use crate::persistence;

struct CachedChain {
    chain: Chain,
    loaded_at: Instant,
}

/// Caches chains loaded from `dir` for up to `ttl`. One store per
/// `DUO_CHAIN_PATH` directory is expected; callers share it via `Arc`.
pub struct ChainStore {
    dir: PathBuf,
    ttl: Duration,
    cache: RwLock<HashMap<ChainId, CachedChain>>,
}

impl ChainStore {
    pub fn new(dir: impl Into<PathBuf>, ttl_secs: u64) -> Self {
        Self {
            dir: dir.into(),
            ttl: Duration::from_secs(ttl_secs),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }

    fn chain_path(&self, uuid: &ChainId) -> PathBuf {
        persistence::chain_file_path(&self.dir, uuid)
    }

    /// Create a fresh, empty chain file. Fails if one already exists.
    pub fn init_chain(&self, uuid: ChainId, seed: impl Into<String>) -> Result<Chain, DuoError> {
        let path = self.chain_path(&uuid);
        if path.exists() {
            return Err(DuoError::InvariantViolation(format!(
                "chain {} already exists",
                uuid.as_str()
            )));
        }
        let chain = Chain::new(uuid, seed);
        persistence::save(&chain, &path)?;
        self.invalidate(&chain.uuid);
        tracing::info!(chain = %chain.uuid, path = %path.display(), "chain initialized");
        Ok(chain)
    }

    /// Load a chain, serving a cached copy if it was loaded within `ttl`.
    pub fn get_chain(&self, uuid: &ChainId) -> Result<Chain, DuoError> {
        if let Some(cached) = self.cache.read().get(uuid) {
            if cached.loaded_at.elapsed() < self.ttl {
                return Ok(cached.chain.clone());
            }
        }
        let path = self.chain_path(uuid);
        let chain = persistence::load(&path)?;
        self.cache.write().insert(
            uuid.clone(),
            CachedChain {
                chain: chain.clone(),
                loaded_at: Instant::now(),
            },
        );
        Ok(chain)
    }

    /// Persist `chain` and invalidate its cache entry immediately — the
    /// explicit hook the TTL alone cannot provide.
    pub fn save_chain(&self, chain: &Chain) -> Result<(), DuoError> {
        let path = self.chain_path(&chain.uuid);
        persistence::save(chain, &path)?;
        self.invalidate(&chain.uuid);
        tracing::debug!(chain = %chain.uuid, height = chain.height(), "chain saved");
        Ok(())
    }

    pub fn invalidate(&self, uuid: &ChainId) {
        self.cache.write().remove(uuid);
        tracing::trace!(chain = %uuid, "cache entry invalidated");
    }

    /// Every chain UUID with a file in `dir`, scanning `chain_*.json` and
    /// skipping `_vcbidx` sidecar files.
    pub fn get_chains(&self) -> Result<Vec<ChainId>, DuoError> {
        let mut out = Vec::new();
        let entries = std::fs::read_dir(&self.dir)?;
        for entry in entries {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            let Some(rest) = name.strip_prefix("chain_") else {
                continue;
            };
            let Some(uuid) = rest.strip_suffix(".json") else {
                continue;
            };
            if uuid.ends_with("_vcbidx") {
                continue;
            }
            out.push(ChainId(uuid.to_string()));
        }
        Ok(out)
    }

    pub fn delete_chain(&self, uuid: &ChainId) -> Result<(), DuoError> {
        let path = self.chain_path(uuid);
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        let idx = persistence::index_path(&path);
        if idx.exists() {
            std::fs::remove_file(&idx)?;
        }
        self.invalidate(uuid);
        Ok(())
    }
}
