//! Canonical JSON persistence: a chain file plus its companion attestation
//! index (`path_stem + "_vcbidx" + ext`).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use duo_core::{Block, ChainId, DuoError};
use serde_json::{Map, Value};

use crate::chain::Chain;

/// Sibling index path for a chain file: `chain_<uuid>.json` →
/// `chain_<uuid>_vcbidx.json`.
pub fn index_path(chain_path: &Path) -> PathBuf {
    let stem = chain_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("chain");
    let ext = chain_path.extension().and_then(|s| s.to_str()).unwrap_or("json");
    let file_name = format!("{stem}_vcbidx.{ext}");
    chain_path.with_file_name(file_name)
}

/// The canonical on-disk name for a chain identified by `uuid` under `dir`.
pub fn chain_file_path(dir: &Path, uuid: &ChainId) -> PathBuf {
    dir.join(format!("chain_{}.json", uuid.as_str()))
}

pub fn save(chain: &Chain, path: &Path) -> Result<(), DuoError> {
    let blocks: Vec<Value> = chain.blocks.iter().map(Block::to_json).collect();
    let doc = serde_json::json!({
        "uuid": chain.uuid.as_str(),
        "seed": chain.seed,
        "blocks": blocks,
    });
    let pretty = serde_json::to_string_pretty(&doc)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, pretty)?;

    let idx_path = index_path(path);
    let mut close_blocks = Map::new();
    for (peer, block) in &chain.close_index {
        close_blocks.insert(peer.as_str().to_string(), block.to_json());
    }
    let idx_doc = serde_json::json!({ "verification_close_blocks": close_blocks });
    std::fs::write(idx_path, serde_json::to_string_pretty(&idx_doc)?)?;

    Ok(())
}

pub fn load(path: &Path) -> Result<Chain, DuoError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| DuoError::NotFound(format!("{}: {e}", path.display())))?;
    let doc: Value = serde_json::from_str(&raw)?;

    let uuid = doc
        .get("uuid")
        .and_then(Value::as_str)
        .ok_or_else(|| DuoError::InvariantViolation("chain file missing `uuid`".into()))?
        .to_string();
    let seed = doc
        .get("seed")
        .and_then(Value::as_str)
        .ok_or_else(|| DuoError::InvariantViolation("chain file missing `seed`".into()))?
        .to_string();
    let raw_blocks = doc
        .get("blocks")
        .and_then(Value::as_array)
        .ok_or_else(|| DuoError::InvariantViolation("chain file missing `blocks`".into()))?;

    let mut blocks = Vec::with_capacity(raw_blocks.len());
    for entry in raw_blocks {
        blocks.push(Block::from_json(entry)?);
    }

    let mut chain = Chain::new(ChainId(uuid), seed);
    chain.blocks = blocks;

    // A missing index file is non-fatal — it simply means no attestations
    // about this chain's peers have been recorded yet.
    let idx_path = index_path(path);
    if let Ok(idx_raw) = std::fs::read_to_string(&idx_path) {
        let idx_doc: Value = serde_json::from_str(&idx_raw)?;
        if let Some(map) = idx_doc.get("verification_close_blocks").and_then(Value::as_object) {
            let mut merged: BTreeMap<ChainId, Block> = BTreeMap::new();
            for (peer, block_json) in map {
                if let Ok(block) = Block::from_json(block_json) {
                    merged.insert(ChainId(peer.clone()), block);
                }
            }
            chain.close_index = merged;
        }
    }

    Ok(chain)
}
