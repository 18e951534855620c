use std::path::Path;

use async_trait::async_trait;

use ledger_common::message::{decode_block, encode_block};
use ledger_common::{Block, BlockStore, Hash, StoreError};

// Disk-backed block store: one sled tree keyed by the raw 32-byte hash, value
// = the block's wire-codec encoding (`ledger_common::message::encode_block`).
// `find_by_hash_and_height` decodes and compares rather than maintaining a
// secondary height index — blocks are small and lookups are not hot.
pub struct SledStore {
    tree: sled::Tree,
}

impl SledStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = sled::open(path).map_err(|e| StoreError::Backend(e.to_string()))?;
        let tree = db
            .open_tree("blocks")
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(SledStore { tree })
    }
}

#[async_trait]
impl BlockStore for SledStore {
    async fn store(&self, block: Block) -> Result<Block, StoreError> {
        let key = *block.hash.as_bytes();
        let already_present = self
            .tree
            .contains_key(key)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        if already_present {
            trace!("sled store: {} already present, no-op", block.hash);
            return Ok(block);
        }
        debug!("sled store: persisting block {} at height {}", block.hash, block.height);
        self.tree
            .insert(key, encode_block(&block))
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(block)
    }

    async fn find_by_hash(&self, hash: &Hash) -> Result<Block, StoreError> {
        let bytes = self
            .tree
            .get(hash.as_bytes())
            .map_err(|e| StoreError::Backend(e.to_string()))?
            .ok_or(StoreError::NotFound)?;
        decode_block(&bytes).map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn find_by_hash_and_height(&self, hash: &Hash, height: u64) -> Result<Block, StoreError> {
        let block = self.find_by_hash(hash).await?;
        if block.height == height {
            Ok(block)
        } else {
            Err(StoreError::NotFound)
        }
    }

    async fn remove(&self, hash: &Hash) -> Result<(), StoreError> {
        let removed = self
            .tree
            .remove(hash.as_bytes())
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        removed.map(|_| ()).ok_or(StoreError::NotFound)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.tree.len() as u64)
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.tree
            .clear()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(height: u64, hash_byte: u8) -> Block {
        Block {
            height,
            timestamp: 0,
            parent_hash: Hash::zero(),
            content_hash: Hash::zero(),
            component_hash: Hash::zero(),
            nonce: 0,
            hash: Hash::new([hash_byte; 32]),
        }
    }

    #[tokio::test]
    async fn persists_and_reopens_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let b = block(3, 7);
        {
            let store = SledStore::open(dir.path()).unwrap();
            store.store(b.clone()).await.unwrap();
        }
        let store = SledStore::open(dir.path()).unwrap();
        let found = store.find_by_hash(&b.hash).await.unwrap();
        assert_eq!(found, b);
    }

    #[tokio::test]
    async fn store_is_idempotent_for_equal_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledStore::open(dir.path()).unwrap();
        let b = block(0, 1);
        store.store(b.clone()).await.unwrap();
        store.store(b.clone()).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn find_by_hash_and_height_requires_both_to_match() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledStore::open(dir.path()).unwrap();
        let b = block(5, 2);
        store.store(b.clone()).await.unwrap();
        assert!(store.find_by_hash_and_height(&b.hash, 5).await.is_ok());
        assert!(store.find_by_hash_and_height(&b.hash, 6).await.is_err());
    }

    #[tokio::test]
    async fn remove_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledStore::open(dir.path()).unwrap();
        let b = block(0, 3);
        store.store(b.clone()).await.unwrap();
        store.remove(&b.hash).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
        assert_eq!(store.remove(&b.hash).await.unwrap_err(), StoreError::NotFound);

        store.store(b.clone()).await.unwrap();
        store.clear().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
