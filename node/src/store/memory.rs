use async_trait::async_trait;
use ledger_common::{Block, BlockStore, Hash, StoreError};
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory block store, for tests and ephemeral (devnet-style) nodes.
#[derive(Default)]
pub struct MemoryStore {
    blocks: Mutex<HashMap<Hash, Block>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            blocks: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl BlockStore for MemoryStore {
    async fn store(&self, block: Block) -> Result<Block, StoreError> {
        self.blocks
            .lock()
            .unwrap()
            .entry(block.hash)
            .or_insert_with(|| block.clone());
        Ok(block)
    }

    async fn find_by_hash(&self, hash: &Hash) -> Result<Block, StoreError> {
        self.blocks
            .lock()
            .unwrap()
            .get(hash)
            .cloned()
            .ok_or(StoreError::NotFound)
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
        self.blocks
            .lock()
            .unwrap()
            .remove(hash)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.blocks.lock().unwrap().len() as u64)
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.blocks.lock().unwrap().clear();
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
    async fn store_is_idempotent_for_equal_blocks() {
        let store = MemoryStore::new();
        let b = block(0, 1);
        store.store(b.clone()).await.unwrap();
        store.store(b.clone()).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn find_by_hash_and_height_requires_both_to_match() {
        let store = MemoryStore::new();
        let b = block(5, 2);
        store.store(b.clone()).await.unwrap();
        assert!(store.find_by_hash_and_height(&b.hash, 5).await.is_ok());
        assert!(store.find_by_hash_and_height(&b.hash, 6).await.is_err());
    }

    #[tokio::test]
    async fn remove_and_clear() {
        let store = MemoryStore::new();
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
