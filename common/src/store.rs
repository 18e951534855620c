use crate::block::Block;
use crate::crypto::Hash;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum StoreError {
    #[error("block not found")]
    NotFound,
    #[error("backend error: {0}")]
    Backend(String),
}

// Content-addressed block persistence. Implementations must be safe to share
// across actors: every operation here is individually atomic.
#[async_trait]
pub trait BlockStore: Send + Sync {
    // Persists `block`, returning it unchanged. Storing an equal block twice
    // is a no-op.
    async fn store(&self, block: Block) -> Result<Block, StoreError>;

    async fn find_by_hash(&self, hash: &Hash) -> Result<Block, StoreError>;

    async fn find_by_hash_and_height(&self, hash: &Hash, height: u64) -> Result<Block, StoreError>;

    async fn remove(&self, hash: &Hash) -> Result<(), StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;

    // Test-only: drop every stored block.
    async fn clear(&self) -> Result<(), StoreError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    // A minimal in-memory BlockStore used only by unit tests in sibling
    // modules (the real in-memory backend lives in the node crate).
    pub struct MapStore {
        blocks: Mutex<HashMap<Hash, Block>>,
    }

    impl MapStore {
        pub fn new() -> Self {
            MapStore {
                blocks: Mutex::new(HashMap::new()),
            }
        }
    }

    #[async_trait]
    impl BlockStore for MapStore {
        async fn store(&self, block: Block) -> Result<Block, StoreError> {
            self.blocks.lock().unwrap().insert(block.hash, block.clone());
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

        async fn find_by_hash_and_height(
            &self,
            hash: &Hash,
            height: u64,
        ) -> Result<Block, StoreError> {
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
}
