use crate::crypto::{perform_joined, Hash, HashPart};
use crate::difficulty;
use crate::store::{BlockStore, StoreError};
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum BlockError {
    #[error("component hash mismatch")]
    ComponentHashMismatch,
    #[error("hash mismatch")]
    HashMismatch,
    #[error("unmet difficulty")]
    UnmetDifficulty,
    #[error("unknown parent")]
    UnknownParent,
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Block {
    pub height: u64,
    pub timestamp: u64,
    pub parent_hash: Hash,
    pub content_hash: Hash,
    pub component_hash: Hash,
    pub nonce: u64,
    pub hash: Hash,
}

impl Block {
    // height=0, parent_hash=invalid, other hashes=invalid, nonce=0.
    pub fn new(content_hash: Hash, timestamp: u64) -> Self {
        Block {
            height: 0,
            timestamp,
            parent_hash: Hash::invalid(),
            content_hash,
            component_hash: Hash::invalid(),
            nonce: 0,
            hash: Hash::invalid(),
        }
    }

    // height = parent.height + 1, parent_hash = parent.hash. Other fields untouched.
    pub fn as_child_of(mut self, parent: &Block) -> Self {
        self.height = parent.height + 1;
        self.parent_hash = parent.hash;
        self
    }

    fn compute_component_hash(&self) -> Hash {
        perform_joined(&[
            HashPart::Int(self.height),
            HashPart::Int(self.timestamp),
            HashPart::Bytes(self.parent_hash.as_bytes()),
            HashPart::Bytes(self.content_hash.as_bytes()),
        ])
    }

    fn compute_hash(&self) -> Hash {
        perform_joined(&[
            HashPart::Bytes(self.component_hash.as_bytes()),
            HashPart::Int(self.nonce),
        ])
    }

    // Fills `component_hash`. Idempotent: sealing twice yields identical bytes.
    pub fn seal(mut self) -> Self {
        self.component_hash = self.compute_component_hash();
        self
    }

    // Independently re-derives component_hash and hash and checks difficulty.
    // Errors are ordered: component mismatch, then hash mismatch, then difficulty.
    pub fn ensure_final(&self) -> Result<(), BlockError> {
        if self.component_hash != self.compute_component_hash() {
            return Err(BlockError::ComponentHashMismatch);
        }
        if self.hash != self.compute_hash() {
            return Err(BlockError::HashMismatch);
        }
        self.hash
            .ensure_hardness(difficulty(self.height) as usize)
            .map_err(|_| BlockError::UnmetDifficulty)
    }

    // True iff the parent is known to `store` and the block is internally final.
    pub async fn mined(&self, store: &dyn BlockStore) -> bool {
        self.ensure_known_parent(store).await.is_ok() && self.ensure_final().is_ok()
    }

    // Genesis (`parent_hash == zero`) is an explicit success.
    pub async fn ensure_known_parent(&self, store: &dyn BlockStore) -> Result<(), BlockError> {
        if self.parent_hash == Hash::zero() {
            return Ok(());
        }
        if self.height == 0 {
            return Err(BlockError::UnknownParent);
        }
        match store
            .find_by_hash_and_height(&self.parent_hash, self.height - 1)
            .await
        {
            Ok(_) => Ok(()),
            Err(StoreError::NotFound) => Err(BlockError::UnknownParent),
            Err(e) => Err(BlockError::Store(e)),
        }
    }

    // Ancestors, oldest first, walking via parent_hash. Does not include `self`.
    // `limit = None` means unbounded. Stops at a block with parent_hash == zero.
    pub async fn ancestry(
        &self,
        store: &dyn BlockStore,
        limit: Option<usize>,
    ) -> Result<Vec<Block>, BlockError> {
        let mut collected = Vec::new();
        let mut current_parent_hash = self.parent_hash;

        loop {
            if current_parent_hash == Hash::zero() {
                break;
            }
            if let Some(n) = limit {
                if collected.len() >= n {
                    break;
                }
            }
            let parent = store.find_by_hash(&current_parent_hash).await?;
            current_parent_hash = parent.parent_hash;
            collected.push(parent);
        }

        collected.reverse();
        Ok(collected)
    }

    // True iff any ancestor has hash equal to `target`. Propagates store errors
    // instead of collapsing a missing ancestor to `false`.
    pub async fn ancestry_contains(
        &self,
        store: &dyn BlockStore,
        target: &Hash,
    ) -> Result<bool, BlockError> {
        let ancestors = self.ancestry(store, None).await?;
        Ok(ancestors.iter().any(|b| &b.hash == target))
    }
}

// floor(h/128) + 1
pub fn difficulty(height: u64) -> u32 {
    difficulty::difficulty(height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::MapStore;

    fn empty_block() -> Block {
        Block::new(Hash::zero(), 0)
    }

    #[test]
    fn seal_is_idempotent() {
        let b = empty_block().seal();
        let b2 = b.clone().seal();
        assert_eq!(b.component_hash, b2.component_hash);
    }

    #[test]
    fn empty_block_seal_short_form() {
        let b = empty_block().seal();
        assert_eq!(
            b.component_hash.readable_short(crate::crypto::Case::Lower),
            "e3f001a9"
        );
    }

    #[tokio::test]
    async fn genesis_parent_is_always_known() {
        let store = MapStore::new();
        let mut genesis = empty_block().seal();
        genesis.parent_hash = Hash::zero();
        assert!(genesis.ensure_known_parent(&store).await.is_ok());
        let ancestry = genesis.ancestry(&store, None).await.unwrap();
        assert!(ancestry.is_empty());
    }

    #[tokio::test]
    async fn ancestry_excludes_self_and_walks_oldest_first() {
        let store = MapStore::new();

        let mut genesis = Block::new(Hash::zero(), 0).seal();
        genesis.parent_hash = Hash::zero();
        genesis.hash = genesis.compute_hash();
        store.store(genesis.clone()).await.unwrap();

        let mut a = Block::new(Hash::zero(), 1).as_child_of(&genesis).seal();
        a.hash = a.compute_hash();
        store.store(a.clone()).await.unwrap();

        let mut b = Block::new(Hash::zero(), 2).as_child_of(&a).seal();
        b.hash = b.compute_hash();
        store.store(b.clone()).await.unwrap();

        let ancestry = b.ancestry(&store, None).await.unwrap();
        assert_eq!(ancestry.len(), 2);
        assert_eq!(ancestry[0].height, 0);
        assert_eq!(ancestry[1].height, 1);
        assert!(!ancestry.iter().any(|blk| blk.hash == b.hash));
    }

    #[tokio::test]
    async fn ensure_final_orders_errors() {
        let mut b = empty_block().seal();
        b.hash = b.compute_hash();
        // Corrupt both component_hash and hash: component mismatch wins.
        b.component_hash = Hash::zero();
        assert_eq!(b.ensure_final().unwrap_err(), BlockError::ComponentHashMismatch);
    }
}
