use crate::block::{Block, BlockError};
use crate::crypto::Hash;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// Genesis parameters injected at node startup. Unlike every other block,
// genesis's hash fields are not derived — they are configured values that
// must themselves pass `ensure_final`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GenesisConfig {
    pub timestamp: u64,
    pub nonce: u64,
    pub parent_hash: Hash,
    pub content_hash: Hash,
    pub component_hash: Hash,
    pub hash: Hash,
}

impl GenesisConfig {
    // Overlays the configured fields onto a zeroed block at height 0.
    pub fn block(&self) -> Block {
        Block {
            height: 0,
            timestamp: self.timestamp,
            parent_hash: self.parent_hash,
            content_hash: self.content_hash,
            component_hash: self.component_hash,
            nonce: self.nonce,
            hash: self.hash,
        }
    }

    // The configured genesis must independently pass the same finality
    // check as any other block, plus `height == 0` and `parent_hash == zero`.
    pub fn validate(&self) -> Result<(), BlockError> {
        let block = self.block();
        if block.height != 0 || block.parent_hash != Hash::zero() {
            return Err(BlockError::UnknownParent);
        }
        block.ensure_final()
    }
}
