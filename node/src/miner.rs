use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ledger_common::crypto::{perform_joined, HashPart};
use ledger_common::difficulty::difficulty;
use ledger_common::Block;

// Finds a nonce for `block` (already sealed: `component_hash` set) such that
// the resulting `hash` meets `difficulty(height)` leading zero bytes. Does
// not re-seal. Runs on a blocking worker so the async runtime stays free,
// and is checked against `cancel` between iterations.
pub async fn mine(block: Block, cancel: Arc<AtomicBool>) -> Option<Block> {
    tokio::task::spawn_blocking(move || mine_blocking(block, cancel))
        .await
        .expect("miner worker panicked")
}

fn mine_blocking(mut block: Block, cancel: Arc<AtomicBool>) -> Option<Block> {
    let target = difficulty(block.height) as usize;
    let mut nonce = 0u64;
    loop {
        if cancel.load(Ordering::Relaxed) {
            trace!("miner: cancelled searching for block at height {} (nonce {})", block.height, nonce);
            return None;
        }
        let candidate = perform_joined(&[
            HashPart::Bytes(block.component_hash.as_bytes()),
            HashPart::Int(nonce),
        ]);
        if candidate.ensure_hardness(target).is_ok() {
            block.nonce = nonce;
            block.hash = candidate;
            return Some(block);
        }
        if log_enabled!(log::Level::Trace) && nonce % 100_000 == 0 && nonce > 0 {
            trace!("miner: still searching at height {}, nonce {}", block.height, nonce);
        }
        nonce += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_common::crypto::{Case, Hash};

    #[tokio::test]
    async fn mines_the_empty_block_at_nonce_224() {
        let block = Block::new(Hash::zero(), 0).seal();
        let mined = mine(block, Default::default()).await.unwrap();
        assert_eq!(mined.nonce, 224);
        assert_eq!(mined.hash.readable_short(Case::Lower), "00551db3");
    }

    #[tokio::test]
    async fn mined_block_satisfies_the_difficulty_it_was_mined_for() {
        let block = Block::new(Hash::zero(), 0).seal();
        let mined = mine(block, Default::default()).await.unwrap();
        assert!(mined
            .hash
            .ensure_hardness(difficulty(mined.height) as usize)
            .is_ok());
    }

    #[tokio::test]
    async fn cancellation_stops_the_search_before_a_solution_is_found() {
        let block = Block::new(Hash::zero(), 0).seal();
        let cancel = Arc::new(AtomicBool::new(true));
        assert!(mine(block, cancel).await.is_none());
    }
}
