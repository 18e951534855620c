#![allow(clippy::module_inception)]

pub mod block;
pub mod codec;
pub mod crypto;
pub mod difficulty;
pub mod genesis;
pub mod message;
pub mod store;
pub mod time;

pub use block::{Block, BlockError};
pub use crypto::Hash;
pub use genesis::GenesisConfig;
pub use store::{BlockStore, StoreError};
