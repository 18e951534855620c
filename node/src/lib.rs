// Ledger node library
// Exposes internal modules for integration testing

#[macro_use]
extern crate log;

pub mod config;
pub mod error;
pub mod handle;
pub mod logic;
pub mod miner;
pub mod p2p;
pub mod registry;
pub mod store;

pub use error::NodeError;
pub use handle::{connect, start, NodeHandle};
