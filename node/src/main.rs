use std::env;
use std::sync::Arc;

use log::info;

use ledger_common::block::Block;
use ledger_common::crypto::{Case, Hash};
use ledger_common::{BlockStore, GenesisConfig};
use ledger_node::config::{NodeConfig, DEFAULT_P2P_BIND_ADDRESS};
use ledger_node::store::{MemoryStore, SledStore};
use ledger_node::{connect, miner, start};

fn install_logger() {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}: {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(log::LevelFilter::Info)
        .chain(std::io::stdout())
        .apply()
        .expect("failed to install logger");
}

// A deterministic devnet genesis: content_hash and timestamp are pinned at
// zero, so every node that boots this binary mines the identical genesis
// (mining is a pure function of those inputs) and they can interoperate
// without a genesis file to distribute. Real deployments hand `start` a
// `GenesisConfig` read from wherever they like; this binary just needs one
// to exist (config *file* loading is out of scope, see spec §1).
async fn dev_genesis() -> GenesisConfig {
    let mut block = Block::new(Hash::zero(), 0);
    block.parent_hash = Hash::zero();
    let sealed = block.seal();
    let mined = miner::mine(sealed, Default::default())
        .await
        .expect("devnet genesis mining is never cancelled");

    GenesisConfig {
        timestamp: mined.timestamp,
        nonce: mined.nonce,
        parent_hash: mined.parent_hash,
        content_hash: mined.content_hash,
        component_hash: mined.component_hash,
        hash: mined.hash,
    }
}

// `ledgerd [bind_address] [seed_uri] [store_path]`. Not a `clap`-based CLI
// on purpose (argument-parsing frameworks are an out-of-scope collaborator,
// spec §1); this is the thin composition root that builds config values and
// calls the library.
#[tokio::main]
async fn main() {
    install_logger();

    let mut args = env::args().skip(1);
    let bind_address = args
        .next()
        .unwrap_or_else(|| DEFAULT_P2P_BIND_ADDRESS.to_string());
    let seed_uri = args.next();
    let store_path = args.next();

    let config = NodeConfig::default().with_bind_address(bind_address);
    let genesis = dev_genesis().await;
    info!("genesis sealed at {}", genesis.hash.readable_short(Case::Lower));

    let store: Arc<dyn BlockStore> = match store_path {
        Some(path) => Arc::new(SledStore::open(&path).expect("failed to open disk store")),
        None => Arc::new(MemoryStore::new()),
    };

    let handle = start(config, genesis, store).await.expect("failed to start node");
    info!("node listening on {}", handle.uri);

    if let Some(uri) = seed_uri {
        connect(&handle, uri);
    }

    tokio::signal::ctrl_c().await.ok();
    info!("shutting down");
}
