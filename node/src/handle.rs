use std::sync::Arc;

use ledger_common::{Block, BlockStore, GenesisConfig};

use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::logic::{self, LogicHandle};
use crate::p2p::connector;
use crate::p2p::listener::{self, ListenerHandle};
use crate::p2p::supervisor::ChildSupervisor;
use crate::p2p::parse_uri;
use crate::registry::{self, Entry, Role};

// Opaque handle bundle addressing a running node's actors (spec §6).
#[derive(Clone)]
pub struct NodeHandle {
    pub uri: String,
    pub node: (String, u16),
    pub clients: Arc<ChildSupervisor>,
    pub connectors: Arc<ChildSupervisor>,
    pub logic: LogicHandle,
    pub listener: Arc<ListenerHandle>,
    connect_timeout_millis: u64,
}

impl NodeHandle {
    // Hands a locally-mined block to this node's Logic, taking the same
    // chain-extension path as a `{:announce, block}` frame arriving from a
    // peer (spec §4.6/§4.9).
    pub async fn announce(&self, block: Block) {
        self.logic.announce(block).await;
    }
}

// Starts a node bound to `config.bind_address`, or returns the already
// running node's handle if one is registered under the same explicit
// `(host, port)` (idempotent, spec §6). An ephemeral `:0` bind address
// always starts a fresh node, since the configured port carries no identity
// to deduplicate on until after the socket is actually bound.
pub async fn start(
    config: NodeConfig,
    genesis: GenesisConfig,
    store: Arc<dyn BlockStore>,
) -> Result<NodeHandle, NodeError> {
    let (host, configured_port) = parse_uri(&format!("tcp://{}", config.bind_address))?;

    if configured_port != 0 {
        if let Some(Entry::Node(existing)) = registry::lookup(&host, configured_port, Role::Node) {
            info!("node {}:{} already running, returning existing handle", host, configured_port);
            return Ok(existing);
        }
    }

    genesis.validate()?;

    let clients = Arc::new(ChildSupervisor::new());
    let connectors = Arc::new(ChildSupervisor::new());

    let logic_handle = logic::spawn(host.clone(), genesis, store, &config, clients.clone());
    let listener_handle = listener::bind(&config.bind_address, logic_handle.clone()).await?;
    let bound_port = listener_handle.local_addr().port();
    let uri = format!("tcp://{}:{}", host, bound_port);

    let handle = NodeHandle {
        uri: uri.clone(),
        node: (host.clone(), bound_port),
        clients: clients.clone(),
        connectors: connectors.clone(),
        logic: logic_handle.clone(),
        listener: Arc::new(listener_handle),
        connect_timeout_millis: config.connect_timeout_millis,
    };

    registry::register(host.clone(), bound_port, Role::Node, Entry::Node(handle.clone()));
    registry::register(host.clone(), bound_port, Role::Logic, Entry::Logic(logic_handle));
    registry::register(host.clone(), bound_port, Role::Clients, Entry::Supervisor(clients));
    registry::register(
        host.clone(),
        bound_port,
        Role::Connectors,
        Entry::Supervisor(connectors),
    );

    info!("node started on {}", uri);
    Ok(handle)
}

// Spawns a Connector to dial `uri`, tracked under the node's connector
// supervisor (spec §6/§4.8).
pub fn connect(handle: &NodeHandle, uri: impl Into<String>) {
    let uri = uri.into();
    let logic = handle.logic.clone();
    let connectors = handle.connectors.clone();
    let dial_timeout_millis = handle.connect_timeout_millis;

    let join = tokio::spawn(async move {
        if let Err(e) = connector::connect(uri.clone(), logic, dial_timeout_millis).await {
            error!("connector for {} exited with error: {}", uri, e);
        }
    });
    connectors.add(join);
}
