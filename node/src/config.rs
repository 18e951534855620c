// Default bind address for the P2P listener.
pub const DEFAULT_P2P_BIND_ADDRESS: &str = "0.0.0.0:2125";

// Channel size for a Peer's outbound frame queue.
pub const PEER_CHANNEL_SIZE: usize = 256;

// Channel size for Logic's inbound mailbox.
pub const LOGIC_CHANNEL_SIZE: usize = 1024;

// millis until we give up on a Connector's dial attempt.
pub const CONNECT_TIMEOUT_MILLIS: u64 = 5_000;

// millis Logic waits for a Peer's registration RPC (`on_client_socket`) to complete
// before the caller closes the socket itself.
pub const CLIENT_SOCKET_HANDOFF_TIMEOUT_MILLIS: u64 = 2_000;

// Seconds between outbound liveness pings.
pub const PING_INTERVAL_SECS: u64 = 10;

/// Runtime configuration for a single node, overridable by the embedder
/// (tests construct this directly instead of parsing argv).
#[derive(Clone, Debug)]
pub struct NodeConfig {
    pub bind_address: String,
    pub peer_channel_size: usize,
    pub logic_channel_size: usize,
    pub connect_timeout_millis: u64,
    pub ping_interval_secs: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig {
            bind_address: DEFAULT_P2P_BIND_ADDRESS.to_string(),
            peer_channel_size: PEER_CHANNEL_SIZE,
            logic_channel_size: LOGIC_CHANNEL_SIZE,
            connect_timeout_millis: CONNECT_TIMEOUT_MILLIS,
            ping_interval_secs: PING_INTERVAL_SECS,
        }
    }
}

impl NodeConfig {
    pub fn with_bind_address(mut self, address: impl Into<String>) -> Self {
        self.bind_address = address.into();
        self
    }
}
