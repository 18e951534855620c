use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::task::AbortHandle;

use crate::error::NodeError;
use crate::logic::LogicHandle;
use crate::p2p::Direction;

// A bound TCP acceptor. Owns nothing beyond its own accept loop's abort
// handle: every accepted socket is hand off to Logic immediately, which
// spawns the inbound Peer that actually owns it.
pub struct ListenerHandle {
    local_addr: SocketAddr,
    abort: AbortHandle,
}

impl ListenerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn shutdown(&self) {
        self.abort.abort();
    }
}

pub async fn bind(bind_address: &str, logic: LogicHandle) -> Result<ListenerHandle, NodeError> {
    let tcp = TcpListener::bind(bind_address).await?;
    let local_addr = tcp.local_addr()?;
    info!("listener: bound on {}", local_addr);

    let join = tokio::spawn(accept_loop(tcp, logic));
    Ok(ListenerHandle {
        local_addr,
        abort: join.abort_handle(),
    })
}

async fn accept_loop(tcp: TcpListener, logic: LogicHandle) {
    loop {
        match tcp.accept().await {
            Ok((stream, addr)) => {
                debug!("listener: accepted inbound connection from {}", addr);
                let logic = logic.clone();
                tokio::spawn(async move {
                    if let Err(e) = logic.on_client_socket(stream, addr, Direction::Inbound).await {
                        warn!("listener: handoff to logic failed for {}: {}", addr, e);
                    }
                });
            }
            Err(e) => {
                error!("listener: accept failed, terminating: {}", e);
                logic.on_listener_terminating(e.to_string()).await;
                break;
            }
        }
    }
}
