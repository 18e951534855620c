use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::error::NodeError;
use crate::logic::LogicHandle;
use crate::p2p::{parse_uri, Direction};

// Dials `uri` once. On success the socket is handed to `logic`, which spawns
// the outbound Peer, and this future resolves `Ok(())`. Connection-refused
// is logged at warn and treated as a normal exit (no retry here — that is
// the supervisor's call per spec §4.8); any other error is returned so a
// caller-side retry policy can act on it.
pub async fn connect(uri: String, logic: LogicHandle, dial_timeout_millis: u64) -> Result<(), NodeError> {
    let (host, port) = parse_uri(&uri)?;
    let addr = format!("{}:{}", host, port);

    let stream = match timeout(
        Duration::from_millis(dial_timeout_millis),
        TcpStream::connect(&addr),
    )
    .await
    {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::ConnectionRefused => {
            warn!("connector: {} refused the connection", uri);
            return Ok(());
        }
        Ok(Err(e)) => {
            error!("connector: dial to {} failed: {}", uri, e);
            return Err(NodeError::Io(e));
        }
        Err(_) => {
            error!("connector: dial to {} timed out", uri);
            return Err(NodeError::DialTimeout);
        }
    };

    let peer_addr = stream.peer_addr()?;
    info!("connector: connected to {}", uri);
    logic.on_client_socket(stream, peer_addr, Direction::Outbound).await?;
    Ok(())
}
