use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use ledger_common::codec::{read_frame, write_frame};
use ledger_common::message::{message_from_term, message_to_term, Message};

use crate::error::NodeError;

// Read half of a split socket, used by a Peer's read loop. Demand-driven:
// one frame is decoded per call, never buffered ahead.
pub struct ConnectionReader {
    inner: OwnedReadHalf,
}

impl ConnectionReader {
    pub async fn read_message(&mut self) -> Result<Message, NodeError> {
        let term = read_frame(&mut self.inner).await?;
        Ok(message_from_term(&term)?)
    }
}

// Write half of a split socket, used by a Peer's write loop. Writes are
// serialized by construction: only one task ever holds this half.
pub struct ConnectionWriter {
    inner: OwnedWriteHalf,
}

impl ConnectionWriter {
    pub async fn write_message(&mut self, message: &Message) -> Result<(), NodeError> {
        let term = message_to_term(message);
        write_frame(&mut self.inner, &term).await?;
        Ok(())
    }
}

// Splits an owned socket into independent read/write halves so a Peer's
// reader and writer can run as separate tasks without sharing the socket.
pub fn split(stream: TcpStream) -> (ConnectionReader, ConnectionWriter) {
    let (read_half, write_half) = stream.into_split();
    (
        ConnectionReader { inner: read_half },
        ConnectionWriter { inner: write_half },
    )
}
