use ledger_common::message::MessageError;
use ledger_common::{BlockError, StoreError};
use thiserror::Error;
use std::io;

#[derive(Error, Debug)]
pub enum NodeError {
    #[error("block error: {0}")]
    Block(#[from] BlockError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("message error: {0}")]
    Message(#[from] MessageError),
    #[error("codec error: {0}")]
    Codec(#[from] ledger_common::codec::CodecError),
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("dial timed out")]
    DialTimeout,
    #[error("invalid uri: {0}")]
    InvalidUri(String),
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),
    #[error("logic actor unavailable")]
    LogicUnavailable,
}
