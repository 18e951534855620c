use crate::block::Block;
use crate::codec::{CodecError, Term};
use crate::crypto::Hash;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MessageError {
    #[error("unknown block hash")]
    UnknownBlockHash,
    #[error("invalid block query")]
    InvalidBlockQuery,
    #[error("malformed message: {0}")]
    Malformed(String),
}

impl From<CodecError> for MessageError {
    fn from(e: CodecError) -> Self {
        MessageError::Malformed(e.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockQuery {
    Genesis,
    Highest,
    Ancestry(Hash),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockQueryResult {
    Block(Block),
    Blocks(Vec<Block>),
    Err(MessageError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    Ping(u64),
    Pong(u64),
    BlockQuery(BlockQuery),
    BlockResponse(BlockQueryResult),
    Announce(Block),
}

fn block_to_term(block: &Block) -> Term {
    Term::tuple([
        Term::UInt(block.height),
        Term::UInt(block.timestamp),
        Term::Bytes(block.parent_hash.as_bytes().to_vec()),
        Term::Bytes(block.content_hash.as_bytes().to_vec()),
        Term::Bytes(block.component_hash.as_bytes().to_vec()),
        Term::UInt(block.nonce),
        Term::Bytes(block.hash.as_bytes().to_vec()),
    ])
}

fn hash_from_bytes_term(term: &Term) -> Result<Hash, MessageError> {
    match term {
        Term::Bytes(b) => {
            let arr: [u8; 32] = b
                .as_slice()
                .try_into()
                .map_err(|_| MessageError::Malformed("hash must be 32 bytes".to_string()))?;
            Ok(Hash::new(arr))
        }
        _ => Err(MessageError::Malformed("expected bytes term for hash".to_string())),
    }
}

fn block_from_term(term: &Term) -> Result<Block, MessageError> {
    match term {
        Term::Tuple(items) if items.len() == 7 => {
            let height = match &items[0] {
                Term::UInt(n) => *n,
                _ => return Err(MessageError::Malformed("expected uint height".to_string())),
            };
            let timestamp = match &items[1] {
                Term::UInt(n) => *n,
                _ => return Err(MessageError::Malformed("expected uint timestamp".to_string())),
            };
            let parent_hash = hash_from_bytes_term(&items[2])?;
            let content_hash = hash_from_bytes_term(&items[3])?;
            let component_hash = hash_from_bytes_term(&items[4])?;
            let nonce = match &items[5] {
                Term::UInt(n) => *n,
                _ => return Err(MessageError::Malformed("expected uint nonce".to_string())),
            };
            let hash = hash_from_bytes_term(&items[6])?;
            Ok(Block {
                height,
                timestamp,
                parent_hash,
                content_hash,
                component_hash,
                nonce,
                hash,
            })
        }
        _ => Err(MessageError::Malformed("expected 7-tuple block term".to_string())),
    }
}

fn query_to_term(query: &BlockQuery) -> Term {
    match query {
        BlockQuery::Genesis => Term::Atom("genesis".to_string()),
        BlockQuery::Highest => Term::Atom("highest".to_string()),
        BlockQuery::Ancestry(h) => Term::tuple([
            Term::Atom("ancestry".to_string()),
            Term::Bytes(h.as_bytes().to_vec()),
        ]),
    }
}

fn query_from_term(term: &Term) -> Result<BlockQuery, MessageError> {
    match term {
        Term::Atom(tag) if tag == "genesis" => Ok(BlockQuery::Genesis),
        Term::Atom(tag) if tag == "highest" => Ok(BlockQuery::Highest),
        Term::Tuple(items) if items.len() == 2 => match &items[0] {
            Term::Atom(tag) if tag == "ancestry" => {
                Ok(BlockQuery::Ancestry(hash_from_bytes_term(&items[1])?))
            }
            _ => Err(MessageError::InvalidBlockQuery),
        },
        _ => Err(MessageError::InvalidBlockQuery),
    }
}

fn query_error_to_term(err: &MessageError) -> Term {
    let tag = match err {
        MessageError::UnknownBlockHash => "unknown_block_hash",
        MessageError::InvalidBlockQuery => "invalid_block_query",
        MessageError::Malformed(_) => "malformed",
    };
    Term::tuple([Term::Atom("error".to_string()), Term::Atom(tag.to_string())])
}

fn result_to_term(result: &BlockQueryResult) -> Term {
    match result {
        BlockQueryResult::Block(b) => block_to_term(b),
        BlockQueryResult::Blocks(blocks) => {
            Term::Tuple(blocks.iter().map(block_to_term).collect())
        }
        BlockQueryResult::Err(e) => query_error_to_term(e),
    }
}

fn result_from_term(term: &Term) -> Result<BlockQueryResult, MessageError> {
    match term {
        Term::Tuple(items) if items.len() == 2 && matches!(&items[0], Term::Atom(tag) if tag == "error") => {
            let kind = match &items[1] {
                Term::Atom(k) => k.clone(),
                _ => return Err(MessageError::Malformed("expected atom error kind".to_string())),
            };
            let err = match kind.as_str() {
                "unknown_block_hash" => MessageError::UnknownBlockHash,
                "invalid_block_query" => MessageError::InvalidBlockQuery,
                other => MessageError::Malformed(other.to_string()),
            };
            Ok(BlockQueryResult::Err(err))
        }
        // A lone block is a 7-tuple whose first element is the height (a uint).
        Term::Tuple(items) if items.len() == 7 && matches!(items[0], Term::UInt(_)) => {
            block_from_term(term).map(BlockQueryResult::Block)
        }
        // Anything else tuple-shaped is a list of block-tuples.
        Term::Tuple(items) => {
            let blocks = items
                .iter()
                .map(block_from_term)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(BlockQueryResult::Blocks(blocks))
        }
        _ => Err(MessageError::Malformed("unrecognised block query result".to_string())),
    }
}

pub fn message_to_term(message: &Message) -> Term {
    match message {
        Message::Ping(n) => Term::tuple([Term::Atom("ping".to_string()), Term::UInt(*n)]),
        Message::Pong(n) => Term::tuple([Term::Atom("pong".to_string()), Term::UInt(*n)]),
        Message::BlockQuery(q) => Term::tuple([
            Term::Atom("block_query".to_string()),
            query_to_term(q),
        ]),
        Message::BlockResponse(r) => Term::tuple([
            Term::Atom("block_response".to_string()),
            result_to_term(r),
        ]),
        Message::Announce(b) => Term::tuple([
            Term::Atom("announce".to_string()),
            block_to_term(b),
        ]),
    }
}

pub fn message_from_term(term: &Term) -> Result<Message, MessageError> {
    match term {
        Term::Tuple(items) if items.len() == 2 => match &items[0] {
            Term::Atom(tag) if tag == "ping" => Ok(Message::Ping(expect_uint(&items[1])?)),
            Term::Atom(tag) if tag == "pong" => Ok(Message::Pong(expect_uint(&items[1])?)),
            Term::Atom(tag) if tag == "block_query" => {
                Ok(Message::BlockQuery(query_from_term(&items[1])?))
            }
            Term::Atom(tag) if tag == "block_response" => {
                Ok(Message::BlockResponse(result_from_term(&items[1])?))
            }
            Term::Atom(tag) if tag == "announce" => {
                Ok(Message::Announce(block_from_term(&items[1])?))
            }
            _ => Err(MessageError::Malformed("unrecognised message tag".to_string())),
        },
        _ => Err(MessageError::Malformed("expected a 2-tuple message".to_string())),
    }
}

fn expect_uint(term: &Term) -> Result<u64, MessageError> {
    match term {
        Term::UInt(n) => Ok(*n),
        _ => Err(MessageError::Malformed("expected uint".to_string())),
    }
}

// Encodes a block with the same wire codec used for peer frames. The disk
// store persists exactly this encoding, so a block round-trips identically
// whether it travels over a socket or into `sled`.
pub fn encode_block(block: &Block) -> Vec<u8> {
    crate::codec::encode(&block_to_term(block))
}

pub fn decode_block(bytes: &[u8]) -> Result<Block, MessageError> {
    let term = crate::codec::decode(bytes)?;
    block_from_term(&term)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode, encode};

    fn sample_block() -> Block {
        Block::new(Hash::zero(), 42).seal()
    }

    fn round_trip(message: Message) {
        let term = message_to_term(&message);
        let bytes = encode(&term);
        let decoded_term = decode(&bytes).unwrap();
        let decoded_message = message_from_term(&decoded_term).unwrap();
        assert_eq!(decoded_message, message);
    }

    #[test]
    fn ping_pong_round_trip() {
        round_trip(Message::Ping(7));
        round_trip(Message::Pong(7));
    }

    #[test]
    fn block_query_variants_round_trip() {
        round_trip(Message::BlockQuery(BlockQuery::Genesis));
        round_trip(Message::BlockQuery(BlockQuery::Highest));
        round_trip(Message::BlockQuery(BlockQuery::Ancestry(Hash::zero())));
    }

    #[test]
    fn block_response_and_announce_round_trip() {
        let block = sample_block();
        round_trip(Message::BlockResponse(BlockQueryResult::Block(block.clone())));
        round_trip(Message::BlockResponse(BlockQueryResult::Blocks(vec![
            block.clone(),
            block.clone(),
        ])));
        round_trip(Message::BlockResponse(BlockQueryResult::Err(
            MessageError::UnknownBlockHash,
        )));
        round_trip(Message::Announce(block));
    }

    #[test]
    fn foo_bar_tuple_round_trip() {
        let term = Term::tuple([Term::Atom("foo".to_string()), Term::Bytes(b"bar".to_vec())]);
        let bytes = encode(&term);
        assert_eq!(decode(&bytes).unwrap(), term);
    }

    #[test]
    fn encode_block_decode_block_round_trip() {
        let block = sample_block();
        let bytes = encode_block(&block);
        assert_eq!(decode_block(&bytes).unwrap(), block);
    }
}
