use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

const TAG_ATOM: u8 = 0;
const TAG_UINT: u8 = 1;
const TAG_BYTES: u8 = 2;
const TAG_TUPLE: u8 = 3;

pub const MAX_FRAME_LEN: u32 = 16 * 1024 * 1024;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CodecError {
    #[error("unexpected end of input")]
    Eof,
    #[error("unknown term tag {0}")]
    UnknownTag(u8),
    #[error("atom too long")]
    AtomTooLong,
    #[error("trailing bytes after term")]
    TrailingBytes,
    #[error("frame exceeds max length")]
    FrameTooLarge,
    #[error("i/o error: {0}")]
    Io(String),
}

impl From<std::io::Error> for CodecError {
    fn from(e: std::io::Error) -> Self {
        CodecError::Io(e.to_string())
    }
}

// A self-describing tagged value: the unit of the wire protocol. Every
// message in `crate::message` is built from (and parsed back into) a Term.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Term {
    // A short textual tag, e.g. `:ping`.
    Atom(String),
    UInt(u64),
    Bytes(Vec<u8>),
    Tuple(Vec<Term>),
}

impl Term {
    pub fn tuple(items: impl IntoIterator<Item = Term>) -> Term {
        Term::Tuple(items.into_iter().collect())
    }
}

// Encodes `term` to its wire representation (no length prefix).
pub fn encode(term: &Term) -> Vec<u8> {
    let mut buf = Vec::new();
    write_term(term, &mut buf);
    buf
}

fn write_term(term: &Term, buf: &mut Vec<u8>) {
    match term {
        Term::Atom(s) => {
            buf.push(TAG_ATOM);
            let bytes = s.as_bytes();
            buf.push(bytes.len() as u8);
            buf.extend_from_slice(bytes);
        }
        Term::UInt(n) => {
            buf.push(TAG_UINT);
            buf.extend_from_slice(&n.to_be_bytes());
        }
        Term::Bytes(b) => {
            buf.push(TAG_BYTES);
            buf.extend_from_slice(&(b.len() as u32).to_be_bytes());
            buf.extend_from_slice(b);
        }
        Term::Tuple(items) => {
            buf.push(TAG_TUPLE);
            buf.extend_from_slice(&(items.len() as u32).to_be_bytes());
            for item in items {
                write_term(item, buf);
            }
        }
    }
}

// Decodes exactly one term from `bytes`; any trailing bytes are an error.
pub fn decode(bytes: &[u8]) -> Result<Term, CodecError> {
    let mut cursor = 0usize;
    let term = read_term(bytes, &mut cursor)?;
    if cursor != bytes.len() {
        return Err(CodecError::TrailingBytes);
    }
    Ok(term)
}

fn read_term(bytes: &[u8], cursor: &mut usize) -> Result<Term, CodecError> {
    let tag = *bytes.get(*cursor).ok_or(CodecError::Eof)?;
    *cursor += 1;
    match tag {
        TAG_ATOM => {
            // Length is a single byte, so an atom is capped at 255 bytes by construction.
            let len = *bytes.get(*cursor).ok_or(CodecError::Eof)? as usize;
            *cursor += 1;
            let slice = bytes.get(*cursor..*cursor + len).ok_or(CodecError::Eof)?;
            *cursor += len;
            let s = String::from_utf8(slice.to_vec()).map_err(|_| CodecError::AtomTooLong)?;
            Ok(Term::Atom(s))
        }
        TAG_UINT => {
            let slice = bytes.get(*cursor..*cursor + 8).ok_or(CodecError::Eof)?;
            *cursor += 8;
            let n = u64::from_be_bytes(slice.try_into().unwrap());
            Ok(Term::UInt(n))
        }
        TAG_BYTES => {
            let len_slice = bytes.get(*cursor..*cursor + 4).ok_or(CodecError::Eof)?;
            *cursor += 4;
            let len = u32::from_be_bytes(len_slice.try_into().unwrap()) as usize;
            let slice = bytes.get(*cursor..*cursor + len).ok_or(CodecError::Eof)?;
            *cursor += len;
            Ok(Term::Bytes(slice.to_vec()))
        }
        TAG_TUPLE => {
            let count_slice = bytes.get(*cursor..*cursor + 4).ok_or(CodecError::Eof)?;
            *cursor += 4;
            let count = u32::from_be_bytes(count_slice.try_into().unwrap()) as usize;
            let mut items = Vec::with_capacity(count.min(4096));
            for _ in 0..count {
                items.push(read_term(bytes, cursor)?);
            }
            Ok(Term::Tuple(items))
        }
        other => Err(CodecError::UnknownTag(other)),
    }
}

// Writes `term` as a 4-byte-big-endian length-prefixed frame.
pub async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    term: &Term,
) -> Result<(), CodecError> {
    let body = encode(term);
    writer.write_u32(body.len() as u32).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

// Reads one length-prefixed frame and decodes it. Returns `Eof` on a clean
// socket close at a frame boundary.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Term, CodecError> {
    let len = reader.read_u32().await?;
    if len > MAX_FRAME_LEN {
        return Err(CodecError::FrameTooLarge);
    }
    let mut body = vec![0u8; len as usize];
    reader.read_exact(&mut body).await?;
    decode(&body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_atoms_ints_bytes_and_tuples() {
        let term = Term::tuple([
            Term::Atom("foo".to_string()),
            Term::Bytes(b"bar".to_vec()),
        ]);
        let encoded = encode(&term);
        assert_eq!(decode(&encoded).unwrap(), term);
    }

    #[test]
    fn round_trips_nested_tuples() {
        let term = Term::tuple([
            Term::Atom("block_query".to_string()),
            Term::tuple([
                Term::Atom("ancestry".to_string()),
                Term::Bytes(vec![0u8; 32]),
            ]),
        ]);
        let encoded = encode(&term);
        assert_eq!(decode(&encoded).unwrap(), term);
    }

    #[test]
    fn rejects_trailing_bytes() {
        let mut encoded = encode(&Term::UInt(1));
        encoded.push(0xFF);
        assert_eq!(decode(&encoded).unwrap_err(), CodecError::TrailingBytes);
    }

    #[test]
    fn decode_random_bytes_errors_with_description() {
        let garbage = vec![0xFFu8; 4];
        let err = decode(&garbage).unwrap_err();
        assert!(!err.to_string().is_empty());
    }

    #[tokio::test]
    async fn frame_round_trips_over_an_in_memory_pipe() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        let term = Term::tuple([Term::Atom("ping".to_string()), Term::UInt(1)]);
        write_frame(&mut client, &term).await.unwrap();
        let decoded = read_frame(&mut server).await.unwrap();
        assert_eq!(decoded, term);
    }
}
