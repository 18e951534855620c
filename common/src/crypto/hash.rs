use sha2::{Digest, Sha256};
use std::fmt::{Display, Error, Formatter};
use thiserror::Error;

pub const HASH_SIZE: usize = 32; // 32 bytes / 256 bits

#[derive(Eq, PartialEq, PartialOrd, Ord, Clone, Copy, Debug, Hash)]
pub struct Hash([u8; HASH_SIZE]);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Case {
    Lower,
    Upper,
}

impl Default for Case {
    fn default() -> Self {
        Case::Lower
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum HashError {
    #[error("invalid hex length, expected {} chars", HASH_SIZE * 2)]
    InvalidLength,
    #[error("invalid hex character")]
    InvalidHex,
    #[error("unmet difficulty")]
    UnmetDifficulty,
}

impl Hash {
    pub const fn new(bytes: [u8; HASH_SIZE]) -> Self {
        Hash(bytes)
    }

    // All-zero hash; marks the parent of genesis.
    pub const fn zero() -> Self {
        Hash([0u8; HASH_SIZE])
    }

    // All-0xFF hash; a "not yet set" sentinel.
    pub const fn invalid() -> Self {
        Hash([0xFFu8; HASH_SIZE])
    }

    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    pub fn to_bytes(self) -> [u8; HASH_SIZE] {
        self.0
    }

    // 64-char hex; `case` defaults to lower.
    pub fn readable(&self, case: Case) -> String {
        let hex = hex::encode(self.0);
        match case {
            Case::Lower => hex,
            Case::Upper => hex.to_uppercase(),
        }
    }

    // First 8 hex chars of `readable`.
    pub fn readable_short(&self, case: Case) -> String {
        let full = self.readable(case);
        full[..8].to_string()
    }

    pub fn from_string(hex_str: &str) -> Result<Self, HashError> {
        if hex_str.len() != HASH_SIZE * 2 {
            return Err(HashError::InvalidLength);
        }
        let bytes = hex::decode(hex_str).map_err(|_| HashError::InvalidHex)?;
        let bytes: [u8; HASH_SIZE] = bytes.try_into().map_err(|_| HashError::InvalidLength)?;
        Ok(Hash(bytes))
    }

    // Succeeds iff the first `n` bytes are all zero.
    pub fn ensure_hardness(&self, n: usize) -> Result<(), HashError> {
        let n = n.min(HASH_SIZE);
        if self.0[..n].iter().all(|b| *b == 0) {
            Ok(())
        } else {
            Err(HashError::UnmetDifficulty)
        }
    }
}

impl Display for Hash {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{}", self.readable(Case::Lower))
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Hash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.readable(Case::Lower))
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Hash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Hash::from_string(&s).map_err(serde::de::Error::custom)
    }
}

// One piece of a joined hash input: either an already-decimal-stringified
// integer or raw bytes (a Hash is embedded this way, not re-hexed).
pub enum HashPart<'a> {
    Int(u64),
    Bytes(&'a [u8]),
}

// SHA-256 of a single byte slice.
#[inline(always)]
pub fn perform(bytes: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let result = hasher.finalize();
    let mut out = [0u8; HASH_SIZE];
    out.copy_from_slice(&result);
    Hash(out)
}

// SHA-256 of `parts` joined with ASCII `_`. Integers are decimal-stringified
// first; byte parts (including other Hashes) are embedded raw.
pub fn perform_joined(parts: &[HashPart]) -> Hash {
    let mut buf = Vec::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            buf.push(b'_');
        }
        match part {
            HashPart::Int(n) => buf.extend_from_slice(n.to_string().as_bytes()),
            HashPart::Bytes(b) => buf.extend_from_slice(b),
        }
    }
    perform(&buf)
}
