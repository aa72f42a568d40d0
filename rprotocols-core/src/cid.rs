// SPDX-License-Identifier: MIT OR Apache-2.0

//! Content identifiers for canonical document payloads.
//!
//! A `Cid` is laid out like a version 1 [CID]: version byte `0x01`, the `dag-cbor` codec `0x71`
//! (canonical bytes are CBOR), the BLAKE3-256 multihash code `0x1e`, digest length `0x20` and the
//! 32-byte BLAKE3 digest of the canonical bytes. Its string form is the multibase `base32`
//! encoding (lowercase RFC 4648 alphabet without padding, prefixed with `b`), which is what
//! external consumers compare.
//!
//! [CID]: https://github.com/multiformats/cid
use std::fmt;
use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;

use crate::canonical::{CanonicalError, canonical_bytes};

/// Size of BLAKE3 digests.
pub const DIGEST_LEN: usize = blake3::OUT_LEN;

/// CID version.
pub const CID_VERSION: u8 = 0x01;

/// Multicodec code of `dag-cbor`.
pub const DAG_CBOR_CODEC: u8 = 0x71;

/// Multihash code of BLAKE3.
pub const BLAKE3_MULTIHASH: u8 = 0x1e;

/// Multibase prefix of lowercase, unpadded base32.
pub const MULTIBASE_BASE32: char = 'b';

const PREFIX: [u8; 4] = [CID_VERSION, DAG_CBOR_CODEC, BLAKE3_MULTIHASH, DIGEST_LEN as u8];

/// Length of the binary representation (prefix and digest).
pub const CID_LEN: usize = PREFIX.len() + DIGEST_LEN;

const ALPHABET: base32::Alphabet = base32::Alphabet::Rfc4648 { padding: false };

/// Content identifier of a canonical document.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cid([u8; DIGEST_LEN]);

impl Cid {
    /// Calculate the identifier of the provided canonical bytes.
    pub fn from_canonical_bytes(bytes: impl AsRef<[u8]>) -> Self {
        Self(*blake3::hash(bytes.as_ref()).as_bytes())
    }

    /// Create a `Cid` from a raw BLAKE3 digest.
    pub const fn from_digest(digest: [u8; DIGEST_LEN]) -> Self {
        Self(digest)
    }

    /// BLAKE3 digest of the canonical bytes.
    pub fn digest(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Binary representation, prefix followed by the digest.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(CID_LEN);
        bytes.extend_from_slice(&PREFIX);
        bytes.extend_from_slice(&self.0);
        bytes
    }

    /// Convert the digest to a hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// Derives the content identifier of a document.
pub fn address_of(content: &Value) -> Result<Cid, CanonicalError> {
    Ok(Cid::from_canonical_bytes(canonical_bytes(content)?))
}

/// Recomputes the identifier of `content` and compares it with `expected`.
pub fn verify(content: &Value, expected: &Cid) -> Result<bool, CanonicalError> {
    Ok(&address_of(content)? == expected)
}

impl TryFrom<&[u8]> for Cid {
    type Error = CidError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        if value.len() != CID_LEN {
            return Err(CidError::InvalidLength(value.len(), CID_LEN));
        }

        let (prefix, digest) = value.split_at(PREFIX.len());
        if prefix != PREFIX {
            return Err(CidError::UnsupportedPrefix(hex::encode(prefix)));
        }

        let digest: [u8; DIGEST_LEN] = digest
            .try_into()
            .map_err(|_| CidError::InvalidLength(value.len(), CID_LEN))?;
        Ok(Self(digest))
    }
}

impl FromStr for Cid {
    type Err = CidError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut chars = value.chars();
        match chars.next() {
            Some(MULTIBASE_BASE32) => (),
            Some(other) => return Err(CidError::UnsupportedMultibase(other)),
            None => return Err(CidError::InvalidLength(0, CID_LEN)),
        }

        let encoded = chars.as_str();
        if encoded.bytes().any(|byte| byte.is_ascii_uppercase()) {
            return Err(CidError::InvalidEncoding);
        }

        let bytes = base32::decode(ALPHABET, &encoded.to_ascii_uppercase())
            .ok_or(CidError::InvalidEncoding)?;
        Self::try_from(bytes.as_slice())
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = base32::encode(ALPHABET, &self.to_bytes()).to_ascii_lowercase();
        write!(f, "{MULTIBASE_BASE32}{encoded}")
    }
}

impl fmt::Debug for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Cid").field(&self.to_string()).finish()
    }
}

/// Error types for `Cid` struct.
#[derive(Error, Debug)]
pub enum CidError {
    /// String does not use the base32 multibase encoding.
    #[error("unsupported multibase prefix '{0}', expected '{MULTIBASE_BASE32}'")]
    UnsupportedMultibase(char),

    /// String contains characters outside of the lowercase base32 alphabet.
    #[error("invalid base32 encoding in cid string")]
    InvalidEncoding,

    /// Binary cid has an invalid length.
    #[error("invalid cid length {0} bytes, expected {1} bytes")]
    InvalidLength(usize, usize),

    /// Version, codec or multihash are not the ones used by the registry.
    #[error("unsupported cid prefix 0x{0}")]
    UnsupportedPrefix(String),
}
