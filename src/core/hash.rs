//! Hashing and Packed Encoding
//!
//! Provides deterministic hashing for:
//! - Start-agreement digests (Keccak-256 over packed ABI encoding)
//! - Role identifiers and address derivation
//! - Move commitments (SHA-256 with domain separation)

use sha2::{Digest, Sha256};
use sha3::Keccak256;

use super::address::Address;

/// Hash output type (256 bits / 32 bytes)
pub type Hash32 = [u8; 32];

/// Prefix applied by `personal_sign` style signers to a 32-byte message.
pub const ETH_SIGNED_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

/// Keccak-256 of arbitrary data.
pub fn keccak256(data: &[u8]) -> Hash32 {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Digest signed by wallets that prefix the message (`eth_sign` / `personal_sign`).
pub fn eth_signed_message_hash(message_hash: &Hash32) -> Hash32 {
    let mut hasher = Keccak256::new();
    hasher.update(ETH_SIGNED_MESSAGE_PREFIX);
    hasher.update(message_hash);
    hasher.finalize().into()
}

/// Compute hash with domain separator.
pub fn sha256_with_domain(domain: &[u8], data: &[u8]) -> Hash32 {
    let mut hasher = Sha256::new();
    hasher.update(domain);
    hasher.update(data);
    hasher.finalize().into()
}

/// Left-pad an unsigned integer into a big-endian 32-byte word.
#[inline]
pub fn u256_word(value: u128) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Tightly packed ABI encoder (`abi.encodePacked`).
///
/// Addresses take 20 bytes, `uint256` values take 32 big-endian bytes.
/// Order of updates is the wire contract.
#[derive(Default, Clone)]
pub struct PackedEncoder {
    buf: Vec<u8>,
}

impl PackedEncoder {
    /// Create an empty encoder.
    pub fn new() -> Self {
        Self { buf: Vec::with_capacity(128) }
    }

    /// Append an address (20 bytes).
    #[inline]
    pub fn address(mut self, addr: &Address) -> Self {
        self.buf.extend_from_slice(addr.as_bytes());
        self
    }

    /// Append a `uint256`.
    #[inline]
    pub fn uint256(mut self, value: u128) -> Self {
        self.buf.extend_from_slice(&u256_word(value));
        self
    }

    /// Append a raw 32-byte word.
    #[inline]
    pub fn word(mut self, word: &Hash32) -> Self {
        self.buf.extend_from_slice(word);
        self
    }

    /// Append a single byte (`uint8`).
    #[inline]
    pub fn uint8(mut self, value: u8) -> Self {
        self.buf.push(value);
        self
    }

    /// Encoded bytes so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consume into the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Keccak-256 of the encoded bytes.
    pub fn keccak(&self) -> Hash32 {
        keccak256(&self.buf)
    }
}
