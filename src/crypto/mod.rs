//! Cryptographic operations for Bitcoin key and address generation.
//!
//! This module provides:
//! - Secure random private key generation on secp256k1
//! - Compressed public key derivation
//! - Legacy P2PKH address encoding (hash160 + base-58-check)

mod address;
mod keypair;

pub use address::{
    checksum, decode_address, encode_address, hash160, Address, ADDRESS_VERSION, CHECKSUM_LEN,
    HASH160_LEN, PAYLOAD_LEN,
};
pub use keypair::{
    derive_public_key, generate_key_and_address, generate_private_key, generate_private_key_with,
    KeyRecord, Keypair, PrivateKey, PublicKey, PRIVATE_KEY_LEN, PUBLIC_KEY_LEN,
};

/// Errors raised by the key derivation pipeline and the address codec.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    #[error("secure randomness source unavailable: {0}")]
    EntropyUnavailable(String),

    #[error("private key is zero or not below the curve order")]
    InvalidScalar,

    #[error("public key must be {expected} bytes, got {actual}")]
    InvalidPublicKeyLength { expected: usize, actual: usize },

    #[error("address is not valid base58: {0}")]
    InvalidBase58(String),

    #[error("decoded address must be {expected} bytes, got {actual}")]
    InvalidAddressLength { expected: usize, actual: usize },

    #[error("address checksum mismatch")]
    ChecksumMismatch,

    #[error("unsupported address version byte 0x{0:02x}")]
    UnsupportedVersion(u8),
}
