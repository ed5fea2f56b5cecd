//! Legacy Bitcoin (P2PKH) address representation and base-58-check codec.

use std::fmt;
use std::str::FromStr;

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use super::keypair::PUBLIC_KEY_LEN;
use super::CryptoError;

/// Version byte of a mainnet pay-to-pubkey-hash address.
pub const ADDRESS_VERSION: u8 = 0x00;
/// Length of a hash160 digest.
pub const HASH160_LEN: usize = 20;
/// Length of version byte + hash160.
pub const PAYLOAD_LEN: usize = 1 + HASH160_LEN;
/// Length of the base-58-check checksum.
pub const CHECKSUM_LEN: usize = 4;

/// A legacy P2PKH address: version byte plus the hash160 of a public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address([u8; PAYLOAD_LEN]);

impl Address {
    /// Creates an address from a public key hash.
    #[inline]
    pub fn from_hash160(hash: [u8; HASH160_LEN]) -> Self {
        let mut payload = [0u8; PAYLOAD_LEN];
        payload[0] = ADDRESS_VERSION;
        payload[1..].copy_from_slice(&hash);
        Self(payload)
    }

    /// Returns the 21-byte payload (version byte followed by hash160).
    #[inline]
    pub const fn payload(&self) -> &[u8; PAYLOAD_LEN] {
        &self.0
    }

    /// Returns the version byte.
    #[inline]
    pub const fn version(&self) -> u8 {
        self.0[0]
    }

    /// Returns the public key hash.
    pub fn hash160(&self) -> &[u8] {
        &self.0[1..]
    }

    /// Returns the base-58-check encoding of the address.
    pub fn to_base58(&self) -> String {
        let mut data = Vec::with_capacity(PAYLOAD_LEN + CHECKSUM_LEN);
        data.extend_from_slice(&self.0);
        data.extend_from_slice(&checksum(&self.0));
        bs58::encode(data).into_string()
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_base58())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base58())
    }
}

impl FromStr for Address {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let payload = decode_address(s)?;
        if payload[0] != ADDRESS_VERSION {
            return Err(CryptoError::UnsupportedVersion(payload[0]));
        }
        Ok(Self(payload))
    }
}

/// RIPEMD-160 of the SHA-256 digest of `data`.
pub fn hash160(data: &[u8]) -> [u8; HASH160_LEN] {
    let sha = Sha256::digest(data);
    Ripemd160::digest(sha).into()
}

/// First four bytes of the double SHA-256 of `data`.
pub fn checksum(data: &[u8]) -> [u8; CHECKSUM_LEN] {
    let digest = Sha256::digest(Sha256::digest(data));
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest[..CHECKSUM_LEN]);
    out
}

/// Encodes a compressed public key as a legacy P2PKH address.
///
/// Process:
/// 1. SHA-256 the 33-byte public key
/// 2. RIPEMD-160 the digest (20 bytes)
/// 3. Prepend the version byte `0x00`
/// 4. Append the first 4 bytes of the double SHA-256 of the payload
/// 5. Base-58 encode the 25 bytes
pub fn encode_address(public_key: &[u8]) -> Result<Address, CryptoError> {
    if public_key.len() != PUBLIC_KEY_LEN {
        return Err(CryptoError::InvalidPublicKeyLength {
            expected: PUBLIC_KEY_LEN,
            actual: public_key.len(),
        });
    }
    Ok(Address::from_hash160(hash160(public_key)))
}

/// Decodes a base-58-check string and returns its verified payload.
///
/// The version byte is returned as-is; [`Address::from_str`] additionally
/// rejects anything other than [`ADDRESS_VERSION`].
pub fn decode_address(encoded: &str) -> Result<[u8; PAYLOAD_LEN], CryptoError> {
    let data = bs58::decode(encoded)
        .into_vec()
        .map_err(|e| CryptoError::InvalidBase58(e.to_string()))?;

    if data.len() != PAYLOAD_LEN + CHECKSUM_LEN {
        return Err(CryptoError::InvalidAddressLength {
            expected: PAYLOAD_LEN + CHECKSUM_LEN,
            actual: data.len(),
        });
    }

    let (payload, check) = data.split_at(PAYLOAD_LEN);
    if checksum(payload) != check {
        return Err(CryptoError::ChecksumMismatch);
    }

    let mut out = [0u8; PAYLOAD_LEN];
    out.copy_from_slice(payload);
    Ok(out)
}
