//! Bitcoin keypair generation.

use std::fmt;

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use secp256k1::{Secp256k1, SecretKey};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::{encode_address, Address, CryptoError};

/// Length of a raw private key.
pub const PRIVATE_KEY_LEN: usize = 32;
/// Length of a compressed SEC1 public key.
pub const PUBLIC_KEY_LEN: usize = 33;

/// A secp256k1 private scalar, wiped from memory when dropped.
#[derive(PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey([u8; PRIVATE_KEY_LEN]);

impl PrivateKey {
    /// Wraps raw bytes after checking they form a valid scalar in `[1, n-1]`.
    pub fn from_bytes(bytes: [u8; PRIVATE_KEY_LEN]) -> Result<Self, CryptoError> {
        SecretKey::from_slice(&bytes).map_err(|_| CryptoError::InvalidScalar)?;
        Ok(Self(bytes))
    }

    /// Returns the raw scalar bytes (big-endian).
    pub fn as_bytes(&self) -> &[u8; PRIVATE_KEY_LEN] {
        &self.0
    }

    /// Returns the private key as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// A compressed SEC1 public key: parity byte (`0x02`/`0x03`) and x-coordinate.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; PUBLIC_KEY_LEN]);

impl PublicKey {
    /// Returns the serialized point.
    pub const fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.0
    }

    /// Returns the public key as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

/// Draws a uniformly random private key from the operating system's CSPRNG.
///
/// Candidates equal to zero or not below the curve order are discarded and
/// redrawn, so the result is uniform over `[1, n-1]`. A failing entropy
/// source is reported immediately and never retried.
pub fn generate_private_key() -> Result<PrivateKey, CryptoError> {
    generate_private_key_with(&mut OsRng)
}

/// Same as [`generate_private_key`], drawing candidates from `rng`.
pub fn generate_private_key_with<R: RngCore + CryptoRng>(
    rng: &mut R,
) -> Result<PrivateKey, CryptoError> {
    let mut candidate = [0u8; PRIVATE_KEY_LEN];
    loop {
        rng.try_fill_bytes(&mut candidate)
            .map_err(|e| CryptoError::EntropyUnavailable(e.to_string()))?;

        if SecretKey::from_slice(&candidate).is_ok() {
            let key = PrivateKey(candidate);
            candidate.zeroize();
            return Ok(key);
        }
    }
}

/// Multiplies the secp256k1 base point by `private_key` and returns the
/// compressed encoding of the result.
pub fn derive_public_key(private_key: &PrivateKey) -> Result<PublicKey, CryptoError> {
    // Unreachable for keys built through this module
    let secret = SecretKey::from_slice(private_key.as_bytes())
        .map_err(|_| CryptoError::InvalidScalar)?;
    let secp = Secp256k1::signing_only();
    let point = secp256k1::PublicKey::from_secret_key(&secp, &secret);
    Ok(PublicKey(point.serialize()))
}

/// A private key with its derived public key and address.
#[derive(Debug)]
pub struct Keypair {
    private_key: PrivateKey,
    public_key: PublicKey,
    address: Address,
}

impl Keypair {
    /// Generates a new random keypair.
    pub fn generate() -> Result<Self, CryptoError> {
        Self::from_private_key(generate_private_key()?)
    }

    /// Derives a keypair from existing secret bytes.
    ///
    /// Fails with [`CryptoError::InvalidScalar`] if the bytes are zero or not
    /// below the curve order.
    pub fn from_secret_bytes(secret_bytes: [u8; PRIVATE_KEY_LEN]) -> Result<Self, CryptoError> {
        Self::from_private_key(PrivateKey::from_bytes(secret_bytes)?)
    }

    fn from_private_key(private_key: PrivateKey) -> Result<Self, CryptoError> {
        let public_key = derive_public_key(&private_key)?;
        let address = encode_address(public_key.as_bytes())?;
        Ok(Self {
            private_key,
            public_key,
            address,
        })
    }

    /// Returns the private key.
    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    /// Returns the private key as a hex string.
    pub fn private_key_hex(&self) -> String {
        self.private_key.to_hex()
    }

    #[inline]
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    #[inline]
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Converts the keypair into its printable form.
    pub fn to_record(&self) -> KeyRecord {
        KeyRecord {
            private_key_hex: self.private_key.to_hex(),
            public_key_hex: self.public_key.to_hex(),
            address: self.address.to_string(),
        }
    }
}

/// Printable output of one pipeline run.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct KeyRecord {
    /// Lowercase hex of the 32-byte private key
    pub private_key_hex: String,
    /// Lowercase hex of the 33-byte compressed public key
    pub public_key_hex: String,
    /// Base-58-check P2PKH address
    pub address: String,
}

impl fmt::Debug for KeyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyRecord")
            .field("private_key_hex", &"<redacted>")
            .field("public_key_hex", &self.public_key_hex)
            .field("address", &self.address)
            .finish()
    }
}

/// Generates one random key and returns it with its public key and address.
pub fn generate_key_and_address() -> Result<KeyRecord, CryptoError> {
    Ok(Keypair::generate()?.to_record())
}
