//! # btc_lottery
//!
//! Draws random Bitcoin keys and checks whether their addresses hold funds.
//!
//! ## Architecture
//!
//! - `crypto`: Key generation, public key derivation, P2PKH address encoding
//! - `balance`: Balance providers, retry policy, provider health probe
//! - `worker`: Draw pool, result tally and offline generation
//! - `config`: Runtime configuration

pub mod balance;
pub mod config;
pub mod crypto;
pub mod worker;

pub use balance::{BalanceError, BalanceLookup, ProviderKind};
pub use config::Config;
pub use crypto::{
    derive_public_key, encode_address, generate_key_and_address, generate_private_key, Address,
    CryptoError, KeyRecord, Keypair,
};
pub use worker::{DrawOutcome, DrawPool, DrawResult, Tally};
