//! # Tessera Core
//!
//! Pure Rust Tendermint light client verification logic.
//!
//! This crate contains **no networking code** and **no persistence**. Headers,
//! commits and proofs come in from whatever source the caller trusts least;
//! nothing from them is believed until it passes through these functions.
//!
//! ## Trust Model
//!
//! - **Trust anchor** (`LightClient::initialize_trust`): a header and its
//!   validator sets obtained out of band. Everything else is derived from it.
//!
//! - **Header verification** (`consensus` module): a header is accepted when
//!   more than 2/3 of its own validator set signed it, and either the previous
//!   trusted header named that validator set (sequential) or at least the trust
//!   level (default 1/3) of the trusted validator power signed it too
//!   (bisection). Trust expires after the configured trust period.
//!
//! - **Proof verification** (`ibc` module): key/value proofs are folded to a
//!   root and compared with the app hash of a header trusted at exactly the
//!   proof's height.
//!
//! ## Usage
//!
//! ```ignore
//! use tessera_core::{LightClient, LightClientConfig};
//!
//! let client = LightClient::new(LightClientConfig::new("cosmoshub-4"))?;
//! client.initialize_trust(&header, &validators, &next_validators, now)?;
//! client.verify_header(&next_header, &vals, &next_vals, &commit, now)?;
//! client.verify_ibc_proof(height, &proof)?;
//! ```

pub mod config;
pub mod consensus;
pub mod ibc;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export commonly used types for convenience
pub use config::{BisectionTimestampPolicy, ConfigError, LightClientConfig, TrustThreshold};
pub use consensus::{
    commit::{verify_commit, verify_commit_signatures, verify_overlap, VerificationError},
    light_client::LightClient,
    store::TrustedState,
    sync::{skip_to_height, HeaderSource, SyncError},
};
pub use ibc::proof::{compute_proof_root, verify_proof_against_root, ProofError};
pub use types::{
    block::{BlockHeader, Commit, CommitSig, LightBlock},
    ibc::{Proof, ProofOp},
    primitives::{Address, Hash, PublicKey, Signature},
    validator::{Validator, ValidatorSet},
};
