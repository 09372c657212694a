use crate::types::primitives::{Address, Hash, Signature};
use crate::types::validator::ValidatorSet;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

/// Domain tag prepended to every precommit sign-bytes payload.
pub const PRECOMMIT_DOMAIN: &[u8] = b"tessera/precommit/v1";

/// Block and application protocol versions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub block: u64,
    pub app: u64,
}

/// A Tendermint block header.
///
/// Everything the light client needs to check a block without its body:
/// the validator set commitments that chain headers together, and the
/// application state root that proofs are checked against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub version: Version,
    /// Chain this header belongs to. Must match the client's configured chain id.
    pub chain_id: String,
    pub height: u64,
    /// Block time, unix seconds.
    pub time: u64,
    /// Hash of the previous block's header.
    pub last_block_id: Hash,
    pub last_commit_hash: Hash,
    pub data_hash: Hash,
    /// Hash of the validator set that signs this block.
    pub validators_hash: Hash,
    /// Hash of the validator set that will sign the next block.
    pub next_validators_hash: Hash,
    pub consensus_hash: Hash,
    /// Application state root. Cross-chain proofs verify against this.
    pub app_hash: Hash,
    pub last_results_hash: Hash,
    pub evidence_hash: Hash,
    pub proposer_address: Address,
}

impl BlockHeader {
    /// Deterministic header hash.
    ///
    /// SHA256 over the fields in declaration order: integers as big-endian,
    /// the chain id prefixed with its length as u32 big-endian, hashes and the
    /// proposer address as raw bytes.
    pub fn hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.version.block.to_be_bytes());
        hasher.update(self.version.app.to_be_bytes());
        hasher.update((self.chain_id.len() as u32).to_be_bytes());
        hasher.update(self.chain_id.as_bytes());
        hasher.update(self.height.to_be_bytes());
        hasher.update(self.time.to_be_bytes());
        hasher.update(self.last_block_id);
        hasher.update(self.last_commit_hash);
        hasher.update(self.data_hash);
        hasher.update(self.validators_hash);
        hasher.update(self.next_validators_hash);
        hasher.update(self.consensus_hash);
        hasher.update(self.app_hash);
        hasher.update(self.last_results_hash);
        hasher.update(self.evidence_hash);
        hasher.update(self.proposer_address);
        Hash(hasher.finalize().into())
    }
}

/// One validator's precommit signature inside a commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSig {
    pub validator_address: Address,
    pub signature: Signature,
}

/// The +2/3 precommits that finalized a block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub height: u64,
    pub round: u32,
    /// Hash of the header being committed to.
    pub block_id: Hash,
    pub signatures: Vec<CommitSig>,
    /// Commit time, unix seconds.
    pub timestamp: u64,
}

impl Commit {
    /// Distinct addresses that signed this commit.
    /// A validator listed twice is still counted once.
    pub fn signing_addresses(&self) -> BTreeSet<Address> {
        self.signatures
            .iter()
            .map(|sig| sig.validator_address)
            .collect()
    }

    /// Canonical bytes every validator signs for this commit:
    /// `domain || len(chain_id) u32 BE || chain_id || height u64 BE || round u32 BE || block_id || timestamp u64 BE`.
    pub fn sign_bytes(&self, chain_id: &str) -> Vec<u8> {
        let mut out = Vec::with_capacity(PRECOMMIT_DOMAIN.len() + 4 + chain_id.len() + 8 + 4 + 32 + 8);
        out.extend_from_slice(PRECOMMIT_DOMAIN);
        out.extend_from_slice(&(chain_id.len() as u32).to_be_bytes());
        out.extend_from_slice(chain_id.as_bytes());
        out.extend_from_slice(&self.height.to_be_bytes());
        out.extend_from_slice(&self.round.to_be_bytes());
        out.extend_from_slice(&self.block_id.0);
        out.extend_from_slice(&self.timestamp.to_be_bytes());
        out
    }
}

/// Everything a header source hands over for one height.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightBlock {
    pub header: BlockHeader,
    pub validator_set: ValidatorSet,
    pub next_validator_set: ValidatorSet,
    pub commit: Commit,
}

impl LightBlock {
    pub fn height(&self) -> u64 {
        self.header.height
    }
}
