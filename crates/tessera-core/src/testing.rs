//! Fixtures for building signed test chains.
//!
//! Validators are identified by a one-byte seed; the seed doubles as the
//! Ed25519 secret key material, so the same seed always yields the same
//! address and signatures.

use crate::types::*;
use ed25519_dalek::{Signer, SigningKey};

pub(crate) const CHAIN_ID: &str = "tessera-test-1";

pub(crate) fn signing_key(seed: u8) -> SigningKey {
    SigningKey::from_bytes(&[seed; 32])
}

pub(crate) fn public_key_for(seed: u8) -> PublicKey {
    PublicKey(signing_key(seed).verifying_key().to_bytes())
}

pub(crate) fn address_for(seed: u8) -> Address {
    Address::from_public_key(&public_key_for(seed))
}

pub(crate) fn validator(seed: u8, power: u64) -> Validator {
    Validator::new(public_key_for(seed), power)
}

/// `members` are `(seed, voting_power)` pairs.
pub(crate) fn validator_set(members: &[(u8, u64)]) -> ValidatorSet {
    ValidatorSet::new(
        members
            .iter()
            .map(|&(seed, power)| validator(seed, power))
            .collect(),
    )
    .expect("fixture validator set")
}

pub(crate) fn app_hash_for(height: u64) -> Hash {
    Hash::digest_parts(&[b"app", &height.to_be_bytes()])
}

pub(crate) fn test_header(
    height: u64,
    time: u64,
    validators: &ValidatorSet,
    next_validators: &ValidatorSet,
) -> BlockHeader {
    BlockHeader {
        version: Version { block: 11, app: 1 },
        chain_id: CHAIN_ID.to_string(),
        height,
        time,
        last_block_id: Hash::digest(&height.saturating_sub(1).to_be_bytes()),
        last_commit_hash: Hash([0x01; 32]),
        data_hash: Hash([0x02; 32]),
        validators_hash: validators.hash(),
        next_validators_hash: next_validators.hash(),
        consensus_hash: Hash([0x03; 32]),
        app_hash: app_hash_for(height),
        last_results_hash: Hash([0x04; 32]),
        evidence_hash: Hash([0x05; 32]),
        proposer_address: validators.validators()[0].address,
    }
}

/// Commit to `header`, signed by the validators with the given seeds.
pub(crate) fn sign_commit(header: &BlockHeader, round: u32, signers: &[u8]) -> Commit {
    let mut commit = Commit {
        height: header.height,
        round,
        block_id: header.hash(),
        signatures: Vec::new(),
        timestamp: header.time,
    };
    let message = commit.sign_bytes(&header.chain_id);
    commit.signatures = signers
        .iter()
        .map(|&seed| CommitSig {
            validator_address: address_for(seed),
            signature: Signature(signing_key(seed).sign(&message).to_bytes()),
        })
        .collect();
    commit
}

/// A fully signed block. `signers` sign the commit; pass every member of
/// `validators` for a commit with full power.
pub(crate) fn light_block(
    height: u64,
    time: u64,
    validators: &[(u8, u64)],
    next_validators: &[(u8, u64)],
    signers: &[u8],
) -> LightBlock {
    let validator_set = validator_set(validators);
    let next_validator_set = validator_set_or_same(next_validators, &validator_set);
    let header = test_header(height, time, &validator_set, &next_validator_set);
    let commit = sign_commit(&header, 0, signers);
    LightBlock {
        header,
        validator_set,
        next_validator_set,
        commit,
    }
}

/// Re-sign a block after its header was edited.
pub(crate) fn resign(block: &mut LightBlock, signers: &[u8]) {
    block.commit = sign_commit(&block.header, block.commit.round, signers);
}

fn validator_set_or_same(members: &[(u8, u64)], same: &ValidatorSet) -> ValidatorSet {
    if members.is_empty() {
        same.clone()
    } else {
        validator_set(members)
    }
}

pub(crate) fn seeds(members: &[(u8, u64)]) -> Vec<u8> {
    members.iter().map(|&(seed, _)| seed).collect()
}
