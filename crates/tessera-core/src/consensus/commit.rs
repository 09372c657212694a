use crate::config::TrustThreshold;
use crate::ibc::proof::ProofError;
use crate::types::block::Commit;
use crate::types::primitives::{Address, Hash};
use crate::types::validator::ValidatorSet;
use ed25519_dalek::VerifyingKey;
use std::fmt;
use thiserror::Error;

/// Which header commitment a validator set was checked against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HashField {
    Validators,
    NextValidators,
}

impl fmt::Display for HashField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashField::Validators => f.write_str("validators_hash"),
            HashField::NextValidators => f.write_str("next_validators_hash"),
        }
    }
}

/// Errors that can occur while verifying headers, commits and proofs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerificationError {
    #[error("No trusted state: initialize trust before verifying headers")]
    NoTrustedState,

    #[error("Trust expired: latest trusted state from {trusted_at} is older than {trust_period}s at {now}")]
    TrustExpired {
        trusted_at: u64,
        now: u64,
        trust_period: u64,
    },

    #[error("Chain id mismatch: expected {expected:?}, got {got:?}")]
    ChainIdMismatch { expected: String, got: String },

    #[error("Invalid header height 0")]
    InvalidHeight,

    #[error("Header time {header_time} is more than {max_drift}s ahead of now ({now})")]
    FutureTimestamp {
        header_time: u64,
        now: u64,
        max_drift: u64,
    },

    #[error("Header {field} is empty")]
    EmptyValidatorHash { field: HashField },

    #[error("Validator set hash {computed} does not match header {field} {expected}")]
    ValidatorSetHashMismatch {
        field: HashField,
        expected: Hash,
        computed: Hash,
    },

    #[error("Commit block id {block_id} does not match header hash {header_hash}")]
    CommitBlockIdMismatch { header_hash: Hash, block_id: Hash },

    #[error("Commit height {commit_height} does not match header height {header_height}")]
    CommitHeightMismatch {
        header_height: u64,
        commit_height: u64,
    },

    #[error("Validator set {got} is not the next validator set {expected} promised by the trusted header")]
    SequentialContinuityMismatch { expected: Hash, got: Hash },

    #[error("Insufficient commit power: {signing_power}/{total} signed (need at least {required})")]
    InsufficientCommitPower {
        signing_power: u64,
        required: u64,
        total: u64,
    },

    #[error("Invalid commit signature from validator {address}: {reason}")]
    InvalidCommitSignature { address: Address, reason: String },

    #[error("Insufficient overlap with trusted validators: {overlap_power}/{total} signed (need {trust_level} of total)")]
    InsufficientOverlapPower {
        overlap_power: u64,
        total: u64,
        trust_level: TrustThreshold,
    },

    #[error("Header time {untrusted_time} is not ordered against trusted header time {trusted_time}")]
    NonMonotonicTimestamp {
        trusted_time: u64,
        untrusted_time: u64,
    },

    #[error("A different header is already trusted at height {height}")]
    ConflictingTrustedHeader { height: u64 },

    #[error("No trusted state at height {height}")]
    NoTrustedStateAtHeight { height: u64 },

    #[error(transparent)]
    Proof(#[from] ProofError),
}

impl VerificationError {
    /// True when nothing but a fresh `initialize_trust` can make progress.
    pub fn requires_reinitialization(&self) -> bool {
        matches!(self, VerificationError::TrustExpired { .. })
    }
}

/// Outcome of tallying a commit against a validator set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VotingPowerTally {
    pub total: u64,
    pub signing_power: u64,
    pub required: u64,
}

/// Minimum power for a valid commit: strictly more than 2/3 of `total`,
/// i.e. `floor(total * 2/3) + 1`.
pub fn required_commit_power(total: u64) -> u64 {
    (total as u128 * 2 / 3) as u64 + 1
}

/// Check that a commit carries more than 2/3 of `validator_set`'s voting power.
///
/// This only tallies power. Pair it with [`verify_commit_signatures`] unless
/// the signatures were already checked elsewhere.
pub fn verify_commit(
    validator_set: &ValidatorSet,
    commit: &Commit,
) -> Result<VotingPowerTally, VerificationError> {
    let total = validator_set.total_voting_power();
    let signing_power = validator_set.compute_voting_power(&commit.signing_addresses());
    let required = required_commit_power(total);

    if signing_power < required {
        return Err(VerificationError::InsufficientCommitPower {
            signing_power,
            required,
            total,
        });
    }

    Ok(VotingPowerTally {
        total,
        signing_power,
        required,
    })
}

/// Verify every signature in `commit` from a member of `validator_set`.
///
/// Each signature must be a valid Ed25519 signature by the member's declared
/// key over [`Commit::sign_bytes`]. Signatures from addresses outside the set
/// are skipped: they add no power to any tally against this set.
pub fn verify_commit_signatures(
    validator_set: &ValidatorSet,
    commit: &Commit,
    chain_id: &str,
) -> Result<(), VerificationError> {
    let message = commit.sign_bytes(chain_id);

    for sig in &commit.signatures {
        let Some(validator) = validator_set.get_validator(&sig.validator_address) else {
            continue;
        };

        let key = VerifyingKey::from_bytes(validator.pub_key.as_bytes()).map_err(|e| {
            VerificationError::InvalidCommitSignature {
                address: sig.validator_address,
                reason: format!("invalid public key: {}", e),
            }
        })?;
        let signature = ed25519_dalek::Signature::from_bytes(sig.signature.as_bytes());

        key.verify_strict(&message, &signature)
            .map_err(|e| VerificationError::InvalidCommitSignature {
                address: sig.validator_address,
                reason: e.to_string(),
            })?;
    }

    Ok(())
}

/// Check that the commit's signers include at least `trust_level` of the
/// trusted validator set's power.
///
/// Power is measured with the trusted set's weights, not whatever the
/// untrusted set claims for the same addresses.
pub fn verify_overlap(
    trusted_validators: &ValidatorSet,
    commit: &Commit,
    trust_level: TrustThreshold,
) -> Result<VotingPowerTally, VerificationError> {
    let total = trusted_validators.total_voting_power();
    let overlap_power = trusted_validators.compute_voting_power(&commit.signing_addresses());

    if !trust_level.is_enough_power(overlap_power, total) {
        return Err(VerificationError::InsufficientOverlapPower {
            overlap_power,
            total,
            trust_level,
        });
    }

    Ok(VotingPowerTally {
        total,
        signing_power: overlap_power,
        required: required_overlap_power(total, trust_level),
    })
}

/// Smallest integer power satisfying `trust_level` of `total`.
fn required_overlap_power(total: u64, trust_level: TrustThreshold) -> u64 {
    let numerator = total as u128 * trust_level.numerator as u128;
    numerator.div_ceil(trust_level.denominator as u128) as u64
}
