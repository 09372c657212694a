use crate::config::{BisectionTimestampPolicy, ConfigError, LightClientConfig};
use crate::consensus::commit::{
    verify_commit, verify_commit_signatures, verify_overlap, HashField, VerificationError,
};
use crate::consensus::store::{check_validator_set_hashes, TrustedState, TrustedStore};
use crate::ibc::proof::{verify_proof_against_root, ProofError};
use crate::types::block::{BlockHeader, Commit, LightBlock};
use crate::types::ibc::Proof;
use crate::types::validator::ValidatorSet;
use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Which verification path accepted a header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerificationPath {
    /// Adjacent height, checked through the trusted next validator set hash.
    Sequential,
    /// Any other height, checked through validator overlap.
    Bisection,
}

/// Tendermint light client verification engine.
///
/// Owns the trusted state store. `verify_header` runs its checks under an
/// upgradable read lock, so verifications are serialized while readers keep
/// getting `Arc` snapshots of committed states. The lock is upgraded to a
/// write lock only to insert a state that passed every check, so a failed
/// verification never leaves anything behind.
///
/// Time is always passed in by the caller as unix seconds: the engine never
/// reads a clock.
pub struct LightClient {
    config: LightClientConfig,
    store: RwLock<TrustedStore>,
}

impl LightClient {
    pub fn new(config: LightClientConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            store: RwLock::new(TrustedStore::new()),
        })
    }

    pub fn config(&self) -> &LightClientConfig {
        &self.config
    }

    /// Install the trust anchor.
    ///
    /// The header and validator sets must be obtained out of band (embedded
    /// genesis, social checkpoint). Only the chain id and internal consistency
    /// are checked here. Any previously trusted states are discarded.
    pub fn initialize_trust(
        &self,
        header: &BlockHeader,
        validator_set: &ValidatorSet,
        next_validator_set: &ValidatorSet,
        now: u64,
    ) -> Result<Arc<TrustedState>, VerificationError> {
        if header.chain_id != self.config.chain_id {
            warn!(
                "Refusing trust anchor for chain {} (configured for {})",
                header.chain_id, self.config.chain_id
            );
            return Err(VerificationError::ChainIdMismatch {
                expected: self.config.chain_id.clone(),
                got: header.chain_id.clone(),
            });
        }

        let anchor = TrustedState::new(
            header.clone(),
            validator_set.clone(),
            next_validator_set.clone(),
            now,
        )?;

        let anchor = self.store.write().reset(anchor);
        info!(
            "Trust initialized at height {} (chain {}, {} validators)",
            anchor.height(),
            anchor.header().chain_id,
            anchor.validator_set().len()
        );
        Ok(anchor)
    }

    /// Verify an untrusted header against the latest trusted state and, if it
    /// checks out, trust it.
    ///
    /// The height picks the path: the immediate successor of the latest trusted
    /// height goes through sequential verification, anything else (skipping
    /// ahead, or revisiting a lower height) through bisection.
    pub fn verify_header(
        &self,
        untrusted_header: &BlockHeader,
        untrusted_validator_set: &ValidatorSet,
        untrusted_next_validator_set: &ValidatorSet,
        commit: &Commit,
        now: u64,
    ) -> Result<Arc<TrustedState>, VerificationError> {
        let store = self.store.upgradable_read();

        let result = self.verify_and_store(
            store,
            untrusted_header,
            untrusted_validator_set,
            untrusted_next_validator_set,
            commit,
            now,
        );

        if let Err(ref e) = result {
            warn!(
                "Rejected header at height {}: {}",
                untrusted_header.height, e
            );
        }
        result
    }

    /// [`LightClient::verify_header`] for a header source's bundle.
    pub fn verify_light_block(
        &self,
        block: &LightBlock,
        now: u64,
    ) -> Result<Arc<TrustedState>, VerificationError> {
        self.verify_header(
            &block.header,
            &block.validator_set,
            &block.next_validator_set,
            &block.commit,
            now,
        )
    }

    fn verify_and_store(
        &self,
        store: RwLockUpgradableReadGuard<'_, TrustedStore>,
        untrusted_header: &BlockHeader,
        untrusted_validator_set: &ValidatorSet,
        untrusted_next_validator_set: &ValidatorSet,
        commit: &Commit,
        now: u64,
    ) -> Result<Arc<TrustedState>, VerificationError> {
        // 1. We need something to verify against
        let trusted = store
            .latest()
            .cloned()
            .ok_or(VerificationError::NoTrustedState)?;

        // 2. ...and it must still be fresh
        self.check_trust_period(&trusted, now)?;

        // 3-4. Header fields and the commit's binding to this header
        self.validate_basic(untrusted_header, commit, now)?;

        // 5. Pick the path
        let path = if trusted.height().checked_add(1) == Some(untrusted_header.height) {
            self.verify_sequential(
                &trusted,
                untrusted_header,
                untrusted_validator_set,
                untrusted_next_validator_set,
                commit,
            )?;
            VerificationPath::Sequential
        } else {
            self.verify_bisection(
                &trusted,
                untrusted_header,
                untrusted_validator_set,
                untrusted_next_validator_set,
                commit,
            )?;
            VerificationPath::Bisection
        };

        // All checks passed, trust the header
        let state = TrustedState::new(
            untrusted_header.clone(),
            untrusted_validator_set.clone(),
            untrusted_next_validator_set.clone(),
            now,
        )?;
        let inserted = RwLockUpgradableReadGuard::upgrade(store).insert(state)?;

        debug!(
            "Verified header at height {} via {:?} (trusted height {})",
            untrusted_header.height,
            path,
            trusted.height()
        );
        if inserted.advanced {
            info!("Latest trusted height advanced to {}", untrusted_header.height);
        }

        Ok(inserted.state)
    }

    fn check_trust_period(&self, trusted: &TrustedState, now: u64) -> Result<(), VerificationError> {
        let age = now.saturating_sub(trusted.trusted_at());
        if age > self.config.trust_period_seconds {
            return Err(VerificationError::TrustExpired {
                trusted_at: trusted.trusted_at(),
                now,
                trust_period: self.config.trust_period_seconds,
            });
        }
        Ok(())
    }

    fn validate_basic(
        &self,
        header: &BlockHeader,
        commit: &Commit,
        now: u64,
    ) -> Result<(), VerificationError> {
        if header.chain_id != self.config.chain_id {
            return Err(VerificationError::ChainIdMismatch {
                expected: self.config.chain_id.clone(),
                got: header.chain_id.clone(),
            });
        }

        if header.height == 0 {
            return Err(VerificationError::InvalidHeight);
        }

        if header.time > now.saturating_add(self.config.max_clock_drift_seconds) {
            return Err(VerificationError::FutureTimestamp {
                header_time: header.time,
                now,
                max_drift: self.config.max_clock_drift_seconds,
            });
        }

        if header.validators_hash.is_empty() {
            return Err(VerificationError::EmptyValidatorHash {
                field: HashField::Validators,
            });
        }
        if header.next_validators_hash.is_empty() {
            return Err(VerificationError::EmptyValidatorHash {
                field: HashField::NextValidators,
            });
        }

        let header_hash = header.hash();
        if commit.block_id != header_hash {
            return Err(VerificationError::CommitBlockIdMismatch {
                header_hash,
                block_id: commit.block_id,
            });
        }

        if commit.height != header.height {
            return Err(VerificationError::CommitHeightMismatch {
                header_height: header.height,
                commit_height: commit.height,
            });
        }

        Ok(())
    }

    /// Strong-trust path for the immediate successor of the trusted header.
    fn verify_sequential(
        &self,
        trusted: &TrustedState,
        untrusted_header: &BlockHeader,
        untrusted_validator_set: &ValidatorSet,
        untrusted_next_validator_set: &ValidatorSet,
        commit: &Commit,
    ) -> Result<(), VerificationError> {
        check_validator_set_hashes(
            untrusted_header,
            untrusted_validator_set,
            untrusted_next_validator_set,
        )?;

        // The trusted header promised who would sign this block
        let expected = trusted.next_validator_set().hash();
        let got = untrusted_validator_set.hash();
        if got != expected {
            return Err(VerificationError::SequentialContinuityMismatch { expected, got });
        }

        self.verify_commit_power(untrusted_validator_set, commit)?;

        if untrusted_header.time <= trusted.header().time {
            return Err(VerificationError::NonMonotonicTimestamp {
                trusted_time: trusted.header().time,
                untrusted_time: untrusted_header.time,
            });
        }

        Ok(())
    }

    /// Weak-trust path for non-adjacent heights: the commit must be valid on
    /// its own, and enough of the validators we already trust must have signed it.
    fn verify_bisection(
        &self,
        trusted: &TrustedState,
        untrusted_header: &BlockHeader,
        untrusted_validator_set: &ValidatorSet,
        untrusted_next_validator_set: &ValidatorSet,
        commit: &Commit,
    ) -> Result<(), VerificationError> {
        check_validator_set_hashes(
            untrusted_header,
            untrusted_validator_set,
            untrusted_next_validator_set,
        )?;

        self.verify_commit_power(untrusted_validator_set, commit)?;

        if self.config.verify_signatures {
            verify_commit_signatures(trusted.next_validator_set(), commit, &self.config.chain_id)?;
        }
        let overlap = verify_overlap(trusted.next_validator_set(), commit, self.config.trust_level)?;
        debug!(
            "Bisection overlap {}/{} at height {}",
            overlap.signing_power, overlap.total, untrusted_header.height
        );

        if self.config.bisection_timestamp_policy == BisectionTimestampPolicy::Strict {
            check_timestamp_order(trusted.header(), untrusted_header)?;
        }

        Ok(())
    }

    fn verify_commit_power(
        &self,
        validator_set: &ValidatorSet,
        commit: &Commit,
    ) -> Result<(), VerificationError> {
        if self.config.verify_signatures {
            verify_commit_signatures(validator_set, commit, &self.config.chain_id)?;
        }
        verify_commit(validator_set, commit)?;
        Ok(())
    }

    pub fn get_trusted_state(&self, height: u64) -> Option<Arc<TrustedState>> {
        self.store.read().get(height).cloned()
    }

    pub fn get_latest_trusted_state(&self) -> Option<Arc<TrustedState>> {
        self.store.read().latest().cloned()
    }

    pub fn latest_trusted_height(&self) -> Option<u64> {
        self.store.read().latest_height()
    }

    /// Every height with a trusted state, ascending.
    pub fn trusted_heights(&self) -> Vec<u64> {
        self.store.read().heights()
    }

    /// Verify a commitment proof against the app hash trusted at exactly `height`.
    ///
    /// No interpolation: a proof for a height we have not verified is refused
    /// even if neighbouring heights are trusted.
    pub fn verify_ibc_proof(&self, height: u64, proof: &Proof) -> Result<(), VerificationError> {
        let trusted = self
            .get_trusted_state(height)
            .ok_or(VerificationError::NoTrustedStateAtHeight { height })?;

        if proof.height != height {
            return Err(ProofError::ProofHeightMismatch {
                proof_height: proof.height,
                requested_height: height,
            }
            .into());
        }

        verify_proof_against_root(&trusted.header().app_hash, proof)?;
        debug!(
            "Verified proof for key 0x{} at height {}",
            hex::encode(&proof.key),
            height
        );
        Ok(())
    }
}

/// Strict bisection ordering: a header above the trusted one must be newer,
/// one below it must be older.
fn check_timestamp_order(
    trusted: &BlockHeader,
    untrusted: &BlockHeader,
) -> Result<(), VerificationError> {
    let ordered = if untrusted.height > trusted.height {
        untrusted.time > trusted.time
    } else if untrusted.height < trusted.height {
        untrusted.time < trusted.time
    } else {
        untrusted.time == trusted.time
    };

    if !ordered {
        return Err(VerificationError::NonMonotonicTimestamp {
            trusted_time: trusted.time,
            untrusted_time: untrusted.time,
        });
    }
    Ok(())
}
