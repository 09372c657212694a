use crate::consensus::commit::{HashField, VerificationError};
use crate::types::block::BlockHeader;
use crate::types::validator::ValidatorSet;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A header the client has accepted, with the validator sets it commits to.
///
/// Only constructible through [`TrustedState::new`], which checks that both
/// validator sets hash to the header's commitments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TrustedState {
    header: BlockHeader,
    validator_set: ValidatorSet,
    next_validator_set: ValidatorSet,
    /// Local time (unix seconds) at which this state was accepted.
    trusted_at: u64,
}

impl TrustedState {
    pub fn new(
        header: BlockHeader,
        validator_set: ValidatorSet,
        next_validator_set: ValidatorSet,
        trusted_at: u64,
    ) -> Result<Self, VerificationError> {
        check_validator_set_hashes(&header, &validator_set, &next_validator_set)?;
        Ok(Self {
            header,
            validator_set,
            next_validator_set,
            trusted_at,
        })
    }

    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    pub fn height(&self) -> u64 {
        self.header.height
    }

    pub fn validator_set(&self) -> &ValidatorSet {
        &self.validator_set
    }

    pub fn next_validator_set(&self) -> &ValidatorSet {
        &self.next_validator_set
    }

    pub fn trusted_at(&self) -> u64 {
        self.trusted_at
    }
}

/// Check that `validator_set` and `next_validator_set` are the sets `header` commits to.
pub fn check_validator_set_hashes(
    header: &BlockHeader,
    validator_set: &ValidatorSet,
    next_validator_set: &ValidatorSet,
) -> Result<(), VerificationError> {
    let computed = validator_set.hash();
    if computed != header.validators_hash {
        return Err(VerificationError::ValidatorSetHashMismatch {
            field: HashField::Validators,
            expected: header.validators_hash,
            computed,
        });
    }

    let computed = next_validator_set.hash();
    if computed != header.next_validators_hash {
        return Err(VerificationError::ValidatorSetHashMismatch {
            field: HashField::NextValidators,
            expected: header.next_validators_hash,
            computed,
        });
    }

    Ok(())
}

/// Height-indexed trusted states plus the "best known" height pointer.
///
/// The pointer only moves forward. Entries below it can still be added.
#[derive(Debug, Default)]
pub struct TrustedStore {
    states: BTreeMap<u64, Arc<TrustedState>>,
    latest_height: Option<u64>,
}

/// Result of inserting a verified state.
#[derive(Debug)]
pub struct Inserted {
    pub state: Arc<TrustedState>,
    /// The latest-height pointer moved to this state.
    pub advanced: bool,
}

impl TrustedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop everything and start over from a single anchor.
    pub fn reset(&mut self, anchor: TrustedState) -> Arc<TrustedState> {
        let height = anchor.height();
        let anchor = Arc::new(anchor);
        self.states.clear();
        self.states.insert(height, Arc::clone(&anchor));
        self.latest_height = Some(height);
        anchor
    }

    /// Store a verified state.
    ///
    /// Re-inserting the same header is a no-op that returns the existing
    /// entry. A different header at an occupied height is refused, leaving
    /// the store untouched.
    pub fn insert(&mut self, state: TrustedState) -> Result<Inserted, VerificationError> {
        let height = state.height();

        if let Some(existing) = self.states.get(&height) {
            if existing.header.hash() != state.header.hash() {
                return Err(VerificationError::ConflictingTrustedHeader { height });
            }
            return Ok(Inserted {
                state: Arc::clone(existing),
                advanced: false,
            });
        }

        let state = Arc::new(state);
        self.states.insert(height, Arc::clone(&state));

        let advanced = self.latest_height.map_or(true, |latest| height > latest);
        if advanced {
            self.latest_height = Some(height);
        }

        Ok(Inserted { state, advanced })
    }

    pub fn get(&self, height: u64) -> Option<&Arc<TrustedState>> {
        self.states.get(&height)
    }

    pub fn latest(&self) -> Option<&Arc<TrustedState>> {
        self.latest_height.and_then(|h| self.states.get(&h))
    }

    pub fn latest_height(&self) -> Option<u64> {
        self.latest_height
    }

    /// Trusted heights in ascending order.
    pub fn heights(&self) -> Vec<u64> {
        self.states.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
