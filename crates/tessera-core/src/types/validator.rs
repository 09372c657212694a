use crate::types::primitives::{Address, Hash, PublicKey};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

/// Errors raised when assembling a validator set snapshot.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidatorSetError {
    #[error("Validator set is empty")]
    Empty,

    #[error("Duplicate validator address {address}")]
    DuplicateAddress { address: Address },

    #[error("Total voting power overflows u64")]
    PowerOverflow,
}

/// A single consensus participant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    /// Address the validator signs commits under.
    pub address: Address,
    /// Ed25519 key commit signatures are checked against.
    pub pub_key: PublicKey,
    /// Weight of this validator's vote.
    pub voting_power: u64,
    /// Round-robin proposer priority. Carried through, never used for verification.
    #[serde(default)]
    pub proposer_priority: i64,
}

impl Validator {
    /// Build a validator whose address is derived from its public key.
    pub fn new(pub_key: PublicKey, voting_power: u64) -> Self {
        Self {
            address: Address::from_public_key(&pub_key),
            pub_key,
            voting_power,
            proposer_priority: 0,
        }
    }

    /// Merkle leaf: SHA256(address || pubkey || voting_power as u64 big-endian).
    pub fn merkle_leaf(&self) -> Hash {
        Hash::digest_parts(&[
            &self.address.0,
            &self.pub_key.0,
            &self.voting_power.to_be_bytes(),
        ])
    }
}

/// The validators active at one height.
///
/// Addresses are unique and the total voting power is computed once at
/// construction. Deserialization goes through the same checks as [`ValidatorSet::new`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "Vec<Validator>", into = "Vec<Validator>")]
pub struct ValidatorSet {
    validators: Vec<Validator>,
    total_voting_power: u64,
    address_index: HashMap<Address, usize>,
}

impl ValidatorSet {
    pub fn new(validators: Vec<Validator>) -> Result<Self, ValidatorSetError> {
        if validators.is_empty() {
            return Err(ValidatorSetError::Empty);
        }

        let mut address_index = HashMap::with_capacity(validators.len());
        let mut total_voting_power: u64 = 0;

        for (i, validator) in validators.iter().enumerate() {
            if address_index.insert(validator.address, i).is_some() {
                return Err(ValidatorSetError::DuplicateAddress {
                    address: validator.address,
                });
            }
            total_voting_power = total_voting_power
                .checked_add(validator.voting_power)
                .ok_or(ValidatorSetError::PowerOverflow)?;
        }

        Ok(Self {
            validators,
            total_voting_power,
            address_index,
        })
    }

    /// Validators in the order they were supplied.
    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    pub fn total_voting_power(&self) -> u64 {
        self.total_voting_power
    }

    pub fn get_validator(&self, address: &Address) -> Option<&Validator> {
        self.address_index
            .get(address)
            .and_then(|&i| self.validators.get(i))
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.address_index.contains_key(address)
    }

    /// Sum the voting power of the members among `addresses`.
    ///
    /// Addresses that are not in the set contribute zero rather than failing.
    /// Commits tallied against a trusted set routinely carry signers outside it.
    pub fn compute_voting_power(&self, addresses: &BTreeSet<Address>) -> u64 {
        addresses
            .iter()
            .filter_map(|address| self.get_validator(address))
            .map(|v| v.voting_power)
            .sum()
    }

    /// Canonical Merkle hash of the set.
    ///
    /// Leaves are taken in address order, so the result does not depend on
    /// the order validators were supplied in.
    pub fn hash(&self) -> Hash {
        let mut sorted: Vec<&Validator> = self.validators.iter().collect();
        sorted.sort_by(|a, b| a.address.cmp(&b.address));
        merkle_root(sorted.iter().map(|v| v.merkle_leaf()).collect())
    }
}

impl PartialEq for ValidatorSet {
    fn eq(&self, other: &Self) -> bool {
        self.validators == other.validators
    }
}

impl Eq for ValidatorSet {}

impl TryFrom<Vec<Validator>> for ValidatorSet {
    type Error = ValidatorSetError;

    fn try_from(validators: Vec<Validator>) -> Result<Self, Self::Error> {
        Self::new(validators)
    }
}

impl From<ValidatorSet> for Vec<Validator> {
    fn from(set: ValidatorSet) -> Self {
        set.validators
    }
}

/// Fold leaves into a root: pad to a power of two by repeating the last leaf,
/// then hash adjacent pairs layer by layer. A single leaf is its own root.
fn merkle_root(mut layer: Vec<Hash>) -> Hash {
    let Some(&last) = layer.last() else {
        return Hash::EMPTY;
    };
    layer.resize(layer.len().next_power_of_two(), last);

    while layer.len() > 1 {
        layer = layer
            .chunks(2)
            .map(|pair| Hash::pair(&pair[0], &pair[1]))
            .collect();
    }

    layer[0]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::primitives::PUBLIC_KEY_LEN;

    fn make_validator(seed: u8, power: u64) -> Validator {
        Validator::new(PublicKey([seed; PUBLIC_KEY_LEN]), power)
    }

    #[test]
    fn test_total_voting_power() {
        let set = ValidatorSet::new(vec![
            make_validator(1, 10),
            make_validator(2, 20),
            make_validator(3, 30),
        ])
        .unwrap();
        assert_eq!(set.total_voting_power(), 60);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_hash_independent_of_order() {
        let a = make_validator(1, 10);
        let b = make_validator(2, 20);
        let c = make_validator(3, 30);

        let forward = ValidatorSet::new(vec![a.clone(), b.clone(), c.clone()]).unwrap();
        let shuffled = ValidatorSet::new(vec![c, a, b]).unwrap();
        assert_eq!(forward.hash(), shuffled.hash());
    }

    #[test]
    fn test_single_validator_root_is_leaf() {
        let v = make_validator(9, 5);
        let set = ValidatorSet::new(vec![v.clone()]).unwrap();
        assert_eq!(set.hash(), v.merkle_leaf());
    }

    #[test]
    fn test_odd_set_pads_with_last_leaf() {
        let mut members = vec![
            make_validator(1, 1),
            make_validator(2, 1),
            make_validator(3, 1),
        ];
        members.sort_by(|a, b| a.address.cmp(&b.address));
        let leaves: Vec<Hash> = members.iter().map(|v| v.merkle_leaf()).collect();
        let expected = Hash::pair(
            &Hash::pair(&leaves[0], &leaves[1]),
            &Hash::pair(&leaves[2], &leaves[2]),
        );

        let set = ValidatorSet::new(members).unwrap();
        assert_eq!(set.hash(), expected);
    }

    #[test]
    fn test_single_byte_mutation_changes_hash() {
        let original = ValidatorSet::new(vec![make_validator(1, 10), make_validator(2, 10)]).unwrap();

        let mut tampered_key = make_validator(2, 10);
        tampered_key.pub_key.0[31] ^= 0x01;
        let tampered =
            ValidatorSet::new(vec![make_validator(1, 10), tampered_key]).unwrap();
        assert_ne!(original.hash(), tampered.hash());

        let reweighted =
            ValidatorSet::new(vec![make_validator(1, 10), make_validator(2, 11)]).unwrap();
        assert_ne!(original.hash(), reweighted.hash());
    }

    #[test]
    fn test_rejects_duplicates_and_empty() {
        assert_eq!(ValidatorSet::new(vec![]), Err(ValidatorSetError::Empty));

        let dup = ValidatorSet::new(vec![make_validator(1, 10), make_validator(1, 20)]);
        assert!(matches!(dup, Err(ValidatorSetError::DuplicateAddress { .. })));
    }

    #[test]
    fn test_rejects_power_overflow() {
        let result = ValidatorSet::new(vec![make_validator(1, u64::MAX), make_validator(2, 1)]);
        assert_eq!(result, Err(ValidatorSetError::PowerOverflow));
    }

    #[test]
    fn test_compute_voting_power_ignores_unknown() {
        let a = make_validator(1, 10);
        let b = make_validator(2, 20);
        let set = ValidatorSet::new(vec![a.clone(), b.clone()]).unwrap();

        let stranger = make_validator(77, 1000).address;
        let addresses: BTreeSet<Address> = [a.address, stranger].into_iter().collect();
        assert_eq!(set.compute_voting_power(&addresses), 10);

        let everyone: BTreeSet<Address> = [a.address, b.address].into_iter().collect();
        assert_eq!(set.compute_voting_power(&everyone), 30);
    }

    #[test]
    fn test_get_validator() {
        let a = make_validator(1, 10);
        let set = ValidatorSet::new(vec![a.clone()]).unwrap();
        assert_eq!(set.get_validator(&a.address), Some(&a));
        assert!(set.get_validator(&make_validator(2, 1).address).is_none());
    }

    #[test]
    fn test_deserialize_rebuilds_index_and_checks() {
        let a = make_validator(1, 10);
        let set = ValidatorSet::new(vec![a.clone(), make_validator(2, 5)]).unwrap();

        let json = serde_json::to_string(&set).unwrap();
        let decoded: ValidatorSet = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, set);
        assert_eq!(decoded.total_voting_power(), 15);
        assert!(decoded.contains(&a.address));

        let dup_json = serde_json::to_string(&vec![a.clone(), a]).unwrap();
        assert!(serde_json::from_str::<ValidatorSet>(&dup_json).is_err());
    }
}
