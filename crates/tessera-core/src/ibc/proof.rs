use crate::types::ibc::*;
use crate::types::primitives::Hash;
use thiserror::Error;
use tracing::trace;

/// Errors during commitment proof verification.
/// Any failure rejects the whole proof.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProofError {
    #[error("Unknown proof operation {op_type:?} at index {index}")]
    UnknownProofOp { index: usize, op_type: String },

    #[error("Proof verification failed: computed root {computed} does not match trusted app hash {expected}")]
    ProofRootMismatch { computed: Hash, expected: Hash },

    #[error("Proof is for height {proof_height} but was checked against height {requested_height}")]
    ProofHeightMismatch {
        proof_height: u64,
        requested_height: u64,
    },
}

/// Fold a proof into the root it commits to.
///
/// Seeds with SHA256(key || value), then applies each operation in order.
/// The first operation that is not an `iavl` op fails the whole proof.
pub fn compute_proof_root(proof: &Proof) -> Result<Hash, ProofError> {
    let mut current = Hash::digest_parts(&[&proof.key, &proof.value]);

    for (index, op) in proof.ops.iter().enumerate() {
        match op.op_type.as_str() {
            IAVL_OP => {
                current = Hash::digest_parts(&[&op.prefix, &current.0, &op.suffix]);
                trace!("Proof op {} folded to {}", index, current);
            }
            other => {
                return Err(ProofError::UnknownProofOp {
                    index,
                    op_type: other.to_string(),
                });
            }
        }
    }

    Ok(current)
}

/// Verify a proof against an app hash taken from a trusted header.
///
/// IMPORTANT: `app_hash` must come from our trusted state.
/// Never accept a root from the same party that supplied the proof.
pub fn verify_proof_against_root(app_hash: &Hash, proof: &Proof) -> Result<(), ProofError> {
    let computed = compute_proof_root(proof)?;
    if computed != *app_hash {
        return Err(ProofError::ProofRootMismatch {
            computed,
            expected: *app_hash,
        });
    }
    Ok(())
}
