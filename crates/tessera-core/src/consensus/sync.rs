//! Skipping verification driver.
//!
//! Reaches a target height by asking [`LightClient::verify_header`] to jump
//! straight there. When the jump fails for lack of validator overlap, an
//! intermediate height halfway between the latest trusted height and the
//! failed attempt is verified first, and the jump is retried from there.

use crate::consensus::commit::VerificationError;
use crate::consensus::light_client::LightClient;
use crate::consensus::store::TrustedState;
use crate::types::block::LightBlock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Upper bound on fetch-and-verify attempts for one [`skip_to_height`] call.
pub const DEFAULT_MAX_BISECTION_STEPS: usize = 64;

/// Supplies untrusted light blocks by height.
///
/// Nothing returned from a source is believed until the client verifies it.
pub trait HeaderSource {
    fn light_block(&self, height: u64) -> anyhow::Result<LightBlock>;
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Gave up reaching height {target} after {max_steps} verification steps")]
    StepLimitExceeded { target: u64, max_steps: usize },

    #[error("Failed to fetch light block at height {height}: {source}")]
    Source {
        height: u64,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Verification(#[from] VerificationError),
}

/// Verify the header at `target`, bisecting through intermediate heights
/// fetched from `source` as needed.
///
/// Returns the trusted state at `target`. Any verification failure other than
/// insufficient overlap is returned as is; so is insufficient overlap when
/// there is no height left to pivot on.
pub fn skip_to_height<S>(
    client: &LightClient,
    source: &S,
    target: u64,
    now: u64,
    max_steps: usize,
) -> Result<Arc<TrustedState>, SyncError>
where
    S: HeaderSource + ?Sized,
{
    if let Some(state) = client.get_trusted_state(target) {
        return Ok(state);
    }

    let mut pending = vec![target];
    let mut steps = 0;

    while let Some(&attempt) = pending.last() {
        if steps >= max_steps {
            return Err(SyncError::StepLimitExceeded { target, max_steps });
        }
        steps += 1;

        let block = source
            .light_block(attempt)
            .map_err(|source| SyncError::Source {
                height: attempt,
                source,
            })?;
        debug!(
            "Step {}: verifying light block at height {}",
            steps,
            block.height()
        );

        match client.verify_light_block(&block, now) {
            Ok(state) => {
                pending.pop();
                if pending.is_empty() {
                    info!("Reached height {} in {} steps", target, steps);
                    return Ok(state);
                }
            }
            Err(e @ VerificationError::InsufficientOverlapPower { .. }) => {
                let trusted = client
                    .latest_trusted_height()
                    .ok_or(VerificationError::NoTrustedState)?;
                let Some(pivot) = pivot_height(trusted, attempt) else {
                    return Err(e.into());
                };
                debug!(
                    "Not enough overlap from {} to {}, pivoting at {}",
                    trusted, attempt, pivot
                );
                pending.push(pivot);
            }
            Err(e) => return Err(e.into()),
        }
    }

    // `pending` starts non-empty and only empties on success
    Err(VerificationError::NoTrustedStateAtHeight { height: target }.into())
}

/// Midpoint between `trusted` and `attempt`, if one strictly between them exists.
fn pivot_height(trusted: u64, attempt: u64) -> Option<u64> {
    if attempt <= trusted {
        return None;
    }
    let pivot = trusted + (attempt - trusted) / 2;
    (pivot > trusted).then_some(pivot)
}
