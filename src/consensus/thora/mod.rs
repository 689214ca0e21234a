//! Thora proof-of-authority consensus engine.
//!
//! A set of authorized signers takes turns sealing blocks. Signers vote
//! other accounts in or out by setting a block's coinbase (the target) and
//! nonce (the direction); a strict majority of the current signers resolves
//! the vote. Every `epoch` blocks a checkpoint header carries the full
//! signer list and open votes are dropped.
//!
//! The whole signer history is derivable from headers, so the engine keeps
//! only a recomputable in-memory cache of [`Snapshot`]s.

mod cache;
mod config;
mod engine;
mod error;
mod extra;
mod reward;
mod seal;
mod snapshot;

#[cfg(test)]
mod testing;

pub use cache::{LruSnapshotCache, NoopSnapshotCache, SnapshotCache};
pub use config::ThoraConfig;
pub use engine::Thora;
pub use error::ThoraError;
pub use extra::{encode_extra, ExtraData};
pub use reward::RewardCredit;
pub use seal::{pubkey_to_address, recover_signer, seal_hash, sign_seal};
pub use snapshot::{Snapshot, Tally};

use alloy_primitives::B64;

/// Fixed number of extra-data prefix bytes reserved for signer vanity.
pub const EXTRA_VANITY: usize = 32;

/// Fixed number of extra-data suffix bytes reserved for signer seal (65 bytes signature).
pub const EXTRA_SEAL: usize = 65;

/// Length of a signer address in the checkpoint signer list.
pub const ADDRESS_LENGTH: usize = 20;

/// Default number of blocks after which to checkpoint and reset the pending votes.
pub const EPOCH_LENGTH: u64 = 30000;

/// Number of replayed headers after which a checkpoint is trusted as-is
/// instead of being walked through.
pub const FULL_IMMUTABILITY_THRESHOLD: usize = 90000;

/// Number of recent vote snapshots to keep in memory.
pub const INMEMORY_SNAPSHOTS: usize = 128;

/// Number of recent block signatures to keep in memory.
pub const INMEMORY_SIGNATURES: usize = 4096;

/// Block difficulty for in-turn signatures.
pub const DIFF_IN_TURN: u64 = 2;

/// Block difficulty for out-of-turn signatures.
pub const DIFF_NO_TURN: u64 = 1;

/// Magic nonce number to vote on adding a new signer.
pub const NONCE_AUTH_VOTE: B64 = B64::new([0xff; 8]);

/// Magic nonce number to vote on removing a signer.
pub const NONCE_DROP_VOTE: B64 = B64::new([0x00; 8]);
