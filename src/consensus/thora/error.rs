//! Thora consensus errors.

use alloy_primitives::{Address, B256};
use thiserror::Error;

/// Thora consensus errors.
///
/// Every variant is a hard rejection of the header being processed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThoraError {
    /// Extra-data length does not fit `vanity + k * 20 + seal`.
    #[error("malformed extra-data: length {length}, checkpoint {checkpoint}")]
    MalformedExtraData { length: usize, checkpoint: bool },

    /// Signer list present on a non-checkpoint block, or missing on a checkpoint.
    #[error("invalid signer list on block {number} (checkpoint {checkpoint})")]
    InvalidCheckpointSigners { number: u64, checkpoint: bool },

    /// Checkpoint signer list differs from the reconstructed signer set.
    #[error("mismatching signer list on checkpoint block {number}")]
    MismatchingCheckpointSigners { number: u64 },

    /// Signature recovery failed.
    #[error("invalid signature: {message}")]
    InvalidSignature { message: String },

    /// The block was produced by an account outside the signer set.
    #[error("unauthorized signer: {signer}")]
    UnauthorizedSigner { signer: Address },

    /// Signer produced another block within the recency window.
    #[error("signer {signer} recently signed at block {recent_block}")]
    RecentlySigned { signer: Address, recent_block: u64 },

    /// Difficulty does not match the signer's turn.
    #[error("wrong difficulty for {signer} at block {block}: expected {expected}, got {actual}")]
    WrongDifficulty { signer: Address, block: u64, expected: u64, actual: u64 },

    /// Difficulty is neither the in-turn nor the out-of-turn value.
    #[error("invalid difficulty: expected 1 or 2, got {difficulty}")]
    InvalidDifficulty { difficulty: u64 },

    /// Walking parent links did not reach a cached snapshot, checkpoint or genesis.
    #[error("unknown ancestor {hash} at block {number}")]
    AncestorNotFound { number: u64, hash: B256 },

    /// Headers handed to the snapshot replay are not a contiguous chain.
    #[error("invalid voting chain")]
    InvalidVotingChain,

    /// Invalid vote nonce (not 0x00..0 or 0xff..f).
    #[error("vote nonce not 0x00..0 or 0xff..f")]
    InvalidVote,

    /// Checkpoint block has non-zero vote nonce.
    #[error("vote nonce in checkpoint block non-zero")]
    InvalidCheckpointVote,

    /// Checkpoint block has non-zero beneficiary.
    #[error("beneficiary in checkpoint block non-zero")]
    InvalidCheckpointBeneficiary,

    /// Non-zero mix digest.
    #[error("non-zero mix digest")]
    InvalidMixDigest,

    /// Non-empty uncle hash.
    #[error("non empty uncle hash")]
    InvalidUncleHash,

    /// Block is from the future.
    #[error("block from future: block time {block_time}, current time {current_time}")]
    FutureBlock { block_time: u64, current_time: u64 },

    /// Invalid timestamp (too close to parent).
    #[error("invalid timestamp: parent {parent_time} + period {period} > block {block_time}")]
    InvalidTimestamp { parent_time: u64, period: u64, block_time: u64 },

    /// The genesis block carries no seal.
    #[error("unknown block")]
    UnknownBlock,

    /// No local signing key has been installed.
    #[error("no signing key authorized")]
    MissingSigner,
}
