//! Thora proof-of-authority consensus.
//!
//! A fixed but votable set of signers takes turns sealing blocks. This
//! crate reconstructs the signer set and pending votes at any block from
//! headers alone, verifies incoming headers against it, helps a local
//! signer prepare and seal blocks, and pays block rewards.
//!
//! # Modules
//!
//! - [`primitives`]: Block header and its RLP encoding
//! - [`storage`]: Header chain and state collaborators, with in-memory versions
//! - [`consensus`]: The Thora engine and its snapshot machine

#![warn(unused_crate_dependencies)]
// Dependencies used by binaries
use eyre as _;
use tracing_subscriber as _;

pub mod consensus;
pub mod primitives;
pub mod storage;

// Re-export consensus types
pub use consensus::thora::{
    encode_extra, recover_signer, seal_hash, ExtraData, LruSnapshotCache, NoopSnapshotCache,
    RewardCredit, Snapshot, SnapshotCache, Tally, Thora, ThoraConfig, ThoraError,
};

// Re-export primitives and storage
pub use primitives::Header;
pub use storage::{ChainHeaderReader, InMemoryHeaderStore, InMemoryState, StateMutator};
