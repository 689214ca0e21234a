//! Storage collaborators.
//!
//! The consensus engine holds no durable state of its own: the signer set
//! and vote history are derivable from headers alone. It only needs read
//! access to the header chain and, during finalization, a way to credit
//! balances.
//!
//! # Implementations
//!
//! - [`InMemoryHeaderStore`]: header chain with a canonical index
//! - [`InMemoryState`]: balance map used by the reward finalizer
//!
//! # Usage
//!
//! ```ignore
//! use thora_node::storage::{ChainHeaderReader, InMemoryHeaderStore};
//!
//! let store = InMemoryHeaderStore::new(genesis);
//! let hash = store.insert_header(header);
//! assert!(store.header_by_hash(hash).is_some());
//! ```

mod memory;
mod traits;

pub use memory::{InMemoryHeaderStore, InMemoryState};
pub use traits::{ChainHeaderReader, StateMutator};
