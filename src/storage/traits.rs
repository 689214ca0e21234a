//! Collaborator interfaces consumed by the consensus engine.

use crate::primitives::Header;
use alloy_primitives::{Address, B256, U256};

/// Read access to the header chain.
///
/// Lookups may hit disk and are treated as blocking calls; the engine
/// imposes no timeout of its own.
pub trait ChainHeaderReader: Send + Sync {
    /// Get the head of the canonical chain.
    fn current_header(&self) -> Option<Header>;

    /// Get a header by its block hash.
    fn header_by_hash(&self, hash: B256) -> Option<Header>;

    /// Get the canonical header at a given height.
    fn header_by_number(&self, number: u64) -> Option<Header>;

    /// Get a header by hash, checking that it sits at the expected height.
    fn header(&self, hash: B256, number: u64) -> Option<Header> {
        self.header_by_hash(hash).filter(|header| header.number == number)
    }
}

/// Write access to account balances, supplied by the state layer during
/// block finalization.
pub trait StateMutator {
    /// Credit `amount` to `address`.
    fn add_balance(&mut self, address: Address, amount: U256);
}

impl<T: ChainHeaderReader + ?Sized> ChainHeaderReader for std::sync::Arc<T> {
    fn current_header(&self) -> Option<Header> {
        (**self).current_header()
    }

    fn header_by_hash(&self, hash: B256) -> Option<Header> {
        (**self).header_by_hash(hash)
    }

    fn header_by_number(&self, number: u64) -> Option<Header> {
        (**self).header_by_number(number)
    }
}
