//! In-memory header chain and balance state.
//!
//! These back the engine in tests and in the demo binary. A node plugs in
//! its own database-backed [`ChainHeaderReader`] instead.

use super::traits::{ChainHeaderReader, StateMutator};
use crate::primitives::Header;
use alloy_primitives::{Address, B256, U256};
use parking_lot::RwLock;
use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

/// In-memory header store.
///
/// Headers are indexed by hash; a `BTreeMap` keyed by number tracks the
/// canonical chain. Inserting a header makes it canonical at its height
/// and drops any canonical entries above it, which is how a reorg onto a
/// shorter or sibling branch looks from the reader's side.
#[derive(Debug, Default, Clone)]
pub struct InMemoryHeaderStore {
    /// All known headers by block hash.
    headers: Arc<RwLock<HashMap<B256, Header>>>,
    /// Canonical block number to hash mapping.
    canonical: Arc<RwLock<BTreeMap<u64, B256>>>,
}

impl InMemoryHeaderStore {
    /// Create a store seeded with a genesis header.
    pub fn new(genesis: Header) -> Self {
        let store = Self::default();
        store.insert_header(genesis);
        store
    }

    /// Insert a header and make it the canonical head.
    ///
    /// Returns the header's hash.
    pub fn insert_header(&self, header: Header) -> B256 {
        let hash = header.hash_slow();
        let number = header.number;

        let mut headers = self.headers.write();
        let mut canonical = self.canonical.write();

        headers.insert(hash, header);
        let _ = canonical.split_off(&number);
        canonical.insert(number, hash);

        hash
    }

    /// Insert a header without touching the canonical index (side chains).
    pub fn insert_side_header(&self, header: Header) -> B256 {
        let hash = header.hash_slow();
        self.headers.write().insert(hash, header);
        hash
    }

    /// Remove every header below `number` from the store, as a pruning
    /// node would. The canonical index keeps pointing at missing entries.
    pub fn prune_below(&self, number: u64) {
        self.headers.write().retain(|_, header| header.number >= number);
    }

    /// Number of stored headers.
    pub fn len(&self) -> usize {
        self.headers.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.headers.read().is_empty()
    }
}

impl ChainHeaderReader for InMemoryHeaderStore {
    fn current_header(&self) -> Option<Header> {
        let hash = *self.canonical.read().values().next_back()?;
        self.header_by_hash(hash)
    }

    fn header_by_hash(&self, hash: B256) -> Option<Header> {
        self.headers.read().get(&hash).cloned()
    }

    fn header_by_number(&self, number: u64) -> Option<Header> {
        let hash = *self.canonical.read().get(&number)?;
        self.header_by_hash(hash)
    }
}

/// Account balances kept in a plain map.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InMemoryState {
    balances: HashMap<Address, U256>,
}

impl InMemoryState {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance of an account, zero if never credited.
    pub fn balance(&self, address: &Address) -> U256 {
        self.balances.get(address).copied().unwrap_or_default()
    }

    /// All credited accounts.
    pub fn balances(&self) -> &HashMap<Address, U256> {
        &self.balances
    }
}

impl StateMutator for InMemoryState {
    fn add_balance(&mut self, address: Address, amount: U256) {
        let balance = self.balances.entry(address).or_default();
        *balance = balance.saturating_add(amount);
    }
}
