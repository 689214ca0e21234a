//! Thora snapshot - authorization voting state at a given point in time.

use super::{ThoraConfig, ThoraError, DIFF_IN_TURN, DIFF_NO_TURN, NONCE_AUTH_VOTE, NONCE_DROP_VOTE};
use crate::primitives::Header;
use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use std::collections::{btree_map::Entry, BTreeMap, BTreeSet};
use tracing::debug;

/// Open vote on a single target account.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Tally {
    /// Whether the vote is about authorizing or kicking someone.
    pub authorize: bool,
    /// Signers currently backing the proposal.
    pub voters: BTreeSet<Address>,
}

impl Tally {
    /// Number of votes wanting to pass the proposal.
    pub fn votes(&self) -> usize {
        self.voters.len()
    }
}

/// Snapshot is the state of the authorization voting at a given point in time.
///
/// Snapshots are immutable once produced; [`Snapshot::apply`] derives a new
/// one and leaves `self` untouched, so sibling branches can share an
/// ancestor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Consensus engine configuration.
    #[serde(skip)]
    pub config: ThoraConfig,

    /// Block number where the snapshot was created.
    pub number: u64,

    /// Block hash where the snapshot was created.
    pub hash: B256,

    /// Set of authorized signers at this moment.
    pub signers: BTreeSet<Address>,

    /// Set of recent signers for spam protection (block number -> signer).
    pub recents: BTreeMap<u64, Address>,

    /// Open votes keyed by target account.
    pub tally: BTreeMap<Address, Tally>,
}

impl Snapshot {
    /// Create a new snapshot with the specified startup parameters.
    ///
    /// This method does not initialize the set of recent signers,
    /// so only use it for the genesis block or a trusted checkpoint.
    pub fn new(config: ThoraConfig, number: u64, hash: B256, signers: Vec<Address>) -> Self {
        Self {
            config,
            number,
            hash,
            signers: signers.into_iter().collect(),
            recents: BTreeMap::new(),
            tally: BTreeMap::new(),
        }
    }

    /// Get the list of authorized signers in ascending order.
    pub fn signers_list(&self) -> Vec<Address> {
        self.signers.iter().copied().collect()
    }

    /// Check if an address is an authorized signer.
    pub fn is_signer(&self, address: &Address) -> bool {
        self.signers.contains(address)
    }

    /// Get the number of signers.
    pub fn signer_count(&self) -> usize {
        self.signers.len()
    }

    /// Size of the recency window: a signer may seal at most one block out
    /// of any `limit` consecutive ones.
    pub fn recent_limit(&self) -> u64 {
        (self.signers.len() / 2 + 1) as u64
    }

    /// Check if a signer at a given block height is in-turn.
    pub fn inturn(&self, number: u64, signer: Address) -> bool {
        if self.signers.is_empty() {
            return false;
        }

        match self.signers.iter().position(|s| *s == signer) {
            Some(offset) => number % self.signers.len() as u64 == offset as u64,
            None => false,
        }
    }

    /// Calculate the expected difficulty for a signer at a given block.
    pub fn calc_difficulty(&self, number: u64, signer: Address) -> u64 {
        if self.inturn(number, signer) {
            DIFF_IN_TURN
        } else {
            DIFF_NO_TURN
        }
    }

    /// Whether casting the vote would change membership if it passed.
    ///
    /// Replay does not use this: votes without effect still count.
    pub fn valid_vote(&self, address: &Address, authorize: bool) -> bool {
        let is_signer = self.signers.contains(address);
        (is_signer && !authorize) || (!is_signer && authorize)
    }

    /// Dry-run of the authorization and recency rules for `signer` sealing
    /// block `number` on top of this snapshot.
    pub fn check_signer(&self, number: u64, signer: Address) -> Result<(), ThoraError> {
        if !self.signers.contains(&signer) {
            return Err(ThoraError::UnauthorizedSigner { signer });
        }

        let limit = self.recent_limit();
        for (&recent_block, &recent_signer) in &self.recents {
            if recent_signer == signer && recent_block + limit > number {
                return Err(ThoraError::RecentlySigned { signer, recent_block });
            }
        }
        Ok(())
    }

    /// Record `signer`'s vote on `target`, replacing any earlier vote it
    /// cast on the same target.
    ///
    /// A target has a single open tally with a single direction. An
    /// opposing vote only takes over once the tally has no voters left;
    /// until then it is not counted. Returns whether the vote was counted.
    pub fn cast(&mut self, signer: Address, target: Address, authorize: bool) -> bool {
        self.uncast(signer, target);

        match self.tally.entry(target) {
            Entry::Vacant(entry) => {
                entry.insert(Tally { authorize, voters: BTreeSet::from([signer]) });
                true
            }
            Entry::Occupied(mut entry) if entry.get().authorize == authorize => {
                entry.get_mut().voters.insert(signer);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Withdraw `signer`'s vote on `target`, dropping the tally once empty.
    ///
    /// Returns true if a vote was removed.
    pub fn uncast(&mut self, signer: Address, target: Address) -> bool {
        let Some(tally) = self.tally.get_mut(&target) else {
            return false;
        };

        let removed = tally.voters.remove(&signer);
        if tally.voters.is_empty() {
            self.tally.remove(&target);
        }
        removed
    }

    /// Apply a run of headers to create a new snapshot.
    ///
    /// The headers must directly extend this snapshot in chain order. The
    /// `recover_signer` function is used to extract the signer from each header.
    pub fn apply<F>(&self, headers: &[Header], recover_signer: F) -> Result<Snapshot, ThoraError>
    where
        F: Fn(&Header) -> Result<Address, ThoraError>,
    {
        let mut snap = self.clone();
        for header in headers {
            snap = snap.apply_header(header, recover_signer(header)?)?;
        }
        Ok(snap)
    }

    /// Apply a single header sealed by `signer`.
    ///
    /// The header's parent must be the block this snapshot was taken at.
    pub fn apply_header(&self, header: &Header, signer: Address) -> Result<Snapshot, ThoraError> {
        if header.number != self.number + 1 || header.parent_hash != self.hash {
            return Err(ThoraError::InvalidVotingChain);
        }

        let mut snap = self.clone();
        snap.transition(header, signer)?;
        snap.number = header.number;
        snap.hash = header.hash_slow();
        Ok(snap)
    }

    /// The per-block state transition, in place.
    fn transition(&mut self, header: &Header, signer: Address) -> Result<(), ThoraError> {
        let number = header.number;
        if number == 0 {
            return Ok(());
        }

        self.check_signer(number, signer)?;

        // Record the signature and forget the ones that left the window
        let limit = self.recent_limit();
        self.recents.insert(number, signer);
        self.recents.retain(|&recent_block, _| recent_block + limit > number);

        // Checkpoint blocks start a fresh voting round
        if self.config.is_checkpoint(number) {
            self.tally.clear();
            return Ok(());
        }

        let target = header.coinbase;
        if target.is_zero() {
            return Ok(());
        }

        let authorize = if header.nonce == NONCE_AUTH_VOTE {
            true
        } else if header.nonce == NONCE_DROP_VOTE {
            false
        } else {
            return Err(ThoraError::InvalidVote);
        };

        self.cast(signer, target, authorize);

        // If the vote passed, update the list of signers
        let Some(tally) = self.tally.get(&target) else {
            return Ok(());
        };
        if tally.votes() * 2 <= self.signers.len() {
            return Ok(());
        }

        if tally.authorize {
            self.signers.insert(target);
            debug!(target: "consensus::thora", number, signer = %target, "Signer authorized");
        } else {
            self.signers.remove(&target);
            self.recents.retain(|_, recent| *recent != target);

            // Discard any pending votes the deauthorized signer cast
            let voted_on: Vec<Address> = self
                .tally
                .iter()
                .filter(|(_, tally)| tally.voters.contains(&target))
                .map(|(address, _)| *address)
                .collect();
            for address in voted_on {
                self.uncast(target, address);
            }
            debug!(target: "consensus::thora", number, signer = %target, "Signer deauthorized");
        }

        // The resolved proposal starts over from zero
        self.tally.remove(&target);
        Ok(())
    }
}
