//! Block reward finalization.

use super::{SnapshotCache, Thora};
use crate::{
    primitives::Header,
    storage::{ChainHeaderReader, StateMutator},
};
use alloy_primitives::{Address, U256};
use tracing::{error, trace};

/// A reward paid out while finalizing a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardCredit {
    /// Account that received the reward.
    pub recipient: Address,
    /// Amount credited, in wei.
    pub amount: U256,
}

impl<C: SnapshotCache> Thora<C> {
    /// Credit the block reward for `header` into `state`.
    ///
    /// With a fixed recipient configured every block past genesis pays it.
    /// Otherwise block `n` pays the author of block `n - 1`, whose seal is
    /// final by then; the first block has nobody to pay. Failing to find
    /// that author is logged and skips the reward without rejecting the
    /// block.
    pub fn finalize<R: ChainHeaderReader + ?Sized, S: StateMutator + ?Sized>(
        &self,
        chain: &R,
        header: &Header,
        state: &mut S,
    ) -> Option<RewardCredit> {
        let number = header.number;
        let amount = self.config().block_reward;

        let recipient = match self.config().fixed_reward_recipient() {
            Some(recipient) if number > 0 => recipient,
            Some(_) => return None,
            None if number > 1 => self.parent_author(chain, header)?,
            None => return None,
        };

        state.add_balance(recipient, amount);
        trace!(target: "consensus::thora", number, %recipient, %amount, "Credited block reward");
        Some(RewardCredit { recipient, amount })
    }

    fn parent_author<R: ChainHeaderReader + ?Sized>(
        &self,
        chain: &R,
        header: &Header,
    ) -> Option<Address> {
        let number = header.number;
        let Some(parent) = chain.header(header.parent_hash, number - 1) else {
            error!(
                target: "consensus::thora",
                number,
                parent_hash = %header.parent_hash,
                "Parent header missing, skipping block reward"
            );
            return None;
        };

        match self.author(&parent) {
            Ok(author) => Some(author),
            Err(err) => {
                error!(
                    target: "consensus::thora",
                    number,
                    parent_hash = %header.parent_hash,
                    %err,
                    "Failed to recover parent author, skipping block reward"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        consensus::thora::{
            encode_extra,
            testing::{child, genesis, TesterAccountPool},
            ThoraConfig,
        },
        storage::{InMemoryHeaderStore, InMemoryState},
    };

    struct Chain {
        accounts: TesterAccountPool,
        store: InMemoryHeaderStore,
        headers: Vec<Header>,
    }

    /// A chain of `signers.len()` sealed blocks on top of genesis.
    fn build(signers: &[&str]) -> Chain {
        let mut accounts = TesterAccountPool::new();
        let mut parent = genesis(&accounts.addresses(&["A", "B"]));
        let store = InMemoryHeaderStore::new(parent.clone());
        let mut headers = vec![parent.clone()];

        for signer in signers {
            let mut header = child(&parent, parent.hash_slow(), Address::ZERO, false);
            accounts.sign(&mut header, signer);
            store.insert_header(header.clone());
            headers.push(header.clone());
            parent = header;
        }
        Chain { accounts, store, headers }
    }

    #[test]
    fn test_reward_goes_to_parent_author() {
        let mut chain = build(&["A", "B", "A"]);
        let engine = Thora::in_memory(ThoraConfig::default());
        let mut state = InMemoryState::new();

        for header in &chain.headers {
            engine.finalize(&chain.store, header, &mut state);
        }

        // Blocks 2 and 3 pay the authors of blocks 1 and 2
        let reward = ThoraConfig::default().block_reward;
        assert_eq!(state.balance(&chain.accounts.address("A")), reward);
        assert_eq!(state.balance(&chain.accounts.address("B")), reward);
        assert_eq!(state.balances().len(), 2);
    }

    #[test]
    fn test_no_reward_for_first_blocks() {
        let chain = build(&["A"]);
        let engine = Thora::in_memory(ThoraConfig::default());
        let mut state = InMemoryState::new();

        assert_eq!(engine.finalize(&chain.store, &chain.headers[0], &mut state), None);
        assert_eq!(engine.finalize(&chain.store, &chain.headers[1], &mut state), None);
        assert!(state.balances().is_empty());
    }

    #[test]
    fn test_fixed_recipient() {
        let chain = build(&["A", "B"]);
        let recipient = Address::repeat_byte(0x77);
        let config = ThoraConfig::default()
            .with_reward_recipient(recipient)
            .with_block_reward(U256::from(5));
        let engine = Thora::in_memory(config);
        let mut state = InMemoryState::new();

        assert_eq!(engine.finalize(&chain.store, &chain.headers[0], &mut state), None);
        for header in &chain.headers[1..] {
            assert_eq!(
                engine.finalize(&chain.store, header, &mut state),
                Some(RewardCredit { recipient, amount: U256::from(5) })
            );
        }
        assert_eq!(state.balance(&recipient), U256::from(10));
    }

    #[test]
    fn test_zero_fixed_recipient_pays_signers() {
        let mut chain = build(&["A", "B"]);
        let config = ThoraConfig::default().with_reward_recipient(Address::ZERO);
        let engine = Thora::in_memory(config);
        let mut state = InMemoryState::new();

        let credit = engine.finalize(&chain.store, &chain.headers[2], &mut state);
        assert_eq!(credit.map(|c| c.recipient), Some(chain.accounts.address("A")));
    }

    #[test]
    fn test_unrecoverable_parent_is_skipped() {
        let chain = build(&["A"]);
        let engine = Thora::in_memory(ThoraConfig::default());
        let mut state = InMemoryState::new();

        // Parent not in the store
        let orphan = Header {
            number: 5,
            parent_hash: alloy_primitives::B256::repeat_byte(9),
            ..Default::default()
        };
        assert_eq!(engine.finalize(&chain.store, &orphan, &mut state), None);

        // Parent present but carrying a garbage seal
        let mut bad_parent = chain.headers[1].clone();
        let mut extra = encode_extra(&[], &[]).to_vec();
        let last = extra.len() - 1;
        extra[last] = 9;
        bad_parent.extra_data = extra.into();
        let parent_hash = chain.store.insert_header(bad_parent.clone());
        let next = Header { number: 2, parent_hash, ..Default::default() };
        assert_eq!(engine.finalize(&chain.store, &next, &mut state), None);

        assert!(state.balances().is_empty());
    }
}
