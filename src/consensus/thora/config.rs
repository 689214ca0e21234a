//! Thora chain configuration.

use super::EPOCH_LENGTH;
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// One ether in wei.
const ETHER: u64 = 1_000_000_000_000_000_000;

/// Thora configuration parameters.
///
/// Fixed for the lifetime of a chain; changing any field is a hard fork.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThoraConfig {
    /// Number of seconds between blocks to enforce.
    pub period: u64,
    /// Epoch length to reset votes and checkpoint.
    pub epoch: u64,
    /// Amount credited for every produced block.
    pub block_reward: U256,
    /// Fixed reward recipient; block signers are paid when unset or zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward_recipient: Option<Address>,
}

impl Default for ThoraConfig {
    fn default() -> Self {
        Self {
            period: 15,
            epoch: EPOCH_LENGTH,
            block_reward: U256::from(100u64) * U256::from(ETHER),
            reward_recipient: None,
        }
    }
}

impl ThoraConfig {
    /// Set the block period.
    pub fn with_period(mut self, period: u64) -> Self {
        self.period = period;
        self
    }

    /// Set the epoch length.
    pub fn with_epoch(mut self, epoch: u64) -> Self {
        self.epoch = epoch;
        self
    }

    /// Set the per-block reward.
    pub fn with_block_reward(mut self, block_reward: U256) -> Self {
        self.block_reward = block_reward;
        self
    }

    /// Pay every block reward to a fixed address.
    pub fn with_reward_recipient(mut self, recipient: Address) -> Self {
        self.reward_recipient = Some(recipient);
        self
    }

    /// The configured fixed recipient, ignoring the zero address.
    pub fn fixed_reward_recipient(&self) -> Option<Address> {
        self.reward_recipient.filter(|recipient| !recipient.is_zero())
    }

    /// Replace an unusable zero epoch with the default.
    pub(crate) fn normalized(mut self) -> Self {
        if self.epoch == 0 {
            self.epoch = EPOCH_LENGTH;
        }
        self
    }

    /// Whether `number` is an epoch checkpoint.
    pub fn is_checkpoint(&self, number: u64) -> bool {
        number % self.epoch == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_reward_is_100_ether() {
        let config = ThoraConfig::default();
        assert_eq!(config.block_reward, U256::from(100_000_000_000_000_000_000u128));
        assert_eq!(config.epoch, 30000);
        assert!(config.fixed_reward_recipient().is_none());
    }

    #[test]
    fn test_zero_recipient_is_ignored() {
        let config = ThoraConfig::default().with_reward_recipient(Address::ZERO);
        assert!(config.fixed_reward_recipient().is_none());

        let recipient = Address::repeat_byte(0x42);
        let config = config.with_reward_recipient(recipient);
        assert_eq!(config.fixed_reward_recipient(), Some(recipient));
    }

    #[test]
    fn test_json_field_names() {
        let config = ThoraConfig::default().with_period(5).with_block_reward(U256::from(100));
        let json = serde_json::to_value(config).unwrap();

        assert_eq!(json["period"], 5);
        assert_eq!(json["epoch"], 30000);
        assert!(json.get("blockReward").is_some());
        assert!(json.get("rewardRecipient").is_none());
        assert_eq!(serde_json::from_value::<ThoraConfig>(json).unwrap(), config);

        let parsed: ThoraConfig = serde_json::from_value(serde_json::json!({
            "period": 3,
            "epoch": 200,
            "blockReward": "0x64",
            "rewardRecipient": "0x7777777777777777777777777777777777777777",
        }))
        .unwrap();
        let expected = ThoraConfig::default()
            .with_period(3)
            .with_epoch(200)
            .with_block_reward(U256::from(100))
            .with_reward_recipient(Address::repeat_byte(0x77));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn test_zero_epoch_normalized() {
        let config = ThoraConfig::default().with_epoch(0).normalized();
        assert_eq!(config.epoch, EPOCH_LENGTH);
        assert!(config.is_checkpoint(0));
        assert!(!config.is_checkpoint(1));
    }
}
