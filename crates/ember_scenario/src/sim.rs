//! Deterministic in-memory chain double.
//!
//! Implements every collaborator trait over plain maps so the scenario runs
//! without a network. Claims pull the payout from the configured payer
//! through the transfer-authority allowance, so an underfunded or
//! under-approved payer reverts the claim exactly like the real flow.

use std::collections::HashMap;

use ember_schedule::{Address, RewardProgram};
use primitive_types::U256;

use crate::{ChainClock, ClaimController, FungibleToken, PriceOracle, Revert, RewardsConfigurator};

#[derive(Debug)]
struct ConfiguredProgram {
    program: RewardProgram,
    configured_at: u64,
    // (claimant, asset) -> timestamp accrual has been claimed up to.
    checkpoints: HashMap<(Address, Address), u64>,
}

/// Single-token chain double. No randomness; two runs over identical inputs
/// produce identical states.
#[derive(Debug, Default)]
pub struct SimChain {
    now: u64,
    oracle_answer: U256,
    balances: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address), U256>,
    program: Option<ConfiguredProgram>,
}

impl SimChain {
    #[must_use]
    pub fn new(start_time: u64) -> Self {
        Self {
            now: start_time,
            ..Self::default()
        }
    }

    /// Seed an account balance (genesis-style, no transfer semantics).
    pub fn set_balance(&mut self, account: Address, amount: U256) {
        self.balances.insert(account, amount);
    }

    #[must_use]
    pub fn balance(&self, account: Address) -> U256 {
        self.balances.get(&account).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.allowances
            .get(&(owner, spender))
            .copied()
            .unwrap_or_default()
    }
}

impl ChainClock for SimChain {
    fn now(&self) -> u64 {
        self.now
    }

    fn advance(&mut self, secs: u64) {
        self.now = self.now.saturating_add(secs);
    }
}

impl PriceOracle for SimChain {
    fn set_answer(&mut self, answer: U256) -> Result<(), Revert> {
        self.oracle_answer = answer;
        Ok(())
    }
}

impl FungibleToken for SimChain {
    fn balance_of(&self, account: Address) -> Result<U256, Revert> {
        Ok(self.balance(account))
    }

    fn transfer(&mut self, from: Address, to: Address, amount: U256) -> Result<(), Revert> {
        let from_balance = self.balance(from);
        if from_balance < amount {
            return Err(Revert::new(format!(
                "transfer amount exceeds balance: {from_balance} < {amount}"
            )));
        }
        self.balances.insert(from, from_balance - amount);
        let to_balance = self.balance(to);
        self.balances.insert(to, to_balance + amount);
        Ok(())
    }

    fn approve(&mut self, owner: Address, spender: Address, amount: U256) -> Result<(), Revert> {
        self.allowances.insert((owner, spender), amount);
        Ok(())
    }
}

impl RewardsConfigurator for SimChain {
    fn configure_assets(&mut self, program: &RewardProgram) -> Result<(), Revert> {
        if self.oracle_answer.is_zero() {
            return Err(Revert::new("reward oracle answer not seeded"));
        }
        self.program = Some(ConfiguredProgram {
            program: program.clone(),
            configured_at: self.now,
            checkpoints: HashMap::new(),
        });
        Ok(())
    }
}

impl ClaimController for SimChain {
    fn claim_rewards(
        &mut self,
        assets: &[Address],
        max_amount: U256,
        recipient: Address,
        reward_asset: Address,
    ) -> Result<U256, Revert> {
        let now = self.now;
        let configured = self
            .program
            .as_ref()
            .ok_or_else(|| Revert::new("no reward program configured"))?;
        if configured.program.reward_asset != reward_asset {
            return Err(Revert::new("unknown reward asset"));
        }

        // Accrue first, commit checkpoints only after the pull succeeds so a
        // reverted claim leaves no state behind.
        let mut accrued = U256::zero();
        let mut moved: Vec<((Address, Address), u64)> = Vec::new();
        for asset in assets {
            let Some(entry) = configured
                .program
                .entries
                .iter()
                .find(|e| e.asset == *asset)
            else {
                continue;
            };
            let from = configured
                .checkpoints
                .get(&(recipient, *asset))
                .copied()
                .unwrap_or(configured.configured_at);
            let until = now.min(entry.end_timestamp).max(from);
            accrued += entry.rate_per_second * (until - from);
            moved.push(((recipient, *asset), until));
        }
        let payer = configured.program.payer;
        let authority = configured.program.transfer_authority;

        let payout = accrued.min(max_amount);
        if !payout.is_zero() {
            let allowance = self.allowance(payer, authority);
            if allowance < payout {
                return Err(Revert::new(format!(
                    "insufficient transfer allowance: {allowance} < {payout}"
                )));
            }
            let payer_balance = self.balance(payer);
            if payer_balance < payout {
                return Err(Revert::new(format!(
                    "insufficient payer balance: {payer_balance} < {payout}"
                )));
            }
            self.allowances.insert((payer, authority), allowance - payout);
            self.balances.insert(payer, payer_balance - payout);
            let recipient_balance = self.balance(recipient);
            self.balances.insert(recipient, recipient_balance + payout);
        }
        if let Some(configured) = self.program.as_mut() {
            for (key, until) in moved {
                configured.checkpoints.insert(key, until);
            }
        }
        Ok(payout)
    }
}
