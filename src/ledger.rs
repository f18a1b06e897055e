//! Balance ledger: the only component allowed to mutate money.
//!
//! Every mutation is a signed delta applied under a per-account lock, so the
//! balance check and the write are one atomic step relative to any concurrent
//! caller for the same account. Callers never read a balance, compute a delta
//! and write it back themselves.

use crate::errors::{CasinoError, CasinoResult};
use crate::storage::Storage;
use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Which lifetime aggregate a delta belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateKind {
    Deposited,
    Withdrawn,
    Wagered,
    Won,
}

/// Per-account balance with lifetime aggregates, all in lamports.
///
/// Invariant after every operation:
/// `balance = total_deposited - total_withdrawn - total_wagered + total_won`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Balance {
    pub account_id: String,
    pub balance: u64,
    pub total_deposited: u64,
    pub total_withdrawn: u64,
    pub total_wagered: u64,
    pub total_won: u64,
    pub version: u64,
    pub updated_at: i64,
}

impl Balance {
    fn zeroed(account_id: &str) -> Self {
        Self {
            account_id: account_id.to_string(),
            balance: 0,
            total_deposited: 0,
            total_withdrawn: 0,
            total_wagered: 0,
            total_won: 0,
            version: 0,
            updated_at: Utc::now().timestamp_millis(),
        }
    }

    /// Check the ledger identity between balance and aggregates.
    pub fn invariant_holds(&self) -> bool {
        let derived = self.total_deposited as i128 - self.total_withdrawn as i128
            - self.total_wagered as i128
            + self.total_won as i128;
        derived == self.balance as i128
    }
}

fn balance_key(account_id: &str) -> Vec<u8> {
    format!("balance:{}", account_id).into_bytes()
}

pub struct BalanceLedger {
    storage: Storage,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl BalanceLedger {
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, account_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(account_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn load(&self, account_id: &str) -> CasinoResult<Balance> {
        Ok(self
            .storage
            .get_json(&balance_key(account_id))?
            .unwrap_or_else(|| Balance::zeroed(account_id)))
    }

    /// Current balance for an account; fresh accounts read as zeroed.
    pub fn balance_of(&self, account_id: &str) -> CasinoResult<Balance> {
        self.load(account_id)
    }

    /// Apply a signed delta and bump the matching lifetime aggregate by
    /// `|delta|`, as one atomic step for the account. A debit that would
    /// take the balance negative is rejected with `InsufficientBalance`
    /// before anything is written.
    pub fn apply_delta(
        &self,
        account_id: &str,
        delta: i64,
        kind: AggregateKind,
    ) -> CasinoResult<Balance> {
        let lock = self.lock_for(account_id);
        let _guard = lock.lock().map_err(|_| CasinoError::ConcurrencyConflict)?;

        let mut record = self.load(account_id)?;
        let next = record.balance as i128 + delta as i128;
        if next < 0 {
            return Err(CasinoError::InsufficientBalance);
        }
        record.balance = next as u64;

        let magnitude = delta.unsigned_abs();
        match kind {
            AggregateKind::Deposited => record.total_deposited += magnitude,
            AggregateKind::Withdrawn => record.total_withdrawn += magnitude,
            AggregateKind::Wagered => record.total_wagered += magnitude,
            AggregateKind::Won => record.total_won += magnitude,
        }
        record.version += 1;
        record.updated_at = Utc::now().timestamp_millis();

        self.storage.put_json(&balance_key(account_id), &record)?;
        Ok(record)
    }

    /// Settle a resolved wager as one combined delta (`payout - bet`):
    /// the stake debit and the payout credit land in the same atomic step,
    /// updating `total_wagered` and `total_won` together. There is no
    /// observable state where the account is debited but not credited.
    ///
    /// The stake check is re-validated here under the lock; the orchestrator's
    /// earlier balance check is advisory only.
    pub fn settle_wager(&self, account_id: &str, bet: u64, payout: u64) -> CasinoResult<Balance> {
        let lock = self.lock_for(account_id);
        let _guard = lock.lock().map_err(|_| CasinoError::ConcurrencyConflict)?;

        let mut record = self.load(account_id)?;
        if record.balance < bet {
            return Err(CasinoError::InsufficientBalance);
        }
        record.balance = record.balance - bet + payout;
        record.total_wagered += bet;
        record.total_won += payout;
        record.version += 1;
        record.updated_at = Utc::now().timestamp_millis();

        self.storage.put_json(&balance_key(account_id), &record)?;
        Ok(record)
    }
}
