//! Deposit/withdrawal reconciliation between the chain and the ledger.
//!
//! Deposits: a verified chain signature is converted into exactly one ledger
//! credit; the signature record is claimed with a unique insert before the
//! credit, so replays are idempotent no-ops.
//!
//! Withdrawals: an intent record is persisted *before* anything is broadcast.
//! If the process dies between broadcast and debit, the intent stays in the
//! pending index and the reconciliation pass determines the truth from the
//! chain instead of double-paying or losing the debit.

use crate::chain::{ChainClient, ChainStatus};
use crate::config::WagerConfig;
use crate::errors::{CasinoError, CasinoResult};
use crate::ledger::{AggregateKind, Balance, BalanceLedger};
use crate::storage::Storage;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

const CHAIN_TX_PREFIX: &str = "chain:tx:";
const INTENT_PREFIX: &str = "withdraw:intent:";
const PENDING_PREFIX: &str = "withdraw:pending:";

const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChainTxKind {
    Deposit,
    Withdrawal,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChainTxStatus {
    Pending,
    Confirmed,
    Failed,
}

/// Append-only record of a chain transfer bridged into the ledger. The
/// external signature is the idempotency key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainTransaction {
    pub id: String,
    pub account_id: String,
    pub kind: ChainTxKind,
    pub signature: String,
    pub amount: u64,
    pub status: ChainTxStatus,
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IntentState {
    /// Persisted, nothing broadcast yet.
    Prepared,
    /// Handed to the chain; outcome unknown until confirmed.
    Broadcast,
    Confirmed,
    Failed,
}

/// Withdrawal intent, persisted before any broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalIntent {
    pub id: String,
    pub account_id: String,
    pub amount: u64,
    pub destination: String,
    pub state: IntentState,
    pub signature: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

fn chain_tx_key(signature: &str) -> Vec<u8> {
    format!("{}{}", CHAIN_TX_PREFIX, signature).into_bytes()
}

fn intent_key(intent_id: &str) -> Vec<u8> {
    format!("{}{}", INTENT_PREFIX, intent_id).into_bytes()
}

fn pending_key(intent_id: &str) -> Vec<u8> {
    format!("{}{}", PENDING_PREFIX, intent_id).into_bytes()
}

/// Solana address shape: base58 alphabet, 32-44 characters.
pub fn is_valid_address(address: &str) -> bool {
    (32..=44).contains(&address.len())
        && address.chars().all(|c| BASE58_ALPHABET.contains(c))
}

#[derive(Debug, Clone)]
pub struct DepositReceipt {
    pub signature: String,
    pub amount: u64,
    pub balance: Balance,
}

#[derive(Debug, Clone)]
pub struct WithdrawalReceipt {
    pub signature: String,
    pub amount: u64,
    pub balance: Balance,
}

pub struct Reconciler {
    storage: Storage,
    ledger: Arc<BalanceLedger>,
    chain: Arc<dyn ChainClient>,
    limits: WagerConfig,
}

impl Reconciler {
    pub fn new(
        storage: Storage,
        ledger: Arc<BalanceLedger>,
        chain: Arc<dyn ChainClient>,
        limits: WagerConfig,
    ) -> Self {
        Self {
            storage,
            ledger,
            chain,
            limits,
        }
    }

    /// Bridge a verified on-chain deposit into a ledger credit.
    pub async fn deposit(&self, account_id: &str, signature: &str) -> CasinoResult<DepositReceipt> {
        if signature.is_empty() {
            return Err(CasinoError::validation("signature must not be empty"));
        }

        let verified = self.chain.verify_deposit(signature).await?;

        // Claim the signature first: the unique insert is what makes replays
        // idempotent, independent of anything the handler checked earlier.
        let record = ChainTransaction {
            id: Uuid::new_v4().to_string(),
            account_id: account_id.to_string(),
            kind: ChainTxKind::Deposit,
            signature: signature.to_string(),
            amount: verified.amount,
            status: ChainTxStatus::Confirmed,
            created_at: Utc::now().timestamp_millis(),
        };
        self.storage.insert_unique(&chain_tx_key(signature), &record)?;

        let balance =
            self.ledger
                .apply_delta(account_id, verified.amount as i64, AggregateKind::Deposited)?;

        tracing::info!(account = %account_id, signature, amount = verified.amount, "deposit credited");
        Ok(DepositReceipt {
            signature: signature.to_string(),
            amount: verified.amount,
            balance,
        })
    }

    /// Withdraw to an external address: validate, persist the intent,
    /// broadcast, confirm, then debit.
    pub async fn withdraw(
        &self,
        account_id: &str,
        amount: u64,
        destination: &str,
    ) -> CasinoResult<WithdrawalReceipt> {
        if !is_valid_address(destination) {
            return Err(CasinoError::validation(format!(
                "invalid destination address: {}",
                destination
            )));
        }
        if amount < self.limits.min_withdrawal || amount > self.limits.max_withdrawal {
            return Err(CasinoError::WithdrawalBounds(format!(
                "amount must be within [{}, {}] lamports",
                self.limits.min_withdrawal, self.limits.max_withdrawal
            )));
        }
        if self.ledger.balance_of(account_id)?.balance < amount {
            return Err(CasinoError::InsufficientBalance);
        }

        // Intent lands on disk before the chain sees anything.
        let now = Utc::now().timestamp_millis();
        let mut intent = WithdrawalIntent {
            id: Uuid::new_v4().to_string(),
            account_id: account_id.to_string(),
            amount,
            destination: destination.to_string(),
            state: IntentState::Prepared,
            signature: None,
            created_at: now,
            updated_at: now,
        };
        self.store_intent(&intent, true)?;

        let signature = match self.chain.broadcast_withdrawal(destination, amount).await {
            Ok(signature) => signature,
            Err(e) => {
                // Nothing left the house wallet; the intent is closed out.
                self.transition_intent(&mut intent, IntentState::Failed)?;
                return Err(e);
            }
        };
        intent.signature = Some(signature.clone());
        self.transition_intent(&mut intent, IntentState::Broadcast)?;

        match self.chain.confirm(&signature).await {
            Ok(ChainStatus::Confirmed) => {
                let balance = self.complete_withdrawal(&mut intent)?;
                tracing::info!(account = %account_id, %signature, amount, "withdrawal confirmed");
                Ok(WithdrawalReceipt {
                    signature,
                    amount,
                    balance,
                })
            }
            Ok(ChainStatus::NotFound) | Ok(ChainStatus::Failed) => {
                self.transition_intent(&mut intent, IntentState::Failed)?;
                Err(CasinoError::ExternalVerification(format!(
                    "withdrawal {} did not land on chain",
                    signature
                )))
            }
            // Chain unreachable: the intent stays Broadcast in the pending
            // index and the reconciliation pass settles it later. Surfaced
            // as a distinct retryable error, never silently retried here.
            Err(e) => Err(CasinoError::ExternalVerification(format!(
                "withdrawal {} broadcast but unconfirmed: {}",
                signature, e
            ))),
        }
    }

    /// Resolve stale withdrawal intents from chain state. Run at startup and
    /// whenever an operator asks for it.
    pub async fn reconcile(&self) -> CasinoResult<usize> {
        let pending = self
            .storage
            .scan_prefix(PENDING_PREFIX.as_bytes(), 10_000)?;
        let mut resolved = 0;

        for (key, _) in pending {
            let intent_id = String::from_utf8_lossy(&key[PENDING_PREFIX.len()..]).into_owned();
            let Some(mut intent) = self
                .storage
                .get_json::<WithdrawalIntent>(&intent_key(&intent_id))?
            else {
                self.storage.delete(&key)?;
                continue;
            };

            match intent.state {
                // Never broadcast: nothing was paid, close it out.
                IntentState::Prepared => {
                    self.transition_intent(&mut intent, IntentState::Failed)?;
                    resolved += 1;
                }
                IntentState::Broadcast => {
                    let Some(signature) = intent.signature.clone() else {
                        self.transition_intent(&mut intent, IntentState::Failed)?;
                        resolved += 1;
                        continue;
                    };
                    match self.chain.confirm(&signature).await {
                        Ok(ChainStatus::Confirmed) => {
                            self.complete_withdrawal(&mut intent)?;
                            tracing::info!(intent = %intent.id, %signature, "reconciled withdrawal as confirmed");
                            resolved += 1;
                        }
                        Ok(ChainStatus::NotFound) | Ok(ChainStatus::Failed) => {
                            self.transition_intent(&mut intent, IntentState::Failed)?;
                            tracing::warn!(intent = %intent.id, %signature, "reconciled withdrawal as failed");
                            resolved += 1;
                        }
                        // Chain still unavailable, keep the intent pending.
                        Err(e) => {
                            tracing::warn!(intent = %intent.id, error = %e, "reconcile deferred");
                        }
                    }
                }
                IntentState::Confirmed | IntentState::Failed => {
                    self.storage.delete(&key)?;
                }
            }
        }
        Ok(resolved)
    }

    /// Debit the ledger for a chain-confirmed intent and record the chain
    /// transaction under its signature.
    fn complete_withdrawal(&self, intent: &mut WithdrawalIntent) -> CasinoResult<Balance> {
        let balance = self.ledger.apply_delta(
            &intent.account_id,
            -(intent.amount as i64),
            AggregateKind::Withdrawn,
        )?;

        let signature = intent.signature.clone().unwrap_or_default();
        let record = ChainTransaction {
            id: Uuid::new_v4().to_string(),
            account_id: intent.account_id.clone(),
            kind: ChainTxKind::Withdrawal,
            signature: signature.clone(),
            amount: intent.amount,
            status: ChainTxStatus::Confirmed,
            created_at: Utc::now().timestamp_millis(),
        };
        // A reconcile retry may have recorded it already.
        match self.storage.insert_unique(&chain_tx_key(&signature), &record) {
            Ok(()) | Err(CasinoError::DuplicateTransaction(_)) => {}
            Err(e) => return Err(e),
        }

        self.transition_intent(intent, IntentState::Confirmed)?;
        Ok(balance)
    }

    fn store_intent(&self, intent: &WithdrawalIntent, pending: bool) -> CasinoResult<()> {
        self.storage.put_json(&intent_key(&intent.id), intent)?;
        if pending {
            self.storage.put_raw(&pending_key(&intent.id), b"")?;
        }
        Ok(())
    }

    fn transition_intent(
        &self,
        intent: &mut WithdrawalIntent,
        state: IntentState,
    ) -> CasinoResult<()> {
        intent.state = state;
        intent.updated_at = Utc::now().timestamp_millis();
        self.storage.put_json(&intent_key(&intent.id), intent)?;
        if matches!(state, IntentState::Confirmed | IntentState::Failed) {
            self.storage.delete(&pending_key(&intent.id))?;
        }
        Ok(())
    }

    pub fn chain_transaction(&self, signature: &str) -> CasinoResult<Option<ChainTransaction>> {
        self.storage.get_json(&chain_tx_key(signature))
    }

    #[cfg(test)]
    fn pending_intents(&self) -> CasinoResult<usize> {
        Ok(self
            .storage
            .scan_prefix(PENDING_PREFIX.as_bytes(), 10_000)?
            .len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::mock::MockChainClient;
    use tempfile::TempDir;

    const DEST: &str = "7nYabs9dUhvxYwdTnrWVBL9MYviKSfrEbdWCUbcarjE1";

    fn build(
        chain: Arc<MockChainClient>,
    ) -> (Reconciler, Arc<BalanceLedger>, Storage, TempDir) {
        let dir = TempDir::new().expect("tempdir");
        let storage = Storage::open_default(dir.path()).expect("open");
        let ledger = Arc::new(BalanceLedger::new(storage.clone()));
        let reconciler = Reconciler::new(
            storage.clone(),
            Arc::clone(&ledger),
            chain,
            WagerConfig::default(),
        );
        (reconciler, ledger, storage, dir)
    }

    #[tokio::test]
    async fn test_deposit_credits_once() {
        let chain = Arc::new(MockChainClient::new());
        chain.seed_deposit("sig-dep-1", "player-wallet", 5_000_000);
        let (reconciler, ledger, _storage, _dir) = build(chain);

        let receipt = reconciler.deposit("p1", "sig-dep-1").await.unwrap();
        assert_eq!(receipt.amount, 5_000_000);
        assert_eq!(receipt.balance.balance, 5_000_000);

        // Replaying the same signature is a duplicate, with no balance change.
        let err = reconciler.deposit("p1", "sig-dep-1").await.unwrap_err();
        assert!(matches!(err, CasinoError::DuplicateTransaction(_)));
        assert_eq!(ledger.balance_of("p1").unwrap().balance, 5_000_000);
    }

    #[tokio::test]
    async fn test_deposit_replay_from_other_account_also_rejected() {
        let chain = Arc::new(MockChainClient::new());
        chain.seed_deposit("sig-dep-2", "player-wallet", 1_000);
        let (reconciler, ledger, _storage, _dir) = build(chain);

        reconciler.deposit("p1", "sig-dep-2").await.unwrap();
        let err = reconciler.deposit("p2", "sig-dep-2").await.unwrap_err();
        assert!(matches!(err, CasinoError::DuplicateTransaction(_)));
        assert_eq!(ledger.balance_of("p2").unwrap().balance, 0);
    }

    #[tokio::test]
    async fn test_unverifiable_deposit_is_retryable() {
        let chain = Arc::new(MockChainClient::new());
        let (reconciler, ledger, _storage, _dir) = build(chain);
        let err = reconciler.deposit("p1", "sig-ghost").await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(ledger.balance_of("p1").unwrap().balance, 0);
    }

    #[tokio::test]
    async fn test_withdrawal_happy_path_debits_after_confirm() {
        let chain = Arc::new(MockChainClient::new());
        let (reconciler, ledger, _storage, _dir) = build(chain);
        ledger
            .apply_delta("p1", 10_000_000, AggregateKind::Deposited)
            .unwrap();

        let receipt = reconciler.withdraw("p1", 4_000_000, DEST).await.unwrap();
        let balance = ledger.balance_of("p1").unwrap();
        assert_eq!(balance.balance, 6_000_000);
        assert_eq!(balance.total_withdrawn, 4_000_000);
        assert!(balance.invariant_holds());

        // The signature is recorded and nothing is left pending.
        assert!(reconciler
            .chain_transaction(&receipt.signature)
            .unwrap()
            .is_some());
        assert_eq!(reconciler.pending_intents().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_withdrawal_validations() {
        let chain = Arc::new(MockChainClient::new());
        let (reconciler, ledger, _storage, _dir) = build(chain);
        ledger
            .apply_delta("p1", 10_000_000, AggregateKind::Deposited)
            .unwrap();

        let err = reconciler.withdraw("p1", 4_000_000, "not-an-address").await.unwrap_err();
        assert!(matches!(err, CasinoError::Validation(_)));

        let err = reconciler.withdraw("p1", 1, DEST).await.unwrap_err();
        assert!(matches!(err, CasinoError::WithdrawalBounds(_)));

        let err = reconciler.withdraw("p1", 10_000_001, DEST).await.unwrap_err();
        assert!(matches!(err, CasinoError::InsufficientBalance));
    }

    #[tokio::test]
    async fn test_failed_broadcast_leaves_balance_untouched() {
        let mut chain = MockChainClient::new();
        chain.broadcast_error = Some("signer offline".into());
        let (reconciler, ledger, _storage, _dir) = build(Arc::new(chain));
        ledger
            .apply_delta("p1", 10_000_000, AggregateKind::Deposited)
            .unwrap();

        let err = reconciler.withdraw("p1", 4_000_000, DEST).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(ledger.balance_of("p1").unwrap().balance, 10_000_000);
        assert_eq!(reconciler.pending_intents().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unconfirmed_broadcast_reconciles_to_debit() {
        let mut chain = MockChainClient::new();
        chain.confirm_unavailable = true;
        let chain = Arc::new(chain);
        let (reconciler, ledger, storage, _dir) = build(Arc::clone(&chain));
        ledger
            .apply_delta("p1", 10_000_000, AggregateKind::Deposited)
            .unwrap();

        // Broadcast succeeds but confirmation is unreachable: no debit yet,
        // the intent stays pending.
        let err = reconciler.withdraw("p1", 4_000_000, DEST).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(ledger.balance_of("p1").unwrap().balance, 10_000_000);
        assert_eq!(reconciler.pending_intents().unwrap(), 1);

        // Chain comes back; simulate a restart by building a fresh reconciler
        // over the same storage, with confirmations answering Confirmed.
        let recovered_chain = Arc::new(MockChainClient::new());
        recovered_chain.set_status("mock-withdrawal-0", ChainStatus::Confirmed);
        let reconciler = Reconciler::new(
            storage,
            Arc::clone(&ledger),
            recovered_chain,
            WagerConfig::default(),
        );
        let resolved = reconciler.reconcile().await.unwrap();
        assert_eq!(resolved, 1);

        let balance = ledger.balance_of("p1").unwrap();
        assert_eq!(balance.balance, 6_000_000);
        assert_eq!(balance.total_withdrawn, 4_000_000);
        assert!(balance.invariant_holds());
        assert_eq!(reconciler.pending_intents().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reconcile_marks_vanished_broadcast_failed() {
        let mut chain = MockChainClient::new();
        chain.confirm_unavailable = true;
        let (reconciler, ledger, storage, _dir) = build(Arc::new(chain));
        ledger
            .apply_delta("p1", 10_000_000, AggregateKind::Deposited)
            .unwrap();
        let _ = reconciler.withdraw("p1", 4_000_000, DEST).await.unwrap_err();

        // The signature never landed: reconciliation closes the intent with
        // no debit.
        let recovered_chain = Arc::new(MockChainClient::new());
        recovered_chain.set_status("mock-withdrawal-0", ChainStatus::NotFound);
        let reconciler = Reconciler::new(
            storage,
            Arc::clone(&ledger),
            recovered_chain,
            WagerConfig::default(),
        );
        assert_eq!(reconciler.reconcile().await.unwrap(), 1);
        assert_eq!(ledger.balance_of("p1").unwrap().balance, 10_000_000);
        assert_eq!(reconciler.pending_intents().unwrap(), 0);
    }

    #[test]
    fn test_address_validation() {
        assert!(is_valid_address(DEST));
        assert!(!is_valid_address("short"));
        assert!(!is_valid_address("0OIl_contains_forbidden_chars_0OIl_aaaaa"));
    }
}
