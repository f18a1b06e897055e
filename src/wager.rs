//! Wager orchestration: the one code path that turns a bet into money
//! movement.
//!
//! A play request moves through validation, an advisory balance check, pure
//! outcome resolution, a single atomic settlement delta, session recording
//! and finally the referral cascade. Nothing is written before resolution
//! succeeds, and the stake debit plus payout credit land as one ledger step.

use crate::config::WagerConfig;
use crate::errors::{CasinoError, CasinoResult};
use crate::games::{GameKind, GameRegistry, GameRng};
use crate::ledger::{Balance, BalanceLedger};
use crate::referral::{ReferralCommission, ReferralProgram};
use crate::storage::{inverted_millis, Storage};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

const SESSION_PREFIX: &str = "wager:session:";
const HISTORY_PREFIX: &str = "wager:history:";

/// Immutable record of a resolved wager. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WagerSession {
    pub id: String,
    pub account_id: String,
    pub game: GameKind,
    pub bet_amount: u64,
    pub payout: u64,
    pub win: bool,
    /// Game-specific result payload, including the RNG seed for replay.
    pub detail: serde_json::Value,
    pub created_at: i64,
}

fn session_key(session_id: &str) -> Vec<u8> {
    format!("{}{}", SESSION_PREFIX, session_id).into_bytes()
}

/// History index key: prefix | account | inverted millis | session id, so a
/// forward scan yields newest-first.
fn history_key(account_id: &str, created_at: i64, session_id: &str) -> Vec<u8> {
    let mut key = format!("{}{}:", HISTORY_PREFIX, account_id).into_bytes();
    key.extend_from_slice(&inverted_millis(created_at));
    key.extend_from_slice(session_id.as_bytes());
    key
}

fn history_prefix(account_id: &str) -> Vec<u8> {
    format!("{}{}:", HISTORY_PREFIX, account_id).into_bytes()
}

/// Outcome of a settled play, as returned to the API layer.
#[derive(Debug, Clone)]
pub struct PlayReceipt {
    pub session: WagerSession,
    pub balance: Balance,
    /// Referral commission paid out of this wager's loss, if any.
    pub commission: Option<ReferralCommission>,
}

pub struct WagerProcessor {
    storage: Storage,
    ledger: Arc<BalanceLedger>,
    registry: GameRegistry,
    referrals: Arc<ReferralProgram>,
    limits: WagerConfig,
}

impl WagerProcessor {
    pub fn new(
        storage: Storage,
        ledger: Arc<BalanceLedger>,
        registry: GameRegistry,
        referrals: Arc<ReferralProgram>,
        limits: WagerConfig,
    ) -> Self {
        Self {
            storage,
            ledger,
            registry,
            referrals,
            limits,
        }
    }

    /// Run a wager end to end. Any failure before settlement leaves no
    /// observable state.
    pub fn play(
        &self,
        account_id: &str,
        game: GameKind,
        bet_amount: u64,
        params: &serde_json::Value,
    ) -> CasinoResult<PlayReceipt> {
        // Validating
        let engine = self.registry.get(game)?;
        if bet_amount < self.limits.min_bet || bet_amount > self.limits.max_bet {
            return Err(CasinoError::validation(format!(
                "bet must be within [{}, {}] lamports",
                self.limits.min_bet, self.limits.max_bet
            )));
        }
        engine.validate(bet_amount, params)?;

        // BalanceChecked: fail fast before resolving; the settle step
        // re-validates atomically.
        if self.ledger.balance_of(account_id)?.balance < bet_amount {
            return Err(CasinoError::InsufficientBalance);
        }

        // Resolved: pure computation, no mutation.
        let mut rng = GameRng::from_entropy();
        let seed_hex = rng.seed_hex().to_string();
        let outcome = engine.resolve(bet_amount, params, &mut rng)?;

        // Settled: stake debit and payout credit as one delta.
        let balance = self
            .ledger
            .settle_wager(account_id, bet_amount, outcome.payout)?;

        // Recorded
        let mut detail = outcome.detail;
        if let serde_json::Value::Object(ref mut map) = detail {
            map.insert("seed".to_string(), serde_json::Value::String(seed_hex));
        }
        let session = WagerSession {
            id: Uuid::new_v4().to_string(),
            account_id: account_id.to_string(),
            game,
            bet_amount,
            payout: outcome.payout,
            win: outcome.win,
            detail,
            created_at: Utc::now().timestamp_millis(),
        };
        self.record(&session)?;

        // CommissionCascaded: only on net loss; a failure here never unwinds
        // the settled wager, it is logged for operator follow-up and is
        // idempotent on retry.
        let commission = if session.payout < session.bet_amount {
            self.referrals.cascade(&session).unwrap_or_else(|e| {
                tracing::warn!(
                    session_id = %session.id,
                    error = %e,
                    "referral commission cascade failed"
                );
                None
            })
        } else {
            None
        };

        Ok(PlayReceipt {
            session,
            balance,
            commission,
        })
    }

    fn record(&self, session: &WagerSession) -> CasinoResult<()> {
        self.storage.put_json(&session_key(&session.id), session)?;
        self.storage.put_raw(
            &history_key(&session.account_id, session.created_at, &session.id),
            session.id.as_bytes(),
        )
    }

    pub fn session(&self, session_id: &str) -> CasinoResult<Option<WagerSession>> {
        self.storage.get_json(&session_key(session_id))
    }

    /// Newest-first wager history for an account.
    pub fn history(&self, account_id: &str, limit: usize) -> CasinoResult<Vec<WagerSession>> {
        let rows = self
            .storage
            .scan_prefix(&history_prefix(account_id), limit)?;
        let mut sessions = Vec::with_capacity(rows.len());
        for (_key, session_id) in rows {
            let id = String::from_utf8_lossy(&session_id);
            if let Some(session) = self.session(&id)? {
                sessions.push(session);
            }
        }
        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReferralConfig;
    use crate::ledger::AggregateKind;
    use serde_json::json;
    use tempfile::TempDir;

    fn build_processor() -> (WagerProcessor, Arc<BalanceLedger>, Arc<ReferralProgram>, TempDir) {
        let dir = TempDir::new().expect("tempdir");
        let storage = Storage::open_default(dir.path()).expect("open");
        let ledger = Arc::new(BalanceLedger::new(storage.clone()));
        let referrals = Arc::new(ReferralProgram::new(
            storage.clone(),
            Arc::clone(&ledger),
            ReferralConfig::default(),
        ));
        let processor = WagerProcessor::new(
            storage,
            Arc::clone(&ledger),
            GameRegistry::new(),
            Arc::clone(&referrals),
            WagerConfig::default(),
        );
        (processor, ledger, referrals, dir)
    }

    #[test]
    fn test_play_settles_and_records() {
        let (processor, ledger, _referrals, _dir) = build_processor();
        ledger
            .apply_delta("p1", 10_000_000, AggregateKind::Deposited)
            .unwrap();

        let receipt = processor
            .play("p1", GameKind::Dice, 1_000_000, &json!({ "target": 50.0 }))
            .unwrap();

        // Session persisted and reachable through history.
        let stored = processor.session(&receipt.session.id).unwrap().unwrap();
        assert_eq!(stored.bet_amount, 1_000_000);
        let history = processor.history("p1", 10).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, receipt.session.id);

        // Ledger invariant holds and the combined delta was applied.
        assert!(receipt.balance.invariant_holds());
        assert_eq!(receipt.balance.total_wagered, 1_000_000);
        assert_eq!(receipt.balance.total_won, receipt.session.payout);
    }

    #[test]
    fn test_validation_failure_leaves_no_state() {
        let (processor, ledger, _referrals, _dir) = build_processor();
        ledger
            .apply_delta("p1", 10_000_000, AggregateKind::Deposited)
            .unwrap();

        let err = processor
            .play("p1", GameKind::Dice, 1_000_000, &json!({ "target": 0.5 }))
            .unwrap_err();
        assert!(matches!(err, CasinoError::Validation(_)));

        let balance = ledger.balance_of("p1").unwrap();
        assert_eq!(balance.total_wagered, 0);
        assert!(processor.history("p1", 10).unwrap().is_empty());
    }

    #[test]
    fn test_insufficient_balance_fails_closed() {
        let (processor, ledger, _referrals, _dir) = build_processor();
        ledger
            .apply_delta("p1", 500_000, AggregateKind::Deposited)
            .unwrap();

        let err = processor
            .play("p1", GameKind::Dice, 1_000_000, &json!({ "target": 50.0 }))
            .unwrap_err();
        assert!(matches!(err, CasinoError::InsufficientBalance));
        assert!(processor.history("p1", 10).unwrap().is_empty());
    }

    #[test]
    fn test_bet_bounds_enforced() {
        let (processor, ledger, _referrals, _dir) = build_processor();
        ledger
            .apply_delta("p1", 10_000_000, AggregateKind::Deposited)
            .unwrap();
        let err = processor
            .play("p1", GameKind::Dice, 1, &json!({ "target": 50.0 }))
            .unwrap_err();
        assert!(matches!(err, CasinoError::Validation(_)));
    }

    #[test]
    fn test_net_loss_pays_referrer_through_receipt() {
        let (processor, ledger, referrals, _dir) = build_processor();
        let code = referrals.stats("ref").unwrap().code;
        referrals.redeem("player", &code).unwrap();
        ledger
            .apply_delta("player", 10_000_000, AggregateKind::Deposited)
            .unwrap();

        // A busted mines trace always loses the full stake.
        let receipt = processor
            .play(
                "player",
                GameKind::Mines,
                1_000_000,
                &json!({ "mineCount": 5, "gemsFound": 3, "busted": true }),
            )
            .unwrap();

        let commission = receipt.commission.expect("net loss cascades");
        assert_eq!(commission.commission, 100_000);
        assert_eq!(ledger.balance_of("ref").unwrap().balance, 100_000);
    }

    #[test]
    fn test_history_is_newest_first() {
        let (processor, ledger, _referrals, _dir) = build_processor();
        ledger
            .apply_delta("p1", 100_000_000, AggregateKind::Deposited)
            .unwrap();

        for _ in 0..3 {
            processor
                .play("p1", GameKind::CoinFlip, 1_000_000, &json!({ "choice": "heads" }))
                .unwrap();
            std::thread::sleep(std::time::Duration::from_millis(5));
        }

        let history = processor.history("p1", 10).unwrap();
        assert_eq!(history.len(), 3);
        assert!(history[0].created_at >= history[1].created_at);
        assert!(history[1].created_at >= history[2].created_at);
    }
}
