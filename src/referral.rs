//! Referral program: links, codes and the net-loss commission cascade.
//!
//! A referred account is bound to its referrer exactly once (first referral
//! wins, self-referral is rejected). When a referred account settles a
//! net-loss wager, the referrer is credited a fraction of the loss; the
//! commission record is keyed by the wager session id, so a settlement retry
//! can never credit the same loss twice.

use crate::config::ReferralConfig;
use crate::errors::{CasinoError, CasinoResult};
use crate::ledger::{AggregateKind, BalanceLedger};
use crate::storage::Storage;
use crate::wager::WagerSession;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;

const CODE_PREFIX: &str = "referral:code:";
const LINK_PREFIX: &str = "referral:link:";
const CHILDREN_PREFIX: &str = "referral:children:";
const COMMISSION_PREFIX: &str = "referral:commission:";
const EARNED_PREFIX: &str = "referral:earned:";

const REFERRAL_URL_BASE: &str = "https://play.velvet.casino/r/";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralLink {
    pub referrer: String,
    pub referred: String,
    pub commission_rate: f64,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralCommission {
    pub session_id: String,
    pub referrer: String,
    pub referred: String,
    pub loss: u64,
    pub commission: u64,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralStats {
    pub code: String,
    pub referral_url: String,
    pub referred_count: usize,
    pub total_commission: u64,
    pub commission_rate: f64,
}

pub struct ReferralProgram {
    storage: Storage,
    ledger: Arc<BalanceLedger>,
    config: ReferralConfig,
}

impl ReferralProgram {
    pub fn new(storage: Storage, ledger: Arc<BalanceLedger>, config: ReferralConfig) -> Self {
        Self {
            storage,
            ledger,
            config,
        }
    }

    /// Stable shareable code derived from the account id.
    pub fn code_for(&self, account_id: &str) -> String {
        let digest = Sha256::digest(account_id.as_bytes());
        hex::encode(&digest[..4])
    }

    /// Register the code-to-account mapping so redemptions can resolve it.
    fn ensure_code_registered(&self, account_id: &str) -> CasinoResult<String> {
        let code = self.code_for(account_id);
        let key = format!("{}{}", CODE_PREFIX, code).into_bytes();
        if self.storage.get_json::<String>(&key)?.is_none() {
            self.storage.put_json(&key, &account_id.to_string())?;
        }
        Ok(code)
    }

    /// Bind `referred` to the owner of `code`. First referral wins.
    pub fn redeem(&self, referred: &str, code: &str) -> CasinoResult<ReferralLink> {
        let key = format!("{}{}", CODE_PREFIX, code).into_bytes();
        let referrer: String = self
            .storage
            .get_json(&key)?
            .ok_or_else(|| CasinoError::validation(format!("unknown referral code: {}", code)))?;

        if referrer == referred {
            return Err(CasinoError::validation("self-referral is not allowed"));
        }

        let link = ReferralLink {
            referrer: referrer.clone(),
            referred: referred.to_string(),
            commission_rate: self.config.commission_rate,
            created_at: Utc::now().timestamp_millis(),
        };

        let link_key = format!("{}{}", LINK_PREFIX, referred).into_bytes();
        match self.storage.insert_unique(&link_key, &link) {
            Ok(()) => {}
            Err(CasinoError::DuplicateTransaction(_)) => {
                return Err(CasinoError::validation("account already has a referrer"));
            }
            Err(e) => return Err(e),
        }
        self.storage.put_raw(
            &format!("{}{}:{}", CHILDREN_PREFIX, referrer, referred).into_bytes(),
            b"",
        )?;
        Ok(link)
    }

    pub fn link_of(&self, referred: &str) -> CasinoResult<Option<ReferralLink>> {
        self.storage
            .get_json(&format!("{}{}", LINK_PREFIX, referred).into_bytes())
    }

    /// Credit the referrer for a net-loss wager. Idempotent on the session
    /// id: the commission record is claimed before the credit, so a retried
    /// settlement is a no-op.
    pub fn cascade(&self, session: &WagerSession) -> CasinoResult<Option<ReferralCommission>> {
        if session.payout >= session.bet_amount {
            return Ok(None);
        }
        let Some(link) = self.link_of(&session.account_id)? else {
            return Ok(None);
        };

        let loss = session.bet_amount - session.payout;
        let commission = (loss as f64 * link.commission_rate).floor() as u64;
        if commission == 0 {
            return Ok(None);
        }

        let record = ReferralCommission {
            session_id: session.id.clone(),
            referrer: link.referrer.clone(),
            referred: link.referred.clone(),
            loss,
            commission,
            created_at: Utc::now().timestamp_millis(),
        };

        let commission_key = format!("{}{}", COMMISSION_PREFIX, session.id).into_bytes();
        match self.storage.insert_unique(&commission_key, &record) {
            Ok(()) => {}
            // Already cascaded for this session.
            Err(CasinoError::DuplicateTransaction(_)) => return Ok(None),
            Err(e) => return Err(e),
        }

        self.ledger
            .apply_delta(&link.referrer, commission as i64, AggregateKind::Deposited)?;
        self.storage.put_json(
            &format!("{}{}:{}", EARNED_PREFIX, link.referrer, session.id).into_bytes(),
            &commission,
        )?;

        tracing::debug!(
            referrer = %link.referrer,
            referred = %link.referred,
            commission,
            "referral commission credited"
        );
        Ok(Some(record))
    }

    pub fn stats(&self, account_id: &str) -> CasinoResult<ReferralStats> {
        let code = self.ensure_code_registered(account_id)?;

        let children_prefix = format!("{}{}:", CHILDREN_PREFIX, account_id).into_bytes();
        let referred_count = self.storage.scan_prefix(&children_prefix, 10_000)?.len();

        let earned_prefix = format!("{}{}:", EARNED_PREFIX, account_id).into_bytes();
        let mut total_commission: u64 = 0;
        for (_key, value) in self.storage.scan_prefix(&earned_prefix, 100_000)? {
            let amount: u64 = serde_json::from_slice(&value)
                .map_err(|e| CasinoError::Corrupt(format!("bad commission index entry: {}", e)))?;
            total_commission += amount;
        }

        Ok(ReferralStats {
            referral_url: format!("{}{}", REFERRAL_URL_BASE, code),
            code,
            referred_count,
            total_commission,
            commission_rate: self.config.commission_rate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::GameKind;
    use tempfile::TempDir;

    fn build_program() -> (Arc<ReferralProgram>, Arc<BalanceLedger>, TempDir) {
        let dir = TempDir::new().expect("tempdir");
        let storage = Storage::open_default(dir.path()).expect("open");
        let ledger = Arc::new(BalanceLedger::new(storage.clone()));
        let program = Arc::new(ReferralProgram::new(
            storage,
            Arc::clone(&ledger),
            ReferralConfig::default(),
        ));
        (program, ledger, dir)
    }

    fn loss_session(id: &str, account: &str, bet: u64, payout: u64) -> WagerSession {
        WagerSession {
            id: id.to_string(),
            account_id: account.to_string(),
            game: GameKind::Dice,
            bet_amount: bet,
            payout,
            win: false,
            detail: serde_json::json!({}),
            created_at: Utc::now().timestamp_millis(),
        }
    }

    fn redeem(program: &ReferralProgram, referrer: &str, referred: &str) -> CasinoResult<ReferralLink> {
        let code = program.stats(referrer).unwrap().code;
        program.redeem(referred, &code)
    }

    #[test]
    fn test_self_referral_rejected() {
        let (program, _ledger, _dir) = build_program();
        let code = program.stats("alice").unwrap().code;
        let err = program.redeem("alice", &code).unwrap_err();
        assert!(err.to_string().contains("self-referral"));
    }

    #[test]
    fn test_first_referral_wins() {
        let (program, _ledger, _dir) = build_program();
        redeem(&program, "alice", "carol").unwrap();
        let err = redeem(&program, "bob", "carol").unwrap_err();
        assert!(err.to_string().contains("already has a referrer"));
        // The original link stands.
        let link = program.link_of("carol").unwrap().unwrap();
        assert_eq!(link.referrer, "alice");
    }

    #[test]
    fn test_cascade_credits_loss_fraction_once() {
        let (program, ledger, _dir) = build_program();
        redeem(&program, "alice", "carol").unwrap();

        let session = loss_session("s1", "carol", 1_000_000, 0);
        let record = program.cascade(&session).unwrap().unwrap();
        assert_eq!(record.commission, 100_000);

        let balance = ledger.balance_of("alice").unwrap();
        assert_eq!(balance.balance, 100_000);
        assert!(balance.invariant_holds());

        // Retrying the same session is a no-op.
        assert!(program.cascade(&session).unwrap().is_none());
        assert_eq!(ledger.balance_of("alice").unwrap().balance, 100_000);
    }

    #[test]
    fn test_cascade_skips_wins_and_pushes() {
        let (program, ledger, _dir) = build_program();
        redeem(&program, "alice", "carol").unwrap();

        let push = loss_session("s2", "carol", 500, 500);
        assert!(program.cascade(&push).unwrap().is_none());
        let win = loss_session("s3", "carol", 500, 990);
        assert!(program.cascade(&win).unwrap().is_none());
        assert_eq!(ledger.balance_of("alice").unwrap().balance, 0);
    }

    #[test]
    fn test_cascade_partial_loss_uses_net_amount() {
        let (program, ledger, _dir) = build_program();
        redeem(&program, "alice", "carol").unwrap();

        // Bet 1_000_000, paid back 400_000: loss is 600_000.
        let session = loss_session("s4", "carol", 1_000_000, 400_000);
        let record = program.cascade(&session).unwrap().unwrap();
        assert_eq!(record.loss, 600_000);
        assert_eq!(record.commission, 60_000);
        assert_eq!(ledger.balance_of("alice").unwrap().balance, 60_000);
    }

    #[test]
    fn test_unreferred_account_cascades_nothing() {
        let (program, _ledger, _dir) = build_program();
        let session = loss_session("s5", "nobody", 1_000, 0);
        assert!(program.cascade(&session).unwrap().is_none());
    }

    #[test]
    fn test_stats_accumulate() {
        let (program, _ledger, _dir) = build_program();
        redeem(&program, "alice", "carol").unwrap();
        redeem(&program, "alice", "dave").unwrap();

        program
            .cascade(&loss_session("s6", "carol", 1_000_000, 0))
            .unwrap();
        program
            .cascade(&loss_session("s7", "dave", 500_000, 0))
            .unwrap();

        let stats = program.stats("alice").unwrap();
        assert_eq!(stats.referred_count, 2);
        assert_eq!(stats.total_commission, 150_000);
        assert_eq!(stats.commission_rate, 0.10);
        assert!(stats.referral_url.ends_with(&stats.code));
    }
}
