//! Request and response models for the casino API.

use crate::ledger::Balance;
use crate::wager::WagerSession;
use serde::{Deserialize, Serialize};

/// Body of `POST /games/:kind/play`. Game-specific parameters ride alongside
/// the common fields and are handed to the engine untouched.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayRequest {
    pub account_id: String,
    pub bet_amount: u64,
    #[serde(flatten)]
    pub params: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayResponse {
    pub session_id: String,
    pub game: String,
    pub win: bool,
    pub bet_amount: u64,
    pub payout: u64,
    pub balance: u64,
    pub detail: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub account_id: String,
    pub balance: u64,
    pub total_deposited: u64,
    pub total_withdrawn: u64,
    pub total_wagered: u64,
    pub total_won: u64,
}

impl From<Balance> for BalanceResponse {
    fn from(balance: Balance) -> Self {
        Self {
            account_id: balance.account_id,
            balance: balance.balance,
            total_deposited: balance.total_deposited,
            total_withdrawn: balance.total_withdrawn,
            total_wagered: balance.total_wagered,
            total_won: balance.total_won,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositRequest {
    pub account_id: String,
    pub signature: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositResponse {
    pub success: bool,
    pub signature: String,
    pub amount: u64,
    pub balance: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawRequest {
    pub account_id: String,
    pub amount: u64,
    pub destination_address: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawResponse {
    pub success: bool,
    pub signature: String,
    pub amount: u64,
    pub balance: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemReferralRequest {
    pub account_id: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemReferralResponse {
    pub success: bool,
    pub referrer: String,
    pub commission_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub account_id: String,
    pub sessions: Vec<SessionSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub game: String,
    pub bet_amount: u64,
    pub payout: u64,
    pub win: bool,
    pub created_at: i64,
}

impl From<WagerSession> for SessionSummary {
    fn from(session: WagerSession) -> Self {
        Self {
            session_id: session.id,
            game: session.game.to_string(),
            bet_amount: session.bet_amount,
            payout: session.payout,
            win: session.win,
            created_at: session.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_play_request_flattens_game_params() {
        let request: PlayRequest = serde_json::from_str(
            r#"{ "accountId": "p1", "betAmount": 1000, "target": 50.0 }"#,
        )
        .expect("parse");
        assert_eq!(request.account_id, "p1");
        assert_eq!(request.bet_amount, 1000);
        assert_eq!(request.params["target"], 50.0);
    }
}
