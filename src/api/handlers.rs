//! Request Handlers
//!
//! Thin translation between HTTP and the wager/ledger core: parse, delegate,
//! map errors. No money logic lives here.

use super::{
    errors::ApiError,
    middleware::RequestId,
    models::*,
    monitoring::MetricsRegistry,
    security::RateLimiter,
};
use crate::errors::CasinoError;
use crate::games::GameKind;
use crate::ledger::BalanceLedger;
use crate::reconcile::Reconciler;
use crate::referral::ReferralProgram;
use crate::wager::WagerProcessor;
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;

/// Shared application state
pub struct AppState {
    pub processor: WagerProcessor,
    pub ledger: Arc<BalanceLedger>,
    pub reconciler: Reconciler,
    pub referrals: Arc<ReferralProgram>,
    pub metrics: Arc<MetricsRegistry>,
    pub limiter: Arc<RateLimiter>,
    pub version: String,
}

impl AppState {
    fn fail(&self, request_id: String, err: CasinoError) -> ApiError {
        self.metrics.record_error();
        ApiError::from_casino(request_id, err)
    }
}

/// Health check handler - minimal response time
/// GET /health
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "Running".to_string(),
        version: state.version.clone(),
    })
}

/// Prometheus metrics
/// GET /metrics
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> String {
    state.metrics.render()
}

/// Play a wager game
/// POST /games/:kind/play
pub async fn play_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Json(request): Json<PlayRequest>,
) -> Result<Json<PlayResponse>, ApiError> {
    let game: GameKind = kind
        .parse()
        .map_err(|e| state.fail(request_id.0.clone(), e))?;

    if !state.limiter.check(&request.account_id) {
        return Err(ApiError::too_many_requests(request_id.0));
    }

    let receipt = state
        .processor
        .play(&request.account_id, game, request.bet_amount, &request.params)
        .map_err(|e| state.fail(request_id.0.clone(), e))?;

    state.metrics.record_wager(
        receipt.session.bet_amount,
        receipt.session.payout,
        receipt.session.win,
    );
    if receipt.commission.is_some() {
        state.metrics.record_commission();
    }

    Ok(Json(PlayResponse {
        session_id: receipt.session.id,
        game: game.to_string(),
        win: receipt.session.win,
        bet_amount: receipt.session.bet_amount,
        payout: receipt.session.payout,
        balance: receipt.balance.balance,
        detail: receipt.session.detail,
    }))
}

/// Balance with lifetime aggregates
/// GET /balance/:account_id
pub async fn balance_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(account_id): Path<String>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let balance = state
        .ledger
        .balance_of(&account_id)
        .map_err(|e| state.fail(request_id.0.clone(), e))?;
    Ok(Json(balance.into()))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_history_limit")]
    pub limit: usize,
}

fn default_history_limit() -> usize {
    50
}

/// Newest-first wager history
/// GET /history/:account_id?limit={n}
pub async fn history_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(account_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let limit = query.limit.min(200);
    let sessions = state
        .processor
        .history(&account_id, limit)
        .map_err(|e| state.fail(request_id.0.clone(), e))?;
    Ok(Json(HistoryResponse {
        account_id,
        sessions: sessions.into_iter().map(Into::into).collect(),
    }))
}

/// Credit a verified on-chain deposit
/// POST /deposit
pub async fn deposit_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<DepositRequest>,
) -> Result<Json<DepositResponse>, ApiError> {
    let receipt = state
        .reconciler
        .deposit(&request.account_id, &request.signature)
        .await
        .map_err(|e| state.fail(request_id.0.clone(), e))?;

    state.metrics.record_deposit();
    Ok(Json(DepositResponse {
        success: true,
        signature: receipt.signature,
        amount: receipt.amount,
        balance: receipt.balance.balance,
    }))
}

/// Withdraw to an external address
/// POST /withdraw
pub async fn withdraw_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<WithdrawRequest>,
) -> Result<Json<WithdrawResponse>, ApiError> {
    let receipt = state
        .reconciler
        .withdraw(
            &request.account_id,
            request.amount,
            &request.destination_address,
        )
        .await
        .map_err(|e| state.fail(request_id.0.clone(), e))?;

    state.metrics.record_withdrawal();
    Ok(Json(WithdrawResponse {
        success: true,
        signature: receipt.signature,
        amount: receipt.amount,
        balance: receipt.balance.balance,
    }))
}

/// Bind the caller to a referrer's code
/// POST /referrals/redeem
pub async fn referral_redeem_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<RedeemReferralRequest>,
) -> Result<Json<RedeemReferralResponse>, ApiError> {
    let link = state
        .referrals
        .redeem(&request.account_id, &request.code)
        .map_err(|e| state.fail(request_id.0.clone(), e))?;
    Ok(Json(RedeemReferralResponse {
        success: true,
        referrer: link.referrer,
        commission_rate: link.commission_rate,
    }))
}

/// Referral code, link and lifetime totals
/// GET /referrals/stats/:account_id
pub async fn referral_stats_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(account_id): Path<String>,
) -> Result<Json<crate::referral::ReferralStats>, ApiError> {
    let stats = state
        .referrals
        .stats(&account_id)
        .map_err(|e| state.fail(request_id.0.clone(), e))?;
    Ok(Json(stats))
}
