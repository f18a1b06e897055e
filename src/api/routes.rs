//! Route Definitions
//!
//! Maps URLs to handlers with type-safe routing. One play endpoint serves
//! every game type; the registry resolves the variant.

use super::handlers::*;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Build the API router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check (high priority)
        .route("/health", get(health_handler))
        // Wager endpoints
        .route("/games/:kind/play", post(play_handler))
        .route("/history/:account_id", get(history_handler))
        // Ledger endpoints
        .route("/balance/:account_id", get(balance_handler))
        .route("/deposit", post(deposit_handler))
        .route("/withdraw", post(withdraw_handler))
        // Referral endpoints
        .route("/referrals/redeem", post(referral_redeem_handler))
        .route("/referrals/stats/:account_id", get(referral_stats_handler))
        // Metrics endpoint for Prometheus
        .route("/metrics", get(metrics_handler))
        // Attach shared state
        .with_state(state)
}
