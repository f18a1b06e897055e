//! Casino HTTP API
//!
//! Authenticated game, balance, deposit/withdrawal and referral endpoints
//! over the wager/ledger core.

pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod monitoring;
pub mod routes;
pub mod security;
pub mod server;

pub use server::ApiServer;
