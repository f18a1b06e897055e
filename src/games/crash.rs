//! Crash: cash out before the multiplier curve busts.
//!
//! The crash point arrives from the client for randomness-seed continuity
//! with the animation; the cash-out comparison and payout are evaluated
//! server-side only.

use super::{parse_params, scaled_payout, GameEngine, GameKind, GameRng, Outcome};
use crate::errors::{CasinoError, CasinoResult};
use serde::Deserialize;
use serde_json::json;

const HOUSE_EDGE: f64 = 0.01;
const MIN_CASHOUT: f64 = 1.01;
const MAX_MULTIPLIER: f64 = 10_000.0;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CrashParams {
    crash_point: f64,
    cashout: f64,
}

pub struct Crash;

impl GameEngine for Crash {
    fn kind(&self) -> GameKind {
        GameKind::Crash
    }

    fn validate(&self, _bet: u64, params: &serde_json::Value) -> CasinoResult<()> {
        let params: CrashParams = parse_params(params)?;
        if !params.crash_point.is_finite() || !(1.0..=MAX_MULTIPLIER).contains(&params.crash_point)
        {
            return Err(CasinoError::validation(format!(
                "crash_point must be within [1, {}], got {}",
                MAX_MULTIPLIER, params.crash_point
            )));
        }
        if !params.cashout.is_finite() || !(1.0..=MAX_MULTIPLIER).contains(&params.cashout) {
            return Err(CasinoError::validation(format!(
                "cashout must be within [1, {}], got {}",
                MAX_MULTIPLIER, params.cashout
            )));
        }
        Ok(())
    }

    fn resolve(
        &self,
        bet: u64,
        params: &serde_json::Value,
        _rng: &mut GameRng,
    ) -> CasinoResult<Outcome> {
        let params: CrashParams = parse_params(params)?;
        let win = params.cashout >= MIN_CASHOUT && params.cashout < params.crash_point;
        let payout = if win {
            scaled_payout(bet, params.cashout * (1.0 - HOUSE_EDGE))
        } else {
            0
        };

        Ok(Outcome {
            win,
            payout,
            detail: json!({
                "crashPoint": params.crash_point,
                "cashout": params.cashout,
            }),
        })
    }
}
