//! Plinko: fixed 15-slot multiplier tables keyed by risk tier.
//!
//! The client reports where the puck landed (for animation continuity); the
//! slot index is revalidated as in-range and the multiplier lookup plus the
//! 2% edge are applied server-side.

use super::{parse_params, scaled_payout, GameEngine, GameKind, GameRng, Outcome};
use crate::errors::{CasinoError, CasinoResult};
use serde::{Deserialize, Serialize};
use serde_json::json;

const HOUSE_EDGE: f64 = 0.02;
const SLOT_COUNT: usize = 15;

const HIGH_TABLE: [f64; SLOT_COUNT] = [
    170.0, 42.0, 11.0, 5.0, 3.0, 1.5, 0.7, 0.3, 0.7, 1.5, 3.0, 5.0, 11.0, 42.0, 170.0,
];
const MEDIUM_TABLE: [f64; SLOT_COUNT] = [
    44.0, 13.0, 6.0, 3.0, 1.6, 1.0, 0.7, 0.4, 0.7, 1.0, 1.6, 3.0, 6.0, 13.0, 44.0,
];
const LOW_TABLE: [f64; SLOT_COUNT] = [
    10.0, 5.0, 3.0, 2.0, 1.4, 1.1, 1.0, 0.5, 1.0, 1.1, 1.4, 2.0, 3.0, 5.0, 10.0,
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    fn table(&self) -> &'static [f64; SLOT_COUNT] {
        match self {
            RiskTier::Low => &LOW_TABLE,
            RiskTier::Medium => &MEDIUM_TABLE,
            RiskTier::High => &HIGH_TABLE,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PlinkoParams {
    risk: RiskTier,
    slot: usize,
}

pub struct Plinko;

impl GameEngine for Plinko {
    fn kind(&self) -> GameKind {
        GameKind::Plinko
    }

    fn validate(&self, _bet: u64, params: &serde_json::Value) -> CasinoResult<()> {
        let params: PlinkoParams = parse_params(params)?;
        if params.slot >= SLOT_COUNT {
            return Err(CasinoError::validation(format!(
                "slot must be within 0-{}, got {}",
                SLOT_COUNT - 1,
                params.slot
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
        let params: PlinkoParams = parse_params(params)?;
        if params.slot >= SLOT_COUNT {
            return Err(CasinoError::validation("slot out of range"));
        }
        let multiplier = params.risk.table()[params.slot] * (1.0 - HOUSE_EDGE);
        let payout = scaled_payout(bet, multiplier);

        Ok(Outcome {
            win: payout > bet,
            payout,
            detail: json!({
                "risk": params.risk,
                "slot": params.slot,
                "multiplier": multiplier,
            }),
        })
    }
}
