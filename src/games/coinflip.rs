//! Coin flip: 50/50 with a 2% house edge baked into the multiplier.

use super::{parse_params, scaled_payout, GameEngine, GameKind, GameRng, Outcome};
use crate::errors::CasinoResult;
use serde::{Deserialize, Serialize};
use serde_json::json;

const WIN_MULTIPLIER: f64 = 1.96;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CoinSide {
    Heads,
    Tails,
}

#[derive(Debug, Deserialize)]
struct CoinFlipParams {
    choice: CoinSide,
}

pub struct CoinFlip;

impl GameEngine for CoinFlip {
    fn kind(&self) -> GameKind {
        GameKind::CoinFlip
    }

    fn validate(&self, _bet: u64, params: &serde_json::Value) -> CasinoResult<()> {
        let _params: CoinFlipParams = parse_params(params)?;
        Ok(())
    }

    fn resolve(
        &self,
        bet: u64,
        params: &serde_json::Value,
        rng: &mut GameRng,
    ) -> CasinoResult<Outcome> {
        let params: CoinFlipParams = parse_params(params)?;
        let landed = if rng.next_bounded(2) == 0 {
            CoinSide::Heads
        } else {
            CoinSide::Tails
        };
        let win = landed == params.choice;
        let payout = if win { scaled_payout(bet, WIN_MULTIPLIER) } else { 0 };

        Ok(Outcome {
            win,
            payout,
            detail: json!({
                "choice": params.choice,
                "landed": landed,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_win_pays_one_ninety_six() {
        let engine = CoinFlip;
        let mut wins = 0;
        for seed in 0..64u8 {
            let mut rng = GameRng::from_seed([seed; 32]);
            let outcome = engine
                .resolve(1_000_000, &json!({ "choice": "heads" }), &mut rng)
                .unwrap();
            if outcome.win {
                wins += 1;
                assert_eq!(outcome.payout, 1_960_000);
            } else {
                assert_eq!(outcome.payout, 0);
            }
        }
        // Both sides land across seeds.
        assert!(wins > 0 && wins < 64);
    }

    #[test]
    fn test_unknown_side_rejected() {
        let engine = CoinFlip;
        assert!(engine.validate(100, &json!({ "choice": "edge" })).is_err());
    }
}
