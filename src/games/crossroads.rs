//! Crossroads: guess which of four directions the traveler takes.
//!
//! The payout table is asymmetric on purpose: the north/south roads pay 2x,
//! the east/west roads pay 3x.

use super::{parse_params, scaled_payout, GameEngine, GameKind, GameRng, Outcome};
use crate::errors::CasinoResult;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    fn from_draw(draw: u32) -> Direction {
        match draw {
            0 => Direction::North,
            1 => Direction::South,
            2 => Direction::East,
            _ => Direction::West,
        }
    }

    fn multiplier(&self) -> f64 {
        match self {
            Direction::North | Direction::South => 2.0,
            Direction::East | Direction::West => 3.0,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CrossroadsParams {
    direction: Direction,
}

pub struct Crossroads;

impl GameEngine for Crossroads {
    fn kind(&self) -> GameKind {
        GameKind::Crossroads
    }

    fn validate(&self, _bet: u64, params: &serde_json::Value) -> CasinoResult<()> {
        let _params: CrossroadsParams = parse_params(params)?;
        Ok(())
    }

    fn resolve(
        &self,
        bet: u64,
        params: &serde_json::Value,
        rng: &mut GameRng,
    ) -> CasinoResult<Outcome> {
        let params: CrossroadsParams = parse_params(params)?;
        let taken = Direction::from_draw(rng.next_bounded(4));
        let win = taken == params.direction;
        let payout = if win {
            scaled_payout(bet, params.direction.multiplier())
        } else {
            0
        };

        Ok(Outcome {
            win,
            payout,
            detail: json!({
                "direction": params.direction,
                "taken": taken,
                "multiplier": params.direction.multiplier(),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asymmetric_payout_table() {
        assert_eq!(Direction::North.multiplier(), 2.0);
        assert_eq!(Direction::South.multiplier(), 2.0);
        assert_eq!(Direction::East.multiplier(), 3.0);
        assert_eq!(Direction::West.multiplier(), 3.0);
    }

    #[test]
    fn test_correct_guess_pays_direction_rate() {
        let engine = Crossroads;
        for seed in 0..64u8 {
            let mut rng = GameRng::from_seed([seed; 32]);
            let outcome = engine
                .resolve(1_000_000, &json!({ "direction": "east" }), &mut rng)
                .unwrap();
            if outcome.win {
                assert_eq!(outcome.payout, 3_000_000);
            } else {
                assert_eq!(outcome.payout, 0);
            }
        }
    }
}
