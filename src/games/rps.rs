//! Rock-paper-scissors against the house.

use super::{parse_params, scaled_payout, GameEngine, GameKind, GameRng, Outcome};
use crate::errors::CasinoResult;
use serde::{Deserialize, Serialize};
use serde_json::json;

const WIN_MULTIPLIER: f64 = 2.94;
const TIE_MULTIPLIER: f64 = 1.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Hand {
    Rock,
    Paper,
    Scissors,
}

impl Hand {
    fn beats(&self, other: Hand) -> bool {
        matches!(
            (self, other),
            (Hand::Rock, Hand::Scissors) | (Hand::Paper, Hand::Rock) | (Hand::Scissors, Hand::Paper)
        )
    }

    fn from_draw(draw: u32) -> Hand {
        match draw {
            0 => Hand::Rock,
            1 => Hand::Paper,
            _ => Hand::Scissors,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RpsParams {
    choice: Hand,
}

pub struct RockPaperScissors;

impl GameEngine for RockPaperScissors {
    fn kind(&self) -> GameKind {
        GameKind::Rps
    }

    fn validate(&self, _bet: u64, params: &serde_json::Value) -> CasinoResult<()> {
        let _params: RpsParams = parse_params(params)?;
        Ok(())
    }

    fn resolve(
        &self,
        bet: u64,
        params: &serde_json::Value,
        rng: &mut GameRng,
    ) -> CasinoResult<Outcome> {
        let params: RpsParams = parse_params(params)?;
        let house = Hand::from_draw(rng.next_bounded(3));

        let (win, multiplier) = if params.choice.beats(house) {
            (true, WIN_MULTIPLIER)
        } else if params.choice == house {
            (false, TIE_MULTIPLIER)
        } else {
            (false, 0.0)
        };
        let payout = scaled_payout(bet, multiplier);

        Ok(Outcome {
            win,
            payout,
            detail: json!({
                "choice": params.choice,
                "house": house,
                "tie": params.choice == house,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_beats_table() {
        assert!(Hand::Rock.beats(Hand::Scissors));
        assert!(Hand::Paper.beats(Hand::Rock));
        assert!(Hand::Scissors.beats(Hand::Paper));
        assert!(!Hand::Rock.beats(Hand::Paper));
        assert!(!Hand::Rock.beats(Hand::Rock));
    }

    #[test]
    fn test_payout_by_result() {
        let engine = RockPaperScissors;
        for seed in 0..64u8 {
            let mut rng = GameRng::from_seed([seed; 32]);
            let outcome = engine
                .resolve(1_000_000, &json!({ "choice": "rock" }), &mut rng)
                .unwrap();
            let tie = outcome.detail["tie"].as_bool().unwrap();
            if outcome.win {
                assert_eq!(outcome.payout, 2_940_000);
            } else if tie {
                assert_eq!(outcome.payout, 1_000_000);
            } else {
                assert_eq!(outcome.payout, 0);
            }
        }
    }
}
