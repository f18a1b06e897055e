//! European roulette: single zero, multi-bet spins.
//!
//! The wheel draw is server-side. Zero is green and counts as neither even
//! nor odd nor low/high, so every outside bet loses on it.

use super::{parse_params, GameEngine, GameKind, GameRng, Outcome};
use crate::errors::{CasinoError, CasinoResult};
use serde::{Deserialize, Serialize};
use serde_json::json;

const WHEEL_SLOTS: u32 = 37;
const MAX_BETS: usize = 20;

const RED_NUMBERS: [u8; 18] = [
    1, 3, 5, 7, 9, 12, 14, 16, 18, 19, 21, 23, 25, 27, 30, 32, 34, 36,
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BetKind {
    Red,
    Black,
    Even,
    Odd,
    Low,
    High,
    Straight,
}

impl BetKind {
    /// Total-return multiplier (stake included) for a matched bet.
    fn multiplier(&self) -> u64 {
        match self {
            BetKind::Straight => 36,
            _ => 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouletteBet {
    pub kind: BetKind,
    /// Explicit numbers for straight bets; empty otherwise.
    #[serde(default)]
    pub numbers: Vec<u8>,
    pub amount: u64,
}

#[derive(Debug, Deserialize)]
struct RouletteParams {
    bets: Vec<RouletteBet>,
}

fn is_red(number: u8) -> bool {
    RED_NUMBERS.contains(&number)
}

fn color_of(number: u8) -> &'static str {
    if number == 0 {
        "green"
    } else if is_red(number) {
        "red"
    } else {
        "black"
    }
}

fn bet_matches(bet: &RouletteBet, winning: u8) -> bool {
    if winning == 0 {
        return bet.kind == BetKind::Straight && bet.numbers.contains(&0);
    }
    match bet.kind {
        BetKind::Red => is_red(winning),
        BetKind::Black => !is_red(winning),
        BetKind::Even => winning % 2 == 0,
        BetKind::Odd => winning % 2 == 1,
        BetKind::Low => (1..=18).contains(&winning),
        BetKind::High => (19..=36).contains(&winning),
        BetKind::Straight => bet.numbers.contains(&winning),
    }
}

pub struct Roulette;

impl GameEngine for Roulette {
    fn kind(&self) -> GameKind {
        GameKind::Roulette
    }

    fn validate(&self, bet: u64, params: &serde_json::Value) -> CasinoResult<()> {
        let params: RouletteParams = parse_params(params)?;
        if params.bets.is_empty() || params.bets.len() > MAX_BETS {
            return Err(CasinoError::validation(format!(
                "spin must carry between 1 and {} bets",
                MAX_BETS
            )));
        }
        let mut total: u64 = 0;
        for placed in &params.bets {
            if placed.amount == 0 {
                return Err(CasinoError::validation("bet amount must be positive"));
            }
            match placed.kind {
                BetKind::Straight => {
                    if placed.numbers.is_empty() {
                        return Err(CasinoError::validation(
                            "straight bet must list at least one number",
                        ));
                    }
                    if placed.numbers.iter().any(|&n| n > 36) {
                        return Err(CasinoError::validation("straight numbers must be 0-36"));
                    }
                }
                _ => {
                    if !placed.numbers.is_empty() {
                        return Err(CasinoError::validation(
                            "only straight bets carry explicit numbers",
                        ));
                    }
                }
            }
            total = total
                .checked_add(placed.amount)
                .ok_or_else(|| CasinoError::validation("bet amounts overflow"))?;
        }
        if total != bet {
            return Err(CasinoError::validation(format!(
                "placed bets total {} but wager is {}",
                total, bet
            )));
        }
        Ok(())
    }

    fn resolve(
        &self,
        _bet: u64,
        params: &serde_json::Value,
        rng: &mut GameRng,
    ) -> CasinoResult<Outcome> {
        let params: RouletteParams = parse_params(params)?;
        let winning = rng.next_bounded(WHEEL_SLOTS) as u8;

        let mut payout: u64 = 0;
        let mut results = Vec::with_capacity(params.bets.len());
        for placed in &params.bets {
            let matched = bet_matches(placed, winning);
            if matched {
                payout += placed.amount * placed.kind.multiplier();
            }
            results.push(json!({
                "kind": placed.kind,
                "amount": placed.amount,
                "won": matched,
            }));
        }

        Ok(Outcome {
            win: payout > 0,
            payout,
            detail: json!({
                "winningNumber": winning,
                "color": color_of(winning),
                "bets": results,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bet(kind: BetKind, amount: u64) -> RouletteBet {
        RouletteBet {
            kind,
            numbers: vec![],
            amount,
        }
    }

    #[test]
    fn test_zero_is_green_and_beats_outside_bets() {
        assert_eq!(color_of(0), "green");
        for kind in [
            BetKind::Red,
            BetKind::Black,
            BetKind::Even,
            BetKind::Odd,
            BetKind::Low,
            BetKind::High,
        ] {
            assert!(!bet_matches(&bet(kind, 100), 0), "{:?} must lose on zero", kind);
        }
        // A straight bet on zero itself still pays.
        let straight_zero = RouletteBet {
            kind: BetKind::Straight,
            numbers: vec![0],
            amount: 100,
        };
        assert!(bet_matches(&straight_zero, 0));
    }

    #[test]
    fn test_outside_bets_match() {
        assert!(bet_matches(&bet(BetKind::Red, 1), 32));
        assert!(bet_matches(&bet(BetKind::Black, 1), 26));
        assert!(bet_matches(&bet(BetKind::Even, 1), 18));
        assert!(bet_matches(&bet(BetKind::Odd, 1), 19));
        assert!(bet_matches(&bet(BetKind::Low, 1), 18));
        assert!(bet_matches(&bet(BetKind::High, 1), 19));
        assert!(!bet_matches(&bet(BetKind::Low, 1), 19));
    }

    #[test]
    fn test_payout_sums_across_matching_bets() {
        // Winning number 19 is red, odd, high.
        let params = json!({ "bets": [
            { "kind": "red", "amount": 100 },
            { "kind": "high", "amount": 50 },
            { "kind": "even", "amount": 25 },
            { "kind": "straight", "numbers": [19], "amount": 10 },
        ]});
        let parsed: RouletteParams = parse_params(&params).unwrap();
        let payout: u64 = parsed
            .bets
            .iter()
            .filter(|b| bet_matches(b, 19))
            .map(|b| b.amount * b.kind.multiplier())
            .sum();
        assert_eq!(payout, 200 + 100 + 360);
    }

    #[test]
    fn test_validate_requires_amounts_to_sum_to_wager() {
        let engine = Roulette;
        let params = json!({ "bets": [
            { "kind": "red", "amount": 100 },
            { "kind": "odd", "amount": 50 },
        ]});
        assert!(engine.validate(150, &params).is_ok());
        assert!(engine.validate(151, &params).is_err());
    }

    #[test]
    fn test_resolve_draw_stays_on_wheel() {
        let engine = Roulette;
        let params = json!({ "bets": [{ "kind": "red", "amount": 100 }] });
        for seed in 0..32u8 {
            let mut rng = GameRng::from_seed([seed; 32]);
            let outcome = engine.resolve(100, &params, &mut rng).unwrap();
            let winning = outcome.detail["winningNumber"].as_u64().unwrap();
            assert!(winning <= 36);
        }
    }
}
