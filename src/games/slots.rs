//! Three-reel slots over an eight-symbol paytable.

use super::{parse_params, scaled_payout, GameEngine, GameKind, GameRng, Outcome};
use crate::errors::CasinoResult;
use serde::Deserialize;
use serde_json::json;

const HOUSE_EDGE: f64 = 0.05;
/// Partial (two-of-a-kind) wins only pay on premium symbols.
const PAIR_SYMBOL_FLOOR: usize = 4;
const PAIR_FACTOR: f64 = 0.3;

/// Symbol table: (name, three-of-a-kind multiplier), ordered low to high.
const SYMBOLS: [(&str, f64); 8] = [
    ("cherry", 2.0),
    ("lemon", 3.0),
    ("orange", 4.0),
    ("plum", 5.0),
    ("bell", 8.0),
    ("seven", 12.0),
    ("bar", 20.0),
    ("diamond", 50.0),
];

#[derive(Debug, Deserialize)]
struct SlotsParams {}

pub struct Slots;

impl Slots {
    /// Line multiplier for a spin, before the bet is applied.
    fn line_multiplier(reels: [usize; 3]) -> f64 {
        let [a, b, c] = reels;
        if a == b && b == c {
            return SYMBOLS[a].1 * (1.0 - HOUSE_EDGE);
        }
        // Exactly two matching reels.
        let pair = if a == b || a == c {
            Some(a)
        } else if b == c {
            Some(b)
        } else {
            None
        };
        match pair {
            Some(symbol) if symbol >= PAIR_SYMBOL_FLOOR => {
                SYMBOLS[symbol].1 * PAIR_FACTOR * (1.0 - HOUSE_EDGE)
            }
            _ => 0.0,
        }
    }
}

impl GameEngine for Slots {
    fn kind(&self) -> GameKind {
        GameKind::Slots
    }

    fn validate(&self, _bet: u64, params: &serde_json::Value) -> CasinoResult<()> {
        let _params: SlotsParams = parse_params(params)?;
        Ok(())
    }

    fn resolve(
        &self,
        bet: u64,
        _params: &serde_json::Value,
        rng: &mut GameRng,
    ) -> CasinoResult<Outcome> {
        let reels = [
            rng.next_bounded(SYMBOLS.len() as u32) as usize,
            rng.next_bounded(SYMBOLS.len() as u32) as usize,
            rng.next_bounded(SYMBOLS.len() as u32) as usize,
        ];
        let multiplier = Self::line_multiplier(reels);
        let payout = scaled_payout(bet, multiplier);

        Ok(Outcome {
            win: payout > 0,
            payout,
            detail: json!({
                "reels": reels,
                "symbols": reels.iter().map(|&r| SYMBOLS[r].0).collect::<Vec<_>>(),
                "multiplier": multiplier,
            }),
        })
    }
}
