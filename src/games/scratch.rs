//! Scratch-off: a 3x3 server-drawn grid of symbols.
//!
//! Three or more matching symbols pay that symbol's multiplier, doubled for
//! every match past the third. When several symbols qualify the best one
//! wins.

use super::{parse_params, scaled_payout, GameEngine, GameKind, GameRng, Outcome};
use crate::errors::CasinoResult;
use serde::Deserialize;
use serde_json::json;

const GRID_CELLS: usize = 9;
const MATCH_THRESHOLD: u32 = 3;

/// Symbol table: (name, base multiplier for three matches).
const SYMBOLS: [(&str, f64); 6] = [
    ("coin", 2.0),
    ("horseshoe", 3.0),
    ("clover", 5.0),
    ("bell", 8.0),
    ("gem", 15.0),
    ("crown", 40.0),
];

#[derive(Debug, Deserialize)]
struct ScratchParams {}

pub struct ScratchOff;

impl ScratchOff {
    /// Best payout multiplier across all symbols with at least three matches.
    fn grid_multiplier(grid: &[usize; GRID_CELLS]) -> (f64, Option<usize>) {
        let mut counts = [0u32; SYMBOLS.len()];
        for &cell in grid {
            counts[cell] += 1;
        }

        let mut best = 0.0f64;
        let mut best_symbol = None;
        for (symbol, &count) in counts.iter().enumerate() {
            if count < MATCH_THRESHOLD {
                continue;
            }
            let scale = (count - MATCH_THRESHOLD) as i32;
            let multiplier = SYMBOLS[symbol].1 * 2f64.powi(scale);
            if multiplier > best {
                best = multiplier;
                best_symbol = Some(symbol);
            }
        }
        (best, best_symbol)
    }
}

impl GameEngine for ScratchOff {
    fn kind(&self) -> GameKind {
        GameKind::Scratch
    }

    fn validate(&self, _bet: u64, params: &serde_json::Value) -> CasinoResult<()> {
        let _params: ScratchParams = parse_params(params)?;
        Ok(())
    }

    fn resolve(
        &self,
        bet: u64,
        _params: &serde_json::Value,
        rng: &mut GameRng,
    ) -> CasinoResult<Outcome> {
        let mut grid = [0usize; GRID_CELLS];
        for cell in grid.iter_mut() {
            *cell = rng.next_bounded(SYMBOLS.len() as u32) as usize;
        }

        let (multiplier, best_symbol) = Self::grid_multiplier(&grid);
        let payout = scaled_payout(bet, multiplier);

        Ok(Outcome {
            win: payout > 0,
            payout,
            detail: json!({
                "grid": grid.iter().map(|&c| SYMBOLS[c].0).collect::<Vec<_>>(),
                "matched": best_symbol.map(|s| SYMBOLS[s].0),
                "multiplier": multiplier,
            }),
        })
    }
}
