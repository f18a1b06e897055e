//! Mines: 5x5 grid, reveal gems without hitting a mine.
//!
//! The client reports its play trace (mine count, gems revealed, whether it
//! hit a mine); the multiplier is recomputed here from the combinatorial
//! formula and inconsistent reveal counts are rejected.

use super::{parse_params, scaled_payout, GameEngine, GameKind, GameRng, Outcome};
use crate::errors::{CasinoError, CasinoResult};
use serde::Deserialize;
use serde_json::json;

const HOUSE_EDGE: f64 = 0.03;
const GRID_CELLS: u8 = 25;
const MIN_MULTIPLIER: f64 = 1.01;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MinesParams {
    mine_count: u8,
    gems_found: u8,
    #[serde(default)]
    busted: bool,
}

pub struct Mines;

impl Mines {
    /// Probability-fair multiplier for revealing `gems` safe cells out of a
    /// grid hiding `mines`: the product of survival odds at each reveal.
    fn multiplier(mines: u8, gems: u8) -> f64 {
        let mut multiplier = 1.0;
        for i in 0..gems as u32 {
            let remaining = GRID_CELLS as f64 - i as f64;
            let safe = remaining - mines as f64;
            multiplier *= remaining / safe;
        }
        (multiplier * (1.0 - HOUSE_EDGE)).max(MIN_MULTIPLIER)
    }
}

impl GameEngine for Mines {
    fn kind(&self) -> GameKind {
        GameKind::Mines
    }

    fn validate(&self, _bet: u64, params: &serde_json::Value) -> CasinoResult<()> {
        let params: MinesParams = parse_params(params)?;
        if params.mine_count == 0 || params.mine_count >= GRID_CELLS {
            return Err(CasinoError::validation(format!(
                "mineCount must be within [1, 24], got {}",
                params.mine_count
            )));
        }
        if params.gems_found > GRID_CELLS - params.mine_count {
            return Err(CasinoError::validation(format!(
                "gemsFound {} exceeds the {} safe cells",
                params.gems_found,
                GRID_CELLS - params.mine_count
            )));
        }
        if !params.busted && params.gems_found == 0 {
            return Err(CasinoError::validation(
                "cannot cash out with no gems revealed",
            ));
        }
        Ok(())
    }

    fn resolve(
        &self,
        bet: u64,
        params: &serde_json::Value,
        _rng: &mut GameRng,
    ) -> CasinoResult<Outcome> {
        let params: MinesParams = parse_params(params)?;
        let multiplier = Self::multiplier(params.mine_count, params.gems_found);
        let win = !params.busted;
        let payout = if win { scaled_payout(bet, multiplier) } else { 0 };

        Ok(Outcome {
            win,
            payout,
            detail: json!({
                "mineCount": params.mine_count,
                "gemsFound": params.gems_found,
                "busted": params.busted,
                "multiplier": if win { multiplier } else { 0.0 },
            }),
        })
    }
}
