//! Game outcome engines.
//!
//! Each wager game implements [`GameEngine`]: parameter validation that never
//! mutates anything, and outcome resolution that computes a payout under the
//! game's house edge. Outcomes are either drawn server-side or, where the
//! client submits a play trace (mines, blackjack, poker, plinko's landing
//! slot), independently recomputed and never trusted at face value.
//!
//! Adding a game means implementing the trait and registering it in
//! [`GameRegistry::new`] — handlers never branch on game type themselves.

pub mod blackjack;
pub mod cards;
pub mod coinflip;
pub mod crash;
pub mod crossroads;
pub mod dice;
pub mod mines;
pub mod plinko;
pub mod poker;
pub mod rng;
pub mod roulette;
pub mod rps;
pub mod scratch;
pub mod slots;

use crate::errors::{CasinoError, CasinoResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

pub use rng::GameRng;

/// Supported game types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GameKind {
    Dice,
    Crash,
    Mines,
    Slots,
    Roulette,
    Blackjack,
    Poker,
    CoinFlip,
    Rps,
    Crossroads,
    Plinko,
    Scratch,
}

impl GameKind {
    pub const ALL: [GameKind; 12] = [
        GameKind::Dice,
        GameKind::Crash,
        GameKind::Mines,
        GameKind::Slots,
        GameKind::Roulette,
        GameKind::Blackjack,
        GameKind::Poker,
        GameKind::CoinFlip,
        GameKind::Rps,
        GameKind::Crossroads,
        GameKind::Plinko,
        GameKind::Scratch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GameKind::Dice => "dice",
            GameKind::Crash => "crash",
            GameKind::Mines => "mines",
            GameKind::Slots => "slots",
            GameKind::Roulette => "roulette",
            GameKind::Blackjack => "blackjack",
            GameKind::Poker => "poker",
            GameKind::CoinFlip => "coinflip",
            GameKind::Rps => "rps",
            GameKind::Crossroads => "crossroads",
            GameKind::Plinko => "plinko",
            GameKind::Scratch => "scratch",
        }
    }
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameKind {
    type Err = CasinoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GameKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CasinoError::validation(format!("unknown game type: {}", s)))
    }
}

/// Resolved wager outcome. `payout` is the total return in lamports
/// (stake included on a win or push), `detail` is the game-specific result
/// payload recorded on the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outcome {
    pub win: bool,
    pub payout: u64,
    pub detail: serde_json::Value,
}

/// Common interface across all game variants.
pub trait GameEngine: Send + Sync {
    fn kind(&self) -> GameKind;

    /// Check bet and parameters without mutating or drawing anything.
    fn validate(&self, bet: u64, params: &serde_json::Value) -> CasinoResult<()>;

    /// Compute the outcome. Must be pure apart from consuming the RNG.
    fn resolve(
        &self,
        bet: u64,
        params: &serde_json::Value,
        rng: &mut GameRng,
    ) -> CasinoResult<Outcome>;
}

/// Registry of game engines keyed by kind.
pub struct GameRegistry {
    engines: HashMap<GameKind, Box<dyn GameEngine>>,
}

impl GameRegistry {
    pub fn new() -> Self {
        let mut engines: HashMap<GameKind, Box<dyn GameEngine>> = HashMap::new();
        let all: Vec<Box<dyn GameEngine>> = vec![
            Box::new(dice::Dice),
            Box::new(crash::Crash),
            Box::new(mines::Mines),
            Box::new(slots::Slots),
            Box::new(roulette::Roulette),
            Box::new(blackjack::Blackjack),
            Box::new(poker::VideoPoker),
            Box::new(coinflip::CoinFlip),
            Box::new(rps::RockPaperScissors),
            Box::new(crossroads::Crossroads),
            Box::new(plinko::Plinko),
            Box::new(scratch::ScratchOff),
        ];
        for engine in all {
            engines.insert(engine.kind(), engine);
        }
        Self { engines }
    }

    pub fn get(&self, kind: GameKind) -> CasinoResult<&dyn GameEngine> {
        self.engines
            .get(&kind)
            .map(|b| b.as_ref())
            .ok_or_else(|| CasinoError::validation(format!("unsupported game: {}", kind)))
    }
}

impl Default for GameRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Deserialize game parameters, mapping malformed input to a validation error.
pub(crate) fn parse_params<T: DeserializeOwned>(params: &serde_json::Value) -> CasinoResult<T> {
    serde_json::from_value(params.clone())
        .map_err(|e| CasinoError::validation(format!("invalid game parameters: {}", e)))
}

/// Scale a bet by a payout multiplier, rounding to the nearest lamport.
pub(crate) fn scaled_payout(bet: u64, multiplier: f64) -> u64 {
    (bet as f64 * multiplier).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_covers_all_kinds() {
        let registry = GameRegistry::new();
        for kind in GameKind::ALL {
            let engine = registry.get(kind).expect("engine registered");
            assert_eq!(engine.kind(), kind);
        }
    }

    #[test]
    fn test_kind_round_trips_through_str() {
        for kind in GameKind::ALL {
            assert_eq!(kind.as_str().parse::<GameKind>().unwrap(), kind);
        }
        assert!("keno".parse::<GameKind>().is_err());
    }

    #[test]
    fn test_scaled_payout_rounds() {
        assert_eq!(scaled_payout(100, 1.98), 198);
        assert_eq!(scaled_payout(1_000_000, 2.5), 2_500_000);
        assert_eq!(scaled_payout(3, 0.5), 2); // rounds half away from zero
    }
}
