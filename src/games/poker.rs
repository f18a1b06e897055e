//! Video draw poker (Jacks or Better) settlement.
//!
//! The client submits its final five cards; the hand tier and payout are
//! recomputed here, ignoring any client-declared result.

use super::cards::{ensure_valid_cards, evaluate_hand, HandRank};
use super::{parse_params, GameEngine, GameKind, GameRng, Outcome};
use crate::errors::{CasinoError, CasinoResult};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct PokerParams {
    cards: Vec<u8>,
}

/// Fixed paytable, total-return multipliers per tier.
fn payout_multiplier(rank: HandRank) -> u64 {
    match rank {
        HandRank::RoyalFlush => 250,
        HandRank::StraightFlush => 50,
        HandRank::FourOfAKind => 25,
        HandRank::FullHouse => 9,
        HandRank::Flush => 6,
        HandRank::Straight => 4,
        HandRank::ThreeOfAKind => 3,
        HandRank::TwoPair => 2,
        HandRank::JacksOrBetter => 1,
        HandRank::HighCard => 0,
    }
}

pub struct VideoPoker;

impl GameEngine for VideoPoker {
    fn kind(&self) -> GameKind {
        GameKind::Poker
    }

    fn validate(&self, _bet: u64, params: &serde_json::Value) -> CasinoResult<()> {
        let params: PokerParams = parse_params(params)?;
        if params.cards.len() != 5 {
            return Err(CasinoError::validation("hand must hold exactly five cards"));
        }
        ensure_valid_cards(&[params.cards.as_slice()])?;
        Ok(())
    }

    fn resolve(
        &self,
        bet: u64,
        params: &serde_json::Value,
        _rng: &mut GameRng,
    ) -> CasinoResult<Outcome> {
        let params: PokerParams = parse_params(params)?;
        let cards: [u8; 5] = params
            .cards
            .as_slice()
            .try_into()
            .map_err(|_| CasinoError::validation("hand must hold exactly five cards"))?;
        let rank = evaluate_hand(&cards);
        let multiplier = payout_multiplier(rank);
        let payout = bet * multiplier;

        Ok(Outcome {
            win: multiplier >= 1,
            payout,
            detail: json!({
                "hand": rank.name(),
                "multiplier": multiplier,
                "cards": params.cards,
            }),
        })
    }
}
