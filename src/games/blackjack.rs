//! Blackjack settlement from a completed play trace.
//!
//! The client submits both final hands; values, blackjack flags and the
//! outcome precedence are recomputed here. The dealer trace is replayed
//! against the draw rule (hit below 17, stand on 17 including soft 17), so a
//! fabricated dealer hand is rejected rather than settled.

use super::cards::{ensure_valid_cards, hand_value, is_blackjack};
use super::{parse_params, scaled_payout, GameEngine, GameKind, GameRng, Outcome};
use crate::errors::{CasinoError, CasinoResult};
use serde::Deserialize;
use serde_json::json;

const DEALER_STAND: u8 = 17;
const BLACKJACK_MULTIPLIER: f64 = 2.5; // 3:2 plus the returned stake
const WIN_MULTIPLIER: f64 = 2.0;
const PUSH_MULTIPLIER: f64 = 1.0;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlackjackParams {
    player_cards: Vec<u8>,
    dealer_cards: Vec<u8>,
}

/// Settlement outcomes in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Settlement {
    PlayerBust,
    DealerBust,
    Push,
    PlayerBlackjack,
    DealerBlackjack,
    PlayerWin,
    DealerWin,
}

impl Settlement {
    fn name(&self) -> &'static str {
        match self {
            Settlement::PlayerBust => "player_bust",
            Settlement::DealerBust => "dealer_bust",
            Settlement::Push => "push",
            Settlement::PlayerBlackjack => "player_blackjack",
            Settlement::DealerBlackjack => "dealer_blackjack",
            Settlement::PlayerWin => "player_win",
            Settlement::DealerWin => "dealer_win",
        }
    }

    fn multiplier(&self) -> f64 {
        match self {
            Settlement::PlayerBust | Settlement::DealerBlackjack | Settlement::DealerWin => 0.0,
            Settlement::DealerBust | Settlement::PlayerWin => WIN_MULTIPLIER,
            Settlement::Push => PUSH_MULTIPLIER,
            Settlement::PlayerBlackjack => BLACKJACK_MULTIPLIER,
        }
    }
}

fn settle(player: &[u8], dealer: &[u8]) -> Settlement {
    let (player_total, _) = hand_value(player);
    let (dealer_total, _) = hand_value(dealer);
    let player_bj = is_blackjack(player);
    let dealer_bj = is_blackjack(dealer);

    if player_total > 21 {
        Settlement::PlayerBust
    } else if dealer_total > 21 {
        Settlement::DealerBust
    } else if player_bj && dealer_bj {
        Settlement::Push
    } else if player_bj {
        Settlement::PlayerBlackjack
    } else if dealer_bj {
        Settlement::DealerBlackjack
    } else if player_total > dealer_total {
        Settlement::PlayerWin
    } else if dealer_total > player_total {
        Settlement::DealerWin
    } else {
        Settlement::Push
    }
}

/// The dealer only draws while below 17 and stands as soon as 17 is reached,
/// soft or hard. Any extra or missing draw in the trace is inconsistent.
fn dealer_trace_is_valid(dealer: &[u8]) -> bool {
    if dealer.len() < 2 {
        return false;
    }
    for drawn in 2..dealer.len() {
        if hand_value(&dealer[..drawn]).0 >= DEALER_STAND {
            return false;
        }
    }
    let (total, _) = hand_value(dealer);
    total >= DEALER_STAND || total > 21
}

pub struct Blackjack;

impl GameEngine for Blackjack {
    fn kind(&self) -> GameKind {
        GameKind::Blackjack
    }

    fn validate(&self, _bet: u64, params: &serde_json::Value) -> CasinoResult<()> {
        let params: BlackjackParams = parse_params(params)?;
        if params.player_cards.len() < 2 || params.player_cards.len() > 11 {
            return Err(CasinoError::validation("player hand must hold 2-11 cards"));
        }
        ensure_valid_cards(&[params.player_cards.as_slice(), params.dealer_cards.as_slice()])?;

        let player_busted = hand_value(&params.player_cards).0 > 21;
        let player_bj = is_blackjack(&params.player_cards);
        // After a player bust or a player blackjack the round ends with the
        // dealer's two dealt cards; any drawn card is a fabricated trace.
        if player_busted || player_bj {
            if params.dealer_cards.len() != 2 {
                return Err(CasinoError::validation(
                    "dealer must not draw once the round is over",
                ));
            }
        } else if !dealer_trace_is_valid(&params.dealer_cards) {
            return Err(CasinoError::validation(
                "dealer hand is inconsistent with the draw-to-17 rule",
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
        let params: BlackjackParams = parse_params(params)?;
        let settlement = settle(&params.player_cards, &params.dealer_cards);
        let payout = scaled_payout(bet, settlement.multiplier());

        Ok(Outcome {
            win: payout > bet,
            payout,
            detail: json!({
                "outcome": settlement.name(),
                "playerTotal": hand_value(&params.player_cards).0,
                "dealerTotal": hand_value(&params.dealer_cards).0,
                "playerCards": params.player_cards,
                "dealerCards": params.dealer_cards,
            }),
        })
    }
}
