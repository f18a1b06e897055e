//! Card helpers shared by blackjack and video poker.
//!
//! Cards are encoded 0-51: suit = card / 13, rank = (card % 13) + 1 with
//! 1 = Ace, 11 = Jack, 12 = Queen, 13 = King.

use crate::errors::{CasinoError, CasinoResult};

/// Card rank, 1-13 (Ace = 1).
pub fn card_rank(card: u8) -> u8 {
    (card % 13) + 1
}

/// Card suit, 0-3.
pub fn card_suit(card: u8) -> u8 {
    card / 13
}

/// Reject hands containing out-of-deck codes or duplicate cards.
pub fn ensure_valid_cards(hands: &[&[u8]]) -> CasinoResult<()> {
    let mut seen = 0u64;
    for hand in hands {
        for &card in *hand {
            if card >= 52 {
                return Err(CasinoError::validation(format!("invalid card code {}", card)));
            }
            let bit = 1u64 << card;
            if seen & bit != 0 {
                return Err(CasinoError::validation(format!("duplicate card {}", card)));
            }
            seen |= bit;
        }
    }
    Ok(())
}

/// Blackjack hand value with soft/hard ace handling: aces count 11 and are
/// demoted to 1 one at a time while the total exceeds 21.
pub fn hand_value(cards: &[u8]) -> (u8, bool) {
    let mut value: u16 = 0;
    let mut aces: u8 = 0;

    for &card in cards {
        let rank = card_rank(card);
        if rank == 1 {
            aces += 1;
            value += 11;
        } else if rank >= 10 {
            value += 10;
        } else {
            value += rank as u16;
        }
    }

    while value > 21 && aces > 0 {
        value -= 10;
        aces -= 1;
    }

    let is_soft = aces > 0 && value <= 21;
    (value.min(255) as u8, is_soft)
}

/// Blackjack is exactly two cards totaling 21.
pub fn is_blackjack(cards: &[u8]) -> bool {
    cards.len() == 2 && hand_value(cards).0 == 21
}

/// Poker hand tiers, low to high.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum HandRank {
    HighCard = 0,
    JacksOrBetter = 1,
    TwoPair = 2,
    ThreeOfAKind = 3,
    Straight = 4,
    Flush = 5,
    FullHouse = 6,
    FourOfAKind = 7,
    StraightFlush = 8,
    RoyalFlush = 9,
}

impl HandRank {
    pub fn name(&self) -> &'static str {
        match self {
            HandRank::HighCard => "high_card",
            HandRank::JacksOrBetter => "jacks_or_better",
            HandRank::TwoPair => "two_pair",
            HandRank::ThreeOfAKind => "three_of_a_kind",
            HandRank::Straight => "straight",
            HandRank::Flush => "flush",
            HandRank::FullHouse => "full_house",
            HandRank::FourOfAKind => "four_of_a_kind",
            HandRank::StraightFlush => "straight_flush",
            HandRank::RoyalFlush => "royal_flush",
        }
    }
}

/// Evaluate a 5-card hand into its tier. "Jacks or Better" means a single
/// pair of rank Jack or higher (aces count high for the pair).
pub fn evaluate_hand(cards: &[u8; 5]) -> HandRank {
    let mut ranks = [0u8; 5];
    let mut suits = [0u8; 5];
    for i in 0..5 {
        ranks[i] = card_rank(cards[i]);
        suits[i] = card_suit(cards[i]);
    }
    ranks.sort_unstable();

    let is_flush = suits.iter().all(|&s| s == suits[0]);

    let has_duplicates = ranks.windows(2).any(|w| w[0] == w[1]);

    // Ace plays high (10-J-Q-K-A) and low (A-2-3-4-5).
    let is_straight = if has_duplicates {
        false
    } else if ranks == [1, 10, 11, 12, 13] || ranks == [1, 2, 3, 4, 5] {
        true
    } else {
        ranks[4] - ranks[0] == 4
    };

    let is_royal = ranks == [1, 10, 11, 12, 13];

    let mut counts = [0u8; 14];
    for &r in &ranks {
        counts[r as usize] += 1;
    }

    let mut pairs = 0u8;
    let mut three_kind = false;
    let mut four_kind = false;
    let mut high_pair = false;

    for (rank, &count) in counts.iter().enumerate() {
        match count {
            2 => {
                pairs += 1;
                if rank >= 11 || rank == 1 {
                    high_pair = true;
                }
            }
            3 => three_kind = true,
            4 => four_kind = true,
            _ => {}
        }
    }

    if is_royal && is_flush {
        HandRank::RoyalFlush
    } else if is_straight && is_flush {
        HandRank::StraightFlush
    } else if four_kind {
        HandRank::FourOfAKind
    } else if three_kind && pairs == 1 {
        HandRank::FullHouse
    } else if is_flush {
        HandRank::Flush
    } else if is_straight {
        HandRank::Straight
    } else if three_kind {
        HandRank::ThreeOfAKind
    } else if pairs == 2 {
        HandRank::TwoPair
    } else if pairs == 1 && high_pair {
        HandRank::JacksOrBetter
    } else {
        HandRank::HighCard
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Build a card code from rank (1-13) and suit (0-3).
    fn card(rank: u8, suit: u8) -> u8 {
        suit * 13 + (rank - 1)
    }

    #[test]
    fn test_hand_value_soft_ace_downgrade() {
        // A + 9 = soft 20
        let (value, soft) = hand_value(&[card(1, 0), card(9, 1)]);
        assert_eq!(value, 20);
        assert!(soft);
        // A + 9 + 5: ace demotes to 1, hard 15
        let (value, soft) = hand_value(&[card(1, 0), card(9, 1), card(5, 2)]);
        assert_eq!(value, 15);
        assert!(!soft);
        // A + A + 9: one ace demotes, soft 21
        let (value, soft) = hand_value(&[card(1, 0), card(1, 1), card(9, 2)]);
        assert_eq!(value, 21);
        assert!(soft);
    }

    #[test]
    fn test_blackjack_detection() {
        assert!(is_blackjack(&[card(1, 0), card(13, 1)]));
        assert!(!is_blackjack(&[card(10, 0), card(5, 1), card(6, 2)]));
    }

    #[test]
    fn test_royal_flush() {
        let hand = [card(1, 2), card(10, 2), card(11, 2), card(12, 2), card(13, 2)];
        assert_eq!(evaluate_hand(&hand), HandRank::RoyalFlush);
    }

    #[test]
    fn test_ace_low_straight() {
        let hand = [card(1, 0), card(2, 1), card(3, 2), card(4, 3), card(5, 0)];
        assert_eq!(evaluate_hand(&hand), HandRank::Straight);
    }

    #[test]
    fn test_jacks_or_better_threshold() {
        // Pair of jacks qualifies
        let jacks = [card(11, 0), card(11, 1), card(3, 2), card(7, 3), card(9, 0)];
        assert_eq!(evaluate_hand(&jacks), HandRank::JacksOrBetter);
        // Pair of tens does not
        let tens = [card(10, 0), card(10, 1), card(3, 2), card(7, 3), card(9, 0)];
        assert_eq!(evaluate_hand(&tens), HandRank::HighCard);
        // Pair of aces qualifies
        let aces = [card(1, 0), card(1, 1), card(3, 2), card(7, 3), card(9, 0)];
        assert_eq!(evaluate_hand(&aces), HandRank::JacksOrBetter);
    }

    #[test]
    fn test_full_house_and_quads() {
        let full = [card(4, 0), card(4, 1), card(4, 2), card(9, 0), card(9, 1)];
        assert_eq!(evaluate_hand(&full), HandRank::FullHouse);
        let quads = [card(4, 0), card(4, 1), card(4, 2), card(4, 3), card(9, 1)];
        assert_eq!(evaluate_hand(&quads), HandRank::FourOfAKind);
    }

    #[test]
    fn test_duplicate_cards_rejected() {
        let err = ensure_valid_cards(&[[5u8, 5].as_slice()]).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
        assert!(ensure_valid_cards(&[[5u8, 6].as_slice(), [7u8, 8].as_slice()]).is_ok());
        // Duplicates across hands are also rejected
        assert!(ensure_valid_cards(&[[5u8, 6].as_slice(), [6u8, 8].as_slice()]).is_err());
        // Out-of-deck codes are rejected
        assert!(ensure_valid_cards(&[[52u8].as_slice()]).is_err());
    }
}
