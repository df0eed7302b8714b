//! Pass-line resolution for heads-up street craps.
//!
//! The creator is the shooter's side: naturals and made points pay the
//! creator, craps and seven-outs pay the challenger.

use serde::{Deserialize, Serialize};

/// Totals that establish a point on the come-out roll
pub const POINT_NUMBERS: [u8; 6] = [4, 5, 6, 8, 9, 10];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Creator,
    Challenger,
}

/// What a single roll means for the game
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RollOutcome {
    Natural,
    Craps,
    PointEstablished(u8),
    PointMade,
    SevenOut,
    NoDecision,
}

impl RollOutcome {
    /// Winning side if this roll decides the game
    pub fn winner(&self) -> Option<Side> {
        match self {
            RollOutcome::Natural | RollOutcome::PointMade => Some(Side::Creator),
            RollOutcome::Craps | RollOutcome::SevenOut => Some(Side::Challenger),
            RollOutcome::PointEstablished(_) | RollOutcome::NoDecision => None,
        }
    }
}

pub fn is_natural(total: u8) -> bool {
    total == 7 || total == 11
}

pub fn is_craps(total: u8) -> bool {
    matches!(total, 2 | 3 | 12)
}

pub fn is_point_number(total: u8) -> bool {
    POINT_NUMBERS.contains(&total)
}

/// Resolve `total` against the current point (`None` means come-out)
pub fn resolve(point: Option<u8>, total: u8) -> RollOutcome {
    match point {
        None if is_natural(total) => RollOutcome::Natural,
        None if is_craps(total) => RollOutcome::Craps,
        None => RollOutcome::PointEstablished(total),
        Some(p) if total == p => RollOutcome::PointMade,
        Some(_) if total == 7 => RollOutcome::SevenOut,
        Some(_) => RollOutcome::NoDecision,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_come_out_covers_every_total() {
        for total in 2..=12u8 {
            let outcome = resolve(None, total);
            match total {
                7 | 11 => assert_eq!(outcome, RollOutcome::Natural),
                2 | 3 | 12 => assert_eq!(outcome, RollOutcome::Craps),
                _ => {
                    assert!(is_point_number(total));
                    assert_eq!(outcome, RollOutcome::PointEstablished(total));
                }
            }
        }
    }

    #[test]
    fn test_point_phase() {
        assert_eq!(resolve(Some(6), 6), RollOutcome::PointMade);
        assert_eq!(resolve(Some(6), 7), RollOutcome::SevenOut);
        assert_eq!(resolve(Some(6), 11), RollOutcome::NoDecision);
        assert_eq!(resolve(Some(6), 2), RollOutcome::NoDecision);
    }

    #[test]
    fn test_winner_sides() {
        assert_eq!(RollOutcome::Natural.winner(), Some(Side::Creator));
        assert_eq!(RollOutcome::PointMade.winner(), Some(Side::Creator));
        assert_eq!(RollOutcome::Craps.winner(), Some(Side::Challenger));
        assert_eq!(RollOutcome::SevenOut.winner(), Some(Side::Challenger));
        assert_eq!(RollOutcome::PointEstablished(4).winner(), None);
    }
}
