use crate::errors::{WagerError, WagerResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Heads-up games only: the creator and one challenger
pub const MAX_PLAYERS: usize = 2;

/// Lifecycle status of a game
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Created,
    Open,
    Point,
    Settled,
    Cancelled,
    Closed,
    Forfeited,
}

impl GameStatus {
    /// Statuses in which dice may be rolled or a result forced
    pub fn is_live(&self) -> bool {
        matches!(self, GameStatus::Open | GameStatus::Point)
    }

    /// Statuses in which a winner is fixed and the escrow can be claimed
    pub fn is_decided(&self) -> bool {
        matches!(self, GameStatus::Settled | GameStatus::Forfeited)
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GameStatus::Created => "created",
            GameStatus::Open => "open",
            GameStatus::Point => "point",
            GameStatus::Settled => "settled",
            GameStatus::Cancelled => "cancelled",
            GameStatus::Closed => "closed",
            GameStatus::Forfeited => "forfeited",
        };
        f.pad(s)
    }
}

/// Which part of the pass-line cycle a roll belonged to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RollPhase {
    ComeOut,
    Point,
}

impl fmt::Display for RollPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RollPhase::ComeOut => write!(f, "come_out"),
            RollPhase::Point => write!(f, "point"),
        }
    }
}

/// One entry of the audit trail. Never modified after it is appended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RollResult {
    pub dice: [u8; 2],
    pub total: u8,
    pub phase: RollPhase,
    pub status_after_roll: GameStatus,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerState {
    pub joined: bool,
    /// Set once the player has been paid (claim) or refunded (withdraw)
    pub claimed: bool,
    pub forfeit: bool,
}

impl PlayerState {
    pub fn joined() -> Self {
        Self {
            joined: true,
            ..Self::default()
        }
    }
}

/// Complete record of one wager
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Game {
    pub id: String,
    pub creator: String,
    pub bet_lamports: u64,
    pub treasury_lamports: u64,
    pub point: Option<u8>,
    pub status: GameStatus,
    pub winner: Option<String>,
    pub loser: Option<String>,
    pub retry_count: u8,
    pub rolls: Vec<RollResult>,
    pub players: BTreeMap<String, PlayerState>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Game {
    pub(crate) fn new(id: String, creator: String, bet_lamports: u64) -> Self {
        let now = Utc::now();
        let mut players = BTreeMap::new();
        players.insert(creator.clone(), PlayerState::joined());

        Self {
            id,
            creator,
            bet_lamports,
            treasury_lamports: bet_lamports,
            point: None,
            status: GameStatus::Created,
            winner: None,
            loser: None,
            retry_count: 0,
            rolls: Vec::new(),
            players,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_participant(&self, principal: &str) -> bool {
        self.players.get(principal).map_or(false, |p| p.joined)
    }

    pub fn player(&self, principal: &str) -> Option<&PlayerState> {
        self.players.get(principal)
    }

    /// The single player who is not `excluded`.
    ///
    /// Fails if anything other than exactly one candidate exists, which can
    /// only happen if the two-player cap has been broken.
    pub fn other_player(&self, excluded: &str) -> WagerResult<String> {
        let mut candidates = self.players.keys().filter(|p| p.as_str() != excluded);
        match (candidates.next(), candidates.next()) {
            (Some(only), None) => Ok(only.clone()),
            _ => {
                let found = self.players.keys().filter(|p| p.as_str() != excluded).count();
                tracing::warn!(game_id = %self.id, found, "opponent lookup did not resolve to one player");
                Err(WagerError::invalid_argument(format!(
                    "expected exactly one opponent in game {}, found {}",
                    self.id, found
                )))
            }
        }
    }

    /// Escrow the game must hold right now.
    ///
    /// Once a winner is fixed the whole pot is owed to them until they claim;
    /// before that each joined player is owed their own bet until refunded.
    pub fn owed_escrow(&self) -> u64 {
        match &self.winner {
            Some(winner) => {
                let paid = self.players.get(winner).map_or(false, |p| p.claimed);
                if paid {
                    0
                } else {
                    self.full_escrow()
                }
            }
            None => {
                let unpaid = self.players.values().filter(|p| p.joined && !p.claimed).count();
                unpaid as u64 * self.bet_lamports
            }
        }
    }

    /// Escrow held when every joined player's bet is in the pot
    pub fn full_escrow(&self) -> u64 {
        self.players.values().filter(|p| p.joined).count() as u64 * self.bet_lamports
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
