//! Keyed game table with exclusive access per game id

use crate::errors::{WagerError, WagerResult};
use crate::games::types::Game;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Owns every game record.
///
/// Mutation goes through closures that run while the entry is held, so a
/// single operation on one game can never interleave with another operation on
/// the same game. Different games live in independent entries.
#[derive(Debug, Default)]
pub struct GameTable {
    games: DashMap<String, Game>,
}

impl GameTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the game built by `build` if `id` is unused.
    ///
    /// `build` runs with the slot reserved; if it fails nothing is inserted.
    pub fn insert_new<F>(&self, id: &str, build: F) -> WagerResult<Game>
    where
        F: FnOnce() -> WagerResult<Game>,
    {
        match self.games.entry(id.to_string()) {
            Entry::Occupied(_) => Err(WagerError::conflict(format!("game id {} already exists", id))),
            Entry::Vacant(slot) => {
                let game = build()?;
                let snapshot = game.clone();
                slot.insert(game);
                Ok(snapshot)
            }
        }
    }

    /// Run `op` against the game while holding it exclusively
    pub fn with_game_mut<T, F>(&self, id: &str, op: F) -> WagerResult<T>
    where
        F: FnOnce(&mut Game) -> WagerResult<T>,
    {
        let mut game = self
            .games
            .get_mut(id)
            .ok_or_else(|| WagerError::NotFound(id.to_string()))?;
        op(game.value_mut())
    }

    pub fn get(&self, id: &str) -> WagerResult<Game> {
        self.games
            .get(id)
            .map(|g| g.value().clone())
            .ok_or_else(|| WagerError::NotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.games.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    /// Clones of the games matching `filter`, oldest first
    pub fn list<F>(&self, filter: F) -> Vec<Game>
    where
        F: Fn(&Game) -> bool,
    {
        let mut games: Vec<Game> = self
            .games
            .iter()
            .filter(|entry| filter(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        games.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        games
    }

    /// Escrow held across every game
    pub fn total_treasury(&self) -> u128 {
        self.games.iter().map(|g| g.treasury_lamports as u128).sum()
    }

    pub(crate) fn from_games(games: Vec<Game>) -> Self {
        Self {
            games: games.into_iter().map(|g| (g.id.clone(), g)).collect(),
        }
    }
}
