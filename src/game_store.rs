//! Engine snapshots persisted as JSON files.
//!
//! A snapshot is a full copy of the ledger and the game table. Take it while
//! no operations are in flight; the copy is not a single atomic cut across
//! games and accounts.

use crate::config::EngineConfig;
use crate::errors::StorageError;
use crate::games::dice::{is_valid_face, DiceSource};
use crate::games::engine::WagerEngine;
use crate::games::rules::is_point_number;
use crate::games::types::{Game, GameStatus, MAX_PLAYERS};
use crate::ledger::Ledger;
use crate::metrics::EngineMetrics;
use crate::storage::GameTable;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use tracing::{info, warn};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EngineSnapshot {
    pub version: u32,
    pub taken_at: DateTime<Utc>,
    pub balances: BTreeMap<String, u64>,
    pub games: Vec<Game>,
}

impl EngineSnapshot {
    /// Escrow held across all games in the snapshot
    pub fn total_treasury(&self) -> u128 {
        self.games.iter().map(|g| g.treasury_lamports as u128).sum()
    }

    pub fn total_balance(&self) -> u128 {
        self.balances.values().map(|b| *b as u128).sum()
    }
}

impl<D: DiceSource> WagerEngine<D> {
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            version: SNAPSHOT_VERSION,
            taken_at: Utc::now(),
            balances: self.ledger.balances(),
            games: self.games.list(|_| true),
        }
    }

    /// Rebuild an engine from `snapshot` after checking every game in it.
    ///
    /// Metrics start from zero.
    pub fn restore(
        snapshot: EngineSnapshot,
        dice: D,
        config: EngineConfig,
    ) -> Result<Self, StorageError> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(StorageError::UnsupportedVersion {
                found: snapshot.version,
                expected: SNAPSHOT_VERSION,
            });
        }

        let mut seen = HashSet::new();
        for game in &snapshot.games {
            if !seen.insert(game.id.as_str()) {
                return Err(corrupted(&game.id, "duplicate game id"));
            }
            check_game(game, &config)?;
        }

        info!(
            games = snapshot.games.len(),
            accounts = snapshot.balances.len(),
            taken_at = %snapshot.taken_at,
            "engine restored from snapshot"
        );

        Ok(Self {
            config,
            ledger: Ledger::from_balances(snapshot.balances),
            games: GameTable::from_games(snapshot.games),
            dice: Mutex::new(dice),
            metrics: EngineMetrics::new(),
        })
    }
}

fn corrupted(game_id: &str, reason: &str) -> StorageError {
    warn!(game_id, reason, "snapshot rejected");
    StorageError::CorruptedData(format!("game {}: {}", game_id, reason))
}

fn check_game(game: &Game, config: &EngineConfig) -> Result<(), StorageError> {
    let id = game.id.as_str();

    if game.players.is_empty() || game.players.len() > config.max_players {
        return Err(corrupted(id, "player count out of range"));
    }
    if !game.players.contains_key(&game.creator) {
        return Err(corrupted(id, "creator is not seated"));
    }
    if game.bet_lamports == 0 {
        return Err(corrupted(id, "bet must be positive"));
    }
    match game.status {
        GameStatus::Created if game.players.len() != 1 => {
            return Err(corrupted(id, "created game must hold only the creator"))
        }
        GameStatus::Open | GameStatus::Point | GameStatus::Settled | GameStatus::Forfeited
            if game.players.len() != MAX_PLAYERS =>
        {
            return Err(corrupted(id, "joined game must seat both players"))
        }
        _ => {}
    }

    match (game.status, game.point) {
        (GameStatus::Point, None) => return Err(corrupted(id, "point phase without a point")),
        (GameStatus::Point, Some(p)) if !is_point_number(p) => {
            return Err(corrupted(id, "point is not a point number"))
        }
        (GameStatus::Point, Some(_)) | (_, None) => {}
        (_, Some(_)) => return Err(corrupted(id, "point set outside the point phase")),
    }

    match (&game.winner, &game.loser) {
        (None, None) => {
            if game.status.is_decided() {
                return Err(corrupted(id, "decided game has no winner"));
            }
        }
        (Some(w), Some(l)) => {
            if w == l || !game.is_participant(w) || !game.is_participant(l) {
                return Err(corrupted(id, "winner and loser must be the two players"));
            }
            if !game.status.is_decided() && game.status != GameStatus::Closed {
                return Err(corrupted(id, "undecided game has a winner"));
            }
        }
        _ => return Err(corrupted(id, "winner and loser must be set together")),
    }

    if game.status == GameStatus::Forfeited {
        let forfeited: Vec<&String> = game
            .players
            .iter()
            .filter(|(_, state)| state.forfeit)
            .map(|(principal, _)| principal)
            .collect();
        if forfeited.len() != 1 || game.loser.as_ref() != Some(forfeited[0]) {
            return Err(corrupted(id, "forfeited game must name the forfeiting player as loser"));
        }
    }

    for roll in &game.rolls {
        if !roll.dice.iter().all(|face| is_valid_face(*face)) {
            return Err(corrupted(id, "roll holds a face outside 1..=6"));
        }
        if roll.dice[0] + roll.dice[1] != roll.total {
            return Err(corrupted(id, "roll total does not match its dice"));
        }
    }

    if game.retry_count > config.max_retries {
        return Err(corrupted(id, "retry count above the configured limit"));
    }
    if game.treasury_lamports != game.owed_escrow() {
        return Err(corrupted(id, "treasury does not match unclaimed stakes"));
    }
    Ok(())
}

/// Write `snapshot` to `path`, replacing any existing file atomically.
///
/// The temp file is synced before the rename and removed if anything fails.
pub fn save_snapshot(path: &Path, snapshot: &EngineSnapshot) -> Result<(), StorageError> {
    let bytes = serde_json::to_vec_pretty(snapshot)
        .map_err(|e| StorageError::WriteFailed(format!("Failed to encode snapshot: {}", e)))?;

    let tmp = path.with_extension("json.tmp");
    let written = write_synced(&tmp, &bytes)
        .map_err(|e| StorageError::WriteFailed(format!("{}: {}", tmp.display(), e)))
        .and_then(|()| {
            fs::rename(&tmp, path)
                .map_err(|e| StorageError::WriteFailed(format!("{}: {}", path.display(), e)))
        });
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        warn!(path = %path.display(), error = %e, "snapshot write failed");
        return Err(e);
    }

    info!(path = %path.display(), games = snapshot.games.len(), "snapshot saved");
    Ok(())
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

pub fn load_snapshot(path: &Path) -> Result<EngineSnapshot, StorageError> {
    let bytes = fs::read(path)
        .map_err(|e| StorageError::ReadFailed(format!("{}: {}", path.display(), e)))?;
    let snapshot: EngineSnapshot = serde_json::from_slice(&bytes)?;
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::dice::SeededDice;
    use tempfile::TempDir;

    fn engine_with_games() -> WagerEngine<SeededDice> {
        let engine = WagerEngine::new(SeededDice::new(2));
        engine.fund("alice", 5_000).unwrap();
        engine.fund("bob", 5_000).unwrap();
        engine.create("g01", "alice", 1_000).unwrap();
        engine.join("g01", "bob").unwrap();
        engine.create("g02", "bob", 500).unwrap();
        engine
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("engine.json");
        let snapshot = engine_with_games().snapshot();

        save_snapshot(&path, &snapshot).unwrap();
        assert!(!path.with_extension("json.tmp").exists());

        let loaded = load_snapshot(&path).unwrap();
        assert_eq!(loaded, snapshot);
        assert_eq!(loaded.total_balance() + loaded.total_treasury(), 10_000);
    }

    #[test]
    fn test_restore_rejects_wrong_version() {
        let mut snapshot = engine_with_games().snapshot();
        snapshot.version = 99;
        let err = WagerEngine::restore(snapshot, SeededDice::default(), EngineConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, StorageError::UnsupportedVersion { found: 99, .. }));
    }

    #[test]
    fn test_restore_rejects_treasury_mismatch() {
        let mut snapshot = engine_with_games().snapshot();
        snapshot.games[0].treasury_lamports += 1;
        let err = WagerEngine::restore(snapshot, SeededDice::default(), EngineConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, StorageError::CorruptedData(ref m) if m.contains("treasury")));
    }

    #[test]
    fn test_restore_rejects_stray_point() {
        let mut snapshot = engine_with_games().snapshot();
        snapshot.games[0].point = Some(6);
        assert!(
            WagerEngine::restore(snapshot, SeededDice::default(), EngineConfig::default()).is_err()
        );
    }

    fn game_mut<'a>(snapshot: &'a mut EngineSnapshot, id: &str) -> &'a mut Game {
        snapshot.games.iter_mut().find(|g| g.id == id).unwrap()
    }

    fn rejection(snapshot: EngineSnapshot) -> String {
        match WagerEngine::restore(snapshot, SeededDice::default(), EngineConfig::default()) {
            Ok(_) => panic!("Expected restore to fail"),
            Err(StorageError::CorruptedData(msg)) => msg,
            Err(other) => panic!("Expected corrupted data, got {:?}", other),
        }
    }

    #[test]
    fn test_restore_rejects_joined_status_with_one_seat() {
        let mut snapshot = engine_with_games().snapshot();
        game_mut(&mut snapshot, "g02").status = GameStatus::Open;
        assert!(rejection(snapshot).contains("seat both players"));
    }

    #[test]
    fn test_restore_accepts_cancelled_game_with_one_seat() {
        let engine = engine_with_games();
        engine.cancel("g02", "bob").unwrap();
        let restored =
            WagerEngine::restore(engine.snapshot(), SeededDice::default(), EngineConfig::default());
        assert!(restored.is_ok());
    }

    #[test]
    fn test_restore_rejects_duplicate_game_id() {
        let mut snapshot = engine_with_games().snapshot();
        let copy = game_mut(&mut snapshot, "g01").clone();
        snapshot.games.push(copy);
        assert!(rejection(snapshot).contains("duplicate game id"));
    }

    #[test]
    fn test_restore_rejects_winner_without_loser() {
        let engine = engine_with_games();
        engine.settle_by_admin("g01", "bob").unwrap();
        let mut snapshot = engine.snapshot();
        game_mut(&mut snapshot, "g01").loser = None;
        assert!(rejection(snapshot).contains("set together"));
    }

    #[test]
    fn test_restore_rejects_decided_game_without_winner() {
        let mut snapshot = engine_with_games().snapshot();
        game_mut(&mut snapshot, "g01").status = GameStatus::Settled;
        assert!(rejection(snapshot).contains("decided game has no winner"));
    }

    #[test]
    fn test_restore_rejects_forfeit_mismatch() {
        let engine = engine_with_games();
        engine.forfeit("g01", "bob").unwrap();
        let snapshot = engine.snapshot();

        let mut cleared = snapshot.clone();
        if let Some(state) = game_mut(&mut cleared, "g01").players.get_mut("bob") {
            state.forfeit = false;
        }
        assert!(rejection(cleared).contains("forfeiting player"));

        let mut swapped = snapshot;
        let game = game_mut(&mut swapped, "g01");
        game.winner = Some("bob".into());
        game.loser = Some("alice".into());
        assert!(rejection(swapped).contains("forfeiting player"));
    }

    #[test]
    fn test_restore_rejects_inconsistent_rolls() {
        let engine = engine_with_games();
        engine.roll("g01", "alice").unwrap();
        let snapshot = engine.snapshot();

        let mut bad_total = snapshot.clone();
        game_mut(&mut bad_total, "g01").rolls[0].total = 12;
        assert!(rejection(bad_total).contains("does not match"));

        let mut bad_face = snapshot;
        let roll = &mut game_mut(&mut bad_face, "g01").rolls[0];
        roll.dice = [7, 4];
        roll.total = 11;
        assert!(rejection(bad_face).contains("outside 1..=6"));
    }

    #[test]
    fn test_failed_rename_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("engine.json");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), b"x").unwrap();

        let err = save_snapshot(&path, &engine_with_games().snapshot()).unwrap_err();
        assert!(matches!(err, StorageError::WriteFailed(_)));
        assert!(!path.with_extension("json.tmp").exists());
        assert!(path.join("keep").exists());
    }

    #[test]
    fn test_load_garbage_is_corrupted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, b"{ not json").unwrap();
        assert!(matches!(load_snapshot(&path), Err(StorageError::CorruptedData(_))));

        let missing = dir.path().join("missing.json");
        assert!(matches!(load_snapshot(&missing), Err(StorageError::ReadFailed(_))));
    }
}
