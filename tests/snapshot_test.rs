//! Engine state survives a save, load and restore cycle

use street_craps::{
    load_snapshot, save_snapshot, DiceSource, EngineConfig, GameStatus, SeededDice, WagerEngine,
};
use tempfile::TempDir;

#[test]
fn test_restore_continues_where_snapshot_left_off() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("engine.json");

    // seed 12345 establishes point 5 and makes it on the next roll
    let engine = WagerEngine::new(SeededDice::new(12345));
    engine.fund("alice", 10_000).unwrap();
    engine.fund("bob", 10_000).unwrap();
    engine.create("g01", "alice", 1_000).unwrap();
    engine.join("g01", "bob").unwrap();
    engine.roll("g01", "alice").unwrap();
    engine.create("g02", "bob", 250).unwrap();

    let before = engine.snapshot();
    save_snapshot(&path, &before).unwrap();

    let loaded = load_snapshot(&path).unwrap();
    assert_eq!(loaded.games, before.games);
    assert_eq!(loaded.balances, before.balances);

    let mut dice = SeededDice::new(12345);
    dice.next_face();
    dice.reset(None);
    let restored = WagerEngine::restore(loaded, dice, EngineConfig::default())
        .map_err(|e| e.to_string())
        .unwrap();

    assert_eq!(restored.total_funds(), engine.total_funds());
    assert_eq!(restored.balance_of("bob"), 8_750);
    let game = restored.game("g01").unwrap();
    assert_eq!(game.status, GameStatus::Point);
    assert_eq!(game.point, Some(5));
    assert_eq!(game.rolls.len(), 1);

    // restored dice start over at 3+2
    let roll = restored.roll("g01", "bob").unwrap();
    assert_eq!(roll.total, 5);
    assert_eq!(restored.game("g01").unwrap().winner.as_deref(), Some("alice"));
    assert_eq!(restored.claim("g01", "alice").unwrap(), 2_000);

    assert_eq!(restored.metrics().games_created, 0);
    assert_eq!(restored.metrics().claims, 1);
}

#[test]
fn test_snapshot_overwrites_previous_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("engine.json");

    let engine = WagerEngine::new(SeededDice::default());
    engine.fund("alice", 500).unwrap();
    save_snapshot(&path, &engine.snapshot()).unwrap();

    engine.fund("alice", 500).unwrap();
    save_snapshot(&path, &engine.snapshot()).unwrap();

    let loaded = load_snapshot(&path).unwrap();
    assert_eq!(loaded.balances.get("alice"), Some(&1_000));
    assert!(loaded.games.is_empty());
}
