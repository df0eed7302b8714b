//! Two-party wager engine
//!
//! Owns the game table and the ledger, runs the pass-line protocol, and moves
//! escrow in and out. Each operation validates everything first and only then
//! applies its effects, with the single fallible ledger movement ordered before
//! any change to the game, so a failed call leaves no trace.

use crate::config::{CrapsConfig, EngineConfig};
use crate::errors::{ConfigurationError, WagerError, WagerResult};
use crate::games::dice::{is_valid_face, DiceSource};
use crate::games::rules::{self, RollOutcome, Side};
use crate::games::types::{Game, GameStatus, PlayerState, RollPhase, RollResult, MAX_PLAYERS};
use crate::ledger::{require_principal, Ledger};
use crate::metrics::{EngineMetrics, MetricsSnapshot};
use crate::storage::GameTable;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// The ledger and game table behind one street craps deployment.
///
/// `D` is the die source. Hosts that pick it from configuration use the boxed
/// default; tests usually plug in [`SeededDice`](crate::games::dice::SeededDice)
/// or a scripted source directly.
pub struct WagerEngine<D: DiceSource = Box<dyn DiceSource>> {
    pub(crate) config: EngineConfig,
    pub(crate) ledger: Ledger,
    pub(crate) games: GameTable,
    pub(crate) dice: Mutex<D>,
    pub(crate) metrics: EngineMetrics,
}

impl WagerEngine<Box<dyn DiceSource>> {
    /// Build an engine with the rules and die source `config` describes
    pub fn from_config(config: &CrapsConfig) -> Result<Self, ConfigurationError> {
        let dice = config.build_dice()?;
        Ok(Self::with_config(dice, config.engine.clone()))
    }
}

impl<D: DiceSource> WagerEngine<D> {
    pub fn new(dice: D) -> Self {
        Self::with_config(dice, EngineConfig::default())
    }

    pub fn with_config(dice: D, config: EngineConfig) -> Self {
        Self {
            config,
            ledger: Ledger::new(),
            games: GameTable::new(),
            dice: Mutex::new(dice),
            metrics: EngineMetrics::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Credit `amount` to `account`, returning the new balance
    pub fn fund(&self, account: &str, amount: u64) -> WagerResult<u64> {
        let balance = self.ledger.fund(account, amount)?;
        info!(account, amount, balance, "account funded");
        Ok(balance)
    }

    pub fn balance_of(&self, account: &str) -> u64 {
        self.ledger.balance_of(account)
    }

    /// Open a game and escrow the creator's stake
    pub fn create(&self, game_id: &str, creator: &str, bet_lamports: u64) -> WagerResult<Game> {
        require_principal(creator)?;
        if game_id.chars().count() < self.config.min_game_id_len {
            return Err(WagerError::invalid_argument(format!(
                "game id must be at least {} chars",
                self.config.min_game_id_len
            )));
        }
        if bet_lamports == 0 {
            return Err(WagerError::invalid_argument("bet must be positive"));
        }

        let game = self.games.insert_new(game_id, || {
            self.ledger.debit(creator, bet_lamports)?;
            Ok(Game::new(game_id.to_string(), creator.to_string(), bet_lamports))
        })?;

        self.metrics.record_create();
        info!(game_id, creator, bet_lamports, "game created");
        Ok(game)
    }

    /// Seat the challenger and escrow their matching stake
    pub fn join(&self, game_id: &str, player: &str) -> WagerResult<Game> {
        require_principal(player)?;
        let game = self.games.with_game_mut(game_id, |game| {
            if game.status != GameStatus::Created {
                return Err(WagerError::invalid_state(format!(
                    "game must be in created status to join, found {}",
                    game.status
                )));
            }
            if player == game.creator {
                return Err(WagerError::conflict("creator cannot join their own game"));
            }
            if game.players.contains_key(player) {
                return Err(WagerError::conflict(format!("{} already joined", player)));
            }
            if game.players.len() >= MAX_PLAYERS {
                return Err(WagerError::conflict("game is full"));
            }
            let treasury = game
                .treasury_lamports
                .checked_add(game.bet_lamports)
                .ok_or_else(|| WagerError::invalid_argument("treasury overflow"))?;

            self.ledger.debit(player, game.bet_lamports)?;

            game.players.insert(player.to_string(), PlayerState::joined());
            game.treasury_lamports = treasury;
            game.status = GameStatus::Open;
            game.touch();
            Ok(game.clone())
        })?;

        self.metrics.record_join();
        info!(game_id, player, treasury = game.treasury_lamports, "challenger joined");
        Ok(game)
    }

    /// Throw the dice once and apply the pass-line result
    pub fn roll(&self, game_id: &str, roller: &str) -> WagerResult<RollResult> {
        self.games.with_game_mut(game_id, |game| {
            if !game.status.is_live() {
                return Err(WagerError::invalid_state(format!(
                    "game cannot roll while {}",
                    game.status
                )));
            }
            if !game.is_participant(roller) {
                return Err(WagerError::unauthorized("roller must be a participant"));
            }
            let challenger = game.other_player(&game.creator)?;
            let dice = self.draw_pair()?;
            let total = dice[0] + dice[1];

            let phase = match game.point {
                None => RollPhase::ComeOut,
                Some(_) => RollPhase::Point,
            };
            let outcome = rules::resolve(game.point, total);
            match outcome.winner() {
                Some(Side::Creator) => {
                    let creator = game.creator.clone();
                    self.settle(game, creator, challenger);
                }
                Some(Side::Challenger) => {
                    let creator = game.creator.clone();
                    self.settle(game, challenger, creator);
                }
                None => {
                    if let RollOutcome::PointEstablished(point) = outcome {
                        game.point = Some(point);
                        game.status = GameStatus::Point;
                    }
                }
            }

            let result = RollResult {
                dice,
                total,
                phase,
                status_after_roll: game.status,
            };
            game.rolls.push(result.clone());
            game.touch();

            self.metrics.record_roll();
            debug!(
                game_id,
                roller,
                die1 = dice[0],
                die2 = dice[1],
                total,
                %phase,
                ?outcome,
                status = %game.status,
                "dice rolled"
            );
            Ok(result)
        })
    }

    /// Force a result with `winner` taking the pot
    pub fn settle_by_admin(&self, game_id: &str, winner: &str) -> WagerResult<Game> {
        self.games.with_game_mut(game_id, |game| {
            if !game.status.is_live() {
                return Err(WagerError::invalid_state(format!(
                    "cannot settle a game that is {}",
                    game.status
                )));
            }
            if !game.is_participant(winner) {
                return Err(WagerError::unauthorized("winner must be a player"));
            }
            let loser = game.other_player(winner)?;

            self.settle(game, winner.to_string(), loser);
            game.touch();
            Ok(game.clone())
        })
    }

    /// Pay the whole escrow to the winner, once
    pub fn claim(&self, game_id: &str, claimant: &str) -> WagerResult<u64> {
        let payout = self.games.with_game_mut(game_id, |game| {
            if !game.status.is_decided() {
                return Err(WagerError::invalid_state(format!(
                    "claim requires a settled game, found {}",
                    game.status
                )));
            }
            if game.winner.as_deref() != Some(claimant) {
                return Err(WagerError::unauthorized("only the winner can claim"));
            }
            match game.player(claimant) {
                Some(state) if state.joined => {
                    if state.claimed {
                        warn!(game_id, claimant, "double claim rejected");
                        return Err(WagerError::conflict("double-claim prevented"));
                    }
                }
                _ => return Err(WagerError::unauthorized("winner must have joined")),
            }

            let payout = game.treasury_lamports;
            self.ledger.credit(claimant, payout)?;

            if let Some(state) = game.players.get_mut(claimant) {
                state.claimed = true;
            }
            game.treasury_lamports = 0;
            game.touch();
            Ok(payout)
        })?;

        self.metrics.record_claim(payout);
        info!(game_id, claimant, payout, "winnings claimed");
        Ok(payout)
    }

    /// Reopen a settled game for one more round of rolling
    pub fn retry(&self, game_id: &str, actor: &str) -> WagerResult<Game> {
        let game = self.games.with_game_mut(game_id, |game| {
            if game.status != GameStatus::Settled {
                return Err(WagerError::invalid_state(format!(
                    "retry requires a settled game, found {}",
                    game.status
                )));
            }
            if !game.is_participant(actor) {
                return Err(WagerError::unauthorized("actor must be a player"));
            }
            if game.retry_count >= self.config.max_retries {
                return Err(WagerError::conflict(format!(
                    "only {} retry allowed per game",
                    self.config.max_retries
                )));
            }
            if game.treasury_lamports != game.full_escrow() {
                return Err(WagerError::invalid_state(
                    "escrow already paid out; game cannot be reopened",
                ));
            }

            game.retry_count += 1;
            game.status = GameStatus::Open;
            game.winner = None;
            game.loser = None;
            game.point = None;
            for state in game.players.values_mut() {
                state.claimed = false;
            }
            game.touch();
            Ok(game.clone())
        })?;

        self.metrics.record_retry();
        info!(game_id, actor, retry_count = game.retry_count, "game reopened");
        Ok(game)
    }

    /// Creator calls the game off before it is decided
    pub fn cancel(&self, game_id: &str, actor: &str) -> WagerResult<Game> {
        let game = self.games.with_game_mut(game_id, |game| {
            if actor != game.creator {
                return Err(WagerError::unauthorized("only the creator can cancel"));
            }
            if !matches!(game.status, GameStatus::Created | GameStatus::Open) {
                return Err(WagerError::invalid_state(format!(
                    "cancel only before rolling starts, found {}",
                    game.status
                )));
            }

            game.status = GameStatus::Cancelled;
            game.touch();
            Ok(game.clone())
        })?;

        info!(game_id, actor, "game cancelled");
        Ok(game)
    }

    /// Refund a participant's stake from a cancelled game
    pub fn withdraw(&self, game_id: &str, actor: &str) -> WagerResult<u64> {
        let amount = self.games.with_game_mut(game_id, |game| {
            if game.status != GameStatus::Cancelled {
                return Err(WagerError::invalid_state(format!(
                    "withdraw requires a cancelled game, found {}",
                    game.status
                )));
            }
            match game.player(actor) {
                Some(state) if state.joined => {
                    if state.claimed {
                        return Err(WagerError::conflict("already withdrawn"));
                    }
                }
                _ => return Err(WagerError::unauthorized("actor must be a participant")),
            }
            let amount = game.bet_lamports;
            if game.treasury_lamports < amount {
                return Err(WagerError::invalid_state("treasury does not hold the refund amount"));
            }

            self.ledger.credit(actor, amount)?;

            if let Some(state) = game.players.get_mut(actor) {
                state.claimed = true;
            }
            game.treasury_lamports -= amount;
            game.touch();
            Ok(amount)
        })?;

        self.metrics.record_withdrawal(amount);
        info!(game_id, actor, amount, "stake withdrawn");
        Ok(amount)
    }

    /// Concede a live game; the opponent takes the pot
    pub fn forfeit(&self, game_id: &str, actor: &str) -> WagerResult<Game> {
        let game = self.games.with_game_mut(game_id, |game| {
            if !game.status.is_live() {
                return Err(WagerError::invalid_state(format!(
                    "forfeit requires an active game, found {}",
                    game.status
                )));
            }
            if !game.is_participant(actor) {
                return Err(WagerError::unauthorized("forfeit actor must be a player"));
            }
            let winner = game.other_player(actor)?;

            if let Some(state) = game.players.get_mut(actor) {
                state.forfeit = true;
            }
            self.settle(game, winner, actor.to_string());
            game.status = GameStatus::Forfeited;
            game.touch();
            Ok(game.clone())
        })?;

        self.metrics.record_forfeit();
        info!(game_id, actor, "game forfeited");
        Ok(game)
    }

    /// Retire a game whose escrow is fully drained
    pub fn close(&self, game_id: &str, actor: &str) -> WagerResult<Game> {
        let game = self.games.with_game_mut(game_id, |game| {
            if actor != game.creator {
                return Err(WagerError::unauthorized("only the creator can close"));
            }
            if !matches!(
                game.status,
                GameStatus::Settled | GameStatus::Cancelled | GameStatus::Forfeited
            ) {
                return Err(WagerError::invalid_state(format!(
                    "cannot close a game that is {}",
                    game.status
                )));
            }
            if game.treasury_lamports != 0 {
                return Err(WagerError::invalid_state("treasury must be empty before close"));
            }

            game.status = GameStatus::Closed;
            game.touch();
            Ok(game.clone())
        })?;

        info!(game_id, actor, "game closed");
        Ok(game)
    }

    /// Snapshot of one game
    pub fn game(&self, game_id: &str) -> WagerResult<Game> {
        self.games.get(game_id)
    }

    /// Games in `status` (all games when `None`), oldest first
    pub fn list_games(&self, status: Option<GameStatus>) -> Vec<Game> {
        self.games.list(|g| status.map_or(true, |s| g.status == s))
    }

    /// Every game `principal` has a seat in
    pub fn games_for_player(&self, principal: &str) -> Vec<Game> {
        self.games.list(|g| g.players.contains_key(principal))
    }

    /// Funds held by accounts plus funds escrowed by games
    pub fn total_funds(&self) -> u128 {
        self.ledger.total_balance() + self.games.total_treasury()
    }

    fn settle(&self, game: &mut Game, winner: String, loser: String) {
        info!(game_id = %game.id, %winner, %loser, "game settled");
        game.status = GameStatus::Settled;
        game.winner = Some(winner);
        game.loser = Some(loser);
        game.point = None;
        self.metrics.record_settlement();
    }

    fn draw_pair(&self) -> WagerResult<[u8; 2]> {
        let mut dice = self.dice.lock().unwrap_or_else(PoisonError::into_inner);
        let pair = [dice.next_face(), dice.next_face()];
        if let Some(bad) = pair.iter().find(|f| !is_valid_face(**f)) {
            return Err(WagerError::invalid_argument(format!(
                "die source produced face {} outside 1..=6",
                bad
            )));
        }
        Ok(pair)
    }
}

/// Fresh random game id for callers that do not pick their own
pub fn generate_game_id() -> String {
    format!("g-{}", Uuid::new_v4().simple())
}
