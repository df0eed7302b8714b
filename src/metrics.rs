//! Engine activity counters

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

pub struct EngineMetrics {
    start_time: Instant,
    games_created: AtomicU64,
    games_joined: AtomicU64,
    rolls: AtomicU64,
    settlements: AtomicU64,
    forfeits: AtomicU64,
    retries: AtomicU64,
    claims: AtomicU64,
    withdrawals: AtomicU64,
    lamports_paid_out: AtomicU64,
    lamports_refunded: AtomicU64,
}

/// Point-in-time copy of [`EngineMetrics`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub games_created: u64,
    pub games_joined: u64,
    pub rolls: u64,
    pub settlements: u64,
    pub forfeits: u64,
    pub retries: u64,
    pub claims: u64,
    pub withdrawals: u64,
    pub lamports_paid_out: u64,
    pub lamports_refunded: u64,
    pub uptime_secs: u64,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            games_created: AtomicU64::new(0),
            games_joined: AtomicU64::new(0),
            rolls: AtomicU64::new(0),
            settlements: AtomicU64::new(0),
            forfeits: AtomicU64::new(0),
            retries: AtomicU64::new(0),
            claims: AtomicU64::new(0),
            withdrawals: AtomicU64::new(0),
            lamports_paid_out: AtomicU64::new(0),
            lamports_refunded: AtomicU64::new(0),
        }
    }

    pub fn record_create(&self) {
        self.games_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_join(&self) {
        self.games_joined.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_roll(&self) {
        self.rolls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_settlement(&self) {
        self.settlements.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_forfeit(&self) {
        self.forfeits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_claim(&self, lamports: u64) {
        self.claims.fetch_add(1, Ordering::Relaxed);
        self.lamports_paid_out.fetch_add(lamports, Ordering::Relaxed);
    }

    pub fn record_withdrawal(&self, lamports: u64) {
        self.withdrawals.fetch_add(1, Ordering::Relaxed);
        self.lamports_refunded.fetch_add(lamports, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            games_created: self.games_created.load(Ordering::Relaxed),
            games_joined: self.games_joined.load(Ordering::Relaxed),
            rolls: self.rolls.load(Ordering::Relaxed),
            settlements: self.settlements.load(Ordering::Relaxed),
            forfeits: self.forfeits.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            claims: self.claims.load(Ordering::Relaxed),
            withdrawals: self.withdrawals.load(Ordering::Relaxed),
            lamports_paid_out: self.lamports_paid_out.load(Ordering::Relaxed),
            lamports_refunded: self.lamports_refunded.load(Ordering::Relaxed),
            uptime_secs: self.uptime().as_secs(),
        }
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}
