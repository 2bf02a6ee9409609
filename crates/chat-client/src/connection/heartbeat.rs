//! Heartbeat clock
//!
//! Armed on HELLO. Each tick either sends a heartbeat or, when the previous
//! one was never acknowledged, declares the connection dead.

use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// What to do on a heartbeat tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatAction {
    Send,
    Dead,
}

/// Per-connection heartbeat schedule and ack tracking
#[derive(Debug)]
pub struct HeartbeatClock {
    interval: Duration,
    ticker: Interval,
    last_sent_at: Option<Instant>,
    acknowledged: bool,
    latency: Option<Duration>,
}

impl HeartbeatClock {
    /// Arm the clock; the first tick fires after `first_delay`, then every `interval`
    #[must_use]
    pub fn new(interval: Duration, first_delay: Duration) -> Self {
        let interval = interval.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval_at(Instant::now() + first_delay, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self {
            interval,
            ticker,
            last_sent_at: None,
            acknowledged: true,
            latency: None,
        }
    }

    /// Random first delay in `0..interval`
    #[must_use]
    pub fn jittered(interval: Duration) -> Self {
        let first_delay = interval.mul_f64(rand::random::<f64>());
        Self::new(interval, first_delay)
    }

    pub async fn tick(&mut self) {
        self.ticker.tick().await;
    }

    /// Decide what this tick does
    pub fn on_tick(&self) -> HeartbeatAction {
        if self.acknowledged {
            HeartbeatAction::Send
        } else {
            HeartbeatAction::Dead
        }
    }

    pub fn record_sent(&mut self) {
        self.last_sent_at = Some(Instant::now());
        self.acknowledged = false;
    }

    pub fn acknowledge(&mut self) {
        self.acknowledged = true;
        if let Some(sent) = self.last_sent_at {
            self.latency = Some(sent.elapsed());
        }
    }

    pub const fn interval(&self) -> Duration {
        self.interval
    }

    pub const fn is_acknowledged(&self) -> bool {
        self.acknowledged
    }

    /// Round trip of the last acknowledged heartbeat
    pub const fn latency(&self) -> Option<Duration> {
        self.latency
    }
}

/// Next tick of an armed clock; pending forever while disarmed
pub(crate) async fn next_tick(clock: &mut Option<HeartbeatClock>) {
    match clock {
        Some(clock) => clock.tick().await,
        None => std::future::pending().await,
    }
}
