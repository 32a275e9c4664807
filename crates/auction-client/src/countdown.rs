//! Local countdown derived from the server-reported remaining time.

use std::time::Duration;

use tracing::debug;

use crate::events::{EngineEvent, EventSender};
use crate::scheduler::TimerSlot;

const TICK: Duration = Duration::from_secs(1);

/// What a countdown tick produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockSignal {
    /// The counter decremented to the given (non-zero) value.
    Ticked(u32),
    /// The counter reached zero. Emitted once per [`CountdownClock::start`].
    Expired,
}

/// One-second countdown.
///
/// Ticks arrive as [`EngineEvent::Tick`] messages tagged with the generation
/// of the timer that produced them; the controller feeds them back through
/// [`CountdownClock::on_tick`]. Ticks from a cancelled or replaced timer are
/// ignored, so a restart never overlaps with the previous countdown.
pub struct CountdownClock {
    remaining: u32,
    generation: u64,
    expired: bool,
    timer: TimerSlot,
    events: EventSender,
}

impl CountdownClock {
    pub(crate) fn new(events: EventSender) -> Self {
        Self {
            remaining: 0,
            generation: 0,
            expired: false,
            timer: TimerSlot::new(),
            events,
        }
    }

    /// Start (or restart) counting down from `seconds`.
    pub fn start(&mut self, seconds: u32) {
        self.generation += 1;
        self.remaining = seconds;
        self.expired = false;

        let generation = self.generation;
        let events = self.events.clone();
        self.timer.repeat(TICK, false, move || {
            events.send(EngineEvent::Tick { generation }).is_ok()
        });
        debug!(seconds, generation, "countdown armed");
    }

    /// Cancel pending ticks. Idempotent.
    pub fn stop(&mut self) {
        self.timer.cancel();
        self.generation += 1;
    }

    /// Apply one tick from the timer armed at `generation`.
    ///
    /// Returns `None` for stale ticks and for ticks after expiry.
    pub(crate) fn on_tick(&mut self, generation: u64) -> Option<ClockSignal> {
        if generation != self.generation || self.expired {
            return None;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.expired = true;
            self.stop();
            return Some(ClockSignal::Expired);
        }
        Some(ClockSignal::Ticked(self.remaining))
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_armed() && !self.expired
    }
}
