//! Cancellable scheduled tasks on the tokio timer.
//!
//! Every timer the engine owns lives in a [`TimerSlot`]: re-arming a slot
//! aborts the task it held before spawning the new one, so a slot never has
//! two live tasks. Tests drive the timers with tokio's paused clock
//! (`#[tokio::test(start_paused = true)]`).
//!
//! Backend requests run in a [`RequestSet`] so teardown can abort every
//! in-flight call at once.

use std::future::Future;
use std::time::Duration;

use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep};

/// Holds at most one scheduled task.
#[derive(Debug, Default)]
pub struct TimerSlot {
    task: Option<JoinHandle<()>>,
}

impl TimerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `on_fire` every `period` until it returns `false` or the slot is
    /// cancelled. The first run happens immediately when `fire_now` is set,
    /// otherwise after one period.
    pub fn repeat<F>(&mut self, period: Duration, fire_now: bool, mut on_fire: F)
    where
        F: FnMut() -> bool + Send + 'static,
    {
        self.cancel();
        let start = if fire_now {
            Instant::now()
        } else {
            Instant::now() + period
        };
        self.task = Some(tokio::spawn(async move {
            let mut ticker = interval_at(start, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !on_fire() {
                    break;
                }
            }
        }));
    }

    /// Run `on_fire` once after `delay`.
    pub fn once<F>(&mut self, delay: Duration, on_fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();
        self.task = Some(tokio::spawn(async move {
            sleep(delay).await;
            on_fire();
        }));
    }

    /// Abort the scheduled task. Idempotent.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// In-flight backend requests owned by one component.
#[derive(Debug, Default)]
pub struct RequestSet {
    tasks: JoinSet<()>,
}

impl RequestSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<F>(&mut self, request: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        // Reap finished tasks so the set does not grow unbounded.
        while self.tasks.try_join_next().is_some() {}
        self.tasks.spawn(request);
    }

    /// Abort every in-flight request. Idempotent.
    pub fn abort_all(&mut self) {
        self.tasks.abort_all();
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
