// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The reusable polling timer family.
//!
//! One [`Poller`] owns at most one live timer task at a time. Restart is
//! always clear-then-set, inactivity auto-suspends the loop, and a tick
//! may halt the family one-way (the auth-expiry transition). The two
//! engine families (message-level and contact-level) are two instances
//! of this type and never couple.

use std::future::Future;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// What a tick tells the timer loop to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Keep polling on the next interval.
    Continue,
    /// Stop the family outright; only an explicit restart revives it.
    Halt,
}

/// Result of an activity signal, so the caller knows whether a restart
/// is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityOutcome {
    /// The timer is alive; its inactivity window was re-armed.
    Rearmed,
    /// The timer suspended on inactivity; the caller should restart it.
    NeedsRestart,
    /// The family was never started (or was explicitly stopped);
    /// activity alone does not arm it.
    NeverStarted,
    /// The family was halted by a tick; activity alone does not revive it.
    Halted,
}

struct TimerHandle {
    cancel: CancellationToken,
    alive: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

/// A periodic timer with inactivity suspension and one-way halt.
pub struct Poller {
    name: &'static str,
    interval: Duration,
    idle_timeout: Duration,
    halted: Arc<AtomicBool>,
    last_activity: Arc<Mutex<Instant>>,
    active: Mutex<Option<TimerHandle>>,
}

impl Poller {
    pub fn new(name: &'static str, interval: Duration, idle_timeout: Duration) -> Self {
        Self {
            name,
            interval,
            idle_timeout,
            halted: Arc::new(AtomicBool::new(false)),
            last_activity: Arc::new(Mutex::new(Instant::now())),
            active: Mutex::new(None),
        }
    }

    /// Start (or restart) the timer with the given tick callback.
    ///
    /// Any existing timer of this family is cancelled first, so at most
    /// one is ever alive. Starting clears a previous halt: the caller
    /// has decided the family should run again.
    pub fn start<F, Fut>(&self, tick: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TickOutcome> + Send + 'static,
    {
        self.stop();
        self.halted.store(false, Ordering::SeqCst);
        *self.last_activity.lock().expect("activity clock poisoned") = Instant::now();

        let cancel = CancellationToken::new();
        let alive = Arc::new(AtomicBool::new(true));
        let halted = Arc::clone(&self.halted);
        let last_activity = Arc::clone(&self.last_activity);
        let name = self.name;
        let interval = self.interval;
        let idle_timeout = self.idle_timeout;

        // Anchor the schedule at start() time, not at the task's first
        // poll, so ticks begin one full interval after start.
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let task = {
            let cancel = cancel.clone();
            let alive = Arc::clone(&alive);
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = ticker.tick() => {
                            let idle = last_activity
                                .lock()
                                .expect("activity clock poisoned")
                                .elapsed();
                            if idle >= idle_timeout {
                                debug!(poller = name, ?idle, "suspending on inactivity");
                                break;
                            }
                            match tick().await {
                                TickOutcome::Continue => {}
                                TickOutcome::Halt => {
                                    debug!(poller = name, "halted by tick");
                                    halted.store(true, Ordering::SeqCst);
                                    break;
                                }
                            }
                        }
                    }
                }
                alive.store(false, Ordering::SeqCst);
            })
        };

        let mut slot = self.active.lock().expect("timer slot poisoned");
        *slot = Some(TimerHandle { cancel, alive, task });
    }

    /// Cancel any live timer of this family.
    pub fn stop(&self) {
        let handle = self.active.lock().expect("timer slot poisoned").take();
        if let Some(handle) = handle {
            handle.cancel.cancel();
            handle.alive.store(false, Ordering::SeqCst);
            handle.task.abort();
        }
    }

    /// Whether a timer task of this family is currently alive.
    pub fn is_running(&self) -> bool {
        self.active
            .lock()
            .expect("timer slot poisoned")
            .as_ref()
            .map(|h| h.alive.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    /// Whether the family was halted by a tick (auth expiry).
    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    /// Signal user activity. Re-arms the inactivity window when the
    /// timer is alive; reports `NeedsRestart` only when a timer that
    /// did run suspended on inactivity. A family that was never started
    /// (or explicitly stopped) reports `NeverStarted`, and a halted one
    /// reports `Halted`; neither is revived by activity alone.
    pub fn mark_activity(&self) -> ActivityOutcome {
        if self.is_halted() {
            return ActivityOutcome::Halted;
        }
        *self.last_activity.lock().expect("activity clock poisoned") = Instant::now();
        // A suspended timer leaves its dead handle in the slot; stop()
        // takes the slot. That difference is the restart signal.
        match self.active.lock().expect("timer slot poisoned").as_ref() {
            None => ActivityOutcome::NeverStarted,
            Some(handle) if handle.alive.load(Ordering::SeqCst) => ActivityOutcome::Rearmed,
            Some(_) => ActivityOutcome::NeedsRestart,
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_tick(counter: Arc<AtomicUsize>) -> impl Fn() -> std::future::Ready<TickOutcome> {
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(TickOutcome::Continue)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_fire_once_per_interval() {
        let poller = Poller::new("test", Duration::from_secs(15), Duration::from_secs(300));
        let counter = Arc::new(AtomicUsize::new(0));
        poller.start(counting_tick(Arc::clone(&counter)));

        tokio::time::advance(Duration::from_secs(15)).await;
        tokio::task::yield_now().await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(15)).await;
        tokio::task::yield_now().await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_replaces_the_previous_timer() {
        let poller = Poller::new("test", Duration::from_secs(15), Duration::from_secs(300));
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        poller.start(counting_tick(Arc::clone(&first)));
        poller.start(counting_tick(Arc::clone(&second)));

        tokio::time::advance(Duration::from_secs(15)).await;
        tokio::task::yield_now().await;

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert!(poller.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn suspends_after_the_idle_window() {
        let poller = Poller::new("test", Duration::from_secs(15), Duration::from_secs(60));
        let counter = Arc::new(AtomicUsize::new(0));
        poller.start(counting_tick(Arc::clone(&counter)));

        // Ticks at 15/30/45 run; the 60s tick sees the idle window
        // elapsed and suspends without invoking the callback.
        for _ in 0..4 {
            tokio::time::advance(Duration::from_secs(15)).await;
            tokio::task::yield_now().await;
        }

        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert!(!poller.is_running());
        assert!(!poller.is_halted());
        assert_eq!(poller.mark_activity(), ActivityOutcome::NeedsRestart);
    }

    #[tokio::test(start_paused = true)]
    async fn activity_rearms_a_live_timer() {
        let poller = Poller::new("test", Duration::from_secs(15), Duration::from_secs(60));
        let counter = Arc::new(AtomicUsize::new(0));
        poller.start(counting_tick(Arc::clone(&counter)));

        for _ in 0..3 {
            tokio::time::advance(Duration::from_secs(15)).await;
            tokio::task::yield_now().await;
            assert_eq!(poller.mark_activity(), ActivityOutcome::Rearmed);
        }

        // Window was re-armed at t=45; the 60s tick still runs.
        tokio::time::advance(Duration::from_secs(15)).await;
        tokio::task::yield_now().await;
        assert_eq!(counter.load(Ordering::SeqCst), 4);
        assert!(poller.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn halt_is_one_way_until_restart() {
        let poller = Poller::new("test", Duration::from_secs(15), Duration::from_secs(300));
        poller.start(|| std::future::ready(TickOutcome::Halt));

        tokio::time::advance(Duration::from_secs(15)).await;
        tokio::task::yield_now().await;

        assert!(!poller.is_running());
        assert!(poller.is_halted());
        assert_eq!(poller.mark_activity(), ActivityOutcome::Halted);
        assert!(!poller.is_running());

        // An explicit restart clears the halt.
        let counter = Arc::new(AtomicUsize::new(0));
        poller.start(counting_tick(Arc::clone(&counter)));
        assert!(!poller.is_halted());
        tokio::time::advance(Duration::from_secs(15)).await;
        tokio::task::yield_now().await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn activity_never_arms_an_unstarted_family() {
        let poller = Poller::new("test", Duration::from_secs(15), Duration::from_secs(300));
        assert_eq!(poller.mark_activity(), ActivityOutcome::NeverStarted);

        // An explicit stop returns the family to the unstarted state.
        let counter = Arc::new(AtomicUsize::new(0));
        poller.start(counting_tick(Arc::clone(&counter)));
        poller.stop();
        assert_eq!(poller.mark_activity(), ActivityOutcome::NeverStarted);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_the_timer() {
        let poller = Poller::new("test", Duration::from_secs(15), Duration::from_secs(300));
        let counter = Arc::new(AtomicUsize::new(0));
        poller.start(counting_tick(Arc::clone(&counter)));
        poller.stop();

        tokio::time::advance(Duration::from_secs(30)).await;
        tokio::task::yield_now().await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert!(!poller.is_running());
    }
}
