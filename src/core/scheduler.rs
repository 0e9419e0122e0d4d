use futures::future::join_all;
use log::{debug, info, warn};
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FirstTick {
    /// First round one full interval after start, like a plain ticker.
    #[default]
    AfterInterval,
    Immediate,
}

/// Owns the repeating capture timer.
pub struct Scheduler;

/// Handle to a running scheduler. `Running` until the shutdown token fires.
pub struct SchedulerHandle {
    timer: JoinHandle<Vec<JoinHandle<()>>>,
    shutdown: CancellationToken,
    ticks: Arc<AtomicU64>,
    in_flight: Arc<AtomicUsize>,
}

/// Counts a round as in flight until dropped, so a panicking round is released too.
struct InFlightGuard(Arc<AtomicUsize>);

impl InFlightGuard {
    /// Returns the guard and how many rounds were already running.
    fn enter(counter: &Arc<AtomicUsize>) -> (Self, usize) {
        let previous = counter.fetch_add(1, Ordering::SeqCst);
        (InFlightGuard(Arc::clone(counter)), previous)
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Scheduler {
    /// Starts the timer loop on the current runtime and returns immediately.
    ///
    /// Every tick spawns `on_tick()` as its own task. Ticks are wall-clock
    /// scheduled: a round that outlasts `interval` is not waited for, so the
    /// next one can overlap it. That case is logged as a warning.
    pub fn start<F, Fut>(
        interval: Duration,
        first_tick: FirstTick,
        shutdown: CancellationToken,
        on_tick: F,
    ) -> SchedulerHandle
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let ticks = Arc::new(AtomicU64::new(0));
        let loop_ticks = Arc::clone(&ticks);
        let loop_shutdown = shutdown.clone();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let loop_in_flight = Arc::clone(&in_flight);

        let timer = tokio::spawn(async move {
            let start = match first_tick {
                FirstTick::Immediate => Instant::now(),
                FirstTick::AfterInterval => Instant::now() + interval,
            };
            let mut ticker = interval_at(start, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut rounds: Vec<JoinHandle<()>> = Vec::new();

            info!("⏱️ Scheduler running every {:?} (first tick: {:?})", interval, first_tick);
            loop {
                tokio::select! {
                    biased;
                    _ = loop_shutdown.cancelled() => {
                        info!("🛑 Scheduler stopping after {} tick(s)", loop_ticks.load(Ordering::SeqCst));
                        break;
                    }
                    _ = ticker.tick() => {
                        let tick_no = loop_ticks.fetch_add(1, Ordering::SeqCst) + 1;
                        let (guard, overlapping) = InFlightGuard::enter(&loop_in_flight);
                        if overlapping > 0 {
                            warn!(
                                tick = tick_no, in_flight = overlapping;
                                "⚠️ Previous capture round still running; starting an overlapping round"
                            );
                        } else {
                            debug!("Tick {}", tick_no);
                        }

                        let round = on_tick();
                        rounds.retain(|handle| !handle.is_finished());
                        rounds.push(tokio::spawn(async move {
                            let _guard = guard;
                            round.await;
                        }));
                    }
                }
            }
            rounds
        });

        SchedulerHandle { timer, shutdown, ticks, in_flight }
    }
}

impl SchedulerHandle {
    pub fn is_running(&self) -> bool {
        !self.shutdown.is_cancelled() && !self.timer.is_finished()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    pub fn rounds_in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    /// Waits for the timer loop to exit, then for any rounds still in flight.
    pub async fn join(self) {
        match self.timer.await {
            Ok(rounds) => {
                if !rounds.is_empty() {
                    debug!("Waiting for {} in-flight round(s)", rounds.len());
                }
                for result in join_all(rounds).await {
                    if let Err(e) = result {
                        warn!("Capture round task ended abnormally: {}", e);
                    }
                }
            }
            Err(e) => warn!("Scheduler task ended abnormally: {}", e),
        }
    }
}
