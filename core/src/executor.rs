//! Tick executor: the host side of the scheduler.
//!
//! HEARTBEAT ORDER (once per tick):
//!   1. Take every task due at or before this tick, ordered by
//!      (due tick, submission sequence).
//!   2. Skip cancelled tasks.
//!   3. Main-lane tasks run inline, one after another.
//!   4. Background-lane tasks are spawned on the worker pool.
//!   5. Repeating tasks are re-queued at `tick + period`.
//!
//! RULES:
//!   - The queue lock is never held while an action runs.
//!   - Tasks submitted during a heartbeat run no earlier than the next one.
//!   - Tasks taken for the running heartbeat stay reachable for owner
//!     cancellation until they have been settled.
//!   - A failed action is logged, never retried.

use crate::{
    config::ExecutorConfig,
    error::{HookResult, ToolkitError, ToolkitResult},
    scheduler::{HostExecutor, Lane, ScheduledTask, TaskAction, TaskHandle, TaskId},
    sync::lock,
    types::Tick,
};
use serde::Serialize;
use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

struct PendingTask {
    handle: TaskHandle,
    period: Option<Tick>,
    lane:   Lane,
    /// Shared so overlapping background runs of one series serialize.
    action: Arc<Mutex<TaskAction>>,
}

#[derive(Default)]
struct QueueState {
    current_tick: Tick,
    next_id:      u64,
    next_seq:     u64,
    queue:        BTreeMap<(Tick, u64), PendingTask>,
    /// Handles of the batch the current heartbeat has not settled yet.
    in_flight:    BTreeMap<TaskId, TaskHandle>,
}

impl QueueState {
    fn enqueue(&mut self, due: Tick, task: PendingTask) {
        self.next_seq += 1;
        self.queue.insert((due, self.next_seq), task);
    }
}

/// What one heartbeat did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HeartbeatReport {
    pub tick:       Tick,
    pub ran:        usize,
    pub dispatched: usize,
    pub failed:     usize,
    pub skipped:    usize,
}

pub struct TickExecutor {
    state:                     Mutex<QueueState>,
    pool:                      rayon::ThreadPool,
    cancel_repeating_on_error: bool,
    background_failures:       Arc<AtomicUsize>,
}

impl TickExecutor {
    pub fn new(config: &ExecutorConfig) -> ToolkitResult<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.background_threads)
            .thread_name(|i| format!("menukit-background-{i}"))
            .build()
            .map_err(|e| ToolkitError::Other(anyhow::anyhow!("background pool: {e}")))?;
        Ok(Self {
            state: Mutex::new(QueueState::default()),
            pool,
            cancel_repeating_on_error: config.cancel_repeating_on_error,
            background_failures: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Run everything due at `tick`. Ticks must be strictly increasing.
    pub fn heartbeat(&self, tick: Tick) -> HeartbeatReport {
        let due = {
            let mut state = lock(&self.state);
            debug_assert!(tick > state.current_tick || tick == 0, "heartbeat went backwards");
            state.current_tick = tick;
            let later = state.queue.split_off(&(tick + 1, 0));
            let due = std::mem::replace(&mut state.queue, later);
            state.in_flight = due
                .values()
                .map(|task| (task.handle.id(), task.handle.clone()))
                .collect();
            due
        };

        let mut report = HeartbeatReport { tick, ..HeartbeatReport::default() };
        for (_, task) in due {
            if task.handle.is_cancelled() {
                report.skipped += 1;
                lock(&self.state).in_flight.remove(&task.handle.id());
                continue;
            }
            match task.lane {
                Lane::Main => {
                    report.ran += 1;
                    let result = run_action(&task.action, &task.handle);
                    if !self.settle(&task.handle, task.period.is_some(), result) {
                        report.failed += 1;
                    }
                }
                Lane::Background => {
                    report.dispatched += 1;
                    self.spawn_background(&task);
                }
            }
            // Checked under the lock so an owner cancel cannot slip in between.
            let mut state = lock(&self.state);
            state.in_flight.remove(&task.handle.id());
            if let Some(period) = task.period {
                if !task.handle.is_cancelled() {
                    state.enqueue(tick + period, task);
                }
            }
        }

        if report.ran + report.dispatched > 0 {
            log::trace!(
                "tick={tick} executor: ran={} dispatched={} failed={}",
                report.ran,
                report.dispatched,
                report.failed
            );
        }
        report
    }

    pub fn pending_count(&self) -> usize {
        lock(&self.state)
            .queue
            .values()
            .filter(|t| !t.handle.is_cancelled())
            .count()
    }

    /// Background actions that have failed so far.
    pub fn background_failures(&self) -> usize {
        self.background_failures.load(Ordering::SeqCst)
    }

    /// Cancel and drop every pending task.
    pub fn shutdown(&self) -> usize {
        let mut state = lock(&self.state);
        let drained = std::mem::take(&mut state.queue);
        for task in drained.values() {
            task.handle.cancel();
        }
        let in_flight = cancel_in_flight(&mut state, |_| true);
        let cancelled = drained.len() + in_flight;
        log::info!("Executor shut down, {cancelled} pending tasks cancelled");
        cancelled
    }

    fn spawn_background(&self, task: &PendingTask) {
        let action = Arc::clone(&task.action);
        let handle = task.handle.clone();
        let repeating = task.period.is_some();
        let cancel_on_error = self.cancel_repeating_on_error;
        let failures = Arc::clone(&self.background_failures);
        self.pool.spawn(move || {
            if handle.is_cancelled() {
                return;
            }
            if let Err(e) = run_action(&action, &handle) {
                failures.fetch_add(1, Ordering::SeqCst);
                log::error!("background task {:?} ({}) failed: {e:#}", handle.id(), handle.owner());
                if repeating && cancel_on_error {
                    handle.cancel();
                }
            }
        });
    }

    /// Log a main-lane outcome and apply the error policy. Returns true on success.
    fn settle(&self, handle: &TaskHandle, repeating: bool, result: HookResult) -> bool {
        let Err(e) = result else {
            return true;
        };
        log::error!("task {:?} ({}) failed: {e:#}", handle.id(), handle.owner());
        if repeating && self.cancel_repeating_on_error {
            log::warn!("cancelling repeating task {:?} after failure", handle.id());
            handle.cancel();
        }
        false
    }
}

/// Flag every in-flight handle `select` picks that is not cancelled yet.
fn cancel_in_flight(state: &mut QueueState, select: impl Fn(&TaskHandle) -> bool) -> usize {
    let mut cancelled = 0;
    for handle in state.in_flight.values().filter(|h| select(h) && !h.is_cancelled()) {
        handle.cancel();
        cancelled += 1;
    }
    cancelled
}

fn run_action(action: &Mutex<TaskAction>, handle: &TaskHandle) -> HookResult {
    let mut action = lock(action);
    (*action)(handle)
}

impl HostExecutor for TickExecutor {
    fn submit(&self, task: ScheduledTask) -> TaskHandle {
        let mut state = lock(&self.state);
        state.next_id += 1;
        let handle = TaskHandle::new(TaskId(state.next_id), task.owner);
        let due = state.current_tick + task.delay;
        state.enqueue(due, PendingTask {
            handle: handle.clone(),
            period: task.period,
            lane: task.lane,
            action: Arc::new(Mutex::new(task.action)),
        });
        handle
    }

    fn current_tick(&self) -> Tick {
        lock(&self.state).current_tick
    }

    fn cancel_owner(&self, owner: &str) -> usize {
        let mut state = lock(&self.state);
        let before = state.queue.len();
        state.queue.retain(|_, task| {
            if task.handle.owner() == owner {
                task.handle.cancel();
                false
            } else {
                true
            }
        });
        let queued = before - state.queue.len();
        queued + cancel_in_flight(&mut state, |handle| handle.owner() == owner)
    }
}
