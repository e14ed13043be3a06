//! Task scheduling on the main lane or the background lane.
//!
//! Delays and periods are given in any `TimeUnit` and converted to ticks
//! before they reach the host executor. A period that converts to zero
//! ticks means "run once". Every call returns immediately with a handle.

use crate::{
    error::HookResult,
    time_unit::TimeUnit,
    types::{OwnerName, Tick},
};
use serde::{Deserialize, Serialize};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lane {
    /// Serial, on the tick thread, in submission order.
    Main,
    /// Handed to a worker pool at the tick boundary.
    Background,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(pub u64);

/// Cancellation handle for one scheduled task. Cheap to clone;
/// all clones share the same flag.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    id:        TaskId,
    owner:     OwnerName,
    cancelled: Arc<AtomicBool>,
}

impl TaskHandle {
    pub fn new(id: TaskId, owner: impl Into<OwnerName>) -> Self {
        Self { id, owner: owner.into(), cancelled: Arc::new(AtomicBool::new(false)) }
    }

    pub fn id(&self) -> TaskId { self.id }
    pub fn owner(&self) -> &str { &self.owner }

    /// Prevent the next run, or every later run of a repeating task.
    /// No-op once a one-shot task has run.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// The work itself. Receives its own handle so it can cancel itself.
pub type TaskAction = Box<dyn FnMut(&TaskHandle) -> HookResult + Send>;

/// A unit of work as handed to the host executor, already in ticks.
pub struct ScheduledTask {
    pub owner:  OwnerName,
    pub delay:  Tick,
    /// `None` for one-shot tasks.
    pub period: Option<Tick>,
    pub lane:   Lane,
    pub action: TaskAction,
}

/// What the host provides to run scheduled work.
pub trait HostExecutor: Send + Sync {
    fn submit(&self, task: ScheduledTask) -> TaskHandle;

    /// The last tick the executor has run.
    fn current_tick(&self) -> Tick;

    /// Cancel every pending task attributed to `owner`. Returns how many.
    fn cancel_owner(&self, owner: &str) -> usize;
}

/// Front end callers schedule through. Attributes every task to one owner.
#[derive(Clone)]
pub struct Scheduler {
    owner:    OwnerName,
    executor: Arc<dyn HostExecutor>,
}

impl Scheduler {
    pub fn new(owner: impl Into<OwnerName>, executor: Arc<dyn HostExecutor>) -> Self {
        Self { owner: owner.into(), executor }
    }

    pub fn owner(&self) -> &str { &self.owner }

    pub fn current_tick(&self) -> Tick {
        self.executor.current_tick()
    }

    /// Run at the next tick boundary.
    pub fn run_now<F>(&self, lane: Lane, action: F) -> TaskHandle
    where
        F: FnMut(&TaskHandle) -> HookResult + Send + 'static,
    {
        self.submit(0, None, lane, Box::new(action))
    }

    pub fn run_delayed<F>(&self, delay: u64, unit: TimeUnit, lane: Lane, action: F) -> TaskHandle
    where
        F: FnMut(&TaskHandle) -> HookResult + Send + 'static,
    {
        self.submit(unit.to_ticks(delay), None, lane, Box::new(action))
    }

    pub fn run_repeating<F>(
        &self,
        delay: u64,
        period: u64,
        unit: TimeUnit,
        lane: Lane,
        action: F,
    ) -> TaskHandle
    where
        F: FnMut(&TaskHandle) -> HookResult + Send + 'static,
    {
        let period = Some(unit.to_ticks(period)).filter(|&ticks| ticks > 0);
        self.submit(unit.to_ticks(delay), period, lane, Box::new(action))
    }

    pub fn sync<F>(&self, action: F) -> TaskHandle
    where
        F: FnMut(&TaskHandle) -> HookResult + Send + 'static,
    {
        self.run_now(Lane::Main, action)
    }

    pub fn run_async<F>(&self, action: F) -> TaskHandle
    where
        F: FnMut(&TaskHandle) -> HookResult + Send + 'static,
    {
        self.run_now(Lane::Background, action)
    }

    pub fn delay_ticks<F>(&self, ticks: Tick, action: F) -> TaskHandle
    where
        F: FnMut(&TaskHandle) -> HookResult + Send + 'static,
    {
        self.run_delayed(ticks, TimeUnit::Ticks, Lane::Main, action)
    }

    /// Repeat every `period` ticks, first run after one period.
    pub fn repeat_ticks<F>(&self, period: Tick, action: F) -> TaskHandle
    where
        F: FnMut(&TaskHandle) -> HookResult + Send + 'static,
    {
        self.run_repeating(period, period, TimeUnit::Ticks, Lane::Main, action)
    }

    /// Cancel every pending task this scheduler's owner submitted.
    pub fn cancel_all(&self) -> usize {
        self.executor.cancel_owner(&self.owner)
    }

    fn submit(&self, delay: Tick, period: Option<Tick>, lane: Lane, action: TaskAction) -> TaskHandle {
        let handle = self.executor.submit(ScheduledTask {
            owner: self.owner.clone(),
            delay,
            period,
            lane,
            action,
        });
        log::trace!(
            "{} scheduled task {:?} on {lane:?}: delay={delay} period={period:?}",
            self.owner,
            handle.id()
        );
        handle
    }
}
