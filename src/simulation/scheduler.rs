//! Virtual clock and the wake-up queue of the device cycles.
//!
//! Time only moves when the next wake-up is taken from the queue; nothing
//! here is tied to wall-clock time.

use std::collections::{BTreeMap, VecDeque};
use std::ops::Add;
use std::time::Duration;

/// Virtual ticks per second. One tick is one microsecond.
pub const TICK_HZ: u64 = 1_000_000;

/// Point on the virtual timeline, counted in ticks from the start of the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VirtualInstant(u64);

impl VirtualInstant {
    pub fn from_millis(millis: u64) -> Self {
        Self(millis.saturating_mul(TICK_HZ / 1000))
    }

    pub fn as_millis_f64(self) -> f64 {
        self.0 as f64 * 1000.0 / TICK_HZ as f64
    }
}

impl Add<Duration> for VirtualInstant {
    type Output = VirtualInstant;

    fn add(self, rhs: Duration) -> VirtualInstant {
        let ticks = (rhs.as_nanos() * TICK_HZ as u128 / 1_000_000_000u128).min(u64::MAX as u128) as u64;
        VirtualInstant(self.0.saturating_add(ticks))
    }
}

/// Point of a device cycle at which it is resumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    /// Waiting time is over, the device starts transmitting.
    Send,
    /// Airtime is over, the attempt is evaluated.
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WakeUp {
    pub device_index: usize,
    pub phase: CyclePhase,
}

/// Virtual clock plus the queue of pending resumptions.
///
/// Wake-ups for the same instant are handed out in the order they were
/// scheduled, so a run is fully determined by its seed.
#[derive(Debug, Default)]
pub struct Scheduler {
    now: VirtualInstant,
    // Map of virtual timestamp -> wake-ups in scheduling order
    queue: BTreeMap<VirtualInstant, VecDeque<WakeUp>>,
    pending: usize,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> VirtualInstant {
        self.now
    }

    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Queue a resumption at `at`. Targets in the past are due now.
    pub fn schedule_wake(&mut self, at: VirtualInstant, wake: WakeUp) {
        let at = at.max(self.now);
        self.queue.entry(at).or_default().push_back(wake);
        self.pending += 1;
    }

    pub fn schedule_after(&mut self, delay: Duration, wake: WakeUp) {
        let at = self.now + delay;
        self.schedule_wake(at, wake);
    }

    /// Pop the earliest wake-up strictly before `until` and advance the clock
    /// to it. Returns `None` once nothing is due before the deadline; pending
    /// wake-ups are then left untouched.
    pub fn next_before(&mut self, until: VirtualInstant) -> Option<WakeUp> {
        let mut entry = self.queue.first_entry()?;
        let at = *entry.key();
        if at >= until {
            return None;
        }
        let wake = entry.get_mut().pop_front();
        if entry.get().is_empty() {
            entry.remove();
        }
        let wake = wake?;
        self.now = at;
        self.pending -= 1;
        Some(wake)
    }
}
