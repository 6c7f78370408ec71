/*!
Timers for admission windows and round deadlines (C4).

Grounded in `original_source/src/Utils/Timer.{hpp,cpp}`: callbacks are queued with a due
time and an optional repeat period, and the whole facility can run under a virtual clock
(driven explicitly by tests, see [`crate::testing::VirtualClock`]) or real wall-clock time.
Cancellation is by id, so a round that stops mid-flight can cancel every timer it owns
without tracking them by any other key.
*/

use std::collections::BinaryHeap;
use std::cmp::Ordering;

/// Opaque handle to a scheduled timer, used only to cancel it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

struct ScheduledEvent<F> {
    due_ms: u64,
    id: TimerId,
    period_ms: Option<u64>,
    callback: F,
}

impl<F> PartialEq for ScheduledEvent<F> {
    fn eq(&self, other: &Self) -> bool {
        self.due_ms == other.due_ms && self.id == other.id
    }
}
impl<F> Eq for ScheduledEvent<F> {}
impl<F> PartialOrd for ScheduledEvent<F> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl<F> Ord for ScheduledEvent<F> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so `BinaryHeap` (a max-heap) pops the earliest-due event first.
        other.due_ms.cmp(&self.due_ms).then_with(|| other.id.cmp(&self.id))
    }
}

/// A queue of pending timer callbacks, driven by an explicit `now_ms` rather than by
/// blocking on a real clock; `round_base` advances it from either a real clock tick or
/// [`crate::testing::VirtualClock`].
pub struct Timer<F> {
    events: BinaryHeap<ScheduledEvent<F>>,
    cancelled: std::collections::BTreeSet<TimerId>,
    next_id: u64,
}

impl<F> Default for Timer<F> {
    fn default() -> Self {
        Self {
            events: BinaryHeap::new(),
            cancelled: std::collections::BTreeSet::new(),
            next_id: 0,
        }
    }
}

impl<F> Timer<F> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules a one-shot callback due at `due_ms`.
    pub fn queue_callback(&mut self, due_ms: u64, callback: F) -> TimerId {
        let id = self.fresh_id();
        self.events.push(ScheduledEvent {
            due_ms,
            id,
            period_ms: None,
            callback,
        });
        id
    }

    /// Schedules a callback due at `due_ms` that reschedules itself every `period_ms` after
    /// firing, until cancelled.
    pub fn queue_periodic(&mut self, due_ms: u64, period_ms: u64, callback: F) -> TimerId
    where
        F: Clone,
    {
        let id = self.fresh_id();
        self.events.push(ScheduledEvent {
            due_ms,
            id,
            period_ms: Some(period_ms),
            callback,
        });
        id
    }

    pub fn cancel(&mut self, id: TimerId) {
        self.cancelled.insert(id);
    }

    fn fresh_id(&mut self) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Pops and returns every callback now due at or before `now_ms`, rescheduling periodic
    /// ones for their next occurrence.
    pub fn drain_due(&mut self, now_ms: u64) -> Vec<F>
    where
        F: Clone,
    {
        let mut fired = Vec::new();
        while let Some(event) = self.events.peek() {
            if event.due_ms > now_ms {
                break;
            }
            let event = self.events.pop().expect("just peeked");
            if self.cancelled.remove(&event.id) {
                continue;
            }
            if let Some(period) = event.period_ms {
                self.events.push(ScheduledEvent {
                    due_ms: event.due_ms + period,
                    id: event.id,
                    period_ms: Some(period),
                    callback: event.callback.clone(),
                });
            }
            fired.push(event.callback);
        }
        fired
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_in_due_order() {
        let mut timer: Timer<&'static str> = Timer::new();
        timer.queue_callback(100, "second");
        timer.queue_callback(50, "first");
        let fired = timer.drain_due(75);
        assert_eq!(fired, vec!["first"]);
        let fired = timer.drain_due(150);
        assert_eq!(fired, vec!["second"]);
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let mut timer: Timer<&'static str> = Timer::new();
        let id = timer.queue_callback(10, "cancel-me");
        timer.cancel(id);
        assert!(timer.drain_due(100).is_empty());
    }

    #[test]
    fn periodic_timer_reschedules() {
        let mut timer: Timer<&'static str> = Timer::new();
        timer.queue_periodic(10, 10, "tick");
        assert_eq!(timer.drain_due(10), vec!["tick"]);
        assert!(timer.drain_due(15).is_empty());
        assert_eq!(timer.drain_due(20), vec!["tick"]);
    }
}
