//! Timer seam.
//!
//! Components never touch a clock directly; they ask a [`Scheduler`] for
//! one-shot timeouts and fixed-period intervals. The browser bridge maps this
//! onto `setTimeout` / `setInterval`; [`VirtualScheduler`] is a deterministic
//! in-memory clock for tests and headless runs.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

/// Handle for a scheduled timeout or interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

/// Cooperative timer facility. All callbacks run on the scheduler's thread,
/// one at a time, to completion.
pub trait Scheduler {
    /// Current time in milliseconds.
    fn now(&self) -> f64;

    /// Run `callback` once after `delay_ms`.
    fn set_timeout(&self, delay_ms: f64, callback: Box<dyn FnOnce()>) -> TimerId;

    /// Run `callback` every `period_ms` until cleared.
    fn set_interval(&self, period_ms: f64, callback: Box<dyn FnMut()>) -> TimerId;

    /// Cancel a timeout or interval. Unknown or already-fired ids are ignored.
    fn clear(&self, id: TimerId);
}

pub type SharedScheduler = Rc<dyn Scheduler>;

enum Task {
    Once(Box<dyn FnOnce()>),
    Repeat {
        period_us: u64,
        callback: Box<dyn FnMut()>,
    },
}

struct Entry {
    key: (u64, u64),
    task: Task,
}

#[derive(Default)]
struct VirtualInner {
    now_us: u64,
    next_id: u64,
    next_seq: u64,
    entries: HashMap<TimerId, Entry>,
    due: BTreeMap<(u64, u64), TimerId>,
    /// Interval whose callback is currently executing (taken out of `entries`).
    running: Option<TimerId>,
    running_cleared: bool,
}

impl VirtualInner {
    fn arm(&mut self, id: TimerId, due_us: u64, task: Task) {
        let key = (due_us, self.next_seq);
        self.next_seq += 1;
        self.due.insert(key, id);
        self.entries.insert(id, Entry { key, task });
    }

    fn allocate(&mut self) -> TimerId {
        self.next_id += 1;
        TimerId(self.next_id)
    }

    /// Pop the earliest entry due at or before `target_us`, advancing the clock to it.
    fn pop_due(&mut self, target_us: u64) -> Option<(TimerId, Task)> {
        let (&key, &id) = self.due.iter().next()?;
        if key.0 > target_us {
            return None;
        }
        self.due.remove(&key);
        self.now_us = key.0;
        let entry = self.entries.remove(&id)?;
        Some((id, entry.task))
    }
}

/// Deterministic scheduler driven by [`advance`](VirtualScheduler::advance).
///
/// Timers fire in due-time order, ties broken by registration order. Timers
/// armed or cleared from inside a callback take effect within the same
/// `advance` call.
#[derive(Default)]
pub struct VirtualScheduler {
    inner: RefCell<VirtualInner>,
}

fn to_us(ms: f64) -> u64 {
    if ms.is_finite() && ms > 0.0 {
        (ms * 1000.0).round() as u64
    } else {
        0
    }
}

impl VirtualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Rc<Self> {
        Rc::new(Self::new())
    }

    /// Move the clock forward by `ms`, firing everything that falls due.
    /// Returns the number of callbacks run.
    pub fn advance(&self, ms: f64) -> usize {
        let target_us = self.inner.borrow().now_us + to_us(ms);
        let mut fired = 0;
        loop {
            let next = self.inner.borrow_mut().pop_due(target_us);
            let Some((id, task)) = next else {
                break;
            };
            fired += 1;
            match task {
                Task::Once(callback) => callback(),
                Task::Repeat { period_us, mut callback } => {
                    {
                        let mut inner = self.inner.borrow_mut();
                        inner.running = Some(id);
                        inner.running_cleared = false;
                    }
                    callback();
                    let mut inner = self.inner.borrow_mut();
                    inner.running = None;
                    if !inner.running_cleared {
                        let due_us = inner.now_us + period_us;
                        inner.arm(id, due_us, Task::Repeat { period_us, callback });
                    }
                }
            }
        }
        self.inner.borrow_mut().now_us = target_us;
        fired
    }

    /// Number of armed timeouts and intervals.
    pub fn pending(&self) -> usize {
        self.inner.borrow().entries.len()
    }
}

impl Scheduler for VirtualScheduler {
    fn now(&self) -> f64 {
        self.inner.borrow().now_us as f64 / 1000.0
    }

    fn set_timeout(&self, delay_ms: f64, callback: Box<dyn FnOnce()>) -> TimerId {
        let mut inner = self.inner.borrow_mut();
        let id = inner.allocate();
        let due_us = inner.now_us + to_us(delay_ms);
        inner.arm(id, due_us, Task::Once(callback));
        id
    }

    fn set_interval(&self, period_ms: f64, callback: Box<dyn FnMut()>) -> TimerId {
        let mut inner = self.inner.borrow_mut();
        let id = inner.allocate();
        // A zero period would never let the clock move.
        let period_us = to_us(period_ms).max(1);
        let due_us = inner.now_us + period_us;
        inner.arm(id, due_us, Task::Repeat { period_us, callback });
        id
    }

    fn clear(&self, id: TimerId) {
        let mut inner = self.inner.borrow_mut();
        if let Some(entry) = inner.entries.remove(&id) {
            inner.due.remove(&entry.key);
        } else if inner.running == Some(id) {
            inner.running_cleared = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn counter() -> (Rc<Cell<u32>>, Rc<Cell<u32>>) {
        let c = Rc::new(Cell::new(0));
        (Rc::clone(&c), c)
    }

    #[test]
    fn timeout_fires_once_when_due() {
        let sched = VirtualScheduler::new();
        let (hits, h) = counter();
        sched.set_timeout(100.0, Box::new(move || h.set(h.get() + 1)));
        assert_eq!(sched.advance(99.0), 0);
        assert_eq!(sched.advance(1.0), 1);
        assert_eq!(sched.advance(1000.0), 0);
        assert_eq!(hits.get(), 1);
        assert_eq!(sched.now(), 1100.0);
    }

    #[test]
    fn interval_repeats_until_cleared() {
        let sched = VirtualScheduler::new();
        let (hits, h) = counter();
        let id = sched.set_interval(200.0, Box::new(move || h.set(h.get() + 1)));
        sched.advance(1000.0);
        assert_eq!(hits.get(), 5);
        sched.clear(id);
        sched.advance(1000.0);
        assert_eq!(hits.get(), 5);
        assert_eq!(sched.pending(), 0);
    }

    #[test]
    fn interval_can_clear_itself() {
        let sched = Rc::new(VirtualScheduler::new());
        let (hits, h) = counter();
        let id_slot: Rc<Cell<Option<TimerId>>> = Rc::new(Cell::new(None));
        let slot = Rc::clone(&id_slot);
        let s = Rc::clone(&sched);
        let id = sched.set_interval(
            10.0,
            Box::new(move || {
                h.set(h.get() + 1);
                if h.get() == 3 {
                    if let Some(id) = slot.get() {
                        s.clear(id);
                    }
                }
            }),
        );
        id_slot.set(Some(id));
        sched.advance(100.0);
        assert_eq!(hits.get(), 3);
    }

    #[test]
    fn ties_fire_in_registration_order() {
        let sched = VirtualScheduler::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        for n in 0..3 {
            let o = Rc::clone(&order);
            sched.set_timeout(50.0, Box::new(move || o.borrow_mut().push(n)));
        }
        sched.advance(50.0);
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn timeout_armed_inside_callback_fires_in_same_advance() {
        let sched = Rc::new(VirtualScheduler::new());
        let (hits, h) = counter();
        let s = Rc::clone(&sched);
        sched.set_timeout(
            10.0,
            Box::new(move || {
                let h = Rc::clone(&h);
                s.set_timeout(10.0, Box::new(move || h.set(h.get() + 1)));
            }),
        );
        sched.advance(25.0);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn clearing_unknown_id_is_noop() {
        let sched = VirtualScheduler::new();
        sched.clear(TimerId(99));
        let id = sched.set_timeout(1.0, Box::new(|| {}));
        sched.advance(5.0);
        sched.clear(id);
        assert_eq!(sched.pending(), 0);
    }
}
