//! [`Scheduler`] over `window.setTimeout` / `setInterval`.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use dropfield::{Scheduler, TimerId};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{Performance, Window};

/// A registered JS timer and the closure it calls.
struct Armed<C> {
    handle: i32,
    repeating: bool,
    closure: C,
}

/// Owns timer closures for as long as JS may call them.
///
/// Fired timeouts and cleared timers are moved to `retired` and only freed on
/// the next [`sweep`](Self::sweep), so a closure is never dropped while it
/// may still be running.
struct TimerLedger<C> {
    armed: HashMap<TimerId, Armed<C>>,
    retired: Vec<C>,
}

impl<C> TimerLedger<C> {
    fn new() -> Self {
        Self {
            armed: HashMap::new(),
            retired: Vec::new(),
        }
    }

    fn insert(&mut self, id: TimerId, handle: i32, repeating: bool, closure: C) {
        self.armed.insert(id, Armed { handle, repeating, closure });
    }

    /// Retire a timer. Returns its JS handle and kind if it was armed.
    fn clear(&mut self, id: TimerId) -> Option<(i32, bool)> {
        let armed = self.armed.remove(&id)?;
        self.retired.push(armed.closure);
        Some((armed.handle, armed.repeating))
    }

    /// Free previously retired closures, then retire the fired timeouts.
    fn sweep(&mut self, fired: impl IntoIterator<Item = TimerId>) {
        self.retired.clear();
        for id in fired {
            if let Some(done) = self.armed.remove(&id) {
                self.retired.push(done.closure);
            }
        }
    }

    fn held(&self) -> usize {
        self.armed.len() + self.retired.len()
    }
}

pub struct BrowserScheduler {
    window: Window,
    performance: Option<Performance>,
    next_key: Cell<u64>,
    ledger: RefCell<TimerLedger<Closure<dyn FnMut()>>>,
    /// Timeouts whose callback has returned, pushed by the callback itself.
    fired: Rc<RefCell<Vec<TimerId>>>,
}

fn to_handle_ms(ms: f64) -> i32 {
    if ms.is_finite() && ms > 0.0 {
        ms.round().min(i32::MAX as f64) as i32
    } else {
        0
    }
}

impl BrowserScheduler {
    pub fn new(window: Window) -> Self {
        let performance = window.performance();
        Self {
            window,
            performance,
            next_key: Cell::new(1),
            ledger: RefCell::new(TimerLedger::new()),
            fired: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Number of timer closures still held, armed or awaiting release.
    pub fn held_closures(&self) -> usize {
        self.ledger.borrow().held()
    }

    fn allocate(&self) -> TimerId {
        let key = self.next_key.get();
        self.next_key.set(key + 1);
        TimerId(key)
    }

    fn sweep(&self) {
        let fired: Vec<TimerId> = self.fired.borrow_mut().drain(..).collect();
        self.ledger.borrow_mut().sweep(fired);
    }

    fn register(&self, id: TimerId, repeating: bool, closure: Closure<dyn FnMut()>, period_ms: f64) {
        let function = closure.as_ref().unchecked_ref();
        let handle = if repeating {
            self.window
                .set_interval_with_callback_and_timeout_and_arguments_0(function, to_handle_ms(period_ms))
        } else {
            self.window
                .set_timeout_with_callback_and_timeout_and_arguments_0(function, to_handle_ms(period_ms))
        };
        match handle {
            Ok(handle) => {
                self.ledger.borrow_mut().insert(id, handle, repeating, closure);
            }
            Err(err) => log::warn!("timer registration failed: {err:?}"),
        }
    }
}

impl Scheduler for BrowserScheduler {
    fn now(&self) -> f64 {
        match &self.performance {
            Some(performance) => performance.now(),
            None => js_sys::Date::now(),
        }
    }

    fn set_timeout(&self, delay_ms: f64, callback: Box<dyn FnOnce()>) -> TimerId {
        self.sweep();
        let id = self.allocate();
        let fired = Rc::clone(&self.fired);
        let closure = Closure::once(move || {
            callback();
            fired.borrow_mut().push(id);
        });
        self.register(id, false, closure, delay_ms);
        id
    }

    fn set_interval(&self, period_ms: f64, callback: Box<dyn FnMut()>) -> TimerId {
        self.sweep();
        let id = self.allocate();
        self.register(id, true, Closure::wrap(callback), period_ms);
        id
    }

    fn clear(&self, id: TimerId) {
        let cleared = self.ledger.borrow_mut().clear(id);
        match cleared {
            Some((handle, true)) => self.window.clear_interval_with_handle(handle),
            Some((handle, false)) => self.window.clear_timeout_with_handle(handle),
            None => {}
        }
    }
}
