//! Ambient decorations.
//!
//! [`DynamicInterval`] is a repeating task whose delay is recomputed before
//! every wait; [`EnvironmentSpawner`] feeds it a delay derived from the live
//! pdr so the field fills up faster as delivery improves.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::api::config::FieldConfig;
use crate::api::types::{ElementRole, SizeClass};
use crate::core::pdr::PdrReader;
use crate::core::scheduler::{Scheduler, SharedScheduler, TimerId};
use crate::systems::renderer::{Renderer, Surface};
use crate::systems::rng::{RandomSource, SharedRandom};

/// One decoration the field can spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    pub symbol: &'static str,
    pub size: SizeClass,
}

const fn normal(symbol: &'static str) -> CatalogEntry {
    CatalogEntry { symbol, size: SizeClass::Normal }
}

const fn small(symbol: &'static str) -> CatalogEntry {
    CatalogEntry { symbol, size: SizeClass::Small }
}

/// Selection is uniform over entries; repeats weight trees up.
pub const ENVIRONMENT_CATALOG: [CatalogEntry; 32] = [
    normal("🌲"),
    normal("🌲"),
    normal("🌲"),
    normal("🌳"),
    normal("🌳"),
    normal("🌳"),
    normal("🌴"),
    normal("🌵"),
    normal("🏠"),
    normal("🏡"),
    normal("🏘️"),
    normal("🏫"),
    normal("⛪"),
    normal("🏢"),
    normal("🏦"),
    small("🌿"),
    small("🍀"),
    small("🍁"),
    small("🍂"),
    small("🍃"),
    small("🌺"),
    small("🌻"),
    small("🌼"),
    small("🌷"),
    small("🌹"),
    small("🥀"),
    small("🌸"),
    small("💐"),
    small("🌾"),
    small("🌱"),
    small("🌰"),
    small("🍄"),
];

/// Delay before the next ambient spawn, in ms.
///
/// `unit` is a uniform draw in [0, 1). At pdr = 1 this is always the base
/// delay; at pdr = 0 it spreads over `[base, base + max)`.
pub fn spawn_delay(unit: f64, pdr: f64, config: &FieldConfig) -> f64 {
    unit * config.max_spawn_delay_ms * (1.0 - pdr) + config.base_spawn_delay_ms
}

struct LoopState {
    scheduler: SharedScheduler,
    active: Cell<bool>,
    pending: Cell<Option<TimerId>>,
    next_delay: Box<dyn Fn() -> f64>,
    callback: RefCell<Box<dyn FnMut()>>,
    cycles: Cell<u64>,
}

impl LoopState {
    fn wait(state: &Rc<LoopState>) {
        let delay = (state.next_delay)();
        let waiting = Rc::clone(state);
        let timer = state
            .scheduler
            .set_timeout(delay, Box::new(move || LoopState::wake(&waiting)));
        state.pending.set(Some(timer));
    }

    fn wake(state: &Rc<LoopState>) {
        state.pending.set(None);
        // Cancellation may have landed while we were waiting.
        if !state.active.get() {
            return;
        }
        (&mut *state.callback.borrow_mut())();
        state.cycles.set(state.cycles.get() + 1);
        if state.active.get() {
            LoopState::wait(state);
        }
    }
}

/// Repeating task with a per-cycle delay: wait `next_delay()`, check for
/// cancellation, run the callback, repeat. The delay getter is called fresh
/// at the start of every wait.
#[derive(Clone)]
pub struct DynamicInterval {
    state: Rc<LoopState>,
}

impl DynamicInterval {
    pub fn start(
        scheduler: SharedScheduler,
        next_delay: impl Fn() -> f64 + 'static,
        callback: impl FnMut() + 'static,
    ) -> Self {
        let state = Rc::new(LoopState {
            scheduler,
            active: Cell::new(true),
            pending: Cell::new(None),
            next_delay: Box::new(next_delay),
            callback: RefCell::new(Box::new(callback)),
            cycles: Cell::new(0),
        });
        LoopState::wait(&state);
        Self { state }
    }

    /// Stop the loop. A cycle already waiting will not run its callback;
    /// a callback already running is not interrupted.
    pub fn cancel(&self) {
        if !self.state.active.replace(false) {
            return;
        }
        if let Some(timer) = self.state.pending.take() {
            self.state.scheduler.clear(timer);
        }
        log::debug!("dynamic interval cancelled after {} cycles", self.state.cycles.get());
    }

    pub fn is_active(&self) -> bool {
        self.state.active.get()
    }

    /// Completed callback runs.
    pub fn cycles(&self) -> u64 {
        self.state.cycles.get()
    }
}

/// Spawns a random catalog decoration at a pdr-modulated rate.
pub struct EnvironmentSpawner;

impl EnvironmentSpawner {
    /// Start spawning. The returned handle cancels the loop.
    pub fn start<S: Surface + 'static>(
        scheduler: SharedScheduler,
        pdr: PdrReader,
        random: SharedRandom,
        renderer: Rc<Renderer<S>>,
        config: &FieldConfig,
    ) -> DynamicInterval {
        let delay_random = Rc::clone(&random);
        let delay_config = config.clone();
        DynamicInterval::start(
            scheduler,
            move || spawn_delay(delay_random.next_unit(), pdr.get(), &delay_config),
            move || {
                if let Some(idx) = random.pick_index(ENVIRONMENT_CATALOG.len()) {
                    let entry = ENVIRONMENT_CATALOG[idx];
                    renderer.display(entry.symbol, entry.size, ElementRole::Environment);
                }
            },
        )
    }
}
