use std::cell::Cell;
use std::rc::Rc;

use crate::api::config::FieldConfig;
use crate::api::types::{ElementRole, SizeClass};
use crate::core::queue::SharedDropQueue;
use crate::core::scheduler::{Scheduler, SharedScheduler, TimerId};
use crate::systems::renderer::{Renderer, Surface};

/// Lifecycle of the drop consumer. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Running,
    Stopped,
}

struct ConsumerInner {
    scheduler: SharedScheduler,
    timer: Cell<Option<TimerId>>,
    state: Cell<ConsumerState>,
    rendered: Cell<u64>,
}

/// Fixed-cadence task that renders at most one queued drop per tick.
///
/// Cloning yields another handle to the same consumer, so the connection can
/// halt it while the session keeps its own handle.
#[derive(Clone)]
pub struct DropConsumer {
    inner: Rc<ConsumerInner>,
}

impl DropConsumer {
    /// Start ticking every `config.drop_period_ms`. Running from the first call.
    pub fn start<S: Surface + 'static>(
        scheduler: SharedScheduler,
        queue: SharedDropQueue,
        renderer: Rc<Renderer<S>>,
        config: &FieldConfig,
    ) -> Self {
        let inner = Rc::new(ConsumerInner {
            scheduler: Rc::clone(&scheduler),
            timer: Cell::new(None),
            state: Cell::new(ConsumerState::Running),
            rendered: Cell::new(0),
        });

        let drop_symbol = config.drop_symbol.clone();
        let explosion_symbol = config.explosion_symbol.clone();
        // Weak so a stopped consumer's interval closure doesn't keep it alive.
        let handle = Rc::downgrade(&inner);
        let timer = scheduler.set_interval(
            config.drop_period_ms,
            Box::new(move || {
                let Some(inner) = handle.upgrade() else {
                    return;
                };
                if inner.state.get() != ConsumerState::Running {
                    return;
                }
                let next = queue.borrow_mut().dequeue_one();
                if let Some(drop) = next {
                    let symbol = if drop.exploded { &explosion_symbol } else { &drop_symbol };
                    renderer.display(symbol, SizeClass::Normal, ElementRole::Drop);
                    inner.rendered.set(inner.rendered.get() + 1);
                }
            }),
        );
        inner.timer.set(Some(timer));

        Self { inner }
    }

    /// Halt the consumer and cancel its tick. Returns `true` if this call
    /// performed the transition.
    pub fn stop(&self) -> bool {
        if self.inner.state.get() == ConsumerState::Stopped {
            return false;
        }
        self.inner.state.set(ConsumerState::Stopped);
        if let Some(timer) = self.inner.timer.take() {
            self.inner.scheduler.clear(timer);
        }
        log::info!("drop consumer halted after {} drops", self.inner.rendered.get());
        true
    }

    pub fn state(&self) -> ConsumerState {
        self.inner.state.get()
    }

    pub fn is_running(&self) -> bool {
        self.state() == ConsumerState::Running
    }

    /// Drops rendered so far.
    pub fn rendered(&self) -> u64 {
        self.inner.rendered.get()
    }
}

impl std::fmt::Debug for DropConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DropConsumer")
            .field("state", &self.state())
            .field("rendered", &self.rendered())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::DropEvent;
    use crate::core::queue::DropQueue;
    use crate::core::scheduler::VirtualScheduler;
    use crate::systems::renderer::MemorySurface;
    use crate::systems::rng::Xorshift;

    struct Rig {
        sched: Rc<VirtualScheduler>,
        queue: SharedDropQueue,
        surface: Rc<MemorySurface>,
        consumer: DropConsumer,
    }

    fn rig() -> Rig {
        let sched = VirtualScheduler::shared();
        let queue = DropQueue::shared();
        let surface = Rc::new(MemorySurface::new());
        let config = FieldConfig::default();
        let renderer = Rc::new(Renderer::new(
            Rc::clone(&surface),
            sched.clone(),
            Rc::new(Xorshift::new(1)),
            config.display_duration_ms,
        ));
        let consumer = DropConsumer::start(sched.clone(), Rc::clone(&queue), renderer, &config);
        Rig { sched, queue, surface, consumer }
    }

    #[test]
    fn one_drop_per_tick() {
        let rig = rig();
        rig.queue.borrow_mut().enqueue_many([DropEvent::normal(); 3]);
        rig.sched.advance(199.0);
        assert_eq!(rig.surface.records().len(), 0);
        rig.sched.advance(1.0);
        assert_eq!(rig.surface.records().len(), 1);
        assert_eq!(rig.queue.borrow().len(), 2);
        rig.sched.advance(400.0);
        assert_eq!(rig.surface.records().len(), 3);
        assert_eq!(rig.consumer.rendered(), 3);
    }

    #[test]
    fn empty_tick_is_noop() {
        let rig = rig();
        rig.sched.advance(1000.0);
        assert!(rig.surface.records().is_empty());
        assert!(rig.consumer.is_running());
    }

    #[test]
    fn glyph_follows_exploded_flag() {
        let rig = rig();
        rig.queue
            .borrow_mut()
            .enqueue_many([DropEvent::exploded(), DropEvent::normal()]);
        rig.sched.advance(400.0);
        assert_eq!(rig.surface.symbols(), vec!["💥", "🥯"]);
        let records = rig.surface.records();
        assert!(records.iter().all(|r| r.element.role == ElementRole::Drop));
        assert!(records.iter().all(|r| r.element.size == SizeClass::Normal));
    }

    #[test]
    fn stopped_consumer_never_dequeues_again() {
        let rig = rig();
        rig.queue.borrow_mut().enqueue_many([DropEvent::normal()]);
        rig.sched.advance(200.0);
        assert!(rig.consumer.stop());
        assert!(!rig.consumer.stop());
        assert_eq!(rig.consumer.state(), ConsumerState::Stopped);

        rig.queue.borrow_mut().enqueue_many([DropEvent::exploded(), DropEvent::normal()]);
        rig.sched.advance(5000.0);
        assert_eq!(rig.surface.records().len(), 1);
        assert_eq!(rig.queue.borrow().len(), 2);
    }

    #[test]
    fn stop_cancels_the_interval() {
        let rig = rig();
        rig.consumer.stop();
        // Renderer removal timers aside, nothing should remain armed.
        assert_eq!(rig.sched.pending(), 0);
    }

    #[test]
    fn rendered_drops_still_expire_after_stop() {
        let rig = rig();
        rig.queue.borrow_mut().enqueue_many([DropEvent::normal()]);
        rig.sched.advance(200.0);
        rig.consumer.stop();
        rig.sched.advance(1500.0);
        assert_eq!(rig.surface.attached(), 0);
        assert_eq!(rig.surface.records()[0].detach_count, 1);
    }
}
