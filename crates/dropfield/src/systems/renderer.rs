use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::api::types::{ElementId, ElementRole, SizeClass, VisualElement};
use crate::core::scheduler::{Scheduler, SharedScheduler};
use crate::systems::rng::{RandomSource, SharedRandom};

/// Where visual elements live. The browser bridge implements this over DOM
/// nodes; [`MemorySurface`] keeps them in a list.
pub trait Surface {
    /// Backend handle for one attached element.
    type Node: 'static;

    /// Attach an element. `None` means the surface is unavailable; the
    /// renderer then skips the element entirely.
    fn attach(&self, element: &VisualElement) -> Option<Self::Node>;

    /// Detach a previously attached node. Must tolerate nodes the host has
    /// already removed on its own.
    fn detach(&self, node: &Self::Node);
}

/// Ownership handle for a rendered element. Releasing detaches the element
/// from its surface; only the first release has any effect.
pub struct ElementLease {
    element: VisualElement,
    release: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl ElementLease {
    fn new(element: VisualElement, release: Box<dyn FnOnce()>) -> Self {
        Self {
            element,
            release: RefCell::new(Some(release)),
        }
    }

    pub fn element(&self) -> &VisualElement {
        &self.element
    }

    /// Detach the element. Returns `false` if it was already released.
    pub fn release(&self) -> bool {
        let release = self.release.borrow_mut().take();
        match release {
            Some(detach) => {
                detach();
                true
            }
            None => false,
        }
    }

    pub fn is_released(&self) -> bool {
        self.release.borrow().is_none()
    }
}

impl std::fmt::Debug for ElementLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementLease")
            .field("element", &self.element)
            .field("released", &self.is_released())
            .finish()
    }
}

/// Puts transient glyphs on a [`Surface`] and takes each one down again once
/// its display duration has elapsed.
pub struct Renderer<S: Surface> {
    surface: S,
    scheduler: SharedScheduler,
    random: SharedRandom,
    display_duration_ms: f64,
    next_id: Cell<u64>,
    live: Cell<usize>,
}

impl<S: Surface + 'static> Renderer<S> {
    pub fn new(
        surface: S,
        scheduler: SharedScheduler,
        random: SharedRandom,
        display_duration_ms: f64,
    ) -> Self {
        Self {
            surface,
            scheduler,
            random,
            display_duration_ms,
            next_id: Cell::new(1),
            live: Cell::new(0),
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Number of elements currently attached through this renderer.
    pub fn live_count(&self) -> usize {
        self.live.get()
    }

    /// Render `symbol` at a fresh random horizontal position. The element is
    /// released automatically after the display duration, whatever else
    /// happens to the session. Returns `None` when the surface is unavailable.
    pub fn display(
        self: &Rc<Self>,
        symbol: &str,
        size: SizeClass,
        role: ElementRole,
    ) -> Option<Rc<ElementLease>> {
        let id = ElementId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        let element = VisualElement {
            id,
            symbol: symbol.to_string(),
            size,
            role,
            position: self.random.next_unit(),
            created_at: self.scheduler.now(),
        };

        let Some(node) = self.surface.attach(&element) else {
            log::debug!("surface unavailable, skipping {symbol}");
            return None;
        };
        self.live.set(self.live.get() + 1);

        let renderer = Rc::clone(self);
        let lease = Rc::new(ElementLease::new(
            element,
            Box::new(move || {
                renderer.surface.detach(&node);
                renderer.live.set(renderer.live.get() - 1);
            }),
        ));

        let expiring = Rc::clone(&lease);
        self.scheduler.set_timeout(
            self.display_duration_ms,
            Box::new(move || {
                expiring.release();
            }),
        );
        Some(lease)
    }
}

/// Record of one element as seen by a [`MemorySurface`].
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceRecord {
    pub element: VisualElement,
    pub detach_count: u32,
}

/// In-memory surface that remembers every element it was given.
#[derive(Debug, Default)]
pub struct MemorySurface {
    records: RefCell<Vec<SurfaceRecord>>,
    unavailable: Cell<bool>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// A surface that refuses every attach.
    pub fn unavailable() -> Self {
        let surface = Self::new();
        surface.unavailable.set(true);
        surface
    }

    pub fn records(&self) -> Vec<SurfaceRecord> {
        self.records.borrow().clone()
    }

    /// Symbols in attach order.
    pub fn symbols(&self) -> Vec<String> {
        self.records.borrow().iter().map(|r| r.element.symbol.clone()).collect()
    }

    /// Elements attached and not yet detached.
    pub fn attached(&self) -> usize {
        self.records.borrow().iter().filter(|r| r.detach_count == 0).count()
    }
}

impl Surface for MemorySurface {
    type Node = usize;

    fn attach(&self, element: &VisualElement) -> Option<usize> {
        if self.unavailable.get() {
            return None;
        }
        let mut records = self.records.borrow_mut();
        records.push(SurfaceRecord {
            element: element.clone(),
            detach_count: 0,
        });
        Some(records.len() - 1)
    }

    fn detach(&self, node: &usize) {
        if let Some(record) = self.records.borrow_mut().get_mut(*node) {
            record.detach_count += 1;
        }
    }
}

impl<T: Surface + ?Sized> Surface for Rc<T> {
    type Node = T::Node;

    fn attach(&self, element: &VisualElement) -> Option<Self::Node> {
        (**self).attach(element)
    }

    fn detach(&self, node: &Self::Node) {
        (**self).detach(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scheduler::VirtualScheduler;
    use crate::systems::rng::{Sequence, Xorshift};

    fn renderer(surface: Rc<MemorySurface>) -> (Rc<VirtualScheduler>, Rc<Renderer<Rc<MemorySurface>>>) {
        let sched = VirtualScheduler::shared();
        let r = Renderer::new(surface, sched.clone(), Rc::new(Xorshift::new(9)), 1500.0);
        (sched, Rc::new(r))
    }

    #[test]
    fn element_removed_once_after_duration() {
        let surface = Rc::new(MemorySurface::new());
        let (sched, r) = renderer(Rc::clone(&surface));
        sched.advance(10.0);
        let lease = r.display("🌲", SizeClass::Normal, ElementRole::Environment).unwrap();
        assert_eq!(lease.element().created_at, 10.0);
        assert_eq!(surface.attached(), 1);

        sched.advance(1499.0);
        assert_eq!(surface.attached(), 1);
        assert!(!lease.is_released());

        sched.advance(1.0);
        assert_eq!(surface.attached(), 0);
        assert!(lease.is_released());
        assert_eq!(sched.now(), 1510.0);

        sched.advance(10_000.0);
        assert_eq!(surface.records()[0].detach_count, 1);
        assert_eq!(r.live_count(), 0);
    }

    #[test]
    fn early_release_makes_timer_a_noop() {
        let surface = Rc::new(MemorySurface::new());
        let (sched, r) = renderer(Rc::clone(&surface));
        let lease = r.display("🍄", SizeClass::Small, ElementRole::Environment).unwrap();
        assert!(lease.release());
        assert!(!lease.release());
        sched.advance(2000.0);
        assert_eq!(surface.records()[0].detach_count, 1);
    }

    #[test]
    fn each_call_draws_a_fresh_position() {
        let surface = Rc::new(MemorySurface::new());
        let sched = VirtualScheduler::shared();
        let r = Rc::new(Renderer::new(
            Rc::clone(&surface),
            sched,
            Rc::new(Sequence::new(vec![0.25, 0.75])),
            1500.0,
        ));
        r.display("a", SizeClass::Normal, ElementRole::Drop);
        r.display("b", SizeClass::Small, ElementRole::Drop);
        let records = surface.records();
        assert_eq!(records[0].element.position, 0.25);
        assert_eq!(records[1].element.position, 0.75);
        assert!(records[1].element.size.is_small());
        assert_ne!(records[0].element.id, records[1].element.id);
    }

    #[test]
    fn unavailable_surface_skips_silently() {
        let surface = Rc::new(MemorySurface::unavailable());
        let (sched, r) = renderer(Rc::clone(&surface));
        assert!(r.display("🌲", SizeClass::Normal, ElementRole::Environment).is_none());
        assert_eq!(sched.pending(), 0);
        assert!(surface.records().is_empty());
    }
}
