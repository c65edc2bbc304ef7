use std::rc::Rc;

use crate::api::config::{BootParams, FieldConfig};
use crate::core::pdr::{pdr_cell, PdrReader};
use crate::core::queue::{DropQueue, SharedDropQueue};
use crate::core::scheduler::SharedScheduler;
use crate::net::connection::Connection;
use crate::systems::consumer::DropConsumer;
use crate::systems::renderer::{Renderer, Surface};
use crate::systems::rng::SharedRandom;
use crate::systems::spawner::{DynamicInterval, EnvironmentSpawner};

/// Everything one page session runs: the shared pdr and drop queue, the
/// renderer, the drop consumer, the ambient spawner and the connection
/// handler that feeds them.
///
/// Construction starts both the consumer and the spawner. The transport is
/// wired by the caller through [`connection`](Self::connection).
pub struct FieldSession<S: Surface + 'static> {
    config: FieldConfig,
    renderer: Rc<Renderer<S>>,
    queue: SharedDropQueue,
    pdr: PdrReader,
    consumer: DropConsumer,
    spawner: DynamicInterval,
    connection: Rc<Connection>,
}

impl<S: Surface + 'static> FieldSession<S> {
    pub fn start(
        config: FieldConfig,
        boot: BootParams,
        surface: S,
        scheduler: SharedScheduler,
        random: SharedRandom,
    ) -> Self {
        let renderer = Rc::new(Renderer::new(
            surface,
            Rc::clone(&scheduler),
            Rc::clone(&random),
            config.display_duration_ms,
        ));
        let queue = DropQueue::shared();
        let (pdr_writer, pdr) = pdr_cell(boot.initial_pdr);

        let consumer = DropConsumer::start(
            Rc::clone(&scheduler),
            Rc::clone(&queue),
            Rc::clone(&renderer),
            &config,
        );
        let spawner = EnvironmentSpawner::start(
            scheduler,
            pdr.clone(),
            random,
            Rc::clone(&renderer),
            &config,
        );
        let connection = Rc::new(Connection::new(
            boot.client_id,
            pdr_writer,
            Rc::clone(&queue),
            consumer.clone(),
        ));

        log::info!(
            "field session started for client {} at pdr {:.2}",
            boot.client_id,
            boot.initial_pdr
        );

        Self {
            config,
            renderer,
            queue,
            pdr,
            consumer,
            spawner,
            connection,
        }
    }

    pub fn config(&self) -> &FieldConfig {
        &self.config
    }

    pub fn connection(&self) -> Rc<Connection> {
        Rc::clone(&self.connection)
    }

    pub fn renderer(&self) -> &Rc<Renderer<S>> {
        &self.renderer
    }

    pub fn queue(&self) -> &SharedDropQueue {
        &self.queue
    }

    pub fn pdr(&self) -> f64 {
        self.pdr.get()
    }

    pub fn consumer(&self) -> &DropConsumer {
        &self.consumer
    }

    pub fn spawner(&self) -> &DynamicInterval {
        &self.spawner
    }

    /// Stop both loops. Elements already on the field still expire normally.
    pub fn shutdown(&self) {
        self.spawner.cancel();
        self.consumer.stop();
    }
}

impl<S: Surface + 'static> Drop for FieldSession<S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::ElementRole;
    use crate::core::scheduler::VirtualScheduler;
    use crate::systems::consumer::ConsumerState;
    use crate::systems::renderer::MemorySurface;
    use crate::systems::rng::Xorshift;

    fn session(pdr: f64) -> (Rc<VirtualScheduler>, Rc<MemorySurface>, FieldSession<Rc<MemorySurface>>) {
        let sched = VirtualScheduler::shared();
        let surface = Rc::new(MemorySurface::new());
        let boot = BootParams { client_id: 3, initial_pdr: pdr };
        let session = FieldSession::start(
            FieldConfig::default(),
            boot,
            Rc::clone(&surface),
            sched.clone(),
            Rc::new(Xorshift::new(1234)),
        );
        (sched, surface, session)
    }

    fn count(surface: &MemorySurface, role: ElementRole) -> usize {
        surface.records().iter().filter(|r| r.element.role == role).count()
    }

    #[test]
    fn drops_and_decorations_interleave() {
        let (sched, surface, session) = session(1.0);
        let conn = session.connection();
        assert_eq!(conn.on_open().as_deref(), Some("3"));
        conn.on_message(r#"{"pdr":1.0,"drops":[{"exploded":false},{"exploded":true},{"exploded":false}]}"#)
            .unwrap();
        sched.advance(1000.0);
        // pdr 1: one decoration every 100 ms.
        assert_eq!(count(&surface, ElementRole::Environment), 10);
        assert_eq!(count(&surface, ElementRole::Drop), 3);
        assert!(session.queue().borrow().is_empty());
    }

    #[test]
    fn every_element_removed_exactly_once_after_duration() {
        let (sched, surface, session) = session(0.3);
        let conn = session.connection();
        for _ in 0..5 {
            conn.on_message(r#"{"pdr":0.6,"drops":[{"exploded":true},{"exploded":false}]}"#)
                .unwrap();
            sched.advance(700.0);
        }
        session.shutdown();
        sched.advance(1500.0);
        let records = surface.records();
        assert!(!records.is_empty());
        assert!(records.iter().all(|r| r.detach_count == 1));
        assert_eq!(session.renderer().live_count(), 0);
        assert_eq!(sched.pending(), 0);
    }

    #[test]
    fn close_mutes_drops_but_not_ambient() {
        let (sched, surface, session) = session(0.5);
        let conn = session.connection();
        conn.on_message(r#"{"pdr":0.9,"drops":[]}"#).unwrap();
        conn.on_close();
        assert_eq!(session.consumer().state(), ConsumerState::Stopped);
        assert!(session.spawner().is_active());
        // pdr freezes at the last value the server sent.
        assert_eq!(session.pdr(), 0.9);

        let before = count(&surface, ElementRole::Environment);
        sched.advance(2000.0);
        assert!(count(&surface, ElementRole::Environment) > before);
        assert_eq!(count(&surface, ElementRole::Drop), 0);
    }

    #[test]
    fn initial_pdr_drives_spawning_before_first_message() {
        let (sched, surface, _session) = session(1.0);
        sched.advance(550.0);
        assert_eq!(count(&surface, ElementRole::Environment), 5);
    }
}
