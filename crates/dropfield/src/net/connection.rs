use std::cell::Cell;

use crate::api::error::FieldError;
use crate::core::pdr::PdrWriter;
use crate::core::queue::SharedDropQueue;
use crate::net::protocol::{handshake, ServerUpdate};
use crate::systems::consumer::DropConsumer;

/// Observable state of the server link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectionState {
    pub is_open: bool,
    /// Set once the link reported an error or closed. Never cleared.
    pub ended: bool,
    pub accepted: u64,
    pub discarded: u64,
}

/// Reacts to the lifecycle of the server socket.
///
/// Transport-agnostic: the browser bridge forwards `open` / `message` /
/// `error` / `close` here and sends whatever [`on_open`](Self::on_open)
/// returns. This is the sole writer of the pdr and the sole producer into the
/// drop queue.
pub struct Connection {
    client_id: u64,
    pdr: PdrWriter,
    queue: SharedDropQueue,
    consumer: DropConsumer,
    state: Cell<ConnectionState>,
    greeted: Cell<bool>,
}

impl Connection {
    pub fn new(client_id: u64, pdr: PdrWriter, queue: SharedDropQueue, consumer: DropConsumer) -> Self {
        Self {
            client_id,
            pdr,
            queue,
            consumer,
            state: Cell::new(ConnectionState::default()),
            greeted: Cell::new(false),
        }
    }

    pub fn client_id(&self) -> u64 {
        self.client_id
    }

    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Link established. Returns the handshake frame to send; `None` if it
    /// has already been handed out.
    pub fn on_open(&self) -> Option<String> {
        self.update_state(|s| s.is_open = true);
        log::info!("connection established, client {}", self.client_id);
        if self.greeted.replace(true) {
            return None;
        }
        Some(handshake(self.client_id))
    }

    /// Apply one server frame. Invalid frames are discarded whole; the link
    /// stays up. Returns the number of drops enqueued.
    pub fn on_message(&self, text: &str) -> Result<usize, FieldError> {
        let update = match ServerUpdate::from_json(text) {
            Ok(update) => update,
            Err(err) => {
                self.update_state(|s| s.discarded += 1);
                log::warn!("discarding server message: {err}");
                return Err(err);
            }
        };
        self.pdr.set(update.pdr);
        let count = update.drops.len();
        self.queue.borrow_mut().enqueue_many(update.drops);
        self.update_state(|s| s.accepted += 1);
        Ok(count)
    }

    /// The link failed. Mutes drop rendering; nothing else is torn down.
    pub fn on_error(&self) {
        log::warn!("connection error");
        self.end();
    }

    /// The link closed. Same outcome as an error.
    pub fn on_close(&self) {
        log::info!("connection closed");
        self.end();
    }

    fn end(&self) {
        self.update_state(|s| {
            s.is_open = false;
            s.ended = true;
        });
        self.consumer.stop();
    }

    fn update_state(&self, f: impl FnOnce(&mut ConnectionState)) {
        let mut state = self.state.get();
        f(&mut state);
        self.state.set(state);
    }
}
