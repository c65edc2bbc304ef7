pub mod api;
pub mod core;
pub mod net;
pub mod systems;

// Re-export key types at crate root for convenience
pub use api::config::{BootParams, FieldConfig};
pub use api::error::FieldError;
pub use api::session::FieldSession;
pub use api::types::{DropEvent, ElementId, ElementRole, SizeClass, VisualElement};
pub use crate::core::pdr::{pdr_cell, PdrReader, PdrWriter};
pub use crate::core::queue::{DropQueue, SharedDropQueue};
pub use crate::core::scheduler::{Scheduler, SharedScheduler, TimerId, VirtualScheduler};
pub use net::connection::{Connection, ConnectionState};
pub use net::protocol::{handshake, ServerUpdate};
pub use systems::consumer::{ConsumerState, DropConsumer};
pub use systems::renderer::{ElementLease, MemorySurface, Renderer, Surface, SurfaceRecord};
pub use systems::rng::{RandomSource, SharedRandom, Xorshift};
pub use systems::spawner::{
    spawn_delay, CatalogEntry, DynamicInterval, EnvironmentSpawner, ENVIRONMENT_CATALOG,
};
