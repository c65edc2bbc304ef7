pub mod pdr;
pub mod queue;
pub mod scheduler;
