pub mod consumer;
pub mod renderer;
pub mod rng;
pub mod spawner;
