pub mod config;
pub mod mesh_worker;
pub mod renderer;
pub mod world;

pub use config::EngineConfig;
pub use world::{FrameStats, WorldEngine};
