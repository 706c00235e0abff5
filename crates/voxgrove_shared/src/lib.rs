pub mod ao;
pub mod block;
pub mod chunk;
pub mod coords;
pub mod daylight;
pub mod face;
pub mod lighting;
pub mod storage;
pub mod worldgen;
