// fanwatch-core/src/platforms/mod.rs

pub mod creator;
pub mod discord;
