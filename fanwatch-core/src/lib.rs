// src/lib.rs

pub mod config;
pub mod db;
pub mod repositories;
pub mod platforms;
pub mod eventbus;
pub mod health;
pub mod services;
pub mod tasks;
pub mod test_utils;

pub use db::Database;
pub use fanwatch_common::error::Error;
