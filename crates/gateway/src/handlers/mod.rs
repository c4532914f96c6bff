//! API handlers module

pub mod dispatch;
pub mod files;
pub mod health;
pub mod progress;
