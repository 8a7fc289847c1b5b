//! I/O adapters for the loop controller.

pub mod atomic;
pub mod config;
pub mod launcher;
pub mod paths;
pub mod replies;
pub mod state_store;
