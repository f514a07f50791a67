//! Core types and logic for the Rollbook attendance subsystem.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! store is reached through the [`store::AttendanceStore`] trait and is always
//! passed in by the caller.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod duplicate;
pub mod error;
pub mod import;
pub mod record;
pub mod roster;
pub mod service;
pub mod store;
pub mod summary;
pub mod validate;

pub use error::{Error, Result};
pub use service::AttendanceService;

#[cfg(test)]
mod memory;
