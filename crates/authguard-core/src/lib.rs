//! Core types and trait definitions for AuthGuard.
//!
//! This crate is deliberately free of HTTP and database dependencies. It owns
//! the session bootstrap state machine, the routing policy built on top of it,
//! and the record types and store traits the backends implement.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod auth_error;
pub mod controller;
pub mod dispatch;
pub mod error;
pub mod login;
pub mod nav;
pub mod provider;
pub mod record;
pub mod routing;
pub mod session;
pub mod store;
pub mod wire;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
