//! quizflow-core — Core quiz flow engine, state, and timers.
//!
//! This crate defines the session model, the flow state machine, the
//! countdown timers, and the backend trait that the entire quizflow system
//! builds on.

pub mod error;
pub mod flow;
pub mod guard;
pub mod model;
pub mod session;
pub mod store;
pub mod timer;
pub mod traits;
