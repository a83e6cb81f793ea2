//! Cadence is:
//! * a push-based, single threaded event system with time-varying values
//!   (polls) built on top of it.
//! * a reconciler that flattens a reactive description tree into an ordered
//!   stream of tree mutations, and runs them against an interpreter.
pub mod deferred;
pub mod event;
pub mod interpret;
pub mod mailbox;
pub mod poll;
pub mod reconcile;
pub mod runtime;
pub mod utils;
