//! This module contains cadence's push-based event system. The module is
//! organized into the following sub modules:
//! * `dispatcher` which implements the subscriber table behind every subject.
//! * `observable` which implements the [Event](observable::Event) type, a
//!   lazily subscribed source of values.
//! * `ops` which contains all of the event combinators.
//! * `subject` which implements the subjects used as the root of an event
//!   chain.
//! * `subscription` which implements the
//!   [Subscription](subscription::Subscription) type which is used to tie a
//!   chain of callbacks to the current scope.
//! * `cell` which holds the latest-value cell shared by sampling operators.
//!
pub mod cell;
pub mod dispatcher;
pub mod observable;
pub mod ops;
pub mod subject;
pub mod subscription;
