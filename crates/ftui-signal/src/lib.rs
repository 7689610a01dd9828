#![forbid(unsafe_code)]

//! Synchronous, in-process publish/subscribe signals.
//!
//! A [`Signal<T>`] broadcasts a payload of type `T` to an ordered set of
//! [`Listener`]s, each registered through a [`Binding`]. Delivery is
//! synchronous and single-threaded: every listener runs to completion on
//! the dispatching thread before the next one starts.
//!
//! - Listeners are deduplicated by identity; registering the same listener
//!   twice returns the same binding.
//! - `add_once` bindings remove themselves before their first execution.
//! - A listener can end the current pass early by returning `false` /
//!   [`Propagation::Halt`] or by calling [`Signal::halt`].
//! - Each pass walks a snapshot of the bindings, so listeners may mutate
//!   the signal while it dispatches.

pub mod binding;
pub mod config;
pub mod error;
pub mod listener;
pub mod signal;

pub use binding::Binding;
pub use config::SignalConfig;
pub use error::{RegistrationKind, SignalError};
pub use listener::{Listener, Propagation, Scope};
pub use signal::{Signal, WeakSignal};
