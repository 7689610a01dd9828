#![forbid(unsafe_code)]

//! Synchronous event broadcaster.
//!
//! # Design
//!
//! [`Signal<T>`] keeps an ordered list of [`Binding`]s in shared,
//! reference-counted storage. Cloning a signal creates another handle to
//! the same list and flags, in the same way an `Observable` handle works.
//!
//! `dispatch` copies the binding list before walking it. That copy is the
//! *cohort* of the pass: listeners that add or remove bindings while the
//! pass runs change the live list (and therefore later passes) but never
//! the cohort being walked. A binding removed from the live list by a
//! sibling still runs in the current pass.
//!
//! No `RefCell` borrow is held while a listener runs, so listeners may
//! freely call back into the signal: `add`, `remove`, `remove_all`, `halt`,
//! `disable`, and nested `dispatch` are all legal mid-pass.
//!
//! A listener that needs its own signal should capture a [`WeakSignal`]
//! from [`Signal::downgrade`]. A strong clone captured by a listener forms
//! a reference cycle through the binding list and keeps both alive until
//! the listener is removed.
//!
//! # Halting
//!
//! Every active pass owns a propagation flag on a per-signal stack. `halt()`
//! clears the flag of the innermost running pass; a nested pass therefore
//! neither inherits nor leaks a halt. Outside a pass `halt()` does nothing.
//!
//! # Failure Modes
//!
//! - **Conflicting registration**: `add` after `add_once` for the same
//!   listener (or the reverse) returns [`SignalError::ConflictingRegistration`].
//! - **Listener panic**: unwinds out of `dispatch` untouched; the rest of
//!   the cohort is skipped and the pass state is released by a drop guard.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use crate::binding::Binding;
use crate::config::SignalConfig;
use crate::error::{RegistrationKind, SignalError};
use crate::listener::{Listener, Propagation, Scope};

/// Shared interior for [`Signal<T>`].
pub(crate) struct SignalInner<T> {
    bindings: RefCell<Vec<Binding<T>>>,
    enabled: Cell<bool>,
    /// One propagation flag per active dispatch pass, innermost last.
    passes: RefCell<Vec<bool>>,
    memorize: bool,
    memory: RefCell<Option<Rc<T>>>,
}

impl<T> SignalInner<T> {
    fn find(&self, listener: &Listener<T>) -> Option<Binding<T>> {
        self.bindings
            .borrow()
            .iter()
            .find(|binding| binding.listener() == listener)
            .cloned()
    }

    /// Drop `binding` from the live list. Returns `false` if it was absent.
    pub(crate) fn remove_binding(&self, binding: &Binding<T>) -> bool {
        let removed = {
            let mut bindings = self.bindings.borrow_mut();
            bindings
                .iter()
                .position(|b| Binding::ptr_eq(b, binding))
                .map(|index| bindings.remove(index))
        };
        match removed {
            Some(binding) => {
                binding.unbind();
                trace!(listeners = self.bindings.borrow().len(), "binding removed");
                true
            }
            None => false,
        }
    }
}

impl<T> Drop for SignalInner<T> {
    fn drop(&mut self) {
        for binding in self.bindings.get_mut().drain(..) {
            binding.unbind();
        }
    }
}

/// Marks one active dispatch pass; pops its flag on exit, including unwinds.
struct PassGuard<'a, T> {
    inner: &'a SignalInner<T>,
    depth: usize,
}

impl<'a, T> PassGuard<'a, T> {
    fn enter(inner: &'a SignalInner<T>) -> Self {
        let mut passes = inner.passes.borrow_mut();
        passes.push(true);
        let depth = passes.len();
        drop(passes);
        Self { inner, depth }
    }

    fn halted(&self) -> bool {
        matches!(self.inner.passes.borrow().get(self.depth - 1), Some(false))
    }
}

impl<T> Drop for PassGuard<'_, T> {
    fn drop(&mut self) {
        self.inner.passes.borrow_mut().truncate(self.depth - 1);
    }
}

/// An event broadcaster holding an ordered set of listener bindings.
///
/// # Invariants
///
/// 1. No two bindings share a listener identity.
/// 2. Dispatch order is registration order.
/// 3. A disabled signal dispatches nothing and keeps its bindings.
/// 4. A pass walks the cohort captured when it started.
///
/// # Example
///
/// ```
/// use ftui_signal::{Listener, Signal};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let log = Rc::new(RefCell::new(Vec::new()));
/// let signal = Signal::new();
///
/// let f_log = Rc::clone(&log);
/// let f = Listener::new(move |v: &i32| f_log.borrow_mut().push(("f", *v)));
/// let g_log = Rc::clone(&log);
/// let g = Listener::new(move |v: &i32| g_log.borrow_mut().push(("g", *v)));
///
/// signal.add(&f).unwrap();
/// signal.add(&g).unwrap();
/// signal.dispatch(42);
///
/// assert_eq!(*log.borrow(), vec![("f", 42), ("g", 42)]);
/// ```
pub struct Signal<T> {
    inner: Rc<SignalInner<T>>,
}

// Manual Clone: shares the same Rc.
impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Signal<T> {
    /// Create an enabled signal with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(SignalConfig::default())
    }

    #[must_use]
    pub fn with_config(config: SignalConfig) -> Self {
        Self {
            inner: Rc::new(SignalInner {
                bindings: RefCell::new(Vec::new()),
                enabled: Cell::new(config.enabled),
                passes: RefCell::new(Vec::new()),
                memorize: config.memorize,
                memory: RefCell::new(None),
            }),
        }
    }

    /// Create a non-owning handle to this signal.
    ///
    /// Listeners that call back into their own signal should capture the
    /// weak handle so the signal can still be dropped.
    #[must_use]
    pub fn downgrade(&self) -> WeakSignal<T> {
        WeakSignal {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Current configuration, reflecting the live enabled state.
    #[must_use]
    pub fn config(&self) -> SignalConfig {
        SignalConfig {
            enabled: self.is_enabled(),
            memorize: self.inner.memorize,
        }
    }

    /// Register a persistent listener.
    ///
    /// Adding a listener that is already registered returns the existing
    /// binding.
    ///
    /// # Errors
    ///
    /// [`SignalError::ConflictingRegistration`] if the listener is bound via
    /// `add_once`; scope errors if `listener` is scoped.
    pub fn add(&self, listener: &Listener<T>) -> Result<Binding<T>, SignalError> {
        self.register(listener, false, None)
    }

    /// Register a persistent listener invoked against `scope`.
    ///
    /// # Errors
    ///
    /// See [`add`](Self::add).
    pub fn add_scoped(
        &self,
        listener: &Listener<T>,
        scope: impl Into<Scope>,
    ) -> Result<Binding<T>, SignalError> {
        self.register(listener, false, Some(scope.into()))
    }

    /// Register a listener that is removed on its first execution.
    ///
    /// # Errors
    ///
    /// [`SignalError::ConflictingRegistration`] if the listener is bound via
    /// `add`; scope errors if `listener` is scoped.
    pub fn add_once(&self, listener: &Listener<T>) -> Result<Binding<T>, SignalError> {
        self.register(listener, true, None)
    }

    /// Register a once-listener invoked against `scope`.
    ///
    /// # Errors
    ///
    /// See [`add_once`](Self::add_once).
    pub fn add_once_scoped(
        &self,
        listener: &Listener<T>,
        scope: impl Into<Scope>,
    ) -> Result<Binding<T>, SignalError> {
        self.register(listener, true, Some(scope.into()))
    }

    fn register(
        &self,
        listener: &Listener<T>,
        once: bool,
        scope: Option<Scope>,
    ) -> Result<Binding<T>, SignalError> {
        let binding = match self.inner.find(listener) {
            Some(existing) if existing.is_once() != once => {
                let err = SignalError::ConflictingRegistration {
                    existing: existing.kind(),
                    requested: RegistrationKind::from_once(once),
                };
                debug!(%listener, error = %err, "registration rejected");
                return Err(err);
            }
            Some(existing) => existing,
            None => {
                listener.check_scope(scope.as_ref())?;
                let binding =
                    Binding::new(listener.clone(), scope, once, Rc::downgrade(&self.inner));
                let mut bindings = self.inner.bindings.borrow_mut();
                bindings.push(binding.clone());
                trace!(%listener, once, listeners = bindings.len(), "listener registered");
                binding
            }
        };

        let memory = self.inner.memory.borrow().clone();
        if let Some(payload) = memory {
            // Replay runs as its own pass: the verdict and any halt() stay here.
            let _pass = PassGuard::enter(&self.inner);
            binding.execute(&payload);
        }
        Ok(binding)
    }

    /// Remove the binding for `listener`, if any. Returns the argument.
    pub fn remove<'l>(&self, listener: &'l Listener<T>) -> &'l Listener<T> {
        if let Some(binding) = self.inner.find(listener) {
            self.inner.remove_binding(&binding);
        }
        listener
    }

    /// Remove every binding regardless of enablement or once-flag.
    pub fn remove_all(&self) {
        let drained = std::mem::take(&mut *self.inner.bindings.borrow_mut());
        trace!(removed = drained.len(), "all bindings removed");
        for binding in &drained {
            binding.unbind();
        }
    }

    /// Returns `true` if `listener` is currently registered.
    #[must_use]
    pub fn has(&self, listener: &Listener<T>) -> bool {
        self.inner.find(listener).is_some()
    }

    #[must_use]
    pub fn num_listeners(&self) -> usize {
        self.inner.bindings.borrow().len()
    }

    /// Re-open the dispatch gate.
    pub fn enable(&self) {
        self.inner.enabled.set(true);
    }

    /// Block dispatch until [`enable`](Self::enable). Bindings are kept.
    pub fn disable(&self) {
        self.inner.enabled.set(false);
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.get()
    }

    /// Stop the innermost running dispatch pass after the current listener
    /// returns. No effect outside a pass.
    pub fn halt(&self) {
        if let Some(flag) = self.inner.passes.borrow_mut().last_mut() {
            *flag = false;
        }
    }

    /// Clear the memorized payload.
    pub fn forget(&self) {
        self.inner.memory.borrow_mut().take();
    }

    /// Notify listeners in registration order.
    ///
    /// Does nothing while the signal is disabled. A listener returning
    /// [`Propagation::Halt`] (or `false`), or calling [`halt`](Self::halt),
    /// ends the pass; skipped bindings stay registered.
    pub fn dispatch(&self, payload: T) {
        if !self.is_enabled() {
            return;
        }
        if self.inner.memorize {
            let payload = Rc::new(payload);
            *self.inner.memory.borrow_mut() = Some(Rc::clone(&payload));
            self.run_pass(&payload);
        } else {
            self.run_pass(&payload);
        }
    }

    fn run_pass(&self, payload: &T) {
        let cohort: Vec<Binding<T>> = self.inner.bindings.borrow().clone();
        let pass = PassGuard::enter(&self.inner);
        trace!(cohort = cohort.len(), depth = pass.depth, "dispatch pass");

        for (index, binding) in cohort.iter().enumerate() {
            let verdict = binding.execute(payload);
            if verdict.is_some_and(Propagation::is_halt) || pass.halted() {
                debug!(
                    skipped = cohort.len() - index - 1,
                    depth = pass.depth,
                    "dispatch pass halted"
                );
                break;
            }
        }
    }
}

/// Non-owning handle to a [`Signal`], obtained from [`Signal::downgrade`].
///
/// # Example
///
/// ```
/// use ftui_signal::{Listener, Signal};
///
/// let signal: Signal<u32> = Signal::new();
/// let weak = signal.downgrade();
/// signal
///     .add(&Listener::new(move |v: &u32| {
///         if *v > 10 {
///             if let Some(signal) = weak.upgrade() {
///                 signal.halt();
///             }
///         }
///     }))
///     .unwrap();
/// signal.dispatch(11);
/// ```
pub struct WeakSignal<T> {
    inner: Weak<SignalInner<T>>,
}

impl<T> Clone for WeakSignal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<T> WeakSignal<T> {
    /// Returns the signal if it is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Signal<T>> {
        self.inner.upgrade().map(|inner| Signal { inner })
    }
}

impl<T> fmt::Debug for WeakSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakSignal")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl<T> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("enabled", &self.is_enabled())
            .field("listeners", &self.num_listeners())
            .field("memorize", &self.inner.memorize)
            .finish()
    }
}

impl<T> fmt::Display for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[Signal enabled: {} listeners: {}]",
            self.is_enabled(),
            self.num_listeners()
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
