#![forbid(unsafe_code)]

//! Listeners with reference identity, opaque scopes, and propagation verdicts.
//!
//! # Identity
//!
//! A [`Listener<T>`] is a reference-counted callable. Cloning a listener
//! yields another handle to the **same** callable, and equality is pointer
//! equality on that shared allocation. Two listeners built from identical
//! closures are distinct:
//!
//! ```
//! use ftui_signal::Listener;
//!
//! let a = Listener::new(|_: &u32| {});
//! let b = Listener::new(|_: &u32| {});
//! assert_eq!(a, a.clone());
//! assert_ne!(a, b);
//! ```
//!
//! # Scopes
//!
//! A binding may carry a [`Scope`]: an opaque, shared value handed to the
//! listener on every invocation. Listeners built with [`Listener::scoped`]
//! declare the scope type they expect; the signal checks the scope against
//! that type when the binding is created.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::error::SignalError;

/// Verdict returned by a listener to its dispatch pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Propagation {
    /// Keep walking the dispatch cohort.
    #[default]
    Continue,
    /// Skip the remaining bindings of the current pass.
    Halt,
}

impl Propagation {
    /// Returns `true` for [`Propagation::Halt`].
    #[must_use]
    pub const fn is_halt(self) -> bool {
        matches!(self, Self::Halt)
    }
}

impl From<()> for Propagation {
    fn from((): ()) -> Self {
        Self::Continue
    }
}

/// `false` halts, `true` continues.
impl From<bool> for Propagation {
    fn from(keep_going: bool) -> Self {
        if keep_going { Self::Continue } else { Self::Halt }
    }
}

/// Opaque receiver value stored on a binding.
#[derive(Clone)]
pub struct Scope {
    value: Rc<dyn Any>,
    type_name: &'static str,
}

impl Scope {
    /// Wrap a shared value as a scope.
    #[must_use]
    pub fn new<S: 'static>(value: Rc<S>) -> Self {
        Self {
            value,
            type_name: std::any::type_name::<S>(),
        }
    }

    /// Returns `true` if the scope holds an `S`.
    #[must_use]
    pub fn is<S: 'static>(&self) -> bool {
        (*self.value).is::<S>()
    }

    /// Borrow the scope value as an `S`.
    #[must_use]
    pub fn downcast_ref<S: 'static>(&self) -> Option<&S> {
        (*self.value).downcast_ref::<S>()
    }

    /// Type name of the wrapped value, for diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns `true` if both scopes wrap the same allocation.
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.value, &b.value)
    }
}

impl<S: 'static> From<Rc<S>> for Scope {
    fn from(value: Rc<S>) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scope({})", self.type_name)
    }
}

type Callback<T> = dyn Fn(Option<&Scope>, &T) -> Propagation;

/// Scope type a scoped listener was declared with.
#[derive(Clone, Copy)]
struct ScopeRequirement {
    type_name: &'static str,
    accepts: fn(&Scope) -> bool,
}

/// A callable subscribed to a [`Signal`](crate::Signal).
///
/// The listener receives the dispatched payload by reference and returns
/// anything convertible into a [`Propagation`]: `()`, `bool`, or the verdict
/// itself.
pub struct Listener<T> {
    callback: Rc<Callback<T>>,
    scope: Option<ScopeRequirement>,
}

impl<T> Clone for Listener<T> {
    fn clone(&self) -> Self {
        Self {
            callback: Rc::clone(&self.callback),
            scope: self.scope,
        }
    }
}

impl<T: 'static> Listener<T> {
    /// Build a listener that ignores any scope.
    pub fn new<F, R>(f: F) -> Self
    where
        F: Fn(&T) -> R + 'static,
        R: Into<Propagation>,
    {
        let callback: Rc<Callback<T>> =
            Rc::new(move |_scope: Option<&Scope>, payload: &T| f(payload).into());
        Self {
            callback,
            scope: None,
        }
    }

    /// Build a listener invoked against a scope of type `S`.
    ///
    /// Registering it without a scope, or with a scope of another type, is
    /// rejected by the signal.
    pub fn scoped<S, F, R>(f: F) -> Self
    where
        S: 'static,
        F: Fn(&S, &T) -> R + 'static,
        R: Into<Propagation>,
    {
        let callback: Rc<Callback<T>> = Rc::new(move |scope: Option<&Scope>, payload: &T| {
            // Checked at registration; a binding never carries a foreign scope.
            match scope.and_then(Scope::downcast_ref::<S>) {
                Some(scope) => f(scope, payload).into(),
                None => Propagation::Continue,
            }
        });
        Self {
            callback,
            scope: Some(ScopeRequirement {
                type_name: std::any::type_name::<S>(),
                accepts: Scope::is::<S>,
            }),
        }
    }
}

impl<T> Listener<T> {
    /// Returns `true` if both handles refer to the same callable.
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.callback, &b.callback)
    }

    /// Type name of the declared scope, if this listener is scoped.
    #[must_use]
    pub fn scope_type(&self) -> Option<&'static str> {
        self.scope.map(|req| req.type_name)
    }

    pub(crate) fn check_scope(&self, scope: Option<&Scope>) -> Result<(), SignalError> {
        let Some(req) = self.scope else {
            return Ok(());
        };
        match scope {
            None => Err(SignalError::MissingScope {
                expected: req.type_name,
            }),
            Some(scope) if !(req.accepts)(scope) => Err(SignalError::ScopeMismatch {
                expected: req.type_name,
                found: scope.type_name(),
            }),
            Some(_) => Ok(()),
        }
    }

    pub(crate) fn call(&self, scope: Option<&Scope>, payload: &T) -> Propagation {
        (self.callback)(scope, payload)
    }

    fn addr(&self) -> *const () {
        Rc::as_ptr(&self.callback).cast::<()>()
    }
}

impl<T> PartialEq for Listener<T> {
    fn eq(&self, other: &Self) -> bool {
        Self::ptr_eq(self, other)
    }
}

impl<T> Eq for Listener<T> {}

impl<T> std::hash::Hash for Listener<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl<T> fmt::Debug for Listener<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Listener");
        s.field("id", &self.addr());
        if let Some(req) = self.scope {
            s.field("scope", &req.type_name);
        }
        s.finish()
    }
}

impl<T> fmt::Display for Listener<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Listener@{:p}", self.addr())
    }
}
