#![forbid(unsafe_code)]

//! Handle to one listener's subscription on a signal.
//!
//! A [`Binding<T>`] is created only by a signal's registration path. It
//! carries the listener, an optional [`Scope`], the immutable once-flag and
//! a per-binding enabled gate. The back-reference to the owning signal is a
//! `Weak` used for self-removal only; it never keeps the signal alive.
//!
//! # Lifecycle
//!
//! A binding is bound from creation until the signal drops it (`remove`,
//! `remove_all`, [`Binding::detach`], once-driven self-removal, or the
//! signal itself being dropped). An unbound binding stays readable: its
//! listener and scope can still be inspected.

use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::RegistrationKind;
use crate::listener::{Listener, Propagation, Scope};
use crate::signal::SignalInner;

struct BindingInner<T> {
    listener: Listener<T>,
    scope: Option<Scope>,
    once: bool,
    enabled: Cell<bool>,
    bound: Cell<bool>,
    owner: Weak<SignalInner<T>>,
}

/// The relationship between a [`Signal`](crate::Signal) and one listener.
///
/// Cloning shares the same binding; equality is instance identity.
pub struct Binding<T> {
    inner: Rc<BindingInner<T>>,
}

impl<T> Clone for Binding<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Binding<T> {
    pub(crate) fn new(
        listener: Listener<T>,
        scope: Option<Scope>,
        once: bool,
        owner: Weak<SignalInner<T>>,
    ) -> Self {
        Self {
            inner: Rc::new(BindingInner {
                listener,
                scope,
                once,
                enabled: Cell::new(true),
                bound: Cell::new(true),
                owner,
            }),
        }
    }

    /// Invoke the listener with `payload`.
    ///
    /// Returns `None` without invoking anything when the binding is
    /// disabled. A once-binding removes itself from its signal *before*
    /// the listener runs, so the listener already observes itself gone.
    pub fn execute(&self, payload: &T) -> Option<Propagation> {
        if !self.is_enabled() {
            return None;
        }
        if self.inner.once {
            self.detach();
        }
        Some(self.inner.listener.call(self.inner.scope.as_ref(), payload))
    }

    /// Remove this binding from its signal.
    ///
    /// Returns the listener if the binding was still registered, `None` if
    /// it had already been removed or the signal is gone.
    pub fn detach(&self) -> Option<Listener<T>> {
        let owner = self.inner.owner.upgrade()?;
        owner
            .remove_binding(self)
            .then(|| self.inner.listener.clone())
    }

    /// Returns `true` while the owning signal still holds this binding.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.inner.bound.get()
    }

    /// Block execution until [`enable`](Self::enable) is called.
    pub fn disable(&self) {
        self.inner.enabled.set(false);
    }

    /// Allow execution.
    pub fn enable(&self) {
        self.inner.enabled.set(true);
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.get()
    }

    /// Returns `true` if the binding was created by `add_once`.
    #[must_use]
    pub fn is_once(&self) -> bool {
        self.inner.once
    }

    #[must_use]
    pub fn kind(&self) -> RegistrationKind {
        RegistrationKind::from_once(self.inner.once)
    }

    #[must_use]
    pub fn listener(&self) -> &Listener<T> {
        &self.inner.listener
    }

    #[must_use]
    pub fn scope(&self) -> Option<&Scope> {
        self.inner.scope.as_ref()
    }

    /// Returns `true` if both handles refer to the same binding.
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.inner, &b.inner)
    }

    pub(crate) fn unbind(&self) {
        self.inner.bound.set(false);
    }
}

impl<T> PartialEq for Binding<T> {
    fn eq(&self, other: &Self) -> bool {
        Self::ptr_eq(self, other)
    }
}

impl<T> Eq for Binding<T> {}

impl<T> fmt::Debug for Binding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("listener", &self.inner.listener)
            .field("once", &self.inner.once)
            .field("enabled", &self.is_enabled())
            .field("bound", &self.is_bound())
            .field("scope", &self.inner.scope)
            .finish()
    }
}

impl<T> fmt::Display for Binding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[Binding listener: {}, once: {}, enabled: {}, scope: ",
            self.inner.listener,
            self.inner.once,
            self.is_enabled()
        )?;
        match &self.inner.scope {
            Some(scope) => write!(f, "{}]", scope.type_name()),
            None => f.write_str("none]"),
        }
    }
}
