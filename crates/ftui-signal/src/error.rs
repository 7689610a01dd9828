#![forbid(unsafe_code)]

//! Registration errors.
//!
//! Every failure-shaped situation in a signal other than the ones listed
//! here is a silent no-op (removing an unknown listener, halting outside a
//! dispatch pass, dispatching on a disabled signal). The variants below are
//! usage-contract violations and are reported synchronously by the
//! registering call. A rejected registration leaves the signal untouched.
//!
//! | Error | Cause |
//! |-------|-------|
//! | [`SignalError::ConflictingRegistration`] | `add` after `add_once` (or vice versa) for one listener |
//! | [`SignalError::MissingScope`] | scoped listener registered without a scope |
//! | [`SignalError::ScopeMismatch`] | scope value is not of the listener's scope type |

/// How a listener was (or is being) registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistrationKind {
    /// Registered with `add`; survives dispatch.
    Persistent,
    /// Registered with `add_once`; removed on first execution.
    Once,
}

impl RegistrationKind {
    /// Kind matching a binding's once-flag.
    #[must_use]
    pub const fn from_once(once: bool) -> Self {
        if once { Self::Once } else { Self::Persistent }
    }

    /// Name of the registering operation.
    #[must_use]
    pub const fn operation(self) -> &'static str {
        match self {
            Self::Persistent => "add()",
            Self::Once => "add_once()",
        }
    }
}

impl std::fmt::Display for RegistrationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.operation())
    }
}

/// Errors from signal registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalError {
    /// The listener is already bound with the other registration kind.
    ConflictingRegistration {
        existing: RegistrationKind,
        requested: RegistrationKind,
    },
    /// A scoped listener was registered without a scope value.
    MissingScope { expected: &'static str },
    /// The scope value's type does not match the listener's scope type.
    ScopeMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

impl std::fmt::Display for SignalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConflictingRegistration {
                existing,
                requested,
            } => write!(
                f,
                "cannot {existing} then {requested} the same listener without removing the relationship first"
            ),
            Self::MissingScope { expected } => {
                write!(f, "listener expects a scope of type `{expected}` but none was given")
            }
            Self::ScopeMismatch { expected, found } => {
                write!(f, "listener expects a scope of type `{expected}`, got `{found}`")
            }
        }
    }
}

impl std::error::Error for SignalError {}
