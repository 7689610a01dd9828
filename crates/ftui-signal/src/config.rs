#![forbid(unsafe_code)]

//! Construction-time signal configuration.

/// Configuration applied when a [`Signal`](crate::Signal) is built.
///
/// With the `serde` feature enabled this type can be loaded from any serde
/// format; missing fields take their [`Default`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct SignalConfig {
    /// Initial state of the signal-level dispatch gate.
    pub enabled: bool,
    /// Remember the most recent dispatched payload and replay it to every
    /// binding returned by `add`/`add_once`.
    pub memorize: bool,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            memorize: false,
        }
    }
}

impl SignalConfig {
    /// Config for a signal that replays its last payload to late listeners.
    #[must_use]
    pub fn memorizing() -> Self {
        Self {
            memorize: true,
            ..Default::default()
        }
    }

    /// Set the memorize flag.
    #[must_use]
    pub fn with_memorize(mut self, memorize: bool) -> Self {
        self.memorize = memorize;
        self
    }

    /// Set the initial enabled state.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}
