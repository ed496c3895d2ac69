use thiserror::Error;

/// Failure to read something off the page.
///
/// None of these ever reach the host: callers degrade them to
/// `None`/`false`/`Unknown` through [`Probe`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("no element for {0}")]
    MissingElement(String),

    #[error("element has no usable `{0}` attribute")]
    MissingAttribute(String),

    #[error("invalid selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("node is no longer part of the document")]
    Detached,
}

/// Fallback combinator for DOM probes
pub trait Probe<T> {
    /// Use `fallback` when the probe failed
    fn degrade_or(self, probe: &str, fallback: T) -> T;

    /// Use `T::default()` when the probe failed
    fn degrade(self, probe: &str) -> T
    where
        T: Default;
}

impl<T> Probe<T> for Result<T, LookupError> {
    fn degrade_or(self, probe: &str, fallback: T) -> T {
        match self {
            Ok(value) => value,
            Err(e) => {
                log::trace!("{} unavailable: {}", probe, e);
                fallback
            }
        }
    }

    fn degrade(self, probe: &str) -> T
    where
        T: Default,
    {
        self.degrade_or(probe, T::default())
    }
}
