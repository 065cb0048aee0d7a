//! Error reporting context for store operations.
//!
//! Each open [`File`](crate::File) carries one [`Diagnostics`] value. Failing
//! operations are reported through it (to a registered handler, or to
//! `tracing` when none is registered) in addition to being returned as
//! `Err`. Callers that probe for objects which may legitimately be missing
//! hold a [`SuppressGuard`] for the duration of the probe.

use std::cell::Cell;
use std::fmt;
use std::sync::Arc;

use crate::error::FormatError;

/// Callback receiving `(operation, error)` for every reported failure.
pub type ErrorHandler = Arc<dyn Fn(&str, &FormatError) + Send + Sync>;

/// Reporting state threaded through store calls.
#[derive(Clone)]
pub struct Diagnostics {
    handler: Option<ErrorHandler>,
    enabled: Cell<bool>,
    suppressed: Cell<usize>,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("handler", &self.handler.is_some())
            .field("enabled", &self.enabled.get())
            .field("suppressed", &self.suppressed.get())
            .finish()
    }
}

impl Diagnostics {
    /// Reporting enabled, routed to `tracing`.
    pub fn new() -> Self {
        Diagnostics {
            handler: None,
            enabled: Cell::new(true),
            suppressed: Cell::new(0),
        }
    }

    /// Reporting routed to `handler`.
    pub fn with_handler(handler: ErrorHandler) -> Self {
        Diagnostics {
            handler: Some(handler),
            ..Self::new()
        }
    }

    /// Turn reporting on or off altogether.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.set(enabled);
    }

    /// True when a failure reported now would be emitted.
    pub fn is_reporting(&self) -> bool {
        self.enabled.get() && self.suppressed.get() == 0
    }

    /// Silence reporting until the returned guard is dropped.
    ///
    /// Guards nest; reporting resumes when the outermost one is dropped.
    pub fn suppress(&self) -> SuppressGuard<'_> {
        self.suppressed.set(self.suppressed.get() + 1);
        SuppressGuard { diagnostics: self }
    }

    /// Report a failed operation.
    pub fn report(&self, operation: &str, error: &FormatError) {
        if !self.is_reporting() {
            return;
        }
        match &self.handler {
            Some(handler) => handler(operation, error),
            None => tracing::warn!(operation, %error, "store operation failed"),
        }
    }
}

/// Restores reporting when dropped.
#[must_use = "reporting is restored as soon as the guard is dropped"]
pub struct SuppressGuard<'a> {
    diagnostics: &'a Diagnostics,
}

impl Drop for SuppressGuard<'_> {
    fn drop(&mut self) {
        let n = self.diagnostics.suppressed.get();
        self.diagnostics.suppressed.set(n.saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recording() -> (Diagnostics, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let diag = Diagnostics::with_handler(Arc::new(move |op: &str, _e: &FormatError| {
            sink.lock().unwrap().push(op.to_string());
        }));
        (diag, seen)
    }

    #[test]
    fn guard_restores_reporting() {
        let (diag, seen) = recording();
        {
            let _quiet = diag.suppress();
            diag.report("probe", &FormatError::NotFound("/x".into()));
            {
                let _inner = diag.suppress();
            }
            assert!(!diag.is_reporting());
        }
        assert!(diag.is_reporting());
        diag.report("open", &FormatError::NotFound("/y".into()));
        assert_eq!(*seen.lock().unwrap(), vec!["open".to_string()]);
    }

    #[test]
    fn disabled_reports_nothing() {
        let (diag, seen) = recording();
        diag.set_enabled(false);
        diag.report("open", &FormatError::ReadOnly);
        assert!(seen.lock().unwrap().is_empty());
    }
}
