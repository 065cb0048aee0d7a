//! Settings shared by the reader, fetcher and writer.

use std::fmt;

use hltree_format::{CreationProperties, Diagnostics, ErrorHandler};

use crate::node::Compression;

/// Configuration for [`Reader`](crate::Reader), [`Fetcher`](crate::Fetcher)
/// and [`Writer`](crate::Writer).
#[derive(Clone)]
pub struct Config {
    /// Report store failures (to the handler, or to `tracing`).
    pub report_store_errors: bool,
    /// Resolve references through a path index built once per fetch batch.
    pub reference_index: bool,
    /// Compression for datasets that carry no setting of their own.
    pub compression: Compression,
    /// Properties for newly created containers.
    pub creation: CreationProperties,
    /// Receives store failures instead of `tracing`.
    pub error_handler: Option<ErrorHandler>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            report_store_errors: true,
            reference_index: false,
            compression: Compression::default(),
            creation: CreationProperties::default(),
            error_handler: None,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("report_store_errors", &self.report_store_errors)
            .field("reference_index", &self.reference_index)
            .field("compression", &self.compression)
            .field("creation", &self.creation)
            .field("error_handler", &self.error_handler.is_some())
            .finish()
    }
}

impl Config {
    pub fn with_store_errors(mut self, report: bool) -> Self {
        self.report_store_errors = report;
        self
    }

    pub fn with_reference_index(mut self, enabled: bool) -> Self {
        self.reference_index = enabled;
        self
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_userblock(mut self, size: u64) -> Self {
        self.creation.userblock = size;
        self
    }

    pub fn with_error_handler(mut self, handler: ErrorHandler) -> Self {
        self.error_handler = Some(handler);
        self
    }

    /// Fresh diagnostics context for one store session.
    pub(crate) fn diagnostics(&self) -> Diagnostics {
        let diagnostics = match &self.error_handler {
            Some(handler) => Diagnostics::with_handler(handler.clone()),
            None => Diagnostics::new(),
        };
        diagnostics.set_enabled(self.report_store_errors);
        diagnostics
    }
}
