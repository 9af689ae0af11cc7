//! Symcat Core — symbol catalog building and column normalization for
//! per-symbol delimited price files.
//!
//! This crate contains:
//! - Path templates with a single `*` wildcard marking the symbol
//! - Header lookup of columns by name
//! - A single-pass range scanner with the 5x price-jump rejection rule
//! - Catalog assembly with template precedence and an exclusion list
//! - In-place numeric normalization of designated columns

pub mod cancel;
pub mod catalog;
pub mod config;
pub mod data;
pub mod normalize;
pub mod progress;

pub use cancel::CancelToken;
pub use catalog::{Catalog, CatalogBuilder, CatalogEntry, CatalogError, CatalogSummary};
pub use config::{ConfigError, SymcatConfig};
pub use data::{
    ExclusionSet, PathTemplate, Rejection, ScanOutcome, ScanSettings, StreamScanner,
    TemplateSet, TimeRange,
};
pub use normalize::{NormalizeError, NormalizeSettings, NormalizeSummary, Normalizer};
pub use progress::{NoProgress, ProgressSink, StdoutProgress};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: values handed across threads by embedders stay
    /// Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<CancelToken>();
        require_sync::<CancelToken>();
        require_send::<Catalog>();
        require_sync::<Catalog>();
        require_send::<CatalogSummary>();
        require_sync::<CatalogSummary>();
        require_send::<TemplateSet>();
        require_sync::<TemplateSet>();
        require_send::<ExclusionSet>();
        require_sync::<ExclusionSet>();
        require_send::<ScanSettings>();
        require_sync::<ScanSettings>();
        require_send::<SymcatConfig>();
        require_sync::<SymcatConfig>();
    }
}
