//! File discovery, header lookup and range scanning.

pub mod exclusion;
pub mod scan;
pub mod schema;
pub mod template;

pub use exclusion::{ExclusionError, ExclusionSet};
pub use scan::{
    OutlierGuard, RangeTracker, Rejection, ScanError, ScanOutcome, ScanSettings, StreamScanner,
    TimeRange,
};
pub use schema::HeaderIndex;
pub use template::{expand_globs, PathTemplate, TemplateError, TemplateSet};
