//! Type-level search over the resource store.
//!
//! Supports `_profile` filtering, single-key `_sort`, `_count` truncation and
//! reference expansion through `_include` / `_include:iterate`.

pub mod engine;
pub mod include;
pub mod params;

pub use engine::{SearchEngine, SearchEntryMode, SearchError, SearchResult};
pub use include::{IncludeContext, MAX_INCLUDE_DEPTH, expand_includes, include_depth};
pub use params::SearchParams;
