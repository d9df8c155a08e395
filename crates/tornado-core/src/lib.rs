//! tornado-core: configuration engine for multi-region Tornado deployments.
//!
//! Turns a loosely-specified input document into concrete per-region
//! deployment requests:
//!
//! ```text
//! InputDocument ──normalize──▶ CanonicalConfig ──resolve_regions──▶ [RegionConfig]
//!                                                                      │
//!                     build_placeholder_records ◀──────────────────────┘
//!                               │
//!                     resolve_placeholders (after gateway deploy)
//! ```
//!
//! # Components
//!
//! - **`config`**: input document loading (TOML / JSON) and typed views
//! - **`merge`**: recursive structural merge with array-union keys
//! - **`normalize`**: defaults, forced values and function naming
//! - **`region`**: per-region override resolution
//! - **`placeholder`**: pending DNS record values and their resolution

pub mod config;
pub mod error;
pub mod merge;
pub mod naming;
pub mod normalize;
pub mod placeholder;
pub mod region;
pub mod types;

pub use config::InputDocument;
pub use error::{ConfigError, ConfigResult, UnresolvedPlaceholder};
pub use merge::{ARRAY_UNION_KEYS, merge, merge_maps};
pub use normalize::{NormalizeContext, normalize};
pub use placeholder::{
    CheckedDomain, DomainPlan, DomainRecordRequest, RecordValue, ResolvedDomainPlan,
    build_placeholder_records, resolve_placeholders,
};
pub use region::resolve_regions;
pub use types::*;
