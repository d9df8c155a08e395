//! tornado-state: persisted deployment state.
//!
//! Backed by [redb](https://docs.rs/redb). One record per project holds
//! exactly what teardown needs: the function and gateway resource references
//! and the list of DNS domains that were deployed.
//!
//! Records are written only after a deploy has fully completed and are read,
//! never recomputed, during teardown. The `StateStore` is `Clone` + `Send` +
//! `Sync` (backed by `Arc<Database>`).

pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use store::StateStore;
pub use types::*;
