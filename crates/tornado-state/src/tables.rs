//! redb table definitions.
//!
//! Values are JSON-serialized domain types.

use redb::TableDefinition;

/// Deployment state keyed by project name.
pub const DEPLOYMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("deployments");
