//! redb table definitions for the application record store.
//!
//! Record tables use `&str` keys and `&[u8]` values (JSON-serialized domain
//! types). Keys are built by the `table_key` methods in `types`.

use redb::TableDefinition;

/// Application rows keyed by `{cluster_id}/{name}`.
pub const APPLICATIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("applications");

/// Deploy events keyed by `{application_id:020}:{timestamp:020}:{event_id}`.
pub const EVENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("events");

/// Registries keyed by `{project_id}:{registry_id:020}`.
pub const REGISTRIES: TableDefinition<&str, &[u8]> = TableDefinition::new("registries");

/// Id sequences keyed by record kind.
pub const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

pub const APPLICATION_SEQ: &str = "application";
pub const REGISTRY_SEQ: &str = "registry";
