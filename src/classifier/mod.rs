// Table-Driven Endpoint Classification
//
// Derives endpoint name, functional category and auth flag for each completed
// request. The keyword tables live in TOML (embedded default or a user file)
// so workloads with different endpoint naming need no recompilation.
//
// All lookups are pure: the same endpoint string always yields the same
// category and auth flag.

mod definition;
mod tables;

pub use definition::CategoryDefinition;
pub use tables::{endpoint_from_url, ClassifierError, ClassifierTables};
