//! Event schema store
//!
//! An event schema declares, for every event type:
//! - `primary_args`: the roles a record must hold before it counts as complete
//!   for that type (the first one is the trigger role),
//! - `args`: every role the type accepts,
//! - `event_relations`: legal `(head_role, dependent_role)` pairs.
//!
//! Schemas are loaded once and then shared read-only (`&Schema`) by every
//! resolution call of a document batch.

mod error;
mod schema;
mod type_set;

pub use error::SchemaLoadError;
pub use schema::{EventDecl, Schema};
pub use type_set::{EventTypeId, TypeSet};
