//! Document-level event record resolution
//!
//! Turns sentence-level entity/relation annotations of a document into
//! document-level event records:
//!
//! 1. **Prepare** each sentence graph: break relation cycles, drop micro-spans,
//!    recover missed argument types with pattern extractors.
//! 2. **Assign** every entity to a record by walking relation heads (or the
//!    nearest preceding trigger), forking records on role conflicts.
//! 3. **Merge** partial records greedily within an index window, keeping
//!    complete ones, and serialize those with enough arguments.
//!
//! Entity equality during merging is text equality extended by the
//! document's coreference table.

pub mod annotation;
pub mod augment;
pub mod config;
pub mod coref;
pub mod engine;
pub mod error;
pub mod graph;
pub mod pipeline;
pub mod record;
pub mod span;

pub use annotation::{
    group_documents, read_jsonl, read_jsonl_file, write_jsonl, DocumentEvents, EntityAnnotation,
    EventAnnotation, RelationAnnotation, SentenceAnnotation,
};
pub use augment::{default_extractors, PatternExtractor, PatternMatch};
pub use config::{ProximityFallback, ResolveConfig};
pub use coref::{AliasList, CorefSpans, MentionLoc};
pub use engine::{deduplicate_records, window_pairs, RecordArena, RecordId, Resolver};
pub use error::ResolveError;
pub use graph::{deduplicate, DocumentGraph, EntityRef, SentenceGraph};
pub use pipeline::{prepare_document, resolve_documents, PrepareStats};
pub use record::{Arg, Record, Slot};
pub use span::{longest_common_substring, span_distance, spans_overlap, Span};
