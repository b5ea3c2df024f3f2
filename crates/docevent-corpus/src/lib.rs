//! ChFinAnn corpora
//!
//! Reads annotated financial announcement corpora and derives the two views
//! the resolver is trained and scored against:
//!
//! - [`project_corpus`]: gold events projected onto per-sentence entity and
//!   relation annotations (the resolver's input format).
//! - [`gold_corpus`]: gold events as document event annotations (the
//!   resolver's output format).

mod error;
pub mod gold;
pub mod projection;
pub mod reader;

pub use error::CorpusError;
pub use gold::{gold_corpus, gold_events};
pub use projection::{
    project_corpus, project_document, resolve_overlapping_arguments, sentence_entities,
    sentence_relations, Placement, PRIOR_ARGUMENT_ORDER,
};
pub use reader::{load_corpus, read_corpus, ChFinAnnDocument, CorpusEntry, EventArgs, GoldEvent};
