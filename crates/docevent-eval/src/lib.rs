//! Evaluation of predicted annotations against gold annotations.
//!
//! - Sentence level: entities under the `exact`, `offset`, `string` and
//!   `overlap` metrics, relations under `exact` and `string`.
//! - Document level: event arguments, aligning every predicted event with its
//!   best gold event and comparing role values with the overlap rule extended
//!   by the gold coreference aliases.
//!
//! Results are [`Scoreboard`]s: overall and per-type true positives,
//! prediction and gold counts with the derived P/R/F1.

mod error;
pub mod event_eval;
pub mod matching;
pub mod metrics;
pub mod span_eval;

pub use error::EvalError;
pub use event_eval::{arguments_equal, evaluate_events, EventEvalConfig};
pub use matching::{text_overlaps, EntityMetric, RelationMetric, UnknownMetric};
pub use metrics::{Counts, Scoreboard};
pub use span_eval::{evaluate_entities, evaluate_relations, SpanEvalConfig};
