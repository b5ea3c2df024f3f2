//! Sentence-level scoring of entities and relations.
//!
//! Predicted and gold streams are aligned line by line. A predicted object is
//! a true positive if any gold object of the same sentence matches it; counts
//! are broken down by entity type or relation label.

use serde::{Deserialize, Serialize};

use docevent_resolve::SentenceAnnotation;

use crate::matching::{EntityMetric, RelationMetric};
use crate::{EvalError, Scoreboard};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpanEvalConfig {
    /// Share of the gold text the overlap metric requires.
    pub overlap_proportion: f64,
}

impl Default for SpanEvalConfig {
    fn default() -> Self {
        Self {
            overlap_proportion: 1.0,
        }
    }
}

/// Pair predicted and gold sentences, failing on different lengths or on a
/// `(doc_id, sent_id)` mismatch.
fn aligned<'a>(
    pred: &'a [SentenceAnnotation],
    gold: &'a [SentenceAnnotation],
) -> Result<impl Iterator<Item = (&'a SentenceAnnotation, &'a SentenceAnnotation)>, EvalError> {
    if pred.len() != gold.len() {
        return Err(EvalError::CountMismatch {
            pred: pred.len(),
            gold: gold.len(),
        });
    }
    for (index, (p, g)) in pred.iter().zip(gold).enumerate() {
        if (&p.doc_id, p.sent_id) != (&g.doc_id, g.sent_id) {
            return Err(EvalError::MisalignedDocuments {
                index,
                pred: format!("{}#{}", p.doc_id, p.sent_id),
                gold: format!("{}#{}", g.doc_id, g.sent_id),
            });
        }
    }
    Ok(pred.iter().zip(gold))
}

pub fn evaluate_entities(
    pred: &[SentenceAnnotation],
    gold: &[SentenceAnnotation],
    metric: EntityMetric,
    config: &SpanEvalConfig,
) -> Result<Scoreboard, EvalError> {
    let mut board = Scoreboard::default();
    for (p, g) in aligned(pred, gold)? {
        for entity in &p.entity {
            let hit = g
                .entity
                .iter()
                .any(|candidate| metric.matches(entity, candidate, config.overlap_proportion));
            let counts = board.entry(&entity.role);
            counts.pred += 1;
            counts.tp += usize::from(hit);
        }
        for entity in &g.entity {
            board.entry(&entity.role).gold += 1;
        }
    }
    board.total_excluding(|_| false);
    Ok(board)
}

pub fn evaluate_relations(
    pred: &[SentenceAnnotation],
    gold: &[SentenceAnnotation],
    metric: RelationMetric,
) -> Result<Scoreboard, EvalError> {
    let mut board = Scoreboard::default();
    for (p, g) in aligned(pred, gold)? {
        for relation in &p.relation {
            let hit = g
                .relation
                .iter()
                .any(|candidate| metric.matches(relation, candidate, &p.entity, &g.entity));
            let counts = board.entry(&relation.label);
            counts.pred += 1;
            counts.tp += usize::from(hit);
        }
        for relation in &g.relation {
            board.entry(&relation.label).gold += 1;
        }
    }
    board.total_excluding(|_| false);
    Ok(board)
}
