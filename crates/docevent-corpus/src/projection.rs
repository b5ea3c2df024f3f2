//! Projection of gold document-level events onto sentence-level
//! entity/relation annotations.
//!
//! Every gold event contributes, in every sentence, one entity per mention of
//! each of its arguments (plus mentions of the argument's aliases) and one
//! relation per entity pair whose roles form a legal relation of the event
//! type. The annotations of all events of a sentence are then deduplicated
//! into a single line.

use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::{info, warn};

use docevent_resolve::{deduplicate, EntityAnnotation, MentionLoc, RelationAnnotation, SentenceAnnotation};
use docevent_schema::{EventDecl, Schema};

use crate::reader::{ChFinAnnDocument, CorpusEntry, EventArgs, GoldEvent};

/// Argument pairs that commonly share a text without either being primary,
/// ordered by which one usually occurs first.
pub const PRIOR_ARGUMENT_ORDER: [(&str, &str); 4] = [
    ("StartDate", "EndDate"),
    ("EndDate", "ReleasedDate"),
    ("HighestTradingPrice", "LowestTradingPrice"),
    ("TotalHoldingShares", "TotalPledgedShares"),
];

/// Where an argument of one event is annotated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Every mention of the argument text (and its aliases).
    Unplaced,
    /// Exactly one mention.
    At(MentionLoc),
    /// Nowhere.
    Dropped,
}

/// Pin down arguments of one event that share the same text.
///
/// For an ordered role pair sharing a text, a primary role paired with a
/// non-primary one takes the first mention of the text and the other role
/// the second; otherwise a pair listed in [`PRIOR_ARGUMENT_ORDER`] is placed
/// in that order. A role with no mention left is dropped. Returns `None`
/// when some pair cannot be placed in either order, or when two primary
/// roles share a text.
pub fn resolve_overlapping_arguments(
    decl: &EventDecl,
    args: &EventArgs,
    doc: &ChFinAnnDocument,
) -> Option<BTreeMap<String, Placement>> {
    let is_primary = |role: &str| decl.primary_args.iter().any(|p| p == role);
    let mut placements = BTreeMap::new();
    let mut resolved: BTreeMap<(&str, &str), bool> = BTreeMap::new();

    for (role, text) in args.iter() {
        let Some(text) = text else { continue };
        for (other, other_text) in args.iter() {
            if role == other || other_text != Some(text) {
                continue;
            }
            let first_order = match (is_primary(role), is_primary(other)) {
                (true, true) => {
                    info!(event_type = %decl.name, role, other, text, "two primary arguments share a text");
                    return None;
                }
                (true, false) => true,
                _ => PRIOR_ARGUMENT_ORDER
                    .iter()
                    .any(|&(first, second)| first == role && second == other),
            };
            resolved.insert((role, other), first_order);
            if !first_order {
                continue;
            }

            let locations = doc.locations_of(text);
            let place = |i: usize| locations.get(i).copied().map_or(Placement::Dropped, Placement::At);
            placements.insert(role.to_string(), place(0));
            placements.insert(other.to_string(), place(1));
        }
    }

    for (&(role, other), &ok) in &resolved {
        if !ok && resolved.get(&(other, role)) == Some(&false) {
            info!(event_type = %decl.name, role, other, "cannot order arguments sharing a text");
            return None;
        }
    }
    Some(placements)
}

/// Entities of one event in sentence `sent_id`, ids assigned in order.
///
/// Alias mentions are skipped when an entity already emitted for the same
/// argument covers them.
pub fn sentence_entities(
    sent_id: usize,
    args: &EventArgs,
    placements: &BTreeMap<String, Placement>,
    doc: &ChFinAnnDocument,
) -> Vec<EntityAnnotation> {
    fn push(entities: &mut Vec<EntityAnnotation>, role: &str, loc: MentionLoc, text: &str) {
        entities.push(EntityAnnotation {
            ent_id: entities.len() as u32,
            role: role.to_string(),
            offset: loc.span,
            text: text.to_string(),
        });
    }

    let mut entities: Vec<EntityAnnotation> = Vec::new();

    for (role, text) in args.iter() {
        let Some(text) = text else { continue };
        match placements.get(role).copied().unwrap_or(Placement::Unplaced) {
            Placement::At(loc) if loc.sent_id == sent_id => push(&mut entities, role, loc, text),
            Placement::At(_) | Placement::Dropped => {}
            Placement::Unplaced => {
                let first = entities.len();
                for &loc in doc.locations_of(text).iter().filter(|l| l.sent_id == sent_id) {
                    push(&mut entities, role, loc, text);
                }
                for (alias, locations) in doc.coref_spans.aliases(text) {
                    for &loc in locations.iter().filter(|l| l.sent_id == sent_id) {
                        let covered = entities[first..].iter().any(|e| {
                            e.offset.start <= loc.span.start && e.offset.end + 1 >= loc.span.end
                        });
                        if !covered {
                            push(&mut entities, role, loc, alias);
                        }
                    }
                }
            }
        }
    }
    entities
}

/// Relations between every ordered pair of distinct entities whose roles
/// form a legal relation of the event type, labelled `Head-Dependent`.
pub fn sentence_relations(decl: &EventDecl, entities: &[EntityAnnotation]) -> Vec<RelationAnnotation> {
    let mut relations = Vec::new();
    for (i, head) in entities.iter().enumerate() {
        for (j, dependent) in entities.iter().enumerate() {
            if i == j {
                continue;
            }
            if decl
                .event_relations
                .contains(&(head.role.clone(), dependent.role.clone()))
            {
                relations.push(RelationAnnotation::new(
                    format!("{}-{}", head.role, dependent.role),
                    head.ent_id,
                    dependent.ent_id,
                ));
            }
        }
    }
    relations
}

fn project_event(
    schema: &Schema,
    entry: &CorpusEntry,
    event: &GoldEvent,
) -> Option<Vec<(Vec<EntityAnnotation>, Vec<RelationAnnotation>)>> {
    let doc = &entry.document;
    let Some(decl) = schema.decl_by_name(event.event_type()) else {
        warn!(doc_id = %entry.doc_id, event_type = event.event_type(), "event type missing from schema; event dropped");
        return None;
    };
    let Some(placements) = resolve_overlapping_arguments(decl, event.args(), doc) else {
        info!(doc_id = %entry.doc_id, record = event.record_id(), "overlapping arguments unresolved; event dropped");
        return None;
    };
    Some(
        (0..doc.sentences.len())
            .map(|sent_id| {
                let entities = sentence_entities(sent_id, event.args(), &placements, doc);
                let relations = sentence_relations(decl, &entities);
                (entities, relations)
            })
            .collect(),
    )
}

/// One sentence annotation per sentence of the document, in order.
pub fn project_document(schema: &Schema, entry: &CorpusEntry) -> Vec<SentenceAnnotation> {
    let doc = &entry.document;
    let projected: Vec<_> = doc
        .events
        .iter()
        .filter_map(|event| project_event(schema, entry, event))
        .collect();

    doc.sentences
        .iter()
        .enumerate()
        .filter_map(|(sent_id, text)| {
            let base = SentenceAnnotation {
                doc_id: entry.doc_id.clone(),
                sent_id,
                text: text.clone(),
                token: text.chars().map(String::from).collect(),
                entity: Vec::new(),
                relation: Vec::new(),
                coref_spans: doc.coref_spans.clone(),
            };
            let per_event: Vec<SentenceAnnotation> = projected
                .iter()
                .map(|sentences| {
                    let (entity, relation) = sentences[sent_id].clone();
                    SentenceAnnotation {
                        entity,
                        relation,
                        ..base.clone()
                    }
                })
                .collect();
            if per_event.is_empty() {
                Some(base)
            } else {
                deduplicate(&per_event)
            }
        })
        .collect()
}

/// Project every document of a corpus, keeping corpus order.
pub fn project_corpus(schema: &Schema, corpus: &[CorpusEntry]) -> Vec<SentenceAnnotation> {
    corpus
        .par_iter()
        .map(|entry| project_document(schema, entry))
        .collect::<Vec<_>>()
        .into_iter()
        .flatten()
        .collect()
}
