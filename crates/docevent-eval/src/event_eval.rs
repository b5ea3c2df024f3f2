//! Document-level scoring of event arguments.
//!
//! Each predicted event is aligned to the gold event of the same document
//! sharing the most equal arguments. Every predicted role counts as a
//! prediction, every non-null gold role as gold, and equal role values of an
//! aligned pair as true positives.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use docevent_resolve::{AliasList, DocumentEvents, EventAnnotation};

use crate::matching::text_overlaps;
use crate::{EvalError, Scoreboard};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventEvalConfig {
    /// Share of the gold text a predicted argument must cover.
    pub overlap_proportion: f64,
    /// Roles left out of the overall score.
    pub excluded_types: BTreeSet<String>,
    /// Let several predicted events align to the same gold event.
    pub replacement: bool,
}

impl Default for EventEvalConfig {
    fn default() -> Self {
        Self {
            overlap_proportion: 1.0,
            excluded_types: BTreeSet::new(),
            replacement: false,
        }
    }
}

/// Equality of a predicted and a gold argument value.
///
/// Both absent is equal; otherwise the prediction must overlap the gold text,
/// or one of the gold text's aliases, by at least `proportion`.
pub fn arguments_equal(
    pred: Option<&str>,
    gold: Option<&str>,
    coref: &BTreeMap<String, AliasList>,
    proportion: f64,
) -> bool {
    match (pred, gold) {
        (None, None) => true,
        (Some(pred), Some(gold)) => {
            text_overlaps(pred, gold, proportion)
                || coref
                    .get(gold)
                    .is_some_and(|aliases| aliases.iter().any(|alias| text_overlaps(pred, alias, proportion)))
        }
        _ => false,
    }
}

fn true_positives<F>(pred: &EventAnnotation, gold: &EventAnnotation, eq: F) -> usize
where
    F: Fn(Option<&str>, Option<&str>) -> bool,
{
    pred.args
        .iter()
        .filter(|(role, value)| {
            gold.args
                .get(*role)
                .is_some_and(|gold_value| eq(value.as_deref(), gold_value.as_deref()))
        })
        .count()
}

/// Index of the gold event with the most true positives against `pred`
/// (first on ties).
fn best_aligned<F>(pred: &EventAnnotation, gold: &[EventAnnotation], eq: F) -> Option<usize>
where
    F: Fn(Option<&str>, Option<&str>) -> bool + Copy,
{
    let mut best: Option<(usize, usize)> = None;
    for (index, candidate) in gold.iter().enumerate() {
        let tp = true_positives(pred, candidate, eq);
        if best.map_or(true, |(_, best_tp)| tp > best_tp) {
            best = Some((index, tp));
        }
    }
    best.map(|(index, _)| index)
}

fn count_gold(board: &mut Scoreboard, gold: &EventAnnotation) {
    for (role, value) in &gold.args {
        if value.is_some() {
            board.entry(role).gold += 1;
        }
    }
}

pub fn evaluate_events(
    pred: &[DocumentEvents],
    gold: &[DocumentEvents],
    config: &EventEvalConfig,
) -> Result<Scoreboard, EvalError> {
    if pred.len() != gold.len() {
        return Err(EvalError::CountMismatch {
            pred: pred.len(),
            gold: gold.len(),
        });
    }

    let mut board = Scoreboard::default();
    for (index, (p_doc, g_doc)) in pred.iter().zip(gold).enumerate() {
        if p_doc.doc_id != g_doc.doc_id {
            return Err(EvalError::MisalignedDocuments {
                index,
                pred: p_doc.doc_id.clone(),
                gold: g_doc.doc_id.clone(),
            });
        }

        let eq = |p: Option<&str>, g: Option<&str>| {
            arguments_equal(p, g, &g_doc.coref_spans, config.overlap_proportion)
        };
        let mut remaining: Vec<EventAnnotation> = g_doc.event.clone();

        for p_evt in &p_doc.event {
            for role in p_evt.args.keys() {
                board.entry(role).pred += 1;
            }
            let Some(aligned) = best_aligned(p_evt, &remaining, eq) else {
                debug!(doc_id = %p_doc.doc_id, types = ?p_evt.types, "no gold event left to align");
                continue;
            };
            let g_evt = &remaining[aligned];
            for (role, value) in &p_evt.args {
                if g_evt
                    .args
                    .get(role)
                    .is_some_and(|gold_value| eq(value.as_deref(), gold_value.as_deref()))
                {
                    board.entry(role).tp += 1;
                }
            }
            count_gold(&mut board, g_evt);
            if !config.replacement {
                remaining.remove(aligned);
            }
        }

        if !config.replacement {
            for g_evt in &remaining {
                count_gold(&mut board, g_evt);
            }
        }
    }

    board.total_excluding(|role| config.excluded_types.contains(role));
    Ok(board)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Counts;

    fn event(args: &[(&str, Option<&str>)]) -> EventAnnotation {
        EventAnnotation {
            types: vec!["EquityPledge".to_string()],
            args: args
                .iter()
                .map(|(role, value)| (role.to_string(), value.map(str::to_string)))
                .collect(),
        }
    }

    fn doc(doc_id: &str, event: Vec<EventAnnotation>) -> DocumentEvents {
        DocumentEvents {
            doc_id: doc_id.to_string(),
            coref_spans: BTreeMap::new(),
            event,
        }
    }

    #[test]
    fn aliases_of_the_gold_text_count() {
        let coref = BTreeMap::from([(
            "上海银行股份有限公司".to_string(),
            AliasList(vec!["上海银行".to_string()]),
        )]);
        assert!(arguments_equal(Some("上海银行"), Some("上海银行股份有限公司"), &coref, 1.0));
        assert!(!arguments_equal(Some("上海银行股份有限公司"), Some("上海银行"), &BTreeMap::new(), 2.0));
        assert!(arguments_equal(None, None, &coref, 1.0));
        assert!(!arguments_equal(Some("x"), None, &coref, 1.0));
    }

    #[test]
    fn aligns_to_the_best_gold_event() {
        let gold = vec![doc(
            "d",
            vec![
                event(&[("Pledger", Some("张三")), ("Pledgee", Some("银行A"))]),
                event(&[("Pledger", Some("李四")), ("Pledgee", Some("银行B")), ("StartDate", None)]),
            ],
        )];
        let pred = vec![doc(
            "d",
            vec![event(&[("Pledger", Some("李四")), ("Pledgee", Some("银行A"))])],
        )];
        let board = evaluate_events(&pred, &gold, &EventEvalConfig::default()).expect("eval");
        // aligned with the first gold event (tie on one argument, first wins)
        assert_eq!(board.by_type["Pledgee"], Counts::new(1, 1, 2));
        assert_eq!(board.by_type["Pledger"], Counts::new(0, 1, 2));
        assert_eq!(board.overall, Counts::new(1, 2, 4));
        assert!(!board.by_type.contains_key("StartDate"));
    }

    #[test]
    fn replacement_lets_gold_events_align_twice() {
        let gold = vec![doc("d", vec![event(&[("Pledger", Some("张三"))])])];
        let pred = vec![doc(
            "d",
            vec![event(&[("Pledger", Some("张三"))]), event(&[("Pledger", Some("张三"))])],
        )];

        let without = evaluate_events(&pred, &gold, &EventEvalConfig::default()).expect("eval");
        assert_eq!(without.overall, Counts::new(1, 2, 1));

        let with = EventEvalConfig {
            replacement: true,
            ..EventEvalConfig::default()
        };
        let board = evaluate_events(&pred, &gold, &with).expect("eval");
        assert_eq!(board.overall, Counts::new(2, 2, 2));
    }

    #[test]
    fn excluded_roles_leave_the_overall_score_only() {
        let gold = vec![doc("d", vec![event(&[("Pledger", Some("张三")), ("StartDate", Some("1月1日"))])])];
        let pred = vec![doc("d", vec![event(&[("Pledger", Some("张三")), ("StartDate", Some("2月1日"))])])];
        let config = EventEvalConfig {
            excluded_types: ["StartDate".to_string()].into(),
            ..EventEvalConfig::default()
        };
        let board = evaluate_events(&pred, &gold, &config).expect("eval");
        assert_eq!(board.overall, Counts::new(1, 1, 1));
        assert_eq!(board.by_type["StartDate"], Counts::new(0, 1, 1));
    }

    #[test]
    fn misaligned_documents_abort() {
        let err = evaluate_events(&[doc("a", vec![])], &[doc("b", vec![])], &EventEvalConfig::default())
            .unwrap_err();
        assert!(matches!(err, EvalError::MisalignedDocuments { index: 0, .. }));
    }
}
