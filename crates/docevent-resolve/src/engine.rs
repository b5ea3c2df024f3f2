//! Resolution engine: entity → record assignment, then greedy windowed merging.
//!
//! Records live in an arena and entities point at their record through an
//! ownership table, so forking is a plain allocation and "already resolved"
//! is a table lookup. Head chains are walked with an explicit stack instead
//! of recursion.

use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use docevent_schema::Schema;

use crate::graph::{DocumentGraph, EntityRef};
use crate::record::{Arg, Record};
use crate::{DocumentEvents, EventAnnotation, ResolveConfig};

pub type RecordId = usize;

// ============================================================================
// Record arena
// ============================================================================

/// Records of one document and the entity → record ownership table.
#[derive(Debug)]
pub struct RecordArena<'s> {
    records: Vec<Record<'s>>,
    owner: HashMap<EntityRef, RecordId>,
}

impl<'s> RecordArena<'s> {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            owner: HashMap::new(),
        }
    }

    pub fn get(&self, id: RecordId) -> &Record<'s> {
        &self.records[id]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn owner(&self, entity: EntityRef) -> Option<RecordId> {
        self.owner.get(&entity).copied()
    }

    /// Add a record; returns its id.
    pub fn insert(&mut self, record: Record<'s>) -> RecordId {
        self.records.push(record);
        self.records.len() - 1
    }

    /// Fill `arg` into record `id`; on success the entity is owned by it.
    pub fn fill(&mut self, id: RecordId, arg: Arg<'_>) -> bool {
        let filled = self.records[id].fill(Some(arg));
        if filled {
            self.owner.insert(arg.entity, id);
        }
        filled
    }

    /// Fill `arg` into a fork of record `id`. The fork is kept only if the
    /// fill succeeds.
    pub fn fork_and_fill(&mut self, id: RecordId, arg: Arg<'_>) -> Option<RecordId> {
        let mut fork = self.records[id].fork();
        if !fork.fill(Some(arg)) {
            return None;
        }
        let fork_id = self.insert(fork);
        self.owner.insert(arg.entity, fork_id);
        Some(fork_id)
    }

    /// Records owned by at least one entity, in document order of their first
    /// owner.
    pub fn owned_records(&self, order: impl Iterator<Item = EntityRef>) -> Vec<Record<'s>> {
        let mut seen = HashSet::new();
        order
            .filter_map(|entity| self.owner(entity))
            .filter(|id| seen.insert(*id))
            .map(|id| self.records[id].clone())
            .collect()
    }
}

impl Default for RecordArena<'_> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Assignment
// ============================================================================

enum Step {
    Done(bool),
    Expand(Vec<EntityRef>),
}

struct Frame {
    entity: EntityRef,
    heads: Vec<EntityRef>,
    next: usize,
    success: bool,
}

impl Frame {
    fn new(entity: EntityRef, heads: Vec<EntityRef>) -> Self {
        Self {
            entity,
            heads,
            next: 0,
            success: false,
        }
    }
}

/// Turns the entity/relation graph of one document into event records.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'s, 'c> {
    schema: &'s Schema,
    config: &'c ResolveConfig,
}

impl<'s, 'c> Resolver<'s, 'c> {
    pub fn new(schema: &'s Schema, config: &'c ResolveConfig) -> Self {
        Self { schema, config }
    }

    /// Resolve a prepared document into its final record list.
    pub fn resolve(&self, doc: &DocumentGraph) -> Vec<Record<'s>> {
        let mut arena = RecordArena::new();
        for entity in doc.entity_refs() {
            if self.config.excluded_types.contains(&doc.entity(entity).role) {
                continue;
            }
            self.assign(doc, &mut arena, entity);
        }

        let records = arena.owned_records(doc.entity_refs());
        debug!(doc_id = %doc.doc_id, records = records.len(), "assigned entities to records");
        self.merge_records(records, |a, b| doc.entities_equal(a, b))
    }

    /// Resolve and serialize, keeping events with more than `min_args` roles.
    pub fn annotate(&self, doc: &DocumentGraph) -> DocumentEvents {
        let event = self
            .resolve(doc)
            .into_iter()
            .filter(|record| record.len() > self.config.min_args)
            .map(|record| EventAnnotation {
                types: record.type_names(),
                args: record
                    .items()
                    .iter()
                    .map(|(role, slot)| (role.clone(), Some(doc.entity(slot.entity).text.clone())))
                    .collect(),
            })
            .collect();
        DocumentEvents {
            doc_id: doc.doc_id.clone(),
            coref_spans: doc.coref.alias_lists(),
            event,
        }
    }

    /// Attach `root` to a record, resolving its heads first.
    ///
    /// A trigger starts a new record. Any other entity is filled into the
    /// record of each head that resolves; a slot already holding a different
    /// entity forks the head's record. Returns true if the entity ends up in
    /// some record.
    pub fn assign(&self, doc: &DocumentGraph, arena: &mut RecordArena<'s>, root: EntityRef) -> bool {
        let heads = match self.step(doc, arena, root) {
            Step::Done(result) => return result,
            Step::Expand(heads) => heads,
        };

        let mut stack = vec![Frame::new(root, heads)];
        let mut in_progress = HashSet::from([root]);
        let mut finished: Option<bool> = None;

        while let Some(frame) = stack.last_mut() {
            if let Some(resolved) = finished.take() {
                let head = frame.heads[frame.next];
                frame.next += 1;
                if resolved && self.attach(doc, arena, frame.entity, head) {
                    frame.success = true;
                }
                continue;
            }

            let Some(&head) = frame.heads.get(frame.next) else {
                let success = frame.success;
                in_progress.remove(&frame.entity);
                stack.pop();
                if stack.is_empty() {
                    return success;
                }
                finished = Some(success);
                continue;
            };

            if in_progress.contains(&head) {
                debug!(doc_id = %doc.doc_id, ?head, "head chain loops back; skipped");
                finished = Some(false);
                continue;
            }
            match self.step(doc, arena, head) {
                Step::Done(result) => finished = Some(result),
                Step::Expand(heads) => {
                    in_progress.insert(head);
                    stack.push(Frame::new(head, heads));
                }
            }
        }
        false
    }

    fn step(&self, doc: &DocumentGraph, arena: &mut RecordArena<'s>, entity: EntityRef) -> Step {
        if arena.owner(entity).is_some() {
            return Step::Done(true);
        }
        let role = doc.entity(entity).role.as_str();
        if self.schema.is_trigger_role(role) {
            let id = arena.insert(Record::new(self.schema));
            return Step::Done(arena.fill(id, Arg::new(entity, role)));
        }
        let heads = self.find_heads(doc, entity);
        if heads.is_empty() {
            debug!(doc_id = %doc.doc_id, ?entity, role, "no head found; entity left unassigned");
            return Step::Done(false);
        }
        Step::Expand(heads)
    }

    /// Fill `entity` into the record owned by its resolved `head`.
    fn attach(
        &self,
        doc: &DocumentGraph,
        arena: &mut RecordArena<'s>,
        entity: EntityRef,
        head: EntityRef,
    ) -> bool {
        let Some(id) = arena.owner(head) else {
            return false;
        };
        let arg = Arg::new(entity, doc.entity(entity).role.as_str());
        match arena.get(id).slot(arg.role).copied() {
            None => arena.fill(id, arg),
            Some(slot) if !slot.occupied => arena.fill(id, arg),
            Some(slot) if slot.entity == entity => false,
            Some(_) => arena.fork_and_fill(id, arg).is_some(),
        }
    }

    /// Heads of `entity`: relation heads in its own sentence, or else the
    /// nearest preceding trigger within the configured reach.
    ///
    /// Within the chosen sentence the trigger starting last wins; the first
    /// one wins on equal starts.
    pub fn find_heads(&self, doc: &DocumentGraph, entity: EntityRef) -> Vec<EntityRef> {
        let sentence = &doc.sentences[entity.sentence];
        let heads: Vec<EntityRef> = sentence
            .heads_of(entity.index)
            .into_iter()
            .map(|index| EntityRef::new(entity.sentence, index))
            .collect();
        if !heads.is_empty() {
            return heads;
        }

        let role = doc.entity(entity).role.as_str();
        let reach = self.config.fallback.reach(self.schema.is_primary_role(role));
        let earliest = entity.sentence.saturating_sub(reach);
        for s in (earliest..entity.sentence).rev() {
            let nearest = doc.sentences[s]
                .entities
                .iter()
                .enumerate()
                .filter(|(_, e)| self.schema.is_trigger_role(&e.role))
                .fold(None, |best: Option<(usize, usize)>, (index, e)| match best {
                    Some((_, start)) if start >= e.offset.start => best,
                    _ => Some((index, e.offset.start)),
                });
            if let Some((index, _)) = nearest {
                return vec![EntityRef::new(s, index)];
            }
        }
        Vec::new()
    }

    // ========================================================================
    // Merging
    // ========================================================================

    /// Greedy windowed merge.
    ///
    /// Each round tries every pair of records whose indices differ by less
    /// than the window. A record that merged with nothing is emitted if it is
    /// complete; the deduplicated merge results form the next round. A single
    /// remaining record is emitted as is. When a round does not shrink the
    /// list, merging stops and only its complete records are kept.
    pub fn merge_records<F>(&self, records: Vec<Record<'s>>, eq: F) -> Vec<Record<'s>>
    where
        F: Fn(EntityRef, EntityRef) -> bool + Copy,
    {
        let mut records = deduplicate_records(records, eq);
        let mut output = Vec::new();
        let mut round = 0;

        loop {
            if records.len() <= 1 {
                output.append(&mut records);
                break;
            }
            round += 1;

            let mut merged_any = vec![false; records.len()];
            let mut merged = Vec::new();
            for (i, j) in window_pairs(records.len(), self.config.window) {
                match records[i].merge(&records[j], eq) {
                    Some(record) => {
                        merged_any[i] = true;
                        merged_any[j] = true;
                        merged.push(record);
                    }
                    None => debug!(i, j, "records do not merge"),
                }
            }

            for (record, _) in records.iter().zip(&merged_any).filter(|(_, m)| !**m) {
                if record.is_complete() {
                    output.push(record.clone());
                }
            }

            let next = deduplicate_records(merged, eq);
            if next.len() >= records.len() {
                if same_records(&records, &next, eq) {
                    warn!(records = next.len(), round, "merging reached a fixpoint; keeping complete records");
                } else {
                    debug!(records = next.len(), round, "record list stopped shrinking; keeping complete records");
                }
                output.extend(next.into_iter().filter(Record::is_complete));
                break;
            }
            records = next;
        }

        deduplicate_records(output, eq)
    }
}

/// Index pairs `(i, j)` with `i < j < len` and `j - i < window`, in
/// row-major order.
pub fn window_pairs(len: usize, window: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..len).flat_map(move |i| (i + 1..len.min(i.saturating_add(window))).map(move |j| (i, j)))
}

/// Keep each record unless an earlier kept record compares equal to it.
pub fn deduplicate_records<'s, F>(records: Vec<Record<'s>>, eq: F) -> Vec<Record<'s>>
where
    F: Fn(EntityRef, EntityRef) -> bool + Copy,
{
    let mut kept: Vec<Record<'s>> = Vec::with_capacity(records.len());
    for record in records {
        if !kept.iter().any(|k| k.compare(&record, eq)) {
            kept.push(record);
        }
    }
    kept
}

fn same_records<F>(a: &[Record<'_>], b: &[Record<'_>], eq: F) -> bool
where
    F: Fn(EntityRef, EntityRef) -> bool + Copy,
{
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.compare(y, eq))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::SentenceGraph;
    use crate::{CorefSpans, EntityAnnotation, ProximityFallback, RelationAnnotation, Span};
    use docevent_schema::EventDecl;

    fn schema() -> Schema {
        Schema::from_decls(vec![
            EventDecl::new(
                "EquityPledge",
                ["PledgeTrigger", "Pledger"],
                ["PledgeTrigger", "Pledger", "PledgedShares", "Pledgee"],
                [
                    ("PledgeTrigger", "Pledger"),
                    ("PledgeTrigger", "PledgedShares"),
                    ("Pledger", "Pledgee"),
                ],
            ),
            EventDecl::new(
                "EquityFreeze",
                ["FreezeTrigger", "EquityHolder"],
                ["FreezeTrigger", "EquityHolder", "FrozeShares"],
                [("FreezeTrigger", "EquityHolder")],
            ),
        ])
        .expect("schema")
    }

    fn ent(ent_id: u32, role: &str, start: usize, text: &str) -> EntityAnnotation {
        EntityAnnotation {
            ent_id,
            role: role.to_string(),
            offset: Span::new(start, start + text.chars().count()),
            text: text.to_string(),
        }
    }

    fn rel(head: u32, dep: u32) -> RelationAnnotation {
        RelationAnnotation::new("r", head, dep)
    }

    fn doc(sentences: Vec<(Vec<EntityAnnotation>, Vec<RelationAnnotation>)>) -> DocumentGraph {
        DocumentGraph {
            doc_id: "d".to_string(),
            sentences: sentences
                .into_iter()
                .enumerate()
                .map(|(i, (e, r))| SentenceGraph::new(i, "", e, r))
                .collect(),
            coref: CorefSpans::new(),
        }
    }

    fn text_of<'a>(doc: &'a DocumentGraph, record: &Record<'_>, role: &str) -> Option<&'a str> {
        record.slot(role).map(|s| doc.entity(s.entity).text.as_str())
    }

    #[test]
    fn window_pairs_respect_the_window() {
        assert_eq!(window_pairs(3, 1).count(), 0);
        assert_eq!(window_pairs(3, 2).collect::<Vec<_>>(), vec![(0, 1), (1, 2)]);
        assert_eq!(
            window_pairs(3, 3).collect::<Vec<_>>(),
            vec![(0, 1), (0, 2), (1, 2)]
        );
        assert_eq!(window_pairs(0, 3).count(), 0);
        assert_eq!(window_pairs(4, usize::MAX).count(), 6);
    }

    #[test]
    fn relation_chain_builds_one_record() {
        let schema = schema();
        let config = ResolveConfig::default();
        let doc = doc(vec![(
            vec![
                ent(0, "PledgeTrigger", 0, "质押"),
                ent(1, "Pledger", 3, "Alice"),
                ent(2, "PledgedShares", 9, "1000股"),
                ent(3, "Pledgee", 20, "Bank"),
            ],
            vec![rel(0, 1), rel(0, 2), rel(1, 3)],
        )]);
        let records = Resolver::new(&schema, &config).resolve(&doc);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].len(), 4);
        assert_eq!(records[0].type_names(), vec!["EquityPledge"]);
    }

    #[test]
    fn conflicting_argument_forks_the_head_record() {
        let schema = schema();
        let config = ResolveConfig::default();
        let doc = doc(vec![(
            vec![
                ent(0, "PledgeTrigger", 0, "质押"),
                ent(1, "Pledger", 3, "Alice"),
                ent(2, "Pledger", 9, "Bob"),
            ],
            vec![rel(0, 1), rel(0, 2)],
        )]);
        let resolver = Resolver::new(&schema, &config);
        let mut arena = RecordArena::new();
        for entity in doc.entity_refs() {
            assert!(resolver.assign(&doc, &mut arena, entity));
        }
        assert_eq!(arena.len(), 2);
        let alice = arena.get(arena.owner(EntityRef::new(0, 1)).expect("owner"));
        let bob = arena.get(arena.owner(EntityRef::new(0, 2)).expect("owner"));
        assert_eq!(text_of(&doc, alice, "Pledger"), Some("Alice"));
        assert_eq!(text_of(&doc, bob, "Pledger"), Some("Bob"));
        assert_eq!(text_of(&doc, bob, "PledgeTrigger"), Some("质押"));
    }

    #[test]
    fn entity_without_any_head_is_left_out() {
        let schema = schema();
        let config = ResolveConfig::default();
        let doc = doc(vec![(vec![ent(0, "Pledger", 0, "Alice")], vec![])]);
        let resolver = Resolver::new(&schema, &config);
        let mut arena = RecordArena::new();
        assert!(!resolver.assign(&doc, &mut arena, EntityRef::new(0, 0)));
        assert!(arena.is_empty());
    }

    #[test]
    fn fallback_takes_the_last_trigger_of_the_nearest_sentence() {
        let schema = schema();
        let config = ResolveConfig::default();
        let doc = doc(vec![
            (vec![ent(0, "PledgeTrigger", 0, "质押")], vec![]),
            (
                vec![ent(0, "PledgeTrigger", 2, "质押"), ent(1, "PledgeTrigger", 8, "质押")],
                vec![],
            ),
            (vec![ent(0, "PledgedShares", 0, "1000股")], vec![]),
        ]);
        let heads = Resolver::new(&schema, &config).find_heads(&doc, EntityRef::new(2, 0));
        assert_eq!(heads, vec![EntityRef::new(1, 1)]);
    }

    #[test]
    fn capped_fallback_limits_non_primary_roles_only() {
        let schema = schema();
        let config = ResolveConfig::default();
        let doc = doc(vec![
            (vec![ent(0, "PledgeTrigger", 0, "质押")], vec![]),
            (vec![], vec![]),
            (
                vec![ent(0, "PledgedShares", 0, "1000股"), ent(1, "Pledger", 8, "Alice")],
                vec![],
            ),
        ]);
        let resolver = Resolver::new(&schema, &config);
        assert!(resolver.find_heads(&doc, EntityRef::new(2, 0)).is_empty());
        assert_eq!(
            resolver.find_heads(&doc, EntityRef::new(2, 1)),
            vec![EntityRef::new(0, 0)]
        );

        let uncapped = ResolveConfig {
            fallback: ProximityFallback::Uncapped,
            ..ResolveConfig::default()
        };
        assert_eq!(
            Resolver::new(&schema, &uncapped).find_heads(&doc, EntityRef::new(2, 0)),
            vec![EntityRef::new(0, 0)]
        );
    }

    #[test]
    fn excluded_roles_are_not_resolution_roots() {
        let schema = schema();
        let config = ResolveConfig {
            excluded_types: ["Pledgee".to_string()].into(),
            ..ResolveConfig::default()
        };
        let doc = doc(vec![(
            vec![
                ent(0, "PledgeTrigger", 0, "质押"),
                ent(1, "Pledger", 3, "Alice"),
                ent(2, "Pledgee", 9, "Bank"),
            ],
            vec![rel(0, 1), rel(1, 2)],
        )]);
        let records = Resolver::new(&schema, &config).resolve(&doc);
        assert_eq!(records.len(), 1);
        assert!(records[0].slot("Pledgee").is_none());
    }

    #[test]
    fn merging_across_sentences_and_min_args_filter() {
        let schema = schema();
        let config = ResolveConfig::default();
        let doc = doc(vec![
            (
                vec![ent(0, "PledgeTrigger", 0, "质押"), ent(1, "Pledger", 3, "Alice")],
                vec![rel(0, 1)],
            ),
            (
                vec![ent(0, "PledgeTrigger", 0, "质押"), ent(1, "PledgedShares", 3, "1000股")],
                vec![rel(0, 1)],
            ),
        ]);
        let resolver = Resolver::new(&schema, &config);
        let records = resolver.resolve(&doc);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].len(), 3);

        let events = resolver.annotate(&doc);
        assert_eq!(events.event.len(), 1);
        assert_eq!(events.event[0].args["Pledger"].as_deref(), Some("Alice"));

        let strict = ResolveConfig {
            min_args: 3,
            ..ResolveConfig::default()
        };
        assert!(Resolver::new(&schema, &strict).annotate(&doc).event.is_empty());
    }

    #[test]
    fn incomplete_unmergeable_records_are_dropped() {
        let schema = schema();
        let config = ResolveConfig::default();
        let doc = doc(vec![(
            vec![
                ent(0, "PledgeTrigger", 0, "质押"),
                ent(1, "Pledger", 3, "Alice"),
                ent(2, "FreezeTrigger", 9, "冻结"),
            ],
            vec![rel(0, 1)],
        )]);
        let records = Resolver::new(&schema, &config).resolve(&doc);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].type_names(), vec!["EquityPledge"]);
    }

    fn chain_schema(roles: usize) -> Schema {
        let roles: Vec<String> = (0..roles).map(|i| format!("R{i}")).collect();
        Schema::from_decls(vec![EventDecl::new(
            "Chain".to_string(),
            vec!["R0".to_string()],
            roles,
            Vec::new(),
        )])
        .expect("schema")
    }

    fn single_role_records(schema: &Schema, roles: usize) -> Vec<Record<'_>> {
        (0..roles)
            .map(|i| {
                let role = format!("R{i}");
                let mut record = Record::new(schema);
                assert!(record.fill(Some(Arg::new(EntityRef::new(0, i), &role))));
                record
            })
            .collect()
    }

    #[test]
    fn long_chain_merges_into_one_record() {
        let schema = chain_schema(70);
        let config = ResolveConfig {
            window: 2,
            ..ResolveConfig::default()
        };
        let records = single_role_records(&schema, 70);
        let merged = Resolver::new(&schema, &config).merge_records(records, |a, b| a == b);
        let sizes: Vec<usize> = merged.iter().map(Record::len).collect();
        assert_eq!(sizes, vec![70]);
    }

    #[test]
    fn merging_stops_when_the_list_stops_shrinking() {
        let schema = chain_schema(3);
        let config = ResolveConfig {
            window: 3,
            ..ResolveConfig::default()
        };
        // every pair merges, so the first round yields three records again
        let records = single_role_records(&schema, 3);
        let merged = Resolver::new(&schema, &config).merge_records(records, |a, b| a == b);
        assert_eq!(merged.len(), 2);
        assert!(merged.iter().all(|r| r.len() == 2 && r.slot("R0").is_some()));
        assert!(merged[0].slot("R1").is_some());
        assert!(merged[1].slot("R2").is_some());
    }
}
