//! Per-sentence entity/relation graphs and the document that aggregates them.
//!
//! Relations point from head to dependent and never cross sentences. Before
//! resolution every sentence is made acyclic (`break_cycles`), stripped of
//! micro-spans (`filter_short_entities`) and optionally augmented with regex
//! matches (`augment_entities`).

use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, warn};

use crate::augment::PatternExtractor;
use crate::span::spans_overlap;
use crate::{CorefSpans, EntityAnnotation, RelationAnnotation, SentenceAnnotation};

/// Position of an entity inside a document: sentence index, then entity index
/// within that sentence. Stable for the lifetime of a prepared document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityRef {
    pub sentence: usize,
    pub index: usize,
}

impl EntityRef {
    pub fn new(sentence: usize, index: usize) -> Self {
        Self { sentence, index }
    }
}

// ============================================================================
// Sentence graph
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentenceGraph {
    pub sent_id: usize,
    pub text: String,
    pub entities: Vec<EntityAnnotation>,
    pub relations: Vec<RelationAnnotation>,
}

impl SentenceGraph {
    pub fn new(
        sent_id: usize,
        text: impl Into<String>,
        entities: Vec<EntityAnnotation>,
        relations: Vec<RelationAnnotation>,
    ) -> Self {
        Self {
            sent_id,
            text: text.into(),
            entities,
            relations,
        }
    }

    /// Index of the first entity carrying `ent_id`.
    pub fn entity_index(&self, ent_id: u32) -> Option<usize> {
        self.entities.iter().position(|e| e.ent_id == ent_id)
    }

    /// Heads of the entity at `index`: for every relation whose dependent is
    /// that entity, the entity named as head (in relation order).
    pub fn heads_of(&self, index: usize) -> Vec<usize> {
        let ent_id = self.entities[index].ent_id;
        self.relations
            .iter()
            .filter(|rel| rel.dependent() == ent_id)
            .filter_map(|rel| self.entity_index(rel.head()))
            .collect()
    }

    /// Remove the relation closing each cycle of head chains.
    ///
    /// From every entity, walk head chains breadth-first; when a chain comes
    /// back to the starting entity, the relation from the start to the entity
    /// that reached it is dropped. Returns the number of relations removed.
    pub fn break_cycles(&mut self) -> usize {
        let mut removed = 0;
        for start in 0..self.entities.len() {
            let mut queue = VecDeque::from([start]);
            let mut visited = HashSet::new();
            while let Some(current) = queue.pop_front() {
                for head in self.heads_of(current) {
                    if head == start {
                        let head_id = self.entities[head].ent_id;
                        let dep_id = self.entities[current].ent_id;
                        if let Some(pos) = self
                            .relations
                            .iter()
                            .position(|r| r.head() == head_id && r.dependent() == dep_id)
                        {
                            let rel = self.relations.remove(pos);
                            debug!(sent_id = self.sent_id, args = ?rel.args, "removed relation closing a cycle");
                            removed += 1;
                        }
                    } else if visited.insert(head) {
                        queue.push_back(head);
                    }
                }
            }
        }
        removed
    }

    /// Drop entities shorter than `min_len` characters and every relation
    /// mentioning them. Returns the number of entities removed.
    pub fn filter_short_entities(&mut self, min_len: usize) -> usize {
        let (kept, dropped): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entities)
            .into_iter()
            .partition(|e| e.offset.len() >= min_len);
        for ent in &dropped {
            debug!(sent_id = self.sent_id, ent_id = ent.ent_id, text = %ent.text, "filtered short entity");
            self.relations.retain(|rel| !rel.mentions(ent.ent_id));
        }
        self.entities = kept;
        dropped.len()
    }

    /// Apply regex extractors to the sentence text.
    ///
    /// A match overlapping an existing entity retypes and re-spans that entity
    /// in place (its relations keep pointing at the same id); otherwise a new
    /// entity with a fresh id is appended, unless the ids are exhausted.
    /// Returns the number of matches applied.
    pub fn augment_entities(&mut self, extractors: &[PatternExtractor]) -> usize {
        let mut applied = 0;
        for extractor in extractors {
            for m in extractor.find(&self.text) {
                if let Some(ent) = self
                    .entities
                    .iter_mut()
                    .find(|e| spans_overlap(e.offset, m.span))
                {
                    debug!(
                        sent_id = self.sent_id,
                        ent_id = ent.ent_id,
                        from = %ent.role,
                        to = %extractor.role,
                        "retyped entity from pattern match"
                    );
                    ent.offset = m.span;
                    ent.role = extractor.role.clone();
                    ent.text = m.text;
                    applied += 1;
                    continue;
                }
                let next_id = match self.entities.iter().map(|e| e.ent_id).max() {
                    Some(max) => max.checked_add(1),
                    None => Some(0),
                };
                let Some(ent_id) = next_id else {
                    warn!(sent_id = self.sent_id, role = %extractor.role, text = %m.text, "entity ids exhausted; pattern match skipped");
                    continue;
                };
                debug!(sent_id = self.sent_id, ent_id, role = %extractor.role, text = %m.text, "added entity from pattern match");
                self.entities.push(EntityAnnotation {
                    ent_id,
                    role: extractor.role.clone(),
                    offset: m.span,
                    text: m.text,
                });
                applied += 1;
            }
        }
        applied
    }
}

impl From<SentenceAnnotation> for SentenceGraph {
    fn from(sent: SentenceAnnotation) -> Self {
        Self::new(sent.sent_id, sent.text, sent.entity, sent.relation)
    }
}

// ============================================================================
// Document graph
// ============================================================================

/// All sentences of one document plus its coreference table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentGraph {
    pub doc_id: String,
    pub sentences: Vec<SentenceGraph>,
    pub coref: CorefSpans,
}

impl DocumentGraph {
    /// Build from consecutive sentence lines of one document. The coreference
    /// table of the first sentence is the document's.
    pub fn from_sentences(sentences: Vec<SentenceAnnotation>) -> Option<Self> {
        let first = sentences.first()?;
        let doc_id = first.doc_id.clone();
        let coref = first.coref_spans.clone();
        Some(Self {
            doc_id,
            sentences: sentences.into_iter().map(SentenceGraph::from).collect(),
            coref,
        })
    }

    pub fn entity(&self, at: EntityRef) -> &EntityAnnotation {
        &self.sentences[at.sentence].entities[at.index]
    }

    /// Every entity in document order: sentence order, then appearance order.
    pub fn entity_refs(&self) -> impl Iterator<Item = EntityRef> + '_ {
        self.sentences.iter().enumerate().flat_map(|(s, sent)| {
            (0..sent.entities.len()).map(move |i| EntityRef::new(s, i))
        })
    }

    /// Coreference-aware equality of two entities' texts.
    pub fn entities_equal(&self, a: EntityRef, b: EntityRef) -> bool {
        self.coref
            .texts_equal(Some(&self.entity(a).text), Some(&self.entity(b).text))
    }
}

// ============================================================================
// Deduplication
// ============================================================================

/// Merge several annotations of the same sentence into one.
///
/// Entities with identical spans are unified under one id (first occurrence
/// wins, ids are reassigned in order of first occurrence); relations are
/// remapped to the unified ids and exact duplicates collapsed. Metadata comes
/// from the first annotation. Running it on its own output is a no-op.
pub fn deduplicate(sentences: &[SentenceAnnotation]) -> Option<SentenceAnnotation> {
    let first = sentences.first()?;
    let mut entities: Vec<EntityAnnotation> = Vec::new();
    let mut relations: Vec<RelationAnnotation> = Vec::new();

    for sent in sentences {
        let mut id_map: HashMap<u32, u32> = HashMap::new();
        for ent in &sent.entity {
            let new_id = match entities.iter().find(|e| e.offset == ent.offset) {
                Some(existing) => existing.ent_id,
                None => {
                    let new_id = entities.len() as u32;
                    entities.push(EntityAnnotation {
                        ent_id: new_id,
                        ..ent.clone()
                    });
                    new_id
                }
            };
            id_map.entry(ent.ent_id).or_insert(new_id);
        }

        for rel in &sent.relation {
            let (Some(&head), Some(&dep)) = (id_map.get(&rel.head()), id_map.get(&rel.dependent()))
            else {
                warn!(doc_id = %sent.doc_id, sent_id = sent.sent_id, args = ?rel.args, "relation names an unknown entity; dropped");
                continue;
            };
            let remapped = RelationAnnotation::new(rel.label.clone(), head, dep);
            if !relations.contains(&remapped) {
                relations.push(remapped);
            }
        }
    }

    Some(SentenceAnnotation {
        entity: entities,
        relation: relations,
        ..first.clone()
    })
}
