//! Document preparation and batch resolution.

use rayon::prelude::*;
use tracing::debug;

use docevent_schema::Schema;

use crate::augment::default_extractors;
use crate::graph::DocumentGraph;
use crate::{group_documents, DocumentEvents, ResolveConfig, Resolver, SentenceAnnotation};

/// Counts of what preparation changed in one document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrepareStats {
    pub relations_removed: usize,
    pub entities_filtered: usize,
    pub entities_augmented: usize,
}

/// Break cycles, drop short entities and apply pattern extractors, sentence
/// by sentence, in that order.
pub fn prepare_document(doc: &mut DocumentGraph, config: &ResolveConfig) -> PrepareStats {
    let mut stats = PrepareStats::default();
    for sentence in &mut doc.sentences {
        stats.relations_removed += sentence.break_cycles();
        stats.entities_filtered += sentence.filter_short_entities(config.min_entity_len);
        if config.augment {
            stats.entities_augmented += sentence.augment_entities(default_extractors());
        }
    }
    debug!(doc_id = %doc.doc_id, ?stats, "prepared document");
    stats
}

/// Resolve a sentence stream into one event document per input document,
/// in input order. Documents are resolved in parallel.
pub fn resolve_documents(
    schema: &Schema,
    config: &ResolveConfig,
    sentences: Vec<SentenceAnnotation>,
) -> Vec<DocumentEvents> {
    let resolver = Resolver::new(schema, config);
    group_documents(sentences)
        .into_par_iter()
        .filter_map(DocumentGraph::from_sentences)
        .map(|mut doc| {
            prepare_document(&mut doc, config);
            resolver.annotate(&doc)
        })
        .collect()
}
