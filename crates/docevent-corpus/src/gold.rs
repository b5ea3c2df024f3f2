//! Gold event documents in the resolver's output format.

use rayon::prelude::*;

use docevent_resolve::{DocumentEvents, EventAnnotation};

use crate::reader::CorpusEntry;

/// The gold events of one document, one single-typed event per record with
/// `null` kept for unfilled roles.
pub fn gold_events(entry: &CorpusEntry) -> DocumentEvents {
    DocumentEvents {
        doc_id: entry.doc_id.clone(),
        coref_spans: entry.document.coref_spans.alias_lists(),
        event: entry
            .document
            .events
            .iter()
            .map(|event| EventAnnotation {
                types: vec![event.event_type().to_string()],
                args: event.args().to_map(),
            })
            .collect(),
    }
}

pub fn gold_corpus(corpus: &[CorpusEntry]) -> Vec<DocumentEvents> {
    corpus.par_iter().map(gold_events).collect()
}
