//! Wire formats: sentence-level entity/relation annotations in, document-level
//! event annotations out. Both are JSON Lines.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use crate::{AliasList, CorefSpans, ResolveError, Span};

// ============================================================================
// Sentence-level input
// ============================================================================

/// A typed span of one sentence. `role` is the argument type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityAnnotation {
    pub ent_id: u32,
    #[serde(rename = "type")]
    pub role: String,
    pub offset: Span,
    pub text: String,
}

/// Directed relation `args = [head, dependent]` between entity ids of one sentence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationAnnotation {
    #[serde(rename = "type")]
    pub label: String,
    pub args: [u32; 2],
}

impl RelationAnnotation {
    pub fn new(label: impl Into<String>, head: u32, dependent: u32) -> Self {
        Self {
            label: label.into(),
            args: [head, dependent],
        }
    }

    pub fn head(&self) -> u32 {
        self.args[0]
    }

    pub fn dependent(&self) -> u32 {
        self.args[1]
    }

    pub fn mentions(&self, ent_id: u32) -> bool {
        self.args[0] == ent_id || self.args[1] == ent_id
    }
}

/// One line of the sentence annotation stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceAnnotation {
    pub doc_id: String,
    pub sent_id: usize,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub token: Vec<String>,
    #[serde(default)]
    pub entity: Vec<EntityAnnotation>,
    #[serde(default)]
    pub relation: Vec<RelationAnnotation>,
    #[serde(default)]
    pub coref_spans: CorefSpans,
}

// ============================================================================
// Document-level output
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAnnotation {
    /// Every event type the record was still consistent with.
    #[serde(rename = "type")]
    pub types: Vec<String>,
    /// role -> argument text (gold documents may carry `null`).
    pub args: BTreeMap<String, Option<String>>,
}

impl EventAnnotation {
    /// Number of roles with a value.
    pub fn filled_args(&self) -> usize {
        self.args.values().filter(|v| v.is_some()).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentEvents {
    pub doc_id: String,
    #[serde(default)]
    pub coref_spans: BTreeMap<String, AliasList>,
    #[serde(default)]
    pub event: Vec<EventAnnotation>,
}

// ============================================================================
// JSON Lines
// ============================================================================

/// Group consecutive sentences sharing a `doc_id` into documents, keeping
/// stream order.
pub fn group_documents(sentences: Vec<SentenceAnnotation>) -> Vec<Vec<SentenceAnnotation>> {
    let mut docs: Vec<Vec<SentenceAnnotation>> = Vec::new();
    for sentence in sentences {
        match docs.last_mut() {
            Some(doc) if doc[0].doc_id == sentence.doc_id => doc.push(sentence),
            _ => docs.push(vec![sentence]),
        }
    }
    docs
}

/// Parse one JSON value per non-blank line. The first malformed line fails
/// the whole stream.
pub fn read_jsonl<T: DeserializeOwned>(reader: impl BufRead) -> Result<Vec<T>, ResolveError> {
    let mut items = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let item = serde_json::from_str(&line).map_err(|source| ResolveError::Jsonl {
            line: index + 1,
            source,
        })?;
        items.push(item);
    }
    Ok(items)
}

pub fn read_jsonl_file<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, ResolveError> {
    let file = std::fs::File::open(path).map_err(|source| ResolveError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_jsonl(BufReader::new(file))
}

pub fn write_jsonl<T: Serialize>(mut writer: impl Write, items: &[T]) -> Result<(), ResolveError> {
    for item in items {
        let line = serde_json::to_string(item).map_err(|e| ResolveError::Stream(e.into()))?;
        writeln!(writer, "{line}")?;
    }
    writer.flush()?;
    Ok(())
}
