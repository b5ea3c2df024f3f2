//! ChFinAnn corpus files.
//!
//! A corpus is a JSON array of `[doc_id, document]` pairs. Each document
//! lists its sentences, the locations of every annotated span, the gold
//! events as `[record_id, event_type, {role: text | null}]` triples and an
//! optional coreference table. Unknown fields are ignored.

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use std::path::Path;

use docevent_resolve::{CorefSpans, MentionLoc};

use crate::CorpusError;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "(String, ChFinAnnDocument)")]
pub struct CorpusEntry {
    pub doc_id: String,
    pub document: ChFinAnnDocument,
}

impl From<(String, ChFinAnnDocument)> for CorpusEntry {
    fn from((doc_id, document): (String, ChFinAnnDocument)) -> Self {
        Self { doc_id, document }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChFinAnnDocument {
    pub sentences: Vec<String>,
    /// span text -> every `(sentence, start, end)` it occurs at
    #[serde(default, rename = "ann_mspan2dranges")]
    pub locations: BTreeMap<String, Vec<MentionLoc>>,
    #[serde(default, rename = "recguid_eventname_eventdict_list")]
    pub events: Vec<GoldEvent>,
    #[serde(default)]
    pub coref_spans: CorefSpans,
}

impl ChFinAnnDocument {
    pub fn locations_of(&self, text: &str) -> &[MentionLoc] {
        self.locations.get(text).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// `[record_id, event_type, args]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GoldEvent(pub u64, pub String, pub EventArgs);

impl GoldEvent {
    pub fn record_id(&self) -> u64 {
        self.0
    }

    pub fn event_type(&self) -> &str {
        &self.1
    }

    pub fn args(&self) -> &EventArgs {
        &self.2
    }
}

/// Role values of a gold event in file order. Entity ids of projected
/// sentences follow this order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventArgs(Vec<(String, Option<String>)>);

impl EventArgs {
    pub fn new(args: Vec<(String, Option<String>)>) -> Self {
        Self(args)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.0.iter().map(|(role, text)| (role.as_str(), text.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_map(&self) -> BTreeMap<String, Option<String>> {
        self.0.iter().cloned().collect()
    }
}

impl<'de> Deserialize<'de> for EventArgs {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ArgsVisitor;

        impl<'de> Visitor<'de> for ArgsVisitor {
            type Value = EventArgs;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map from role to argument text or null")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut args = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, Option<String>>()? {
                    args.push(entry);
                }
                Ok(EventArgs(args))
            }
        }

        deserializer.deserialize_map(ArgsVisitor)
    }
}

pub fn read_corpus(reader: impl Read) -> Result<Vec<CorpusEntry>, CorpusError> {
    Ok(serde_json::from_reader(reader)?)
}

pub fn load_corpus(path: &Path) -> Result<Vec<CorpusEntry>, CorpusError> {
    let file = std::fs::File::open(path).map_err(|source| CorpusError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_corpus(std::io::BufReader::new(file))
}
