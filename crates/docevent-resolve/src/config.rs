//! Resolution settings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

use crate::ResolveError;

/// How far back a head-less argument may look for the nearest trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ProximityFallback {
    /// Non-primary roles only look at the `max_sentences` preceding
    /// sentences; primary roles look at all of them.
    Capped { max_sentences: usize },
    /// Every role looks at all preceding sentences.
    Uncapped,
}

impl ProximityFallback {
    /// Number of preceding sentences searched for an argument of this kind.
    pub fn reach(&self, primary: bool) -> usize {
        match self {
            ProximityFallback::Capped { max_sentences } if !primary => *max_sentences,
            _ => usize::MAX,
        }
    }
}

impl Default for ProximityFallback {
    fn default() -> Self {
        ProximityFallback::Capped { max_sentences: 1 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveConfig {
    /// Events are emitted only with more filled roles than this.
    pub min_args: usize,
    /// Entities spanning fewer characters are dropped before resolution.
    pub min_entity_len: usize,
    /// Entity roles never used as resolution roots.
    pub excluded_types: BTreeSet<String>,
    /// Records are merge candidates when their list indices differ by less
    /// than this.
    pub window: usize,
    pub fallback: ProximityFallback,
    /// Run the built-in pattern extractors over sentence text.
    pub augment: bool,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            min_args: 2,
            min_entity_len: 2,
            excluded_types: BTreeSet::new(),
            window: 3,
            fallback: ProximityFallback::default(),
            augment: true,
        }
    }
}

impl ResolveConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, ResolveError> {
        let text = std::fs::read_to_string(path).map_err(|source| ResolveError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ResolveError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}
