//! Document-scoped coreference table and the text equality built on it.
//!
//! The table is produced upstream (mention detection is not done here): for a
//! canonical mention it lists aliases and where each alias occurs. Equality is
//! pairwise only, checking both directions, and is not closed transitively.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::Span;

/// `(sentence_id, start, end)` location of a mention; a triple on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "[usize; 3]", into = "[usize; 3]")]
pub struct MentionLoc {
    pub sent_id: usize,
    pub span: Span,
}

impl MentionLoc {
    pub fn new(sent_id: usize, start: usize, end: usize) -> Self {
        Self {
            sent_id,
            span: Span::new(start, end),
        }
    }
}

impl From<[usize; 3]> for MentionLoc {
    fn from([sent_id, start, end]: [usize; 3]) -> Self {
        Self::new(sent_id, start, end)
    }
}

impl From<MentionLoc> for [usize; 3] {
    fn from(loc: MentionLoc) -> Self {
        [loc.sent_id, loc.span.start, loc.span.end]
    }
}

/// mention text -> alias text -> alias locations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorefSpans(BTreeMap<String, BTreeMap<String, Vec<MentionLoc>>>);

impl CorefSpans {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn insert(
        &mut self,
        mention: impl Into<String>,
        alias: impl Into<String>,
        locations: Vec<MentionLoc>,
    ) {
        self.0
            .entry(mention.into())
            .or_default()
            .insert(alias.into(), locations);
    }

    /// Aliases of `mention` with their locations (empty if unknown).
    pub fn aliases(&self, mention: &str) -> impl Iterator<Item = (&str, &[MentionLoc])> {
        self.0
            .get(mention)
            .into_iter()
            .flat_map(|aliases| aliases.iter().map(|(a, locs)| (a.as_str(), locs.as_slice())))
    }

    pub fn is_alias(&self, mention: &str, alias: &str) -> bool {
        self.0
            .get(mention)
            .is_some_and(|aliases| aliases.contains_key(alias))
    }

    /// Equality of two (possibly absent) entity texts: both absent, identical
    /// text, or one listed as an alias of the other.
    pub fn texts_equal(&self, a: Option<&str>, b: Option<&str>) -> bool {
        match (a, b) {
            (None, None) => true,
            (Some(a), Some(b)) => a == b || self.is_alias(a, b) || self.is_alias(b, a),
            _ => false,
        }
    }

    /// Mention -> alias texts, the form written into event documents.
    pub fn alias_lists(&self) -> BTreeMap<String, AliasList> {
        self.0
            .iter()
            .map(|(mention, aliases)| (mention.clone(), AliasList(aliases.keys().cloned().collect())))
            .collect()
    }
}

/// Alias texts of one mention.
///
/// Serialized as a list; reading also accepts the located form
/// (`{alias: [[sent, start, end], ...]}`), keeping only the alias texts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "AliasRepr", into = "Vec<String>")]
pub struct AliasList(pub Vec<String>);

impl AliasList {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AliasRepr {
    Listed(Vec<String>),
    Located(BTreeMap<String, serde_json::Value>),
}

impl From<AliasRepr> for AliasList {
    fn from(repr: AliasRepr) -> Self {
        match repr {
            AliasRepr::Listed(aliases) => AliasList(aliases),
            AliasRepr::Located(aliases) => AliasList(aliases.into_keys().collect()),
        }
    }
}

impl From<AliasList> for Vec<String> {
    fn from(list: AliasList) -> Self {
        list.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> CorefSpans {
        let mut coref = CorefSpans::new();
        coref.insert("Alice", "A.", vec![MentionLoc::new(0, 5, 7)]);
        coref
    }

    #[test]
    fn alias_equality_checks_both_directions() {
        let coref = table();
        assert!(coref.texts_equal(Some("Alice"), Some("A.")));
        assert!(coref.texts_equal(Some("A."), Some("Alice")));
        assert!(coref.texts_equal(Some("Bob"), Some("Bob")));
        assert!(!coref.texts_equal(Some("Alice"), Some("Bob")));
    }

    #[test]
    fn absent_texts() {
        let coref = table();
        assert!(coref.texts_equal(None, None));
        assert!(!coref.texts_equal(Some("Alice"), None));
        assert!(!coref.texts_equal(None, Some("A.")));
    }

    #[test]
    fn equality_is_not_transitive() {
        let mut coref = CorefSpans::new();
        coref.insert("Alpha Holdings", "Alpha", vec![]);
        coref.insert("Alpha", "AH", vec![]);
        assert!(coref.texts_equal(Some("Alpha Holdings"), Some("Alpha")));
        assert!(coref.texts_equal(Some("Alpha"), Some("AH")));
        assert!(!coref.texts_equal(Some("Alpha Holdings"), Some("AH")));
    }

    #[test]
    fn located_form_round_trips_and_lists_aliases() {
        let coref: CorefSpans =
            serde_json::from_str(r#"{"Alice": {"A.": [[0, 5, 7], [2, 1, 3]]}}"#).expect("coref");
        let locs: Vec<MentionLoc> = coref.aliases("Alice").flat_map(|(_, l)| l.to_vec()).collect();
        assert_eq!(locs, vec![MentionLoc::new(0, 5, 7), MentionLoc::new(2, 1, 3)]);

        let lists = coref.alias_lists();
        assert_eq!(lists["Alice"].0, vec!["A.".to_string()]);
        assert_eq!(
            serde_json::to_string(&lists).expect("json"),
            r#"{"Alice":["A."]}"#
        );
    }

    #[test]
    fn alias_list_reads_both_forms() {
        let listed: AliasList = serde_json::from_str(r#"["A.", "Ally"]"#).expect("list");
        let located: AliasList = serde_json::from_str(r#"{"A.": [[0, 1, 3]]}"#).expect("map");
        assert_eq!(listed.0, vec!["A.", "Ally"]);
        assert_eq!(located.0, vec!["A."]);
    }
}
