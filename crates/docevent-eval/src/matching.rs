//! Match criteria for sentence-level entities and relations.

use std::fmt;
use std::str::FromStr;

use docevent_resolve::{longest_common_substring, EntityAnnotation, RelationAnnotation};

/// True if the longest common substring of `pred` and `gold` covers at least
/// `proportion` of `gold` (in characters).
pub fn text_overlaps(pred: &str, gold: &str, proportion: f64) -> bool {
    let (_, _, matched) = longest_common_substring(pred, gold);
    matched as f64 >= proportion * gold.chars().count() as f64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityMetric {
    /// Same span and same type.
    Exact,
    /// Same span.
    Offset,
    /// Same text.
    String,
    /// Text overlap of at least the configured proportion of the gold text.
    Overlap,
}

impl EntityMetric {
    pub const ALL: [EntityMetric; 4] = [
        EntityMetric::Exact,
        EntityMetric::Offset,
        EntityMetric::String,
        EntityMetric::Overlap,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityMetric::Exact => "exact",
            EntityMetric::Offset => "offset",
            EntityMetric::String => "string",
            EntityMetric::Overlap => "overlap",
        }
    }

    pub fn matches(&self, pred: &EntityAnnotation, gold: &EntityAnnotation, proportion: f64) -> bool {
        match self {
            EntityMetric::Exact => pred.offset == gold.offset && pred.role == gold.role,
            EntityMetric::Offset => pred.offset == gold.offset,
            EntityMetric::String => pred.text == gold.text,
            EntityMetric::Overlap => text_overlaps(&pred.text, &gold.text, proportion),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RelationMetric {
    /// Same label, both endpoints equal under [`EntityMetric::Exact`].
    Exact,
    /// Same label, both endpoints equal under [`EntityMetric::String`].
    String,
}

impl RelationMetric {
    pub const ALL: [RelationMetric; 2] = [RelationMetric::Exact, RelationMetric::String];

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationMetric::Exact => "exact",
            RelationMetric::String => "string",
        }
    }

    fn endpoint_metric(&self) -> EntityMetric {
        match self {
            RelationMetric::Exact => EntityMetric::Exact,
            RelationMetric::String => EntityMetric::String,
        }
    }

    /// Relations whose endpoints cannot be found never match.
    pub fn matches(
        &self,
        pred: &RelationAnnotation,
        gold: &RelationAnnotation,
        pred_entities: &[EntityAnnotation],
        gold_entities: &[EntityAnnotation],
    ) -> bool {
        let find = |entities: &[EntityAnnotation], id: u32| {
            entities.iter().find(|e| e.ent_id == id).cloned()
        };
        let (Some(p0), Some(p1), Some(g0), Some(g1)) = (
            find(pred_entities, pred.head()),
            find(pred_entities, pred.dependent()),
            find(gold_entities, gold.head()),
            find(gold_entities, gold.dependent()),
        ) else {
            return false;
        };
        let metric = self.endpoint_metric();
        pred.label == gold.label && metric.matches(&p0, &g0, 1.0) && metric.matches(&p1, &g1, 1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown metric `{0}`")]
pub struct UnknownMetric(pub String);

impl FromStr for EntityMetric {
    type Err = UnknownMetric;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityMetric::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| UnknownMetric(s.to_string()))
    }
}

impl FromStr for RelationMetric {
    type Err = UnknownMetric;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RelationMetric::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| UnknownMetric(s.to_string()))
    }
}

impl fmt::Display for EntityMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for RelationMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
