use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};

/// Dense id of an event type, in schema declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventTypeId(u32);

impl EventTypeId {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A set of event types, stored as a bitmap over [`EventTypeId`]s.
///
/// Candidate-type narrowing is a plain intersection against the schema's
/// precomputed role index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeSet(RoaringBitmap);

impl TypeSet {
    pub fn new() -> Self {
        Self(RoaringBitmap::new())
    }

    pub fn insert(&mut self, id: EventTypeId) -> bool {
        self.0.insert(id.0)
    }

    pub fn contains(&self, id: EventTypeId) -> bool {
        self.0.contains(id.0)
    }

    pub fn len(&self) -> usize {
        self.0.len() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn intersection(&self, other: &TypeSet) -> TypeSet {
        TypeSet(&self.0 & &other.0)
    }

    pub fn is_disjoint(&self, other: &TypeSet) -> bool {
        self.0.is_disjoint(&other.0)
    }

    pub fn is_subset(&self, other: &TypeSet) -> bool {
        self.0.is_subset(&other.0)
    }

    /// Ids in ascending (declaration) order.
    pub fn iter(&self) -> impl Iterator<Item = EventTypeId> + '_ {
        self.0.iter().map(EventTypeId)
    }
}

impl FromIterator<EventTypeId> for TypeSet {
    fn from_iter<I: IntoIterator<Item = EventTypeId>>(iter: I) -> Self {
        TypeSet(iter.into_iter().map(|id| id.0).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[u32]) -> TypeSet {
        ids.iter().copied().map(EventTypeId::new).collect()
    }

    #[test]
    fn intersection_and_disjointness() {
        let a = set(&[0, 1, 2]);
        let b = set(&[2, 3]);
        assert_eq!(a.intersection(&b), set(&[2]));
        assert!(!a.is_disjoint(&b));
        assert!(a.is_disjoint(&set(&[4])));
        assert!(set(&[1, 2]).is_subset(&a));
    }

    #[test]
    fn iterates_in_ascending_order() {
        let s = set(&[5, 1, 3]);
        let ids: Vec<usize> = s.iter().map(EventTypeId::index).collect();
        assert_eq!(ids, vec![1, 3, 5]);
        assert_eq!(s.len(), 3);
    }
}
