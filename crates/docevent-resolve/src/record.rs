//! Partial event records.
//!
//! A record holds at most one entity per argument role and the set of event
//! types it is still consistent with. Every filled role is accepted by every
//! remaining candidate type, so the candidate set only ever shrinks and is
//! never empty.

use std::collections::BTreeMap;

use docevent_schema::{Schema, TypeSet};

use crate::EntityRef;

/// An entity offered to a record under its argument role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arg<'a> {
    pub entity: EntityRef,
    pub role: &'a str,
}

impl<'a> Arg<'a> {
    pub fn new(entity: EntityRef, role: &'a str) -> Self {
        Self { entity, role }
    }
}

/// One role of a record. `occupied` is false for slots inherited through a
/// fork and not re-filled since; such slots may be overwritten in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub entity: EntityRef,
    pub occupied: bool,
}

#[derive(Debug, Clone)]
pub struct Record<'s> {
    schema: &'s Schema,
    candidate_types: TypeSet,
    items: BTreeMap<String, Slot>,
}

impl<'s> Record<'s> {
    /// An empty record consistent with every event type of the schema.
    pub fn new(schema: &'s Schema) -> Self {
        Self {
            schema,
            candidate_types: schema.all_types(),
            items: BTreeMap::new(),
        }
    }

    pub fn candidate_types(&self) -> &TypeSet {
        &self.candidate_types
    }

    pub fn items(&self) -> &BTreeMap<String, Slot> {
        &self.items
    }

    pub fn slot(&self, role: &str) -> Option<&Slot> {
        self.items.get(role)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Candidate type names in schema order.
    pub fn type_names(&self) -> Vec<String> {
        self.candidate_types
            .iter()
            .map(|id| self.schema.name(id).to_string())
            .collect()
    }

    /// True if the record is empty or some candidate type accepts `role`.
    pub fn is_compatible(&self, role: &str) -> bool {
        self.items.is_empty() || !self.schema.narrow(&self.candidate_types, role).is_empty()
    }

    /// Set (or overwrite) the slot for `arg.role` and narrow the candidate
    /// types to those accepting it. A missing argument succeeds without
    /// touching the record. Returns false, leaving the record unchanged, when
    /// no candidate type accepts the role.
    pub fn fill(&mut self, arg: Option<Arg<'_>>) -> bool {
        let Some(arg) = arg else {
            return true;
        };
        let narrowed = self.schema.narrow(&self.candidate_types, arg.role);
        if narrowed.is_empty() {
            return false;
        }
        self.items.insert(
            arg.role.to_string(),
            Slot {
                entity: arg.entity,
                occupied: true,
            },
        );
        self.candidate_types = narrowed;
        true
    }

    /// A copy whose slots are all marked unoccupied.
    pub fn fork(&self) -> Self {
        Self {
            schema: self.schema,
            candidate_types: self.candidate_types.clone(),
            items: self
                .items
                .iter()
                .map(|(role, slot)| {
                    (
                        role.clone(),
                        Slot {
                            entity: slot.entity,
                            occupied: false,
                        },
                    )
                })
                .collect(),
        }
    }

    /// Structural equality: same candidate types, same roles, and pairwise
    /// equal entities under `eq`.
    pub fn compare<F>(&self, other: &Record<'_>, eq: F) -> bool
    where
        F: Fn(EntityRef, EntityRef) -> bool,
    {
        self.candidate_types == other.candidate_types
            && self.items.len() == other.items.len()
            && self.items.iter().all(|(role, slot)| {
                other
                    .items
                    .get(role)
                    .is_some_and(|theirs| eq(slot.entity, theirs.entity))
            })
    }

    /// True if some candidate type has all of its primary roles filled.
    pub fn is_complete(&self) -> bool {
        self.candidate_types.iter().any(|id| {
            self.schema
                .decl(id)
                .primary_args
                .iter()
                .all(|role| self.items.contains_key(role))
        })
    }

    /// Combine two records, or `None` when they cannot describe one event.
    ///
    /// Fails when the candidate type sets share no type or when both records
    /// fill a role with entities `eq` does not equate. The result is a fork of
    /// `self` that adopts the roles only `other` fills; its candidate types
    /// are the intersection of both sets. Partly overlapping sets such as
    /// `{A, B}` and `{B, C}` still merge; only disjoint sets are rejected.
    pub fn merge<F>(&self, other: &Record<'_>, eq: F) -> Option<Record<'s>>
    where
        F: Fn(EntityRef, EntityRef) -> bool,
    {
        let candidate_types = self.candidate_types.intersection(&other.candidate_types);
        if candidate_types.is_empty() {
            return None;
        }

        let mut merged = self.fork();
        for (role, theirs) in &other.items {
            match merged.items.get(role) {
                Some(ours) if !eq(ours.entity, theirs.entity) => return None,
                Some(_) => {}
                None => {
                    if self.schema.narrow(&candidate_types, role).is_empty() {
                        return None;
                    }
                    merged.items.insert(
                        role.clone(),
                        Slot {
                            entity: theirs.entity,
                            occupied: true,
                        },
                    );
                }
            }
        }
        merged.candidate_types = candidate_types;
        Some(merged)
    }
}
