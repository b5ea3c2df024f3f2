use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::Path;

use crate::{EventTypeId, SchemaLoadError, TypeSet};

// ============================================================================
// Declarations
// ============================================================================

/// One event type of the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDecl {
    pub name: String,
    /// Required roles; `primary_args[0]` is the trigger role.
    pub primary_args: Vec<String>,
    pub args: BTreeSet<String>,
    /// Legal `(head_role, dependent_role)` pairs.
    pub event_relations: BTreeSet<(String, String)>,
}

impl EventDecl {
    pub fn new<S: Into<String>>(
        name: S,
        primary_args: impl IntoIterator<Item = S>,
        args: impl IntoIterator<Item = S>,
        event_relations: impl IntoIterator<Item = (S, S)>,
    ) -> Self {
        Self {
            name: name.into(),
            primary_args: primary_args.into_iter().map(Into::into).collect(),
            args: args.into_iter().map(Into::into).collect(),
            event_relations: event_relations
                .into_iter()
                .map(|(h, d)| (h.into(), d.into()))
                .collect(),
        }
    }

    pub fn trigger_role(&self) -> &str {
        &self.primary_args[0]
    }
}

#[derive(Debug, Deserialize)]
struct RawEventDecl {
    primary_args: Vec<String>,
    args: Vec<String>,
    #[serde(default)]
    event_relations: Vec<(String, String)>,
}

/// Event declarations in file order (a plain map would sort them, and the
/// order of output `type` lists follows the schema file).
struct OrderedDecls(Vec<(String, RawEventDecl)>);

impl<'de> Deserialize<'de> for OrderedDecls {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DeclsVisitor;

        impl<'de> Visitor<'de> for DeclsVisitor {
            type Value = OrderedDecls;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map from event type to its declaration")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut decls = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, decl)) = map.next_entry::<String, RawEventDecl>()? {
                    decls.push((name, decl));
                }
                Ok(OrderedDecls(decls))
            }
        }

        deserializer.deserialize_map(DeclsVisitor)
    }
}

// ============================================================================
// Schema
// ============================================================================

/// Loaded event schema plus the role indexes resolution needs.
#[derive(Debug, Clone)]
pub struct Schema {
    events: Vec<EventDecl>,
    by_name: HashMap<String, EventTypeId>,
    /// role -> event types that accept the role
    accepting: HashMap<String, TypeSet>,
    trigger_roles: BTreeSet<String>,
    primary_roles: BTreeSet<String>,
}

impl Schema {
    /// Load a schema file: `{ eventType: {primary_args, args, event_relations}, ... }`.
    pub fn load(path: &Path) -> Result<Self, SchemaLoadError> {
        let text = std::fs::read_to_string(path).map_err(|source| SchemaLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, SchemaLoadError> {
        let OrderedDecls(raw) = serde_json::from_str(text)?;
        let decls = raw
            .into_iter()
            .map(|(name, raw)| EventDecl {
                name,
                primary_args: raw.primary_args,
                args: raw.args.into_iter().collect(),
                event_relations: raw.event_relations.into_iter().collect(),
            })
            .collect();
        Self::from_decls(decls)
    }

    /// Build a schema from declarations, validating each one.
    pub fn from_decls(decls: Vec<EventDecl>) -> Result<Self, SchemaLoadError> {
        if decls.is_empty() {
            return Err(SchemaLoadError::Empty);
        }

        let mut by_name = HashMap::new();
        let mut accepting: HashMap<String, TypeSet> = HashMap::new();
        let mut trigger_roles = BTreeSet::new();
        let mut primary_roles = BTreeSet::new();

        for (index, decl) in decls.iter().enumerate() {
            validate_decl(decl)?;
            let id = EventTypeId::new(index as u32);
            if by_name.insert(decl.name.clone(), id).is_some() {
                return Err(invalid(&decl.name, "event type declared twice"));
            }
            for role in &decl.args {
                accepting.entry(role.clone()).or_default().insert(id);
            }
            trigger_roles.insert(decl.trigger_role().to_string());
            primary_roles.extend(decl.primary_args.iter().cloned());
        }

        Ok(Self {
            events: decls,
            by_name,
            accepting,
            trigger_roles,
            primary_roles,
        })
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Declarations in schema order.
    pub fn events(&self) -> impl Iterator<Item = (EventTypeId, &EventDecl)> {
        self.events
            .iter()
            .enumerate()
            .map(|(i, decl)| (EventTypeId::new(i as u32), decl))
    }

    pub fn decl(&self, id: EventTypeId) -> &EventDecl {
        &self.events[id.index()]
    }

    pub fn name(&self, id: EventTypeId) -> &str {
        &self.events[id.index()].name
    }

    pub fn id_of(&self, name: &str) -> Option<EventTypeId> {
        self.by_name.get(name).copied()
    }

    pub fn decl_by_name(&self, name: &str) -> Option<&EventDecl> {
        self.id_of(name).map(|id| self.decl(id))
    }

    pub fn all_types(&self) -> TypeSet {
        (0..self.events.len() as u32).map(EventTypeId::new).collect()
    }

    /// Event types accepting `role` (empty for roles no type declares).
    pub fn types_accepting(&self, role: &str) -> TypeSet {
        self.accepting.get(role).cloned().unwrap_or_default()
    }

    /// `types` restricted to the types accepting `role`.
    pub fn narrow(&self, types: &TypeSet, role: &str) -> TypeSet {
        match self.accepting.get(role) {
            Some(accepting) => types.intersection(accepting),
            None => TypeSet::new(),
        }
    }

    /// True if `role` is the trigger role (first primary argument) of some type.
    pub fn is_trigger_role(&self, role: &str) -> bool {
        self.trigger_roles.contains(role)
    }

    /// True if `role` is a primary argument of some type.
    pub fn is_primary_role(&self, role: &str) -> bool {
        self.primary_roles.contains(role)
    }

    pub fn is_legal_relation(&self, id: EventTypeId, head: &str, dependent: &str) -> bool {
        self.decl(id)
            .event_relations
            .contains(&(head.to_string(), dependent.to_string()))
    }
}

fn invalid(event_type: &str, reason: impl Into<String>) -> SchemaLoadError {
    SchemaLoadError::Invalid {
        event_type: event_type.to_string(),
        reason: reason.into(),
    }
}

fn validate_decl(decl: &EventDecl) -> Result<(), SchemaLoadError> {
    if decl.primary_args.is_empty() {
        return Err(invalid(&decl.name, "`primary_args` must name a trigger role"));
    }
    for role in &decl.primary_args {
        if !decl.args.contains(role) {
            return Err(invalid(
                &decl.name,
                format!("primary argument `{role}` is missing from `args`"),
            ));
        }
    }
    for (head, dependent) in &decl.event_relations {
        for role in [head, dependent] {
            if !decl.args.contains(role) {
                return Err(invalid(
                    &decl.name,
                    format!("relation ({head}, {dependent}) uses undeclared role `{role}`"),
                ));
            }
        }
    }
    Ok(())
}
