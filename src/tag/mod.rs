//! The tag layer: a forest of generic, dialect-agnostic tag-structures (§3 "Tag-structure" and
//! §4.2 of the design spec).
//!
//! A [`Forest`] owns every [`Structure`] in a parsed (or hand-built) document as a flat arena,
//! addressed by [`StructureId`] indices. This sidesteps the lifetime cycles that a naive
//! object-identity graph (parent pointers, reverse-reference sets) would otherwise require —
//! exactly the arena-of-structures design the spec's design notes call for.

#[cfg(feature = "json")]
pub mod json;
pub mod parse;
pub mod write;

use crate::select::NodeStore;
use std::collections::HashMap;

/// An index into a [`Forest`]'s structure arena. Stable for the lifetime of the forest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StructureId(pub(crate) usize);

/// A tag-structure's payload (§3): absent, a string, a pointer to another structure in the same
/// forest, or the null-pointer sentinel (`@VOID@`).
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    /// No payload on this line.
    None,
    /// A string payload (after CONT/CONC splicing and `@@` un-escaping).
    Text(String),
    /// A pointer to another structure in the same forest.
    Pointer(StructureId),
    /// The null-pointer sentinel, `@VOID@`.
    Void,
}

impl Payload {
    /// True for [`Payload::None`].
    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Payload::None)
    }

    /// The string payload, if this is [`Payload::Text`].
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// The pointed-to structure, if this is [`Payload::Pointer`].
    #[must_use]
    pub fn as_pointer(&self) -> Option<StructureId> {
        match self {
            Payload::Pointer(id) => Some(*id),
            _ => None,
        }
    }
}

/// A single line's worth of structure: a tag, a payload, an ordered list of children, and the
/// bookkeeping needed to round-trip cross-reference identifiers.
#[derive(Clone, Debug)]
pub struct Structure {
    /// The tag (e.g. `HEAD`, `INDI`, `_CUSTOM`).
    pub tag: String,
    /// This structure's payload.
    pub payload: Payload,
    /// Child structures, in document order.
    pub children: Vec<StructureId>,
    /// The structure containing this one, or `None` at the top level.
    pub parent: Option<StructureId>,
    /// The cross-reference identifier this structure was parsed with (or explicitly assigned),
    /// preserved across round-trips when possible.
    pub xref_id: Option<String>,
    /// Structures elsewhere in the forest that point at this one.
    pub(crate) references: Vec<StructureId>,
    /// 1-based source line this structure started on, for diagnostics. `0` for structures built
    /// programmatically rather than parsed.
    pub line: u32,
}

impl Structure {
    fn new(tag: impl Into<String>, line: u32) -> Structure {
        Structure {
            tag: tag.into(),
            payload: Payload::None,
            children: Vec::new(),
            parent: None,
            xref_id: None,
            references: Vec::new(),
            line,
        }
    }
}

/// A forest of tag-structures: the result of parsing GEDC text (or the input to serializing it).
#[derive(Clone, Debug, Default)]
pub struct Forest {
    structures: Vec<Structure>,
    xref_index: HashMap<String, StructureId>,
    roots: Vec<StructureId>,
}

impl Forest {
    /// An empty forest.
    #[must_use]
    pub fn new() -> Forest {
        Forest::default()
    }

    /// Appends a new, childless top-level structure and returns its id.
    pub fn add_root(&mut self, tag: impl Into<String>) -> StructureId {
        let id = self.push(Structure::new(tag, 0));
        self.roots.push(id);
        id
    }

    /// Appends a new, childless structure as a child of `parent` and returns its id.
    pub fn add_child(&mut self, parent: StructureId, tag: impl Into<String>) -> StructureId {
        let id = self.push(Structure::new(tag, 0));
        self.structures[id.0].parent = Some(parent);
        self.structures[parent.0].children.push(id);
        id
    }

    fn push(&mut self, structure: Structure) -> StructureId {
        let id = StructureId(self.structures.len());
        self.structures.push(structure);
        id
    }

    /// Looks up a structure by its immutable id.
    #[must_use]
    pub fn get(&self, id: StructureId) -> &Structure {
        &self.structures[id.0]
    }

    /// Looks up a structure by its immutable id, mutably.
    pub fn get_mut(&mut self, id: StructureId) -> &mut Structure {
        &mut self.structures[id.0]
    }

    /// The top-level structures, in document order.
    #[must_use]
    pub fn roots(&self) -> &[StructureId] {
        &self.roots
    }

    /// The total number of structures in the forest.
    #[must_use]
    pub fn len(&self) -> usize {
        self.structures.len()
    }

    /// True if the forest has no structures.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.structures.is_empty()
    }

    /// Sets `id`'s payload to a pointer at `target`, recording the reverse reference.
    pub fn set_pointer(&mut self, id: StructureId, target: StructureId) {
        self.structures[id.0].payload = Payload::Pointer(target);
        self.structures[target.0].references.push(id);
    }

    /// Sets `id`'s preferred cross-reference identifier, indexing it for pointer resolution.
    ///
    /// Returns `false` (and leaves the forest unchanged) if `xref_id` is already claimed by a
    /// different structure.
    #[must_use]
    pub fn set_xref_id(&mut self, id: StructureId, xref_id: impl Into<String>) -> bool {
        let xref_id = xref_id.into();
        if let Some(&existing) = self.xref_index.get(&xref_id) {
            if existing != id {
                return false;
            }
        }
        self.structures[id.0].xref_id = Some(xref_id.clone());
        self.xref_index.insert(xref_id, id);
        true
    }

    /// Finds a structure by its cross-reference identifier (without surrounding `@`).
    #[must_use]
    pub fn by_xref_id(&self, xref_id: &str) -> Option<StructureId> {
        self.xref_index.get(xref_id).copied()
    }

    /// Structures elsewhere in the forest that point at `id`.
    #[must_use]
    pub fn references(&self, id: StructureId) -> &[StructureId] {
        &self.structures[id.0].references
    }

    /// True if anything in the forest points at `id` (so it needs a cross-reference identifier
    /// to round-trip through text).
    #[must_use]
    pub fn is_pointed_to(&self, id: StructureId) -> bool {
        !self.references(id).is_empty()
    }

    /// All xref-ids already claimed in this forest (used by the identifier minter to avoid
    /// collisions).
    pub(crate) fn claimed_xref_ids(&self) -> impl Iterator<Item = &str> {
        self.xref_index.keys().map(String::as_str)
    }
}

impl NodeStore for Forest {
    type Id = StructureId;

    fn key(&self, id: StructureId) -> &str {
        &self.get(id).tag
    }

    fn children(&self, id: StructureId) -> Vec<StructureId> {
        self.get(id).children.clone()
    }

    fn roots(&self) -> Vec<StructureId> {
        self.roots.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_records_reverse_reference() {
        let mut forest = Forest::new();
        let fam = forest.add_root("FAM");
        let husb = forest.add_child(fam, "HUSB");
        let indi = forest.add_root("INDI");
        forest.set_xref_id(indi, "I1");
        forest.set_pointer(husb, indi);

        assert!(forest.is_pointed_to(indi));
        assert_eq!(forest.references(indi), &[husb]);
    }

    #[test]
    fn duplicate_xref_id_is_rejected() {
        let mut forest = Forest::new();
        let a = forest.add_root("INDI");
        let b = forest.add_root("INDI");
        assert!(forest.set_xref_id(a, "I1"));
        assert!(!forest.set_xref_id(b, "I1"));
    }
}
