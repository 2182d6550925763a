//! The typed layer (§4.5): a schema-aware dataset built atop the tag layer, where structure kinds
//! are resolved to canonical URIs, payloads are parsed into [`value::Value`]s, and substructure
//! cardinality/pointer targets are validated against a [`crate::schema::Lookup`].
//!
//! Mirrors the tag layer's arena/handle design (§9 Design Notes): a [`TypedDataset`] owns every
//! [`TypedStructure`] in a flat `Vec`, addressed by [`TypedStructureId`], so superstructure and
//! reverse-reference links are plain indices rather than `Rc`/lifetime cycles.

pub mod calendar;
#[cfg(feature = "json")]
pub mod json;
pub mod value;

use crate::dialect::Dialect;
use crate::schema::Lookup;
use crate::select::NodeStore;
use crate::tag::{Forest, Payload, StructureId};
use crate::{GedcomWarning, Severity, WarningKind};
use std::collections::{HashMap, HashSet};
use value::Value;

const HEAD_URI: &str = "https://gedcom.io/terms/v7/HEAD";

/// An index into a [`TypedDataset`]'s structure arena. Stable for the lifetime of the dataset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TypedStructureId(pub(crate) usize);

/// A typed structure's payload: absent, a parsed typed value, a pointer to another record in the
/// same dataset, or the null-pointer sentinel.
#[derive(Clone, Debug, PartialEq)]
pub enum TypedPayload {
    /// No payload.
    None,
    /// A parsed typed value.
    Value(Value),
    /// A pointer to another record (always a top-level structure, per the v7 pointer-target
    /// invariant).
    Pointer(TypedStructureId),
    /// The null-pointer sentinel.
    Void,
}

/// A single typed structure: a resolved type (a URI, or a bare tag for an undocumented
/// extension), a payload, and its substructures.
#[derive(Clone, Debug)]
pub struct TypedStructure {
    /// The structure's resolved type: a canonical URI for standard and schema-registered
    /// extension types, or the raw tag for an undocumented extension.
    pub type_: String,
    /// This structure's payload.
    pub payload: TypedPayload,
    children: Vec<TypedStructureId>,
    /// The structure containing this one, or `None` for a record (top-level structure).
    pub parent: Option<TypedStructureId>,
    /// Structures elsewhere in the dataset that point at this one.
    pub(crate) references: Vec<TypedStructureId>,
    /// This structure's preferred cross-reference identifier, if any.
    pub xref_id: Option<String>,
    payload_invalid: bool,
}

/// A schema-aware GEDCOM 7 dataset: one header and zero or more records, grouped by type, built
/// atop a [`crate::tag::Forest`] using a [`Lookup`] and the typed datatype grammar of
/// [`value::Value`].
pub struct TypedDataset {
    structures: Vec<TypedStructure>,
    records: Vec<TypedStructureId>,
    xref_index: HashMap<String, TypedStructureId>,
    lookup: Lookup,
    diagnostics: Vec<GedcomWarning>,
}

impl TypedDataset {
    /// Creates an empty dataset backed by `lookup`.
    #[must_use]
    pub fn new(lookup: Lookup) -> TypedDataset {
        TypedDataset {
            structures: Vec::new(),
            records: Vec::new(),
            xref_index: HashMap::new(),
            lookup,
            diagnostics: Vec::new(),
        }
    }

    /// The schema lookup backing this dataset.
    #[must_use]
    pub fn lookup(&self) -> &Lookup {
        &self.lookup
    }

    /// The schema lookup backing this dataset, mutably (for registering additional extensions
    /// before further construction).
    pub fn lookup_mut(&mut self) -> &mut Lookup {
        &mut self.lookup
    }

    /// Looks up a structure by its immutable id.
    #[must_use]
    pub fn get(&self, id: TypedStructureId) -> &TypedStructure {
        &self.structures[id.0]
    }

    /// Looks up a structure by its immutable id, mutably.
    pub fn get_mut(&mut self, id: TypedStructureId) -> &mut TypedStructure {
        &mut self.structures[id.0]
    }

    /// This structure's children, in document order.
    #[must_use]
    pub fn children(&self, id: TypedStructureId) -> &[TypedStructureId] {
        &self.structures[id.0].children
    }

    /// This structure's children whose resolved type is exactly `type_uri`, in document order.
    #[must_use]
    pub fn children_of_type(&self, id: TypedStructureId, type_uri: &str) -> Vec<TypedStructureId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|&c| self.get(c).type_ == type_uri)
            .collect()
    }

    /// Every record (top-level structure), in document order.
    #[must_use]
    pub fn records(&self) -> &[TypedStructureId] {
        &self.records
    }

    /// Every record whose resolved type is exactly `type_uri`, in document order.
    #[must_use]
    pub fn records_of_type(&self, type_uri: &str) -> Vec<TypedStructureId> {
        self.records
            .iter()
            .copied()
            .filter(|&r| self.get(r).type_ == type_uri)
            .collect()
    }

    /// The dataset's single header record, if one has been created.
    #[must_use]
    pub fn header(&self) -> Option<TypedStructureId> {
        self.records.iter().copied().find(|&r| self.get(r).type_ == HEAD_URI)
    }

    /// Finds a structure by its cross-reference identifier.
    #[must_use]
    pub fn by_xref_id(&self, xref_id: &str) -> Option<TypedStructureId> {
        self.xref_index.get(xref_id).copied()
    }

    /// Resolves `tag_or_uri` to a canonical type within `container_type` (the empty string for
    /// record-level resolution), consulting the schema lookup's five-way taxonomy unless
    /// `tag_or_uri` already looks like a URI.
    fn resolve_type(&self, container_type: &str, tag_or_uri: &str) -> String {
        if tag_or_uri.starts_with("http") {
            tag_or_uri.to_string()
        } else {
            self.lookup.substructure(container_type, tag_or_uri).uri().to_string()
        }
    }

    fn push(&mut self, type_: String) -> TypedStructureId {
        let id = TypedStructureId(self.structures.len());
        self.structures.push(TypedStructure {
            type_,
            payload: TypedPayload::None,
            children: Vec::new(),
            parent: None,
            references: Vec::new(),
            xref_id: None,
            payload_invalid: false,
        });
        id
    }

    /// Construction path (a): creates a new record (top-level structure) given a tag or URI.
    pub fn create_record(&mut self, tag_or_uri: &str) -> TypedStructureId {
        let type_ = self.resolve_type("", tag_or_uri);
        let id = self.push(type_);
        self.records.push(id);
        id
    }

    /// Construction path (b): creates a new substructure under `parent` given a tag or URI.
    pub fn create_child(&mut self, parent: TypedStructureId, tag_or_uri: &str) -> TypedStructureId {
        let container = self.get(parent).type_.clone();
        let type_ = self.resolve_type(&container, tag_or_uri);
        let id = self.push(type_);
        self.structures[id.0].parent = Some(parent);
        self.structures[parent.0].children.push(id);
        id
    }

    /// Sets `id`'s preferred cross-reference identifier, indexing it for lookup. Returns `false`
    /// (leaving the dataset unchanged) if the identifier is already claimed by a different
    /// structure.
    #[must_use]
    pub fn set_xref_id(&mut self, id: TypedStructureId, xref_id: impl Into<String>) -> bool {
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

    /// Parses `raw` according to `id`'s resolved type's payload grammar and sets it as `id`'s
    /// payload. Diagnostics are recorded against the dataset's diagnostic sink, prefixed with the
    /// type URI per §9's "thread a diagnostics context explicitly" guidance.
    pub fn set_text(&mut self, id: TypedStructureId, raw: &str) {
        let type_uri = self.get(id).type_.clone();
        let entry = self.lookup.payload(&type_uri);
        let mut diags = Vec::new();
        let value = Value::parse(raw, &entry, &self.lookup, &type_uri, &mut diags);
        let invalid = diags.iter().any(|d| d.severity == Severity::Error);
        self.diagnostics.extend(diags);
        self.structures[id.0].payload = TypedPayload::Value(value);
        self.structures[id.0].payload_invalid = invalid;
    }

    /// Sets `id`'s payload to the null-pointer sentinel.
    pub fn set_void(&mut self, id: TypedStructureId) {
        self.structures[id.0].payload = TypedPayload::Void;
    }

    /// Sets `id`'s payload to a pointer at `target`, enforcing the v7 pointer invariants:
    /// pointers may only target records, and must match the payload type's declared target type
    /// (the `to` field) when one is declared. On violation, `id`'s payload is set to the
    /// null-pointer sentinel, a diagnostic is recorded, and `false` is returned.
    pub fn set_pointer(&mut self, id: TypedStructureId, target: TypedStructureId) -> bool {
        let type_uri = self.get(id).type_.clone();

        if self.get(target).parent.is_some() {
            self.diagnostics.push(GedcomWarning::in_context(
                type_uri,
                Severity::Error,
                WarningKind::Message("pointer to a non-record structure".to_string()),
            ));
            self.structures[id.0].payload = TypedPayload::Void;
            return false;
        }

        let entry = self.lookup.payload(&type_uri);
        if let Some(expected) = &entry.to {
            let target_type = self.get(target).type_.clone();
            if &target_type != expected {
                self.diagnostics.push(GedcomWarning::in_context(
                    type_uri,
                    Severity::Error,
                    WarningKind::Message(format!(
                        "pointer target type mismatch: expected {expected}, found {target_type}"
                    )),
                ));
                self.structures[id.0].payload = TypedPayload::Void;
                return false;
            }
        }

        self.structures[id.0].payload = TypedPayload::Pointer(target);
        self.structures[target.0].references.push(id);
        true
    }

    /// Drains diagnostics accumulated on this dataset and on its schema lookup.
    pub fn take_diagnostics(&mut self) -> Vec<GedcomWarning> {
        let mut out = std::mem::take(&mut self.diagnostics);
        out.extend(self.lookup.take_diagnostics());
        out
    }

    /// Construction path (c): converts a parsed tag forest into a typed dataset, resolving every
    /// structure's type, parsing every payload, registering `HEAD.SCHMA` extensions before they
    /// are needed, and fixing up pointer payloads in a final pass.
    #[must_use]
    pub fn from_forest(forest: &Forest, lookup: Lookup) -> (TypedDataset, Vec<GedcomWarning>) {
        let mut lookup = lookup;
        for &root in forest.roots() {
            if forest.get(root).tag != "HEAD" {
                continue;
            }
            for &child in &forest.get(root).children {
                if forest.get(child).tag != "SCHMA" {
                    continue;
                }
                for &decl in &forest.get(child).children {
                    let structure = forest.get(decl);
                    if structure.tag != "TAG" {
                        continue;
                    }
                    if let Some(text) = structure.payload.as_text() {
                        if let Some((tag, uri)) = text.trim().split_once(char::is_whitespace) {
                            lookup.add_extension(tag.trim(), uri.trim());
                        }
                    }
                }
            }
        }

        let mut dataset = TypedDataset::new(lookup);
        let mut id_map: HashMap<StructureId, TypedStructureId> = HashMap::new();
        let mut pointer_fixups: Vec<(TypedStructureId, StructureId)> = Vec::new();

        for &root in forest.roots() {
            dataset.build_from_tag(forest, root, None, "", &mut id_map, &mut pointer_fixups);
        }

        for (typed_id, forest_target) in pointer_fixups {
            match id_map.get(&forest_target) {
                Some(&target_typed) => {
                    dataset.set_pointer(typed_id, target_typed);
                }
                None => dataset.structures[typed_id.0].payload = TypedPayload::Void,
            }
        }

        let diags = dataset.take_diagnostics();
        (dataset, diags)
    }

    fn build_from_tag(
        &mut self,
        forest: &Forest,
        node: StructureId,
        parent: Option<TypedStructureId>,
        container_type: &str,
        id_map: &mut HashMap<StructureId, TypedStructureId>,
        pointer_fixups: &mut Vec<(TypedStructureId, StructureId)>,
    ) -> TypedStructureId {
        let structure = forest.get(node);
        let type_uri = self.resolve_type(container_type, &structure.tag);

        let id = match parent {
            Some(p) => {
                let new_id = self.push(type_uri.clone());
                self.structures[new_id.0].parent = Some(p);
                self.structures[p.0].children.push(new_id);
                new_id
            }
            None => {
                let new_id = self.push(type_uri.clone());
                self.records.push(new_id);
                new_id
            }
        };
        id_map.insert(node, id);

        if let Some(xref) = &structure.xref_id {
            self.set_xref_id(id, xref.clone());
        }

        match &structure.payload {
            Payload::None => {}
            Payload::Void => self.structures[id.0].payload = TypedPayload::Void,
            Payload::Pointer(target) => pointer_fixups.push((id, *target)),
            Payload::Text(text) => self.set_text(id, text),
        }

        for &child in &structure.children.clone() {
            self.build_from_tag(forest, child, Some(id), &type_uri, id_map, pointer_fixups);
        }

        id
    }

    /// Serializes this dataset back to a tag forest: mints extension tags for every used
    /// non-standard type via [`Lookup::schema_prep`], writes a `HEAD.SCHMA` block declaring them,
    /// emits every record and substructure with its schema-recommended (or minted) tag, resolves
    /// pointer payloads to tag-layer pointers, and terminates the forest with `TRLR`.
    pub fn to_forest(&mut self) -> Forest {
        let used = self.collect_used_types();
        let mints = self.lookup.schema_prep(&used, "");

        let mut forest = Forest::new();
        let mut id_map: HashMap<TypedStructureId, StructureId> = HashMap::new();
        let mut pointer_fixups: Vec<(StructureId, TypedStructureId)> = Vec::new();
        let mut wrote_trailer = false;

        for &record in &self.records.clone() {
            let tag_id = self.emit_structure(&mut forest, record, None, &mut id_map, &mut pointer_fixups);
            if self.get(record).type_ == HEAD_URI {
                self.ensure_schema_block(&mut forest, tag_id, &mints);
            }
            if self.lookup.tag(&self.get(record).type_) == "TRLR" {
                wrote_trailer = true;
            }
        }

        for (tag_id, typed_target) in pointer_fixups {
            match id_map.get(&typed_target) {
                Some(&target_tag_id) => forest.set_pointer(tag_id, target_tag_id),
                None => forest.get_mut(tag_id).payload = Payload::Void,
            }
        }

        if !wrote_trailer {
            forest.add_root("TRLR");
        }
        forest
    }

    fn collect_used_types(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for structure in &self.structures {
            if structure.type_.starts_with("http") && seen.insert(structure.type_.clone()) {
                out.push(structure.type_.clone());
            }
        }
        out
    }

    fn ensure_schema_block(&self, forest: &mut Forest, head_tag_id: StructureId, mints: &[(String, String)]) {
        if mints.is_empty() {
            return;
        }
        let schma_id = forest.add_child(head_tag_id, "SCHMA");
        for (uri, tag) in mints {
            let decl = forest.add_child(schma_id, "TAG");
            forest.get_mut(decl).payload = Payload::Text(format!("{tag} {uri}"));
        }
    }

    fn emit_structure(
        &self,
        forest: &mut Forest,
        id: TypedStructureId,
        parent_tag: Option<StructureId>,
        id_map: &mut HashMap<TypedStructureId, StructureId>,
        pointer_fixups: &mut Vec<(StructureId, TypedStructureId)>,
    ) -> StructureId {
        let structure = self.get(id);
        let tag = self.lookup.tag(&structure.type_);
        let tag_id = match parent_tag {
            Some(p) => forest.add_child(p, tag),
            None => forest.add_root(tag),
        };
        id_map.insert(id, tag_id);

        if let Some(xref) = &structure.xref_id {
            forest.set_xref_id(tag_id, xref.clone());
        }

        match &structure.payload {
            TypedPayload::None => {}
            TypedPayload::Void => forest.get_mut(tag_id).payload = Payload::Void,
            TypedPayload::Pointer(target) => pointer_fixups.push((tag_id, *target)),
            TypedPayload::Value(v) => {
                let text = v.to_gedcom_string(&self.lookup);
                forest.get_mut(tag_id).payload = Payload::Text(text);
            }
        }

        for child in structure.children.clone() {
            self.emit_structure(forest, child, Some(tag_id), id_map, pointer_fixups);
        }

        tag_id
    }

    /// Validates the whole dataset per §4.5's six-step algorithm, recursing from every record.
    /// Returns the total error count; warnings (deprecations) are recorded on the diagnostic sink
    /// but not counted.
    pub fn validate(&mut self) -> usize {
        let roots = self.records.clone();
        roots.iter().map(|&r| self.validate_structure(r)).sum()
    }

    fn validate_structure(&mut self, id: TypedStructureId) -> usize {
        let mut errors = 0;
        let type_uri = self.get(id).type_.clone();
        let children: Vec<TypedStructureId> = self.children(id).to_vec();

        for required_uri in self.lookup.required_substructures(&type_uri) {
            let present = children.iter().any(|&c| self.get(c).type_ == required_uri);
            if !present {
                self.diagnostics.push(GedcomWarning::in_context(
                    type_uri.clone(),
                    Severity::Error,
                    WarningKind::Message(format!("Missing substructure: {required_uri}")),
                ));
                errors += 1;
            }
        }

        let mut checked: HashSet<String> = HashSet::new();
        for child in &children {
            let child_type = self.get(*child).type_.clone();
            if !checked.insert(child_type.clone()) {
                continue;
            }
            if let Some(cardinality) = self.lookup.cardinality_of(&type_uri, &child_type) {
                if cardinality.max == Some(1) {
                    let count = children.iter().filter(|&&c| self.get(c).type_ == child_type).count();
                    if count > 1 {
                        self.diagnostics.push(GedcomWarning::in_context(
                            type_uri.clone(),
                            Severity::Error,
                            WarningKind::Message(format!("Too many {child_type} substructures")),
                        ));
                        errors += 1;
                    }
                }
            }
        }

        let payload_is_empty = matches!(self.get(id).payload, TypedPayload::None)
            || matches!(&self.get(id).payload, TypedPayload::Value(v) if v.is_empty());

        if self.lookup.tag(&type_uri) != "TRLR" && children.is_empty() && payload_is_empty {
            self.diagnostics.push(GedcomWarning::in_context(
                type_uri.clone(),
                Severity::Error,
                WarningKind::Message("empty structure".to_string()),
            ));
            errors += 1;
        }

        if self.get(id).payload_invalid {
            errors += 1;
        }

        if type_uri.ends_with("/EXID") || type_uri == "EXID" {
            let has_type = children
                .iter()
                .any(|&c| self.get(c).type_.ends_with("/EXID-TYPE") || self.get(c).type_ == "EXID-TYPE");
            if !has_type {
                self.diagnostics.push(GedcomWarning::in_context(
                    type_uri,
                    Severity::Warning,
                    WarningKind::DeprecatedExidWithoutType,
                ));
            }
        }

        for child in children {
            errors += self.validate_structure(child);
        }

        errors
    }

    fn payload_string(&self, id: TypedStructureId) -> String {
        match &self.get(id).payload {
            TypedPayload::None => String::new(),
            TypedPayload::Void => "VOID".to_string(),
            TypedPayload::Pointer(target) => self.get(*target).xref_id.clone().unwrap_or_default(),
            TypedPayload::Value(v) => v.to_gedcom_string(&self.lookup),
        }
    }

    /// Descends from `start`, following a path of (tag-or-URI, expected-payload) pairs;
    /// `expected_payload` of `None` matches any payload (the `-1` wildcard of §4.5). Returns the
    /// final structure reached, or `None` if any segment has no match.
    #[must_use]
    pub fn find(
        &self,
        start: TypedStructureId,
        path: &[(&str, Option<&str>)],
    ) -> Option<TypedStructureId> {
        let mut current = start;
        for &(tag_or_uri, expected_payload) in path {
            let container = self.get(current).type_.clone();
            let target_type = self.resolve_type(&container, tag_or_uri);
            let next = self.children(current).iter().copied().find(|&c| {
                self.get(c).type_ == target_type
                    && expected_payload.map_or(true, |expected| self.payload_string(c) == expected)
            })?;
            current = next;
        }
        Some(current)
    }

    /// Like [`TypedDataset::find`], but creates any missing segment of the path (reusing every
    /// matched ancestor), returning the final structure.
    pub fn find_or_create(
        &mut self,
        start: TypedStructureId,
        path: &[(&str, Option<&str>)],
    ) -> TypedStructureId {
        let mut current = start;
        for &(tag_or_uri, expected_payload) in path {
            let container = self.get(current).type_.clone();
            let target_type = self.resolve_type(&container, tag_or_uri);
            let existing = self.children(current).iter().copied().find(|&c| {
                self.get(c).type_ == target_type
                    && expected_payload.map_or(true, |expected| self.payload_string(c) == expected)
            });
            current = match existing {
                Some(id) => id,
                None => {
                    let id = self.create_child(current, tag_or_uri);
                    if let Some(payload) = expected_payload {
                        self.set_text(id, payload);
                    }
                    id
                }
            };
        }
        current
    }
}

impl NodeStore for TypedDataset {
    type Id = TypedStructureId;

    fn key(&self, id: TypedStructureId) -> &str {
        &self.get(id).type_
    }

    fn children(&self, id: TypedStructureId) -> Vec<TypedStructureId> {
        self.children(id).to_vec()
    }

    fn roots(&self) -> Vec<TypedStructureId> {
        self.records.clone()
    }
}

/// Parses GEDC text through the tag layer and the typed layer in one call, the typical
/// entry point once a [`Lookup`] has been built from the registry JSON.
#[must_use]
pub fn parse(source: &str, dialect: &Dialect, lookup: Lookup) -> Result<(TypedDataset, Vec<GedcomWarning>), crate::GedcomError> {
    let parsed = crate::tag::parse::parse(source, dialect)?;
    let (mut dataset, mut warnings) = TypedDataset::from_forest(&parsed.data, lookup);
    warnings.extend(parsed.warnings);
    let validation_warnings = dataset.take_diagnostics();
    warnings.extend(validation_warnings);
    Ok((dataset, warnings))
}
