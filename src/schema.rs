//! Schema lookup (§4.4): wraps the parsed GEDCOM 7 registry JSON and answers every question the
//! typed layer needs to ask about a tag or URI — the five-way (and six-way) extension-handling
//! taxonomy lives here.

use crate::{GedcomError, GedcomWarning, Severity, WarningKind};
use serde_json::Value as Json;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

/// A substructure's declared cardinality: `{0:1}`, `{1:1}`, `{0:M}`, `{1:M}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cardinality {
    /// Lower bound (0 or 1).
    pub min: u8,
    /// Upper bound, `None` meaning `M` (unbounded).
    pub max: Option<u8>,
}

impl Cardinality {
    fn from_str(raw: &str) -> Cardinality {
        // The registry spells this "{0:1}", "{1:1}", "{0:M}", "{1:M}".
        let trimmed = raw.trim_start_matches('{').trim_end_matches('}');
        let mut parts = trimmed.split(':');
        let min = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
        let max = match parts.next() {
            Some("M") | None => None,
            Some(n) => n.parse().ok(),
        };
        Cardinality { min, max }
    }
}

/// A single `substructure[container][tag]` entry.
#[derive(Clone, Debug)]
pub struct SubstructureEntry {
    /// The child's canonical type URI.
    pub type_uri: String,
    /// The declared cardinality.
    pub cardinality: Cardinality,
}

/// A single `payload[URI]` entry.
#[derive(Clone, Debug, Default)]
pub struct PayloadEntry {
    /// The payload's type-class name (e.g. `"https://gedcom.io/terms/v7/type-Date"`, or a
    /// primitive name like `"Integer"`).
    pub type_name: String,
    /// For enumerated payloads, the set URI to resolve values against.
    pub set: Option<String>,
    /// For pointer payloads, the required target type URI.
    pub to: Option<String>,
}

/// A single `calendar[tag]` entry.
#[derive(Clone, Debug, Default)]
pub struct CalendarEntry {
    /// The calendar's canonical type URI.
    pub type_uri: String,
    /// Month tag → URI, in the order the registry declares them.
    pub months: Vec<(String, String)>,
    /// Recognized epoch markers (e.g. `"BCE"`).
    pub epochs: Vec<String>,
}

/// Outcome of resolving a (container, tag) pair or a tag within a set/calendar: distinguishes the
/// five-/six-way incident taxonomy of §4.4 from a clean resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// A standard, schema-declared URI.
    Standard(String),
    /// An extension tag with a `SCHMA`-declared URI.
    Extension(String),
    /// A standard tag used outside its standard container (a record-level tag that the
    /// registry only ever declares as someone else's substructure).
    Relocated(String),
    /// No entry anywhere; the raw tag is used as a fallback "type".
    Undocumented(String),
}

impl Resolution {
    /// The resolved URI or fallback tag, independent of which case matched.
    #[must_use]
    pub fn uri(&self) -> &str {
        match self {
            Resolution::Standard(s)
            | Resolution::Extension(s)
            | Resolution::Relocated(s)
            | Resolution::Undocumented(s) => s,
        }
    }
}

/// The schema lookup: parsed registry maps, alias side-tables for URI-keyed reverse lookup, the
/// live `SCHMA` extension table, and deduplicating diagnostic sinks.
pub struct Lookup {
    substructure: HashMap<String, HashMap<String, SubstructureEntry>>,
    payload: HashMap<String, PayloadEntry>,
    set: HashMap<String, HashMap<String, String>>,
    calendar: HashMap<String, CalendarEntry>,
    tag: HashMap<String, String>,
    tag_to_uri: HashMap<String, String>,
    /// Every type URI the registry declares as *someone's* substructure — a standard tag
    /// resolving to one of these at record level (or under a container that doesn't declare it)
    /// is relocated rather than genuinely standard there.
    substructure_type_uris: HashSet<String>,
    req_substr: RefCell<HashMap<String, Vec<String>>>,
    extensions: HashMap<String, String>,
    seen_messages: RefCell<HashSet<String>>,
    diagnostics: RefCell<Vec<GedcomWarning>>,
}

impl Lookup {
    /// Builds a lookup from the registry JSON's raw text.
    ///
    /// # Errors
    ///
    /// Returns an error if `source` is not valid JSON.
    pub fn from_json_str(source: &str) -> Result<Lookup, GedcomError> {
        let doc: Json = serde_json::from_str(source)
            .map_err(|e| GedcomError::ParseError { line: 0, message: format!("schema JSON: {e}") })?;
        Ok(Lookup::from_value(&doc))
    }

    /// Builds a lookup from an already-parsed registry document.
    #[must_use]
    pub fn from_value(doc: &Json) -> Lookup {
        let mut substructure = HashMap::new();
        if let Some(map) = doc.get("substructure").and_then(Json::as_object) {
            for (container, tags) in map {
                let mut entries = HashMap::new();
                if let Some(tags) = tags.as_object() {
                    for (tag, spec) in tags {
                        let type_uri = spec
                            .get("type")
                            .and_then(Json::as_str)
                            .unwrap_or_default()
                            .to_string();
                        let cardinality = spec
                            .get("cardinality")
                            .and_then(Json::as_str)
                            .map_or(Cardinality { min: 0, max: None }, Cardinality::from_str);
                        entries.insert(tag.clone(), SubstructureEntry { type_uri, cardinality });
                    }
                }
                substructure.insert(container.clone(), entries);
            }
        }

        let mut payload = HashMap::new();
        if let Some(map) = doc.get("payload").and_then(Json::as_object) {
            for (uri, spec) in map {
                payload.insert(
                    uri.clone(),
                    PayloadEntry {
                        type_name: spec
                            .get("type")
                            .and_then(Json::as_str)
                            .unwrap_or_default()
                            .to_string(),
                        set: spec.get("set").and_then(Json::as_str).map(str::to_string),
                        to: spec.get("to").and_then(Json::as_str).map(str::to_string),
                    },
                );
            }
        }

        let mut set = HashMap::new();
        if let Some(map) = doc.get("set").and_then(Json::as_object) {
            for (set_uri, tags) in map {
                let mut entries = HashMap::new();
                if let Some(tags) = tags.as_object() {
                    for (tag, value_uri) in tags {
                        if let Some(value_uri) = value_uri.as_str() {
                            entries.insert(tag.clone(), value_uri.to_string());
                        }
                    }
                }
                set.insert(set_uri.clone(), entries);
            }
        }

        let mut calendar = HashMap::new();
        if let Some(map) = doc.get("calendar").and_then(Json::as_object) {
            for (tag, spec) in map {
                let type_uri = spec
                    .get("type")
                    .and_then(Json::as_str)
                    .unwrap_or_default()
                    .to_string();
                let mut months = Vec::new();
                if let Some(m) = spec.get("months").and_then(Json::as_object) {
                    for (month_tag, uri) in m {
                        if let Some(uri) = uri.as_str() {
                            months.push((month_tag.clone(), uri.to_string()));
                        }
                    }
                }
                let epochs = spec
                    .get("epochs")
                    .and_then(Json::as_array)
                    .map(|a| a.iter().filter_map(Json::as_str).map(str::to_string).collect())
                    .unwrap_or_default();
                calendar.insert(tag.clone(), CalendarEntry { type_uri, months, epochs });
            }
        }

        let mut tag = HashMap::new();
        if let Some(map) = doc.get("tag").and_then(Json::as_object) {
            for (uri, t) in map {
                if let Some(t) = t.as_str() {
                    tag.insert(uri.clone(), t.to_string());
                }
            }
        }

        // Reverse index for record-level resolution (§4.4): a root structure's container is "",
        // which never appears as a `substructure` key, so the only way to recover its canonical
        // type URI from its tag is through the registry's own tag↔URI declarations.
        let tag_to_uri: HashMap<String, String> =
            tag.iter().map(|(uri, t)| (t.clone(), uri.clone())).collect();

        let substructure_type_uris: HashSet<String> = substructure
            .values()
            .flat_map(HashMap::values)
            .map(|entry| entry.type_uri.clone())
            .collect();

        Lookup {
            substructure,
            payload,
            set,
            calendar,
            tag,
            tag_to_uri,
            substructure_type_uris,
            req_substr: RefCell::new(HashMap::new()),
            extensions: HashMap::new(),
            seen_messages: RefCell::new(HashSet::new()),
            diagnostics: RefCell::new(Vec::new()),
        }
    }

    /// An empty lookup: every resolution falls through to undocumented/fallback behavior. Useful
    /// for tests and for callers who have not supplied a registry document.
    #[must_use]
    pub fn empty() -> Lookup {
        Lookup::from_value(&Json::Object(serde_json::Map::new()))
    }

    /// Drains the diagnostics accumulated since the last call.
    pub fn take_diagnostics(&self) -> Vec<GedcomWarning> {
        std::mem::take(&mut *self.diagnostics.borrow_mut())
    }

    fn emit(&self, context: &str, severity: Severity, kind: WarningKind) {
        let rendered = format!("{context}: {kind}");
        if self.seen_messages.borrow_mut().insert(rendered) {
            self.diagnostics
                .borrow_mut()
                .push(GedcomWarning::in_context(context, severity, kind));
        }
    }

    /// Registers a `HEAD.SCHMA.TAG` declaration: `tag` ↔ `uri`. If `tag` was already declared
    /// against a *different* URI in this same `SCHMA` table, the declaration is ambiguous (§4.4);
    /// the first registration wins and the conflict is reported once.
    pub fn add_extension(&mut self, tag: impl Into<String>, uri: impl Into<String>) {
        let tag = tag.into();
        let uri = uri.into();
        match self.extensions.get(&tag) {
            Some(existing) if *existing != uri => {
                self.emit(
                    "SCHMA",
                    Severity::Error,
                    WarningKind::AmbiguousExtension { tag: tag.clone() },
                );
            }
            _ => {
                self.extensions.insert(tag, uri);
            }
        }
    }

    /// The live `SCHMA` extension table (tag → URI), in no particular order.
    #[must_use]
    pub fn extensions(&self) -> &HashMap<String, String> {
        &self.extensions
    }

    /// Resolves a (container URI or tag, tag) pair per the five-way taxonomy of §4.4.
    pub fn substructure(&self, container: &str, tag: &str) -> Resolution {
        if let Some(entries) = self.substructure.get(container) {
            if let Some(entry) = entries.get(tag) {
                return Resolution::Standard(entry.type_uri.clone());
            }
            if let Some(uri) = self.extensions.get(tag) {
                if entries.values().any(|e| e.type_uri == *uri) {
                    self.emit(
                        container,
                        Severity::Warning,
                        WarningKind::AliasedExtension { tag: tag.to_string(), standard_uri: uri.clone() },
                    );
                } else {
                    self.emit(
                        container,
                        Severity::Warning,
                        WarningKind::UnregisteredExtension { uri: uri.clone() },
                    );
                }
                return Resolution::Extension(uri.clone());
            }
            if tag.starts_with('_') {
                self.emit(
                    container,
                    Severity::Warning,
                    WarningKind::UndocumentedExtension { tag: tag.to_string() },
                );
                return Resolution::Undocumented(tag.to_string());
            }
            self.emit(
                container,
                Severity::Error,
                WarningKind::ProhibitedSubstructure {
                    container: container.to_string(),
                    tag: tag.to_string(),
                },
            );
            return Resolution::Undocumented(tag.to_string());
        }

        // Unknown container: treat the tag as a record-level type. A record's own canonical URI
        // is only reachable through the registry's tag↔URI table, since record types never
        // appear as some other container's substructure entry — unless the registry only ever
        // declares this URI as *someone else's* substructure, in which case this tag has been
        // relocated to a place the schema doesn't sanction.
        if let Some(uri) = self.tag_to_uri.get(tag) {
            if self.substructure_type_uris.contains(uri) {
                self.emit(
                    container,
                    Severity::Warning,
                    WarningKind::RelocatedStructure { tag: tag.to_string(), uri: uri.clone() },
                );
                return Resolution::Relocated(uri.clone());
            }
            return Resolution::Standard(uri.clone());
        }
        if let Some(uri) = self.extensions.get(tag) {
            return Resolution::Extension(uri.clone());
        }
        if tag.starts_with('_') {
            self.emit(
                container,
                Severity::Warning,
                WarningKind::UndocumentedExtension { tag: tag.to_string() },
            );
        } else {
            self.emit(
                container,
                Severity::Warning,
                WarningKind::NovelContainer { tag: tag.to_string() },
            );
        }
        Resolution::Undocumented(tag.to_string())
    }

    /// Resolves a calendar tag (e.g. `GREGORIAN`, `JULIAN`) to its entry.
    #[must_use]
    pub fn calendar(&self, tag: &str) -> Option<&CalendarEntry> {
        self.calendar.get(tag)
    }

    /// Resolves a month tag within a calendar. Falls back to treating the tag itself as the
    /// "URI" for calendars the registry does not recognize (e.g. a caller-supplied extension
    /// calendar), per the datatype grammar's "unknown month-tag in an unrecognized calendar is
    /// accepted as tag" rule.
    #[must_use]
    pub fn month(&self, calendar_tag: &str, month_tag: &str) -> Option<String> {
        match self.calendar.get(calendar_tag) {
            Some(entry) => entry
                .months
                .iter()
                .find(|(t, _)| t == month_tag)
                .map(|(_, uri)| uri.clone())
                .or_else(|| Some(month_tag.to_string())),
            None => Some(month_tag.to_string()),
        }
    }

    /// Resolves an enumeration value within `set_uri`.
    pub fn enumval(&self, set_uri: &str, tag: &str) -> Resolution {
        if let Some(entries) = self.set.get(set_uri) {
            if let Some(uri) = entries.get(tag) {
                return Resolution::Standard(uri.clone());
            }
        }
        if let Some(uri) = self.extensions.get(tag) {
            self.emit(
                set_uri,
                Severity::Warning,
                WarningKind::UnregisteredExtension { uri: uri.clone() },
            );
            return Resolution::Extension(uri.clone());
        }
        self.emit(
            set_uri,
            Severity::Warning,
            WarningKind::UndocumentedExtension { tag: tag.to_string() },
        );
        Resolution::Undocumented(tag.to_string())
    }

    /// The payload-type descriptor for `uri`, or a `"?"`-typed default when unknown.
    #[must_use]
    pub fn payload(&self, uri: &str) -> PayloadEntry {
        self.payload.get(uri).cloned().unwrap_or_else(|| PayloadEntry {
            type_name: "?".to_string(),
            set: None,
            to: None,
        })
    }

    /// The recommended tag to serialize `uri` as. Falls back to the last path segment of the URI
    /// (or an already-registered extension tag) when the registry has no entry.
    #[must_use]
    pub fn tag(&self, uri: &str) -> String {
        if let Some(t) = self.tag.get(uri) {
            return t.clone();
        }
        for (tag, ext_uri) in &self.extensions {
            if ext_uri == uri {
                return tag.clone();
            }
        }
        uri.rsplit('/').next().unwrap_or(uri).to_string()
    }

    /// The required (cardinality lower-bound 1) substructure URIs for a container, memoized.
    pub fn required_substructures(&self, container: &str) -> Vec<String> {
        if let Some(cached) = self.req_substr.borrow().get(container) {
            return cached.clone();
        }
        let required: Vec<String> = self
            .substructure
            .get(container)
            .map(|entries| {
                entries
                    .values()
                    .filter(|e| e.cardinality.min >= 1)
                    .map(|e| e.type_uri.clone())
                    .collect()
            })
            .unwrap_or_default();
        self.req_substr
            .borrow_mut()
            .insert(container.to_string(), required.clone());
        required
    }

    /// The declared cardinality for a (container, child-URI) pair, if the schema names it.
    #[must_use]
    pub fn cardinality_of(&self, container: &str, child_uri: &str) -> Option<Cardinality> {
        self.substructure.get(container).and_then(|entries| {
            entries
                .values()
                .find(|e| e.type_uri == child_uri)
                .map(|e| e.cardinality)
        })
    }

    /// Mints an extension tag for every URI in `used` that has no standard placement within
    /// `within`, reusing already-registered extension tags and breaking collisions with a
    /// numeric suffix. Returns the minted/reused tag for each URI, in the order given.
    pub fn schema_prep(&mut self, used: &[String], within: &str) -> Vec<(String, String)> {
        let mut claimed: HashSet<String> = self.extensions.keys().cloned().collect();
        let mut out = Vec::new();
        for uri in used {
            if let Some(standard_tag) = self.standard_tag_in(within, uri) {
                out.push((uri.clone(), standard_tag));
                continue;
            }
            if let Some((tag, _)) = self.extensions.iter().find(|(_, u)| *u == uri) {
                out.push((uri.clone(), tag.clone()));
                continue;
            }
            let base = format!("_{}", self.tag(uri).trim_start_matches('_').to_ascii_uppercase());
            let mut candidate = base.clone();
            let mut n = 1;
            while claimed.contains(&candidate) {
                n += 1;
                candidate = format!("{base}{n}");
            }
            claimed.insert(candidate.clone());
            self.extensions.insert(candidate.clone(), uri.clone());
            out.push((uri.clone(), candidate));
        }
        out
    }

    fn standard_tag_in(&self, container: &str, uri: &str) -> Option<String> {
        self.substructure.get(container).and_then(|entries| {
            entries
                .iter()
                .find(|(_, e)| e.type_uri == *uri)
                .map(|(tag, _)| tag.clone())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_doc() -> Json {
        serde_json::json!({
            "substructure": {
                "https://gedcom.io/terms/v7/HEAD": {
                    "GEDC": {"type": "https://gedcom.io/terms/v7/GEDC", "cardinality": "{1:1}"}
                }
            },
            "payload": {
                "https://gedcom.io/terms/v7/GEDC": {"type": "https://gedcom.io/terms/v7/type-List#Text"}
            },
            "tag": {
                "https://gedcom.io/terms/v7/GEDC": "GEDC"
            }
        })
    }

    #[test]
    fn resolves_standard_substructure() {
        let lookup = Lookup::from_value(&sample_doc());
        let resolution = lookup.substructure("https://gedcom.io/terms/v7/HEAD", "GEDC");
        assert_eq!(
            resolution,
            Resolution::Standard("https://gedcom.io/terms/v7/GEDC".to_string())
        );
    }

    #[test]
    fn undocumented_extension_tag_is_flagged() {
        let lookup = Lookup::from_value(&sample_doc());
        let resolution = lookup.substructure("https://gedcom.io/terms/v7/HEAD", "_FOO");
        assert_eq!(resolution, Resolution::Undocumented("_FOO".to_string()));
        let diags = lookup.take_diagnostics();
        assert_eq!(diags.len(), 1);
        assert!(matches!(diags[0].kind, WarningKind::UndocumentedExtension { .. }));
    }

    #[test]
    fn registered_extension_is_unregistered_warning_only() {
        let mut lookup = Lookup::from_value(&sample_doc());
        lookup.add_extension("_FOO", "https://example.com/foo");
        let resolution = lookup.substructure("https://gedcom.io/terms/v7/HEAD", "_FOO");
        assert_eq!(
            resolution,
            Resolution::Extension("https://example.com/foo".to_string())
        );
        let diags = lookup.take_diagnostics();
        assert_eq!(diags.len(), 1);
        assert!(matches!(diags[0].kind, WarningKind::UnregisteredExtension { .. }));
    }

    #[test]
    fn required_substructures_are_memoized() {
        let lookup = Lookup::from_value(&sample_doc());
        let required = lookup.required_substructures("https://gedcom.io/terms/v7/HEAD");
        assert_eq!(required, vec!["https://gedcom.io/terms/v7/GEDC".to_string()]);
        // second call should hit the memoized path; behavior, not internals, is observable here.
        assert_eq!(
            lookup.required_substructures("https://gedcom.io/terms/v7/HEAD"),
            required
        );
    }

    #[test]
    fn extension_tag_aliasing_a_standard_uri_is_flagged() {
        let mut lookup = Lookup::from_value(&sample_doc());
        lookup.add_extension("_GEDC", "https://gedcom.io/terms/v7/GEDC");
        let resolution = lookup.substructure("https://gedcom.io/terms/v7/HEAD", "_GEDC");
        assert_eq!(
            resolution,
            Resolution::Extension("https://gedcom.io/terms/v7/GEDC".to_string())
        );
        let diags = lookup.take_diagnostics();
        assert_eq!(diags.len(), 1);
        assert!(matches!(diags[0].kind, WarningKind::AliasedExtension { .. }));
    }

    #[test]
    fn tag_resolved_at_unknown_container_is_relocated() {
        let lookup = Lookup::from_value(&sample_doc());
        // GEDC is only ever declared as HEAD's substructure, so resolving it against an
        // unrecognized container is a relocation, not a standard record-level type.
        let resolution = lookup.substructure("https://gedcom.io/terms/v7/UNKNOWN", "GEDC");
        assert_eq!(
            resolution,
            Resolution::Relocated("https://gedcom.io/terms/v7/GEDC".to_string())
        );
        let diags = lookup.take_diagnostics();
        assert_eq!(diags.len(), 1);
        assert!(matches!(diags[0].kind, WarningKind::RelocatedStructure { .. }));
    }

    #[test]
    fn conflicting_schma_declaration_is_ambiguous() {
        let mut lookup = Lookup::from_value(&sample_doc());
        lookup.add_extension("_FOO", "https://example.com/foo");
        lookup.add_extension("_FOO", "https://example.com/bar");
        assert_eq!(
            lookup.extensions().get("_FOO").map(String::as_str),
            Some("https://example.com/foo")
        );
        let diags = lookup.take_diagnostics();
        assert_eq!(diags.len(), 1);
        assert!(matches!(diags[0].kind, WarningKind::AmbiguousExtension { .. }));
    }
}
