//! JSON codec for the tag layer, available under the `json` feature.
//!
//! Each structure serializes as `{"tag": ..., "id"?: ..., "text"|"href"?: ..., "sub"?: [...]}`
//! matching the shape the design spec assigns to the tag-layer intermediate form: `id` carries a
//! structure's own cross-reference identifier (when it has or needs one to be pointed at),
//! `text` a string payload, `href` a pointer payload (rendered as the target's xref-id, or the
//! literal string `"VOID"`), and `sub` the ordered list of children.

use super::{Forest, Payload, StructureId};
use crate::dialect::Dialect;
use crate::GedcomError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Serialize, Deserialize)]
struct JsonStructure {
    tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    href: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    sub: Vec<JsonStructure>,
}

/// Serializes `forest` to the tag-layer JSON intermediate form.
///
/// # Errors
///
/// Returns an error if `serde_json` fails to serialize the intermediate tree (never expected to
/// happen for well-formed forests, but propagated rather than panicking).
pub fn to_json(forest: &Forest, dialect: &Dialect) -> Result<String, GedcomError> {
    let minted = super::write::mint_missing_xref_ids(forest);
    let roots: Vec<JsonStructure> = forest
        .roots()
        .iter()
        .map(|&id| to_json_structure(forest, id, &minted))
        .collect();
    let _ = dialect;
    serde_json::to_string_pretty(&roots)
        .map_err(|e| GedcomError::EncodingError(format!("tag JSON serialization failed: {e}")))
}

fn to_json_structure(
    forest: &Forest,
    id: StructureId,
    minted: &HashMap<StructureId, String>,
) -> JsonStructure {
    let structure = forest.get(id);
    let resolved_id = structure
        .xref_id
        .clone()
        .or_else(|| minted.get(&id).cloned());

    let (text, href) = match &structure.payload {
        Payload::None => (None, None),
        Payload::Text(s) => (Some(s.clone()), None),
        Payload::Void => (None, Some("VOID".to_string())),
        Payload::Pointer(target) => {
            let xref = forest
                .get(*target)
                .xref_id
                .clone()
                .or_else(|| minted.get(target).cloned())
                .unwrap_or_else(|| "VOID".to_string());
            (None, Some(xref))
        }
    };

    JsonStructure {
        tag: structure.tag.clone(),
        id: resolved_id,
        text,
        href,
        sub: structure
            .children
            .iter()
            .map(|&child| to_json_structure(forest, child, minted))
            .collect(),
    }
}

/// Parses the tag-layer JSON intermediate form back into a [`Forest`].
///
/// # Errors
///
/// Returns an error if `source` is not valid JSON, or does not match the expected structure
/// shape.
pub fn from_json(source: &str) -> Result<Forest, GedcomError> {
    let roots: Vec<JsonStructure> = serde_json::from_str(source)
        .map_err(|e| GedcomError::EncodingError(format!("tag JSON parse failed: {e}")))?;

    let mut forest = Forest::new();
    let mut pending = Vec::new();
    for root in roots {
        build(&mut forest, None, root, &mut pending);
    }
    for (id, href) in pending {
        match forest.by_xref_id(&href) {
            Some(target) => forest.set_pointer(id, target),
            None => {
                return Err(GedcomError::InvalidFormat(format!(
                    "pointer to undefined xref_id @{href}@"
                )))
            }
        }
    }
    Ok(forest)
}

fn build(
    forest: &mut Forest,
    parent: Option<StructureId>,
    node: JsonStructure,
    pending: &mut Vec<(StructureId, String)>,
) -> StructureId {
    let id = match parent {
        Some(p) => forest.add_child(p, node.tag),
        None => forest.add_root(node.tag),
    };
    if let Some(xref) = node.id {
        forest.set_xref_id(id, xref);
    }
    if let Some(text) = node.text {
        forest.get_mut(id).payload = Payload::Text(text);
    } else if let Some(href) = node.href {
        if href == "VOID" {
            forest.get_mut(id).payload = Payload::Void;
        } else if let Some(target) = forest.by_xref_id(&href) {
            forest.set_pointer(id, target);
        } else {
            // forward reference to a structure not yet built; resolved in a second pass once
            // the whole tree (and its xref index) exists, mirroring the text-form parser.
            pending.push((id, href));
        }
    }
    for child in node.sub {
        build(forest, Some(id), child, pending);
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::parse::parse;
    use crate::tag::write::write;

    #[test]
    fn round_trips_through_json() {
        let source = "0 HEAD\n1 GEDC\n2 VERS 7.0\n0 TRLR\n";
        let forest = parse(source, &Dialect::gedcom_7()).unwrap().data;
        let json = to_json(&forest, &Dialect::gedcom_7()).unwrap();
        let rebuilt = from_json(&json).unwrap();
        let out = write(&rebuilt, &Dialect::gedcom_7());
        assert_eq!(out, source);
    }

    #[test]
    fn resolves_forward_reference_pointer() {
        let source = "0 @F1@ FAM\n1 HUSB @I1@\n0 @I1@ INDI\n0 TRLR\n";
        let forest = parse(source, &Dialect::gedcom_7()).unwrap().data;
        let json = to_json(&forest, &Dialect::gedcom_7()).unwrap();
        let rebuilt = from_json(&json).unwrap();
        let fam = rebuilt.roots()[0];
        let husb = rebuilt.get(fam).children[0];
        let indi = rebuilt.by_xref_id("I1").unwrap();
        assert_eq!(rebuilt.get(husb).payload.as_pointer(), Some(indi));
    }
}
