//! Serializes a [`Forest`] back to GEDCOM text: the line-wrapping, `CONT`/`CONC`-inserting,
//! xref-id-minting writer.

use super::{Forest, Payload, StructureId};
use crate::dialect::Dialect;
use std::collections::{HashMap, HashSet};

/// Serializes `forest` to GEDCOM text under `dialect`.
///
/// Any structure that is pointed to but carries no cross-reference identifier of its own is
/// assigned one here (not persisted back into the forest) so that the pointer can round-trip.
#[must_use]
pub fn write(forest: &Forest, dialect: &Dialect) -> String {
    let mut out = String::new();
    let minted = mint_missing_xref_ids(forest);
    for &root in forest.roots() {
        write_structure(forest, root, 0, dialect, &minted, &mut out);
    }
    out
}

pub(crate) fn mint_missing_xref_ids(forest: &Forest) -> HashMap<StructureId, String> {
    let mut used: HashSet<String> = forest.claimed_xref_ids().map(str::to_string).collect();
    let mut minted = HashMap::new();
    for i in 0..forest.len() {
        let id = StructureId(i);
        if forest.get(id).xref_id.is_none() && forest.is_pointed_to(id) {
            let prefix = mint_prefix(&forest.get(id).tag);
            let mut n = 1u64;
            let mut candidate = format!("{prefix}{n}");
            while used.contains(&candidate) {
                n += 1;
                candidate = format!("{prefix}{n}");
            }
            used.insert(candidate.clone());
            minted.insert(id, candidate);
        }
    }
    minted
}

fn mint_prefix(tag: &str) -> String {
    tag.chars()
        .find(|c| c.is_ascii_alphabetic())
        .map_or_else(|| "X".to_string(), |c| c.to_ascii_uppercase().to_string())
}

fn resolve_xref<'a>(
    forest: &'a Forest,
    id: StructureId,
    minted: &'a HashMap<StructureId, String>,
) -> Option<&'a str> {
    forest.get(id).xref_id.as_deref().or_else(|| minted.get(&id).map(String::as_str))
}

fn write_structure(
    forest: &Forest,
    id: StructureId,
    level: u8,
    dialect: &Dialect,
    minted: &HashMap<StructureId, String>,
    out: &mut String,
) {
    let structure = forest.get(id);
    out.push_str(itoa(level).as_str());
    out.push(' ');
    if let Some(xref) = resolve_xref(forest, id, minted) {
        out.push('@');
        out.push_str(xref);
        out.push_str("@ ");
    }
    out.push_str(&structure.tag);

    match &structure.payload {
        Payload::None => {}
        Payload::Void => out.push_str(" @VOID@"),
        Payload::Pointer(target) => {
            let target_xref = resolve_xref(forest, *target, minted).unwrap_or("VOID");
            out.push_str(" @");
            out.push_str(target_xref);
            out.push('@');
        }
        Payload::Text(text) => write_text_payload(out, text, level, dialect),
    }
    out.push('\n');

    for &child in &structure.children {
        write_structure(forest, child, level + 1, dialect, minted, out);
    }
}

fn write_text_payload(out: &mut String, text: &str, level: u8, dialect: &Dialect) {
    let mut lines = text.split('\n');
    if let Some(first) = lines.next() {
        out.push(' ');
        append_wrapped(out, &escape_leading_at(first, dialect), level, dialect);
    }
    for line in lines {
        out.push('\n');
        out.push_str(itoa(level + 1).as_str());
        out.push_str(" CONT");
        if !line.is_empty() {
            out.push(' ');
        }
        append_wrapped(out, &escape_leading_at(line, dialect), level + 1, dialect);
    }
}

/// Appends the wrapped form of one inline/`CONT` segment to `out`: the first chunk continues the
/// line the caller already started, and any remaining chunks are emitted as fresh `CONC` lines.
fn append_wrapped(out: &mut String, text: &str, level: u8, dialect: &Dialect) {
    let chunks = wrap_for_dialect(text, level, dialect);
    let mut chunks = chunks.into_iter();
    if let Some((_, first)) = chunks.next() {
        out.push_str(&first);
    }
    for (chunk_level, chunk) in chunks {
        out.push('\n');
        out.push_str(itoa(chunk_level).as_str());
        out.push_str(" CONC ");
        out.push_str(&chunk);
    }
}

/// If `dialect` wraps lines, this splits `text` across the inline segment plus trailing `CONC`
/// continuations at `width` characters each. When the dialect forbids `CONC` (GEDCOM 7), lines
/// are left unwrapped regardless of length — only embedded newlines still require `CONT`.
fn wrap_for_dialect(text: &str, level: u8, dialect: &Dialect) -> Vec<(u8, String)> {
    if !dialect.wraps() {
        return vec![(level, text.to_string())];
    }
    let width = dialect.len.max(1) as usize;
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= width {
        return vec![(level, text.to_string())];
    }
    let mut out = Vec::new();
    let mut rest = chars.as_slice();
    let (head, tail) = rest.split_at(width);
    out.push((level, head.iter().collect::<String>()));
    rest = tail;
    while !rest.is_empty() {
        let take = rest.len().min(width);
        let (chunk, more) = rest.split_at(take);
        out.push((level + 1, chunk.iter().collect::<String>()));
        rest = more;
    }
    out
}

/// Escapes a payload's leading `@` so the writer never emits something that reads back as a
/// pointer. Calendar escapes (`@#...`) get to keep a single `@` when `dialect.escapes` is set
/// (the GEDCOM 5.x convention); everything else, and every dialect with `escapes` off (v7),
/// doubles the `@` (both forms decode identically per §4.2).
fn escape_leading_at(line: &str, dialect: &Dialect) -> String {
    if !line.starts_with('@') {
        return line.to_string();
    }
    if dialect.escapes && line.starts_with("@#") {
        line.to_string()
    } else {
        format!("@{line}")
    }
}

fn itoa(level: u8) -> String {
    level.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::parse::parse;

    #[test]
    fn round_trips_simple_tree() {
        let source = "0 HEAD\n1 GEDC\n2 VERS 7.0\n0 TRLR\n";
        let forest = parse(source, &Dialect::gedcom_7()).unwrap().data;
        let out = write(&forest, &Dialect::gedcom_7());
        assert_eq!(out, source);
    }

    #[test]
    fn mints_xref_for_referenced_structure_with_no_id() {
        let mut forest = Forest::new();
        let fam = forest.add_root("FAM");
        let husb = forest.add_child(fam, "HUSB");
        let indi = forest.add_root("INDI");
        forest.set_pointer(husb, indi);

        let out = write(&forest, &Dialect::gedcom_7());
        assert!(out.contains("@I1@ INDI"));
        assert!(out.contains("1 HUSB @I1@"));
    }

    #[test]
    fn void_pointer_round_trips() {
        let mut forest = Forest::new();
        let fam = forest.add_root("FAM");
        let husb = forest.add_child(fam, "HUSB");
        forest.get_mut(husb).payload = Payload::Void;

        let out = write(&forest, &Dialect::gedcom_7());
        assert!(out.contains("1 HUSB @VOID@"));
    }

    #[test]
    fn cont_round_trips_multiline_text() {
        let source = "0 @N1@ NOTE hello\n1 CONT world\n";
        let forest = parse(source, &Dialect::gedcom_7()).unwrap().data;
        let out = write(&forest, &Dialect::gedcom_7());
        assert_eq!(out, source);
    }

    #[test]
    fn wraps_long_text_with_conc_under_5_5_1() {
        let dialect = Dialect::gedcom_5_5_1();
        let segments = wrap_for_dialect(&"a".repeat(10), 1, &{
            let mut d = dialect;
            d.len = 4;
            d
        });
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], (1, "aaaa".to_string()));
        assert_eq!(segments[1], (2, "aaaa".to_string()));
        assert_eq!(segments[2], (2, "aa".to_string()));
    }
}
