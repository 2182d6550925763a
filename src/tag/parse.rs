//! Builds a [`Forest`] from GEDCOM text: the two-pass tag-layer parser.
//!
//! The first pass drives the [`Tokenizer`] line by line, maintaining a level stack to place each
//! structure under its parent, splicing `CONT`/`CONC` lines into the preceding structure's
//! payload rather than creating child structures for them, and tentatively classifying any
//! `@...@`-shaped payload as a pointer reference. The second pass resolves those tentative
//! pointers against the forest's xref index, now that every structure (including ones defined
//! after their first reference) exists — exactly the two-pass shape the design spec calls for so
//! forward references resolve without a preliminary scan of the raw text.

use super::{Forest, Payload, StructureId};
use crate::dialect::Dialect;
use crate::tokenizer::{Token, Tokenizer};
use crate::{GedcomError, GedcomWarning, ParseResult, Severity, WarningKind};

/// Parses `source` into a [`Forest`] under the given dialect.
///
/// # Errors
///
/// Returns a [`GedcomError`] on a grammar failure that prevents further meaningful parsing
/// (an unterminated level stack, a `CONT`/`CONC` line with no preceding structure, a malformed
/// level number). Recoverable issues — unrecognized tags, dangling pointers, leading zeros the
/// dialect disallows — are reported as warnings on the returned [`ParseResult`] instead.
pub fn parse(source: &str, dialect: &Dialect) -> Result<ParseResult<Forest>, GedcomError> {
    let mut tokenizer = Tokenizer::new(source.chars());
    tokenizer.next_token()?;

    let mut forest = Forest::new();
    let mut warnings = Vec::new();
    let mut stack: Vec<(u8, StructureId)> = Vec::new();
    let mut pending_pointers: Vec<(StructureId, String, u32)> = Vec::new();

    loop {
        let level = match tokenizer.current_token.clone() {
            Token::EOF => break,
            Token::Level(n) => n,
            other => {
                return Err(GedcomError::InvalidToken {
                    line: tokenizer.line,
                    token: format!("{other:?}"),
                });
            }
        };

        if !dialect.zeros && tokenizer.last_level_had_leading_zero {
            warnings.push(GedcomWarning::new(
                tokenizer.line,
                WarningKind::Message("leading zero on level number".to_string()),
            ));
        }

        tokenizer.next_token()?;

        let mut xref_id = None;
        if let Token::Pointer(raw) = &tokenizer.current_token {
            xref_id = Some(strip_at(raw));
            tokenizer.next_token()?;
        }

        let tag = match &tokenizer.current_token {
            Token::Tag(t) | Token::CustomTag(t) => t.clone(),
            other => {
                return Err(GedcomError::InvalidToken {
                    line: tokenizer.line,
                    token: format!("{other:?}"),
                });
            }
        };
        let line_no = tokenizer.line;
        let value = tokenizer.take_line_value()?;

        if tag.eq_ignore_ascii_case("CONT") || tag.eq_ignore_ascii_case("CONC") {
            let Some(&(_, parent_id)) = stack.last() else {
                return Err(GedcomError::InvalidFormat(format!(
                    "{tag} at line {line_no} has no preceding structure to continue"
                )));
            };

            if tag.eq_ignore_ascii_case("CONC") && !dialect.allows_conc() {
                warnings.push(GedcomWarning {
                    line: line_no,
                    context: None,
                    severity: Severity::Error,
                    kind: WarningKind::Message("CONC is not permitted by this dialect".to_string()),
                });
                continue;
            }

            let parent = forest.get(parent_id);
            let splicable = matches!(parent.payload, Payload::Text(_) | Payload::None)
                && parent.children.is_empty();
            if !splicable {
                warnings.push(GedcomWarning {
                    line: line_no,
                    context: None,
                    severity: Severity::Error,
                    kind: WarningKind::Message(format!(
                        "{tag} at line {line_no} cannot splice onto a structure with a pointer payload or substructures"
                    )),
                });
                continue;
            }

            splice(&mut forest, parent_id, &tag, &value);
            continue;
        }

        while let Some(&(top_level, _)) = stack.last() {
            if top_level >= level {
                stack.pop();
            } else {
                break;
            }
        }

        let expected = stack.last().map_or(0, |&(l, _)| l + 1);
        if level != expected {
            return Err(GedcomError::UnexpectedLevel {
                line: line_no,
                expected,
                found: level.to_string(),
            });
        }

        if !dialect.is_valid_tag(&tag) {
            warnings.push(GedcomWarning::new(
                line_no,
                WarningKind::UnrecognizedTag { tag: tag.clone() },
            ));
        }

        let id = match stack.last() {
            Some(&(_, parent_id)) => forest.add_child(parent_id, tag.clone()),
            None => forest.add_root(tag.clone()),
        };
        forest.get_mut(id).line = line_no;

        if let Some(xref) = xref_id {
            if !dialect.is_valid_xref(&xref) {
                warnings.push(GedcomWarning::new(
                    line_no,
                    WarningKind::Message(format!("invalid cross-reference identifier @{xref}@")),
                ));
            }
            if !forest.set_xref_id(id, xref.clone()) {
                warnings.push(GedcomWarning::new(
                    line_no,
                    WarningKind::Message(format!("duplicate cross-reference identifier @{xref}@")),
                ));
            }
        }

        if !value.is_empty() {
            match classify_payload(&value) {
                ClassifiedPayload::Void => forest.get_mut(id).payload = Payload::Void,
                ClassifiedPayload::Text(text) => forest.get_mut(id).payload = Payload::Text(text),
                ClassifiedPayload::TentativePointer(target_xref) => {
                    forest.get_mut(id).payload = Payload::Text(value.clone());
                    pending_pointers.push((id, target_xref, line_no));
                }
            }
        }

        stack.push((level, id));
    }

    for (id, xref, line_no) in pending_pointers {
        match forest.by_xref_id(&xref) {
            Some(target) => forest.set_pointer(id, target),
            None => {
                warnings.push(GedcomWarning {
                    line: line_no,
                    context: None,
                    severity: Severity::Error,
                    kind: WarningKind::UnresolvedPointer { xref_id: xref },
                });
            }
        }
    }

    Ok(ParseResult::with_warnings(forest, warnings))
}

enum ClassifiedPayload {
    Void,
    Text(String),
    TentativePointer(String),
}

/// Decodes a payload's leading-`@` escape: `@@...` denotes the literal text `@...` (one `@`
/// dropped). Values with no leading `@@` are returned unchanged.
fn decode_leading_at(value: &str) -> String {
    match value.strip_prefix("@@") {
        Some(rest) => format!("@{rest}"),
        None => value.to_string(),
    }
}

/// Classifies a raw line-value payload: the `@VOID@` sentinel, an escaped literal `@` (`@@...`),
/// a bare pointer shape (`@XREF@`), or plain text.
fn classify_payload(value: &str) -> ClassifiedPayload {
    if value.starts_with("@@") {
        return ClassifiedPayload::Text(decode_leading_at(value));
    }
    if value == "@VOID@" {
        return ClassifiedPayload::Void;
    }
    if value.len() >= 2 && value.starts_with('@') && value.ends_with('@') {
        let inner = &value[1..value.len() - 1];
        if !inner.is_empty() && !inner.contains('@') {
            return ClassifiedPayload::TentativePointer(inner.to_string());
        }
    }
    ClassifiedPayload::Text(value.to_string())
}

fn strip_at(raw: &str) -> String {
    raw.trim_matches('@').to_string()
}

fn splice(forest: &mut Forest, parent_id: StructureId, tag: &str, value: &str) {
    let value = decode_leading_at(value);
    let structure = forest.get_mut(parent_id);
    let existing = match &structure.payload {
        Payload::Text(s) => s.clone(),
        _ => String::new(),
    };
    let joined = if tag.eq_ignore_ascii_case("CONT") {
        format!("{existing}\n{value}")
    } else {
        format!("{existing}{value}")
    };
    structure.payload = Payload::Text(joined);
}
