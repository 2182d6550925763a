//! Dialect configuration for the tag-layer grammar.
//!
//! A [`Dialect`] parameterizes everything about the line grammar that varies between GEDCOM
//! 5.x and GEDCOM 7: line-length/CONC policy, the character classes allowed in tags and
//! cross-reference identifiers, whether leading zeros on level numbers are tolerated, and
//! whether `@#...@`-style payload escapes are written single- or double-`@`.
//!
//! The spec describes these constraints as regular expressions; this crate follows the
//! teacher's existing hand-written-scanner style (see [`crate::tokenizer`]) and expresses them
//! as character-class predicates instead, which the design notes call out as an equivalent,
//! locale-independent encoding of the same grammar.

use crate::GedcomError;

/// How a [`Dialect`] constrains the alphabet of tags and cross-reference identifiers beyond the
/// universal minima.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Alphabet {
    /// GEDCOM 5.x: permissive, matching the universal minima plus a leading-underscore
    /// allowance for custom tags.
    Gedcom551,
    /// GEDCOM 7: tags and xref-ids restricted to `[A-Z0-9_]+` (with a leading `_` reserved for
    /// extensions).
    Gedcom7,
}

impl Alphabet {
    fn is_valid_tag(self, tag: &str) -> bool {
        if tag.is_empty() {
            return false;
        }
        match self {
            Alphabet::Gedcom551 => is_universal_tag(tag),
            Alphabet::Gedcom7 => tag.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_'),
        }
    }

    fn is_valid_xref(self, xref: &str) -> bool {
        if xref.is_empty() {
            return false;
        }
        match self {
            Alphabet::Gedcom551 => is_universal_xref(xref),
            Alphabet::Gedcom7 => xref.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_'),
        }
    }
}

/// `[^@\p{Cc}\p{Z}][^\p{Cc}\p{Z}]*` — every non-control, non-whitespace-separator, non-`@`
/// character opens a tag; the rest of the tag may additionally not be whitespace or control.
fn is_universal_tag(tag: &str) -> bool {
    let mut chars = tag.chars();
    match chars.next() {
        Some(c) if c != '@' && !c.is_control() && !is_zs_separator(c) => {}
        _ => return false,
    }
    chars.all(|c| !c.is_control() && !is_zs_separator(c))
}

/// `([^@#\p{Cc}]|\t)([^@\p{Cc}]|\t)*`
fn is_universal_xref(xref: &str) -> bool {
    let mut chars = xref.chars();
    match chars.next() {
        Some('\t') => {}
        Some(c) if c != '@' && c != '#' && !c.is_control() => {}
        _ => return false,
    }
    chars.all(|c| c == '\t' || (c != '@' && !c.is_control()))
}

fn is_zs_separator(c: char) -> bool {
    // \p{Zs}: space separators. `char::is_whitespace` is a superset that also covers line/
    // paragraph separators, which the grammar treats identically here.
    c.is_whitespace()
}

/// Parameterizes the tag-layer grammar for a single dialect (GEDCOM 5.x or GEDCOM 7, or a
/// caller-supplied variant).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dialect {
    /// Line-length policy: positive wraps to this width with CONC, zero is unlimited, negative
    /// is unlimited and forbids CONC entirely.
    pub len: i32,
    /// The alphabet constraining tags and xref-ids.
    pub alphabet: Alphabet,
    /// If false, a leading zero on a level number is reported.
    pub zeros: bool,
    /// If true, payloads beginning with `@#` serialize as `@#…`; if false, as `@@#…`. Both
    /// decode identically.
    pub escapes: bool,
}

impl Dialect {
    /// The GEDCOM 5.5.1 dialect: 255-character lines, permissive tag/xref alphabet, escapes on,
    /// leading zeros tolerated.
    #[must_use]
    pub fn gedcom_5_5_1() -> Dialect {
        Dialect {
            len: 255,
            alphabet: Alphabet::Gedcom551,
            zeros: true,
            escapes: true,
        }
    }

    /// The GEDCOM 7.0 dialect: unlimited line length (CONC forbidden), strict `[A-Z0-9_]+`
    /// alphabet, escapes off, leading zeros reported.
    #[must_use]
    pub fn gedcom_7() -> Dialect {
        Dialect {
            len: -1,
            alphabet: Alphabet::Gedcom7,
            zeros: false,
            escapes: false,
        }
    }

    /// True if `CONC` is permitted under this dialect (`len >= 0`).
    #[must_use]
    pub fn allows_conc(&self) -> bool {
        self.len >= 0
    }

    /// True if lines are wrapped to a fixed width (`len > 0`).
    #[must_use]
    pub fn wraps(&self) -> bool {
        self.len > 0
    }

    /// Validates a tag string against this dialect's alphabet.
    #[must_use]
    pub fn is_valid_tag(&self, tag: &str) -> bool {
        self.alphabet.is_valid_tag(tag)
    }

    /// Validates an xref-id (without surrounding `@`) against this dialect's alphabet.
    #[must_use]
    pub fn is_valid_xref(&self, xref: &str) -> bool {
        self.alphabet.is_valid_xref(xref)
    }

    /// Parses a `GEDC.VERS` payload into the matching dialect, defaulting to 5.5.1 for any
    /// version string that does not start with `7`.
    ///
    /// # Errors
    ///
    /// Returns an error if `version` is empty.
    pub fn for_version(version: &str) -> Result<Dialect, GedcomError> {
        if version.trim().is_empty() {
            return Err(GedcomError::ParseError {
                line: 0,
                message: "empty GEDC.VERS value".to_string(),
            });
        }
        if version.trim_start().starts_with('7') {
            Ok(Dialect::gedcom_7())
        } else {
            Ok(Dialect::gedcom_5_5_1())
        }
    }
}

impl Default for Dialect {
    fn default() -> Dialect {
        Dialect::gedcom_7()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gedcom_7_rejects_conc() {
        assert!(!Dialect::gedcom_7().allows_conc());
        assert!(Dialect::gedcom_5_5_1().allows_conc());
    }

    #[test]
    fn gedcom_7_tag_alphabet_is_strict() {
        let d = Dialect::gedcom_7();
        assert!(d.is_valid_tag("INDI"));
        assert!(d.is_valid_tag("_CUSTOM"));
        assert!(!d.is_valid_tag("Indi"));
        assert!(!d.is_valid_tag(""));
    }

    #[test]
    fn for_version_picks_dialect() {
        assert_eq!(Dialect::for_version("7.0").unwrap().len, -1);
        assert_eq!(Dialect::for_version("5.5.1").unwrap().len, 255);
    }

    #[test]
    fn universal_tag_rejects_leading_at() {
        assert!(!is_universal_tag("@FOO"));
        assert!(is_universal_tag("FOO"));
    }
}
