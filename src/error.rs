//! Error and warning types shared by every layer of the crate.

use std::fmt;

/// Represents errors that can occur while parsing, validating, or serializing GEDCOM data.
///
/// Variants map to the three severities in the crate's error model: [`GedcomError`] itself is
/// used for fatal failures (grammar failures that prevent further meaningful parsing) and for
/// error-severity failures that callers choose to escalate with `?` rather than recover from via
/// the warning stream. Recoverable well-formedness issues are normally reported through
/// [`GedcomWarning`] instead so that processing can continue.
#[derive(Debug)]
pub enum GedcomError {
    /// An error indicating that an invalid or unrecognized GEDCOM tag was encountered.
    InvalidTag {
        /// The line number where the error occurred.
        line: u32,
        /// The invalid tag that was encountered.
        tag: String,
    },
    /// An error indicating an invalid token was encountered.
    InvalidToken {
        /// The line number where the error occurred.
        line: u32,
        /// The invalid token that was encountered.
        token: String,
    },
    /// An error indicating an unexpected GEDCOM level number.
    UnexpectedLevel {
        /// The line number where the error occurred.
        line: u32,
        /// The level that was expected for the current line, based on its parent's level.
        expected: u8,
        /// The actual level found on the current line.
        found: String,
    },
    /// An error indicating that a required value for a GEDCOM tag is missing.
    MissingRequiredValue {
        /// The line number where the error occurred.
        line: u32,
        /// The tag for which the required value is missing.
        tag: String,
    },
    /// An error indicating that a value associated with a GEDCOM tag has an invalid format.
    InvalidValueFormat {
        /// The line number where the error occurred.
        line: u32,
        /// The tag whose value has an invalid format.
        tag: String,
        /// The value that was found with an invalid format.
        value: String,
    },
    /// A missing or empty value where one was expected.
    ExpectedValue {
        /// The line number where the error occurred.
        line: u32,
        /// The tag that expected a value.
        tag: String,
    },
    /// A generic parse error with a free-form message, used by components that don't have a
    /// more specific variant (schema lookup, dialect construction, typed-layer conversion).
    ParseError {
        /// The line number where the error occurred, or 0 when not line-addressable.
        line: u32,
        /// The error message.
        message: String,
    },
    /// The dialect-level grammar was violated in a way that halts the whole parse (an empty
    /// input where a forest is required, or a `CONC` boundary that cannot legally be inserted
    /// during wrapping).
    InvalidFormat(String),
    /// A byte-level decoding error (bad declared `CHAR` value, malformed BOM, or a `.gdz`
    /// container that does not contain exactly one top-level `.ged` entry).
    EncodingError(String),
    /// An I/O failure reading a GEDCOM file or gedzip container.
    Io(String),
}

impl fmt::Display for GedcomError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GedcomError::InvalidTag { line, tag } => {
                write!(f, "Invalid tag at line {line}: {tag}")
            }
            GedcomError::InvalidToken { line, token } => {
                write!(f, "Invalid token at line {line}: {token}")
            }
            GedcomError::UnexpectedLevel {
                line,
                expected,
                found,
            } => write!(
                f,
                "Unexpected level at line {line}: expected {expected}, found {found}"
            ),
            GedcomError::MissingRequiredValue { line, tag } => {
                write!(f, "Missing required value at line {line}: {tag}")
            }
            GedcomError::InvalidValueFormat { line, tag, value } => {
                write!(f, "Invalid value format at line {line}: {tag}: {value}")
            }
            GedcomError::ExpectedValue { line, tag } => {
                write!(f, "Expected a value at line {line}: {tag}")
            }
            GedcomError::ParseError { line, message } => {
                write!(f, "Parse error at line {line}: {message}")
            }
            GedcomError::InvalidFormat(msg) => write!(f, "Invalid GEDCOM format: {msg}"),
            GedcomError::EncodingError(msg) => write!(f, "Encoding error: {msg}"),
            GedcomError::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for GedcomError {}

impl From<std::io::Error> for GedcomError {
    fn from(err: std::io::Error) -> Self {
        GedcomError::Io(err.to_string())
    }
}

/// The severity of a non-fatal diagnostic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Severity {
    /// A well-formedness/validity failure. The offending node is normalized to a safe sentinel
    /// and processing continues.
    Error,
    /// A stylistic or compatibility issue with no state change.
    Warning,
}

/// The specific kind of non-fatal diagnostic raised while parsing or validating.
///
/// This is the typed form of the schema lookup's incident taxonomy (undocumented / unregistered
/// / aliased / ambiguous / prohibited / novel extensions), plus the tag-layer diagnostics.
/// Every variant dedupes by its rendered message within a single [`crate::schema::Lookup`] (or,
/// for tag-layer-only diagnostics, within a single parse).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WarningKind {
    /// A tag was not recognized in any context and has no schema entry (`undocumented`).
    UndocumentedExtension {
        /// The offending tag.
        tag: String,
    },
    /// A documented extension URI is not present in the authoritative registry
    /// (`unregistered`).
    UnregisteredExtension {
        /// The extension's declared URI.
        uri: String,
    },
    /// An extension tag was used where a standard tag exists (`aliased`).
    AliasedExtension {
        /// The tag that was used.
        tag: String,
        /// The standard URI it was aliased against.
        standard_uri: String,
    },
    /// One tag maps to two or more URIs in `SCHMA` without disambiguation (`ambiguous`,
    /// downgraded to a warning when the ambiguity is a relocation).
    AmbiguousExtension {
        /// The offending tag.
        tag: String,
    },
    /// An extension-defined container had no registry match at all (`novel`).
    NovelContainer {
        /// The container tag.
        tag: String,
    },
    /// A standard tag was used outside its standard container (`relocated`).
    RelocatedStructure {
        /// The tag as used.
        tag: String,
        /// The canonical URI it resolves to, declared elsewhere in the registry.
        uri: String,
    },
    /// A standard tag was used outside its permitted container (`prohibited`).
    ProhibitedSubstructure {
        /// The containing type URI or tag.
        container: String,
        /// The offending child tag.
        tag: String,
    },
    /// An `EXID` substructure with no `EXID-TYPE` child (the one deprecation the spec requires).
    DeprecatedExidWithoutType,
    /// A tag was encountered with no defined handling and was skipped (tag-layer level).
    UnrecognizedTag {
        /// The offending tag.
        tag: String,
    },
    /// A pointer payload referred to an xref-id with no matching structure in the forest.
    UnresolvedPointer {
        /// The dangling xref-id (without surrounding `@`).
        xref_id: String,
    },
    /// A free-form diagnostic for cases the taxonomy above doesn't name precisely.
    Message(String),
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            WarningKind::UndocumentedExtension { tag } => {
                write!(f, "Undocumented extension tag: {tag}")
            }
            WarningKind::UnregisteredExtension { uri } => {
                write!(f, "Unregistered extension: {uri}")
            }
            WarningKind::AliasedExtension { tag, standard_uri } => {
                write!(f, "Aliased extension tag {tag}, standard is {standard_uri}")
            }
            WarningKind::AmbiguousExtension { tag } => {
                write!(f, "Ambiguous extension tag: {tag}")
            }
            WarningKind::NovelContainer { tag } => {
                write!(f, "Novel extension container: {tag}")
            }
            WarningKind::RelocatedStructure { tag, uri } => {
                write!(f, "Relocated structure {tag}, standard location is {uri}")
            }
            WarningKind::ProhibitedSubstructure { container, tag } => {
                write!(f, "Prohibited substructure {tag} under {container}")
            }
            WarningKind::DeprecatedExidWithoutType => {
                write!(f, "EXID without EXID-TYPE is deprecated")
            }
            WarningKind::UnrecognizedTag { tag } => write!(f, "Unrecognized tag: {tag}"),
            WarningKind::UnresolvedPointer { xref_id } => {
                write!(f, "pointer to undefined xref_id @{xref_id}@")
            }
            WarningKind::Message(msg) => write!(f, "{msg}"),
        }
    }
}

/// A single non-fatal diagnostic, located either by tag-layer line number or by typed-layer
/// context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GedcomWarning {
    /// 1-based source line, or 0 when the diagnostic is typed-layer-only (see `context`).
    pub line: u32,
    /// The typed-layer context (the offending structure's type URI, and optionally the child
    /// type under consideration), empty for tag-layer diagnostics.
    pub context: Option<String>,
    /// The diagnostic's severity.
    pub severity: Severity,
    /// The specific kind of diagnostic.
    pub kind: WarningKind,
}

impl GedcomWarning {
    /// Creates a tag-layer warning located by line number.
    #[must_use]
    pub fn new(line: u32, kind: WarningKind) -> Self {
        GedcomWarning {
            line,
            context: None,
            severity: Severity::Warning,
            kind,
        }
    }

    /// Creates a typed-layer diagnostic located by type URI/context, with an explicit severity.
    #[must_use]
    pub fn in_context(context: impl Into<String>, severity: Severity, kind: WarningKind) -> Self {
        GedcomWarning {
            line: 0,
            context: Some(context.into()),
            severity,
            kind,
        }
    }

    /// Renders the diagnostic the way the deduplicating sinks in [`crate::schema::Lookup`] key
    /// on it: by message content, independent of severity.
    #[must_use]
    pub fn message(&self) -> String {
        match &self.context {
            Some(ctx) => format!("{ctx}: {}", self.kind),
            None => self.kind.to_string(),
        }
    }
}

impl fmt::Display for GedcomWarning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.line > 0 {
            write!(f, "line {}: {}", self.line, self.kind)
        } else {
            write!(f, "{}", self.message())
        }
    }
}

/// Bundles a parsed or validated value together with the warnings accumulated while producing
/// it.
#[derive(Debug)]
pub struct ParseResult<T> {
    /// The parsed/validated value.
    pub data: T,
    /// Warnings accumulated while producing `data`, in document order, first-occurrence only.
    pub warnings: Vec<GedcomWarning>,
}

impl<T> ParseResult<T> {
    /// Wraps `data` with no warnings.
    #[must_use]
    pub fn new(data: T) -> Self {
        ParseResult {
            data,
            warnings: Vec::new(),
        }
    }

    /// Wraps `data` with the given warnings.
    #[must_use]
    pub fn with_warnings(data: T, warnings: Vec<GedcomWarning>) -> Self {
        ParseResult { data, warnings }
    }

    /// True if no warnings were accumulated.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}
