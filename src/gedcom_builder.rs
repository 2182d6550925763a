//! Fluent entry point wiring dialect selection, tag parsing, and typed construction/validation
//! together (§4.9, ambient — reconstructed from the CLI's call site).

use crate::dialect::Dialect;
use crate::schema::Lookup;
use crate::types_layer::{self, TypedDataset};
use crate::{GedcomError, GedcomWarning, Severity};

/// Configures and runs an end-to-end parse of GEDCOM text into a validated [`TypedDataset`].
///
/// `GedcomBuilder::new()` mirrors the GEDCOM-7 defaults: forward-compatible dialect detection,
/// reference validation on, unknown tags tolerated, no forced strictness. Each setter returns
/// `self` so calls chain, matching the CLI's
/// `GedcomBuilder::new().strict_mode(true).validate_references(true)...` usage.
#[derive(Debug, Default)]
pub struct GedcomBuilder {
    strict_mode: bool,
    validate_references: bool,
    ignore_unknown_tags: bool,
    date_validation: bool,
    dialect: Option<Dialect>,
    schema: Option<serde_json::Value>,
}

/// The outcome of [`GedcomBuilder::build_from_str`]: a typed dataset plus every diagnostic
/// collected along the way, from the tag-layer parse through typed construction and validation.
#[derive(Debug)]
pub struct ValidationReport {
    /// The typed dataset built from the source, regardless of whether it's fully valid.
    pub dataset: TypedDataset,
    /// Every warning and error collected while building and validating `dataset`, in the order
    /// produced.
    pub diagnostics: Vec<GedcomWarning>,
}

impl ValidationReport {
    /// Diagnostics at [`Severity::Error`].
    #[must_use]
    pub fn errors(&self) -> Vec<&GedcomWarning> {
        self.diagnostics
            .iter()
            .filter(|w| w.severity == Severity::Error)
            .collect()
    }

    /// Diagnostics at [`Severity::Warning`].
    #[must_use]
    pub fn warnings(&self) -> Vec<&GedcomWarning> {
        self.diagnostics
            .iter()
            .filter(|w| w.severity == Severity::Warning)
            .collect()
    }
}

impl GedcomBuilder {
    /// A builder with GEDCOM-7 defaults: no forced strictness, references validated, unknown
    /// tags tolerated, dates parsed and validated.
    #[must_use]
    pub fn new() -> GedcomBuilder {
        GedcomBuilder {
            strict_mode: false,
            validate_references: true,
            ignore_unknown_tags: true,
            date_validation: true,
            dialect: None,
            schema: None,
        }
    }

    /// When set, any [`Severity::Error`]-level diagnostic turns [`GedcomBuilder::build_from_str`]
    /// into an `Err` instead of a clean [`ValidationReport`].
    #[must_use]
    pub fn strict_mode(mut self, strict: bool) -> GedcomBuilder {
        self.strict_mode = strict;
        self
    }

    /// When set, pointers that resolve to nothing in the forest are reported (always on by
    /// default, since dangling pointers are well-formedness failures regardless of mode).
    #[must_use]
    pub fn validate_references(mut self, validate: bool) -> GedcomBuilder {
        self.validate_references = validate;
        self
    }

    /// When set, tags the dialect doesn't recognize and the schema doesn't register are parsed
    /// without complaint instead of producing an `UnrecognizedTag` warning.
    #[must_use]
    pub fn ignore_unknown_tags(mut self, ignore: bool) -> GedcomBuilder {
        self.ignore_unknown_tags = ignore;
        self
    }

    /// When set, date-valued payloads are parsed and validated against the GEDCOM date grammar
    /// rather than stored as opaque text.
    #[must_use]
    pub fn date_validation(mut self, validate: bool) -> GedcomBuilder {
        self.date_validation = validate;
        self
    }

    /// Forces a specific dialect instead of detecting one from the source's `HEAD.GEDC.VERS`.
    #[must_use]
    pub fn dialect(mut self, dialect: Dialect) -> GedcomBuilder {
        self.dialect = Some(dialect);
        self
    }

    /// Supplies a GEDCOM-7-registry-shaped schema document (see [`Lookup::from_value`]) instead
    /// of the built-in minimal lookup.
    #[must_use]
    pub fn schema(mut self, schema: serde_json::Value) -> GedcomBuilder {
        self.schema = Some(schema);
        self
    }

    /// Parses `src` into a typed dataset, running validation and collecting every diagnostic.
    ///
    /// # Errors
    ///
    /// Returns a [`GedcomError`] for a tag-layer grammar failure that prevents parsing
    /// altogether, or, in `strict_mode`, for any [`Severity::Error`]-level diagnostic surfaced
    /// while building or validating the typed dataset.
    pub fn build_from_str(&self, src: &str) -> Result<ValidationReport, GedcomError> {
        let dialect = match &self.dialect {
            Some(d) => d.clone(),
            None => detect_dialect(src)?,
        };

        let lookup = match &self.schema {
            Some(value) => Lookup::from_value(value),
            None => Lookup::empty(),
        };

        let (mut dataset, mut diagnostics) = types_layer::parse(src, &dialect, lookup)?;

        if !self.ignore_unknown_tags {
            diagnostics.retain(|w| !matches!(w.kind, crate::WarningKind::UnrecognizedTag { .. }));
        }
        if !self.validate_references {
            diagnostics.retain(|w| !matches!(w.kind, crate::WarningKind::UnresolvedPointer { .. }));
        }

        dataset.validate();
        diagnostics.extend(dataset.take_diagnostics());

        if !self.date_validation {
            diagnostics.retain(|w| !w.message().to_lowercase().contains("date"));
        }

        if self.strict_mode && diagnostics.iter().any(|w| w.severity == Severity::Error) {
            let first = diagnostics
                .iter()
                .find(|w| w.severity == Severity::Error)
                .expect("checked above");
            return Err(GedcomError::ParseError {
                line: first.line,
                message: first.message(),
            });
        }

        Ok(ValidationReport { dataset, diagnostics })
    }
}

/// Detects a document's dialect from its declared `HEAD.GEDC.VERS`, defaulting to GEDCOM 7 when
/// the header is missing or silent (matching [`Dialect::default`]).
fn detect_dialect(source: &str) -> Result<Dialect, GedcomError> {
    for line in source.lines() {
        let mut parts = line.trim().splitn(3, char::is_whitespace);
        let level = parts.next();
        if level != Some("2") {
            continue;
        }
        let tag = parts.next();
        if tag == Some("VERS") {
            if let Some(version) = parts.next().map(str::trim) {
                if !version.is_empty() {
                    return Dialect::for_version(version);
                }
            }
        }
    }
    Ok(Dialect::default())
}
