/*!
`gedcom7` parses GEDCOM genealogical data — both the legacy 5.x family of dialects and GEDCOM 7 —
into two layered representations.

The **tag layer** ([`tag`]) is a dialect-agnostic forest of generic tag-structures: it knows the
universal line grammar (levels, tags, cross-reference identifiers, pointers, `CONT`/`CONC`
splicing) but nothing about what any particular tag *means*. The **typed layer**
([`types_layer`]) sits atop it, resolving each structure's tag to a canonical URI against a
[`schema::Lookup`] built from a GEDCOM-7-registry-shaped schema document, parsing payloads into
typed values ([`types_layer::value::Value`]), and validating substructure cardinality and pointer
targets.

Both layers share one query mechanism ([`select`]) and one diagnostic model
([`GedcomError`] for fatal failures, [`GedcomWarning`]/[`WarningKind`] for recoverable ones).

Basic example, parsing straight to the typed layer:

```rust
use gedcom7::GedcomBuilder;

let source = "0 HEAD\n1 GEDC\n2 VERS 7.0\n0 TRLR\n";
let report = GedcomBuilder::new().build_from_str(source).unwrap();
assert!(report.errors().is_empty());
```

Working with the tag layer directly, dialect by dialect:

```rust
use gedcom7::dialect::Dialect;
use gedcom7::tag::parse::parse;

let source = "0 HEAD\n1 GEDC\n2 VERS 5.5.1\n0 TRLR\n";
let dialect = Dialect::for_version("5.5.1").unwrap();
let result = parse(source, &dialect).unwrap();
assert!(result.is_clean());
```

This crate has three optional features: `"json"` adds JSON codecs for both layers (via
[`serde`](https://serde.rs)/`serde_json`); `"calendar"` adds calendar-system conversions (via
`chrono`) to [`types_layer::calendar`]; `"gedzip"` adds [`gedzip`], a reader for `.gdz` container
files.
*/

#![deny(clippy::pedantic)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod dialect;
pub mod encoding;
pub mod error;
#[cfg(feature = "gedzip")]
pub mod gedzip;
pub mod schema;
pub mod select;
pub mod tag;
pub mod tokenizer;
pub mod types_layer;

mod gedcom_builder;

pub use error::{GedcomError, GedcomWarning, ParseResult, Severity, WarningKind};
pub use gedcom_builder::{GedcomBuilder, ValidationReport};
