//! Typed datatypes (§4.3): the payload grammars the typed layer parses structure payloads into.
//!
//! Every variant round-trips through [`Value::to_gedcom_string`] and exposes an `is_empty`-style
//! check. Parsing never fails outright — malformed input is normalized to the documented
//! sentinel and reported through the caller-supplied diagnostics sink, matching the "errors are
//! recovered, not fatal" policy of the crate's severity model.

use super::calendar::{Calendar, CalendarConversionError, DateQualifier, ParsedDateTime};
use crate::schema::{Lookup, PayloadEntry};
use crate::{GedcomWarning, Severity, WarningKind};

/// A non-negative integer payload (`[0-9]+`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NonNegativeInteger(pub u64);

impl NonNegativeInteger {
    fn parse(raw: &str, context: &str, diagnostics: &mut Vec<GedcomWarning>) -> NonNegativeInteger {
        match raw.trim().parse::<u64>() {
            Ok(n) => NonNegativeInteger(n),
            Err(_) => {
                diagnostics.push(GedcomWarning::in_context(
                    context,
                    Severity::Error,
                    WarningKind::Message(format!("invalid non-negative integer: {raw:?}")),
                ));
                NonNegativeInteger(0)
            }
        }
    }

    #[must_use]
    pub fn to_gedcom_string(&self) -> String {
        self.0.to_string()
    }
}

/// A personal name payload: `Given /Surname/ Suffix`, surname delimited by a single pair of
/// slashes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Name(pub String);

impl Name {
    fn parse(raw: &str, context: &str, diagnostics: &mut Vec<GedcomWarning>) -> Name {
        let slash_count = raw.matches('/').count();
        let has_control = raw.chars().any(|c| c.is_control());
        if has_control || slash_count > 2 {
            diagnostics.push(GedcomWarning::in_context(
                context,
                Severity::Error,
                WarningKind::Message(format!("malformed name payload: {raw:?}")),
            ));
            return Name(raw.replace('/', "\u{2044}"));
        }
        Name(raw.to_string())
    }

    #[must_use]
    pub fn to_gedcom_string(&self) -> String {
        self.0.clone()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// An `Age` payload: an optional `<`/`>` modifier followed by an ordered subset of
/// `{years, months, weeks, days}`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Age {
    pub modifier: Option<char>,
    pub years: Option<u32>,
    pub months: Option<u32>,
    pub weeks: Option<u32>,
    pub days: Option<u32>,
}

impl Age {
    fn parse(raw: &str, context: &str, diagnostics: &mut Vec<GedcomWarning>) -> Age {
        let raw = raw.trim();
        if raw.is_empty() {
            return Age::default();
        }

        let mut age = Age::default();
        let mut rest = raw;
        if let Some(stripped) = rest.strip_prefix('<') {
            age.modifier = Some('<');
            rest = stripped.trim_start();
        } else if let Some(stripped) = rest.strip_prefix('>') {
            age.modifier = Some('>');
            rest = stripped.trim_start();
        }

        let mut any = false;
        for token in rest.split_whitespace() {
            let Some((number, unit)) = split_age_token(token) else {
                diagnostics.push(GedcomWarning::in_context(
                    context,
                    Severity::Error,
                    WarningKind::Message(format!("invalid age token: {token:?}")),
                ));
                continue;
            };
            let Ok(n) = number.parse::<u32>() else {
                diagnostics.push(GedcomWarning::in_context(
                    context,
                    Severity::Error,
                    WarningKind::Message(format!("invalid age number: {number:?}")),
                ));
                continue;
            };
            match unit {
                'y' => age.years = Some(n),
                'm' => age.months = Some(n),
                'w' => age.weeks = Some(n),
                'd' => age.days = Some(n),
                _ => unreachable!(),
            }
            any = true;
        }

        if !any {
            diagnostics.push(GedcomWarning::in_context(
                context,
                Severity::Error,
                WarningKind::Message(format!("age payload with no components: {raw:?}")),
            ));
            return Age { modifier: Some('>'), years: Some(0), ..Age::default() };
        }

        age
    }

    #[must_use]
    pub fn to_gedcom_string(&self) -> String {
        let mut parts = Vec::new();
        if let Some(m) = self.modifier {
            parts.push(m.to_string());
        }
        if let Some(y) = self.years {
            parts.push(format!("{y}y"));
        }
        if let Some(m) = self.months {
            parts.push(format!("{m}m"));
        }
        if let Some(w) = self.weeks {
            parts.push(format!("{w}w"));
        }
        if let Some(d) = self.days {
            parts.push(format!("{d}d"));
        }
        parts.join(" ").replacen("< ", "<", 1).replacen("> ", ">", 1)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.years.is_none() && self.months.is_none() && self.weeks.is_none() && self.days.is_none()
    }
}

fn split_age_token(token: &str) -> Option<(&str, char)> {
    let unit = token.chars().last()?;
    if !matches!(unit, 'y' | 'm' | 'w' | 'd') {
        return None;
    }
    let number = &token[..token.len() - 1];
    if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some((number, unit))
}

/// A `Time` payload: `HH:MM(:SS(.fff)?)?(Z)?`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Time {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub utc: bool,
}

impl Time {
    fn parse(raw: &str, context: &str, diagnostics: &mut Vec<GedcomWarning>) -> Time {
        let raw = raw.trim();
        let (body, utc) = match raw.strip_suffix('Z') {
            Some(b) => (b, true),
            None => (raw, false),
        };

        let parts: Vec<&str> = body.split(':').collect();
        let parsed = (|| -> Option<Time> {
            let hour: u8 = parts.first()?.parse().ok()?;
            let minute: u8 = parts.get(1)?.parse().ok()?;
            let second: u8 = match parts.get(2) {
                Some(s) => s.split('.').next()?.parse().ok()?,
                None => 0,
            };
            if hour > 23 || minute > 59 || second > 59 {
                return None;
            }
            Some(Time { hour, minute, second, utc })
        })();

        parsed.unwrap_or_else(|| {
            diagnostics.push(GedcomWarning::in_context(
                context,
                Severity::Error,
                WarningKind::Message(format!("invalid time payload: {raw:?}")),
            ));
            Time::default()
        })
    }

    #[must_use]
    pub fn to_gedcom_string(&self) -> String {
        let mut s = format!("{:02}:{:02}:{:02}", self.hour, self.minute, self.second);
        if self.utc {
            s.push('Z');
        }
        s
    }
}

/// A `Date` payload (the `date` production): calendar, optional day/month, required year,
/// optional epoch. Wraps the crate's [`ParsedDateTime`] calendar-conversion engine.
#[derive(Clone, Debug, PartialEq)]
pub struct Date(pub ParsedDateTime);

impl Date {
    fn parse(raw: &str, context: &str, diagnostics: &mut Vec<GedcomWarning>) -> Date {
        match ParsedDateTime::from_gedcom_date(raw) {
            Ok(parsed) if parsed.year.is_some() => Date(parsed),
            Ok(_) => {
                diagnostics.push(GedcomWarning::in_context(
                    context,
                    Severity::Error,
                    WarningKind::Message(format!("date payload with no year: {raw:?}")),
                ));
                Date(ParsedDateTime::default())
            }
            Err(CalendarConversionError::RangeDate { .. }) => {
                // A range/period keyword reached the bare-date parser; the caller (DateValue)
                // handles these before falling back here.
                diagnostics.push(GedcomWarning::in_context(
                    context,
                    Severity::Error,
                    WarningKind::Message(format!("expected a single date, found a range: {raw:?}")),
                ));
                Date(ParsedDateTime::default())
            }
            Err(e) => {
                diagnostics.push(GedcomWarning::in_context(
                    context,
                    Severity::Error,
                    WarningKind::Message(format!("invalid date payload {raw:?}: {e}")),
                ));
                Date(ParsedDateTime::default())
            }
        }
    }

    #[must_use]
    pub fn to_gedcom_string(&self) -> String {
        self.0.to_gedcom_date()
    }
}

/// A `DateValue` payload (`…/type-Date` and its `#period` subtype): the disjoint union over
/// approximate/calculated/estimated single dates, ranges, periods, and the bare date/empty cases.
#[derive(Clone, Debug, PartialEq)]
pub enum DateValue {
    Empty,
    Date(Date),
    About(Date),
    Calculated(Date),
    Estimated(Date),
    Range { from: Option<Date>, to: Option<Date> },
    Period { from: Option<Date>, to: Option<Date> },
}

impl DateValue {
    /// Parses a `DateValue` payload. `period_only` restricts acceptance to `{Empty, Period}` per
    /// the `#period` subtype rule, downgrading anything else to `Empty` with a diagnostic.
    fn parse(
        raw: &str,
        period_only: bool,
        context: &str,
        diagnostics: &mut Vec<GedcomWarning>,
    ) -> DateValue {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return DateValue::Empty;
        }

        let upper = trimmed.to_uppercase();
        let value = if let Some(rest) = strip_keyword(&upper, trimmed, "BET") {
            if let Some((from, to)) = split_and(rest) {
                DateValue::Range {
                    from: Some(Date::parse(from, context, diagnostics)),
                    to: Some(Date::parse(to, context, diagnostics)),
                }
            } else {
                diagnostics.push(GedcomWarning::in_context(
                    context,
                    Severity::Error,
                    WarningKind::Message(format!("malformed BET...AND range: {raw:?}")),
                ));
                DateValue::Empty
            }
        } else if let Some(rest) = strip_keyword(&upper, trimmed, "BEF") {
            DateValue::Range { from: None, to: Some(Date::parse(rest, context, diagnostics)) }
        } else if let Some(rest) = strip_keyword(&upper, trimmed, "AFT") {
            DateValue::Range { from: Some(Date::parse(rest, context, diagnostics)), to: None }
        } else if let Some(rest) = strip_keyword(&upper, trimmed, "FROM") {
            if let Some((from, to)) = split_to(rest) {
                DateValue::Period {
                    from: Some(Date::parse(from, context, diagnostics)),
                    to: Some(Date::parse(to, context, diagnostics)),
                }
            } else {
                DateValue::Period { from: Some(Date::parse(rest, context, diagnostics)), to: None }
            }
        } else if let Some(rest) = strip_keyword(&upper, trimmed, "TO") {
            DateValue::Period { from: None, to: Some(Date::parse(rest, context, diagnostics)) }
        } else if let Some(rest) = strip_keyword(&upper, trimmed, "ABT") {
            DateValue::About(Date::parse(rest, context, diagnostics))
        } else if let Some(rest) = strip_keyword(&upper, trimmed, "CAL") {
            DateValue::Calculated(Date::parse(rest, context, diagnostics))
        } else if let Some(rest) = strip_keyword(&upper, trimmed, "EST") {
            DateValue::Estimated(Date::parse(rest, context, diagnostics))
        } else {
            DateValue::Date(Date::parse(trimmed, context, diagnostics))
        };

        if period_only && !matches!(value, DateValue::Period { .. }) {
            diagnostics.push(GedcomWarning::in_context(
                context,
                Severity::Warning,
                WarningKind::Message(format!("Expected DatePeriod, not {}", value.kind_name())),
            ));
            return DateValue::Empty;
        }

        value
    }

    fn kind_name(&self) -> &'static str {
        match self {
            DateValue::Empty => "empty",
            DateValue::Date(_) => "date",
            DateValue::About(_) => "ABT",
            DateValue::Calculated(_) => "CAL",
            DateValue::Estimated(_) => "EST",
            DateValue::Range { .. } => "dateRange",
            DateValue::Period { .. } => "DatePeriod",
        }
    }

    #[must_use]
    pub fn to_gedcom_string(&self) -> String {
        match self {
            DateValue::Empty => String::new(),
            DateValue::Date(d) => d.to_gedcom_string(),
            DateValue::About(d) => format!("ABT {}", d.to_gedcom_string()),
            DateValue::Calculated(d) => format!("CAL {}", d.to_gedcom_string()),
            DateValue::Estimated(d) => format!("EST {}", d.to_gedcom_string()),
            DateValue::Range { from: Some(f), to: Some(t) } => {
                format!("BET {} AND {}", f.to_gedcom_string(), t.to_gedcom_string())
            }
            DateValue::Range { from: Some(f), to: None } => format!("AFT {}", f.to_gedcom_string()),
            DateValue::Range { from: None, to: Some(t) } => format!("BEF {}", t.to_gedcom_string()),
            DateValue::Range { from: None, to: None } => String::new(),
            DateValue::Period { from: Some(f), to: Some(t) } => {
                format!("FROM {} TO {}", f.to_gedcom_string(), t.to_gedcom_string())
            }
            DateValue::Period { from: Some(f), to: None } => format!("FROM {}", f.to_gedcom_string()),
            DateValue::Period { from: None, to: Some(t) } => format!("TO {}", t.to_gedcom_string()),
            DateValue::Period { from: None, to: None } => String::new(),
        }
    }
}

fn strip_keyword<'a>(upper: &str, original: &'a str, keyword: &str) -> Option<&'a str> {
    if upper == keyword {
        return Some("");
    }
    let prefix = format!("{keyword} ");
    if upper.starts_with(&prefix) {
        Some(original[prefix.len()..].trim())
    } else {
        None
    }
}

fn split_and(s: &str) -> Option<(&str, &str)> {
    let upper = s.to_uppercase();
    let pos = upper.find(" AND ")?;
    Some((s[..pos].trim(), s[pos + 5..].trim()))
}

fn split_to(s: &str) -> Option<(&str, &str)> {
    let upper = s.to_uppercase();
    let pos = upper.find(" TO ")?;
    Some((s[..pos].trim(), s[pos + 4..].trim()))
}

/// An enumerated payload, resolved against a set URI through the schema lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Enum(pub String);

impl Enum {
    fn parse(raw: &str, set_uri: &str, lookup: &Lookup) -> Enum {
        Enum(lookup.enumval(set_uri, raw.trim()).uri().to_string())
    }

    #[must_use]
    pub fn to_gedcom_string(&self, lookup: &Lookup) -> String {
        lookup.tag(&self.0)
    }
}

/// The complete tagged-sum payload a typed structure's string content is parsed into.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// No structured type was resolvable for this payload (`"?"`); kept verbatim.
    Text(String),
    Integer(NonNegativeInteger),
    Name(Name),
    /// A BCP-47 language tag; malformed input is replaced with `"und"`.
    Language(String),
    /// An RFC 6838 media type; malformed input is replaced with `application/octet-stream`.
    MediaType(String),
    /// `Y` or empty.
    YesNull(bool),
    Age(Age),
    Time(Time),
    Date(Date),
    DateValue(DateValue),
    Enum(Enum),
    ListText(Vec<String>),
    ListEnum(Vec<Enum>),
}

impl Value {
    /// Parses a raw payload string according to `entry`'s declared type-class, resolving
    /// enumerations through `lookup`. Diagnostics are appended to `diagnostics`, each tagged with
    /// `context` (the containing structure's type URI), per the "transiently wrapped" diagnostic
    /// prefix design note.
    #[must_use]
    pub fn parse(
        raw: &str,
        entry: &PayloadEntry,
        lookup: &Lookup,
        context: &str,
        diagnostics: &mut Vec<GedcomWarning>,
    ) -> Value {
        match entry.type_name.as_str() {
            "https://gedcom.io/terms/v7/type-Age" => Value::Age(Age::parse(raw, context, diagnostics)),
            "https://gedcom.io/terms/v7/type-Time" => Value::Time(Time::parse(raw, context, diagnostics)),
            "https://gedcom.io/terms/v7/type-Date" => {
                Value::DateValue(DateValue::parse(raw, false, context, diagnostics))
            }
            "https://gedcom.io/terms/v7/type-Date#period" => {
                Value::DateValue(DateValue::parse(raw, true, context, diagnostics))
            }
            t if t.ends_with("type-Date#exact") => Value::Date(Date::parse(raw, context, diagnostics)),
            "https://gedcom.io/terms/v7/type-List#Text" => {
                Value::ListText(raw.split(',').map(|s| s.trim().to_string()).collect())
            }
            "https://gedcom.io/terms/v7/type-List#Enum" => {
                let set_uri = entry.set.as_deref().unwrap_or_default();
                Value::ListEnum(
                    raw.split(',')
                        .map(|s| Enum::parse(s, set_uri, lookup))
                        .collect(),
                )
            }
            "Enum" => {
                let set_uri = entry.set.as_deref().unwrap_or_default();
                Value::Enum(Enum::parse(raw, set_uri, lookup))
            }
            "NonNegativeInteger" | "Integer" => {
                Value::Integer(NonNegativeInteger::parse(raw, context, diagnostics))
            }
            "Name" => Value::Name(Name::parse(raw, context, diagnostics)),
            "Language" => Value::Language(parse_language(raw, context, diagnostics)),
            "MediaType" => Value::MediaType(parse_media_type(raw, context, diagnostics)),
            "Y|<NULL>" => Value::YesNull(parse_yes_null(raw, context, diagnostics)),
            _ => Value::Text(raw.to_string()),
        }
    }

    /// Serializes back to the payload's canonical text form.
    #[must_use]
    pub fn to_gedcom_string(&self, lookup: &Lookup) -> String {
        match self {
            Value::Text(s) | Value::Language(s) | Value::MediaType(s) => s.clone(),
            Value::Integer(n) => n.to_gedcom_string(),
            Value::Name(n) => n.to_gedcom_string(),
            Value::YesNull(true) => "Y".to_string(),
            Value::YesNull(false) => String::new(),
            Value::Age(a) => a.to_gedcom_string(),
            Value::Time(t) => t.to_gedcom_string(),
            Value::Date(d) => d.to_gedcom_string(),
            Value::DateValue(d) => d.to_gedcom_string(),
            Value::Enum(e) => e.to_gedcom_string(lookup),
            Value::ListText(items) => items.join(", "),
            Value::ListEnum(items) => items
                .iter()
                .map(|e| e.to_gedcom_string(lookup))
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    /// True when the value carries no informative content.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Text(s) | Value::Language(s) | Value::MediaType(s) => s.is_empty(),
            Value::Name(n) => n.is_empty(),
            Value::YesNull(b) => !b,
            Value::Age(a) => a.is_empty(),
            Value::DateValue(DateValue::Empty) => true,
            Value::ListText(items) => items.is_empty(),
            Value::ListEnum(items) => items.is_empty(),
            _ => false,
        }
    }
}

fn parse_language(raw: &str, context: &str, diagnostics: &mut Vec<GedcomWarning>) -> String {
    let raw = raw.trim();
    let valid = !raw.is_empty()
        && raw
            .split('-')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric()));
    if valid {
        raw.to_string()
    } else {
        diagnostics.push(GedcomWarning::in_context(
            context,
            Severity::Error,
            WarningKind::Message(format!("invalid language tag: {raw:?}")),
        ));
        "und".to_string()
    }
}

fn parse_media_type(raw: &str, context: &str, diagnostics: &mut Vec<GedcomWarning>) -> String {
    let raw = raw.trim();
    let valid = raw
        .split_once('/')
        .is_some_and(|(a, b)| !a.is_empty() && !b.is_empty() && !a.contains(char::is_whitespace) && !b.contains(char::is_whitespace));
    if valid {
        raw.to_string()
    } else {
        diagnostics.push(GedcomWarning::in_context(
            context,
            Severity::Error,
            WarningKind::Message(format!("invalid media type: {raw:?}")),
        ));
        "application/octet-stream".to_string()
    }
}

fn parse_yes_null(raw: &str, context: &str, diagnostics: &mut Vec<GedcomWarning>) -> bool {
    match raw.trim() {
        "" => false,
        "Y" => true,
        other => {
            diagnostics.push(GedcomWarning::in_context(
                context,
                Severity::Error,
                WarningKind::Message(format!("expected Y or empty, found {other:?}")),
            ));
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_diagnostics() -> Vec<GedcomWarning> {
        Vec::new()
    }

    #[test]
    fn age_round_trips() {
        let mut diags = ctx_diagnostics();
        let age = Age::parse("< 1y 2m", "ctx", &mut diags);
        assert!(diags.is_empty());
        assert_eq!(age.modifier, Some('<'));
        assert_eq!(age.years, Some(1));
        assert_eq!(age.months, Some(2));
        assert_eq!(age.to_gedcom_string(), "<1y 2m");
    }

    #[test]
    fn time_parses_utc_suffix() {
        let mut diags = ctx_diagnostics();
        let t = Time::parse("12:34:56Z", "ctx", &mut diags);
        assert!(diags.is_empty());
        assert!(t.utc);
        assert_eq!(t.to_gedcom_string(), "12:34:56Z");
    }

    #[test]
    fn age_no_match_sentinel_renders_greater_than_zero() {
        let mut diags = ctx_diagnostics();
        let age = Age::parse("not an age", "ctx", &mut diags);
        assert_eq!(age.modifier, Some('>'));
        assert_eq!(age.years, Some(0));
        assert_eq!(age.to_gedcom_string(), ">0y");
    }

    #[test]
    fn bare_type_date_uri_parses_through_date_value() {
        let mut diags = ctx_diagnostics();
        let lookup = Lookup::empty();
        let entry = PayloadEntry {
            type_name: "https://gedcom.io/terms/v7/type-Date".to_string(),
            ..PayloadEntry::default()
        };
        let v = Value::parse("ABT 1900", &entry, &lookup, "ctx", &mut diags);
        assert!(diags.is_empty());
        assert!(matches!(v, Value::DateValue(DateValue::About(_))));

        let mut diags = ctx_diagnostics();
        let v = Value::parse("BET 1900 AND 1910", &entry, &lookup, "ctx", &mut diags);
        assert!(diags.is_empty());
        assert!(matches!(
            v,
            Value::DateValue(DateValue::Range { from: Some(_), to: Some(_) })
        ));
    }

    #[test]
    fn exact_suffix_uri_parses_bare_date() {
        let mut diags = ctx_diagnostics();
        let lookup = Lookup::empty();
        let entry = PayloadEntry {
            type_name: "https://gedcom.io/terms/v7/type-Date#exact".to_string(),
            ..PayloadEntry::default()
        };
        let v = Value::parse("1 JAN 2020", &entry, &lookup, "ctx", &mut diags);
        assert!(diags.is_empty());
        assert!(matches!(v, Value::Date(_)));
    }

    #[test]
    fn date_value_parses_between_and_range() {
        let mut diags = ctx_diagnostics();
        let v = DateValue::parse("BET 1900 AND 1910", false, "ctx", &mut diags);
        assert!(diags.is_empty());
        assert!(matches!(v, DateValue::Range { from: Some(_), to: Some(_) }));
    }

    #[test]
    fn date_value_period_downgrades_other_kinds() {
        let mut diags = ctx_diagnostics();
        let v = DateValue::parse("ABT 1 JAN 2020", true, "ctx", &mut diags);
        assert_eq!(v, DateValue::Empty);
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn yes_null_rejects_other_text() {
        let mut diags = ctx_diagnostics();
        assert!(!parse_yes_null("maybe", "ctx", &mut diags));
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn name_escapes_too_many_slashes() {
        let mut diags = ctx_diagnostics();
        let name = Name::parse("a/b/c/d", "ctx", &mut diags);
        assert_eq!(diags.len(), 1);
        assert!(name.0.contains('\u{2044}'));
    }
}
