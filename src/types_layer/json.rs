//! JSON codec for the typed layer, available under the `json` feature.
//!
//! Each structure serializes as a node `{"id"?: ..., "xref"|payload?: ..., "sub"?: {URI: [Node,
//! ...]}}`, keyed under its resolved type URI at the parent (or, for the header, bare at the top
//! level). `xref` values are rendered `"#"+id`, matching the tag layer's own `"href"` convention
//! but distinguishing a record reference from a parsed value at the same slot. Typed payloads
//! serialize to their canonical structured forms rather than the plain GEDCOM text the tag layer
//! uses — a `Date` becomes `{"calendar", "year", "month"?, "day"?, ...}`, an `Age` becomes
//! `{"mod"?, "years"?, "months"?, "weeks"?, "days"?}` and so on — so round-tripping through this
//! form never re-parses a payload string.

use super::calendar::ParsedDateTime;
use super::value::{Age, Date, DateValue, Enum, Name, NonNegativeInteger, Time, Value};
use super::{TypedDataset, TypedPayload, TypedStructureId};
use crate::schema::Lookup;
use crate::GedcomError;
use serde_json::{json, Map, Value as Json};
use std::collections::HashMap;

/// Parses the typed-layer JSON intermediate form (as produced by [`to_json`]) back into a
/// [`TypedDataset`] under `lookup`.
///
/// Unlike [`super::super::tag::json::from_json`], typed payloads here are already structured
/// values rather than raw GEDCOM text, so each node's `payload` is re-encoded to its canonical
/// GEDCOM string form and re-parsed through [`TypedDataset::set_text`] — this keeps one payload
/// grammar (`Value::parse`) authoritative instead of duplicating it for JSON.
///
/// # Errors
///
/// Returns an error if `source` is not valid JSON, does not match the expected node shape, or a
/// `xref` field references an id not defined anywhere else in the document.
pub fn from_json(source: &str, lookup: Lookup) -> Result<TypedDataset, GedcomError> {
    let doc: Json = serde_json::from_str(source)
        .map_err(|e| GedcomError::EncodingError(format!("typed JSON parse failed: {e}")))?;

    let mut dataset = TypedDataset::new(lookup);
    let mut pending: Vec<(TypedStructureId, String)> = Vec::new();

    if let Some(header) = doc.get("header").filter(|h| !h.is_null()) {
        let id = dataset.create_record("HEAD");
        build_node(&mut dataset, id, header, &mut pending)?;
    }

    if let Some(records) = doc.get("records").and_then(Json::as_object) {
        for (type_uri, nodes) in records {
            let Some(nodes) = nodes.as_array() else { continue };
            for node in nodes {
                let id = dataset.create_record(type_uri);
                build_node(&mut dataset, id, node, &mut pending)?;
            }
        }
    }

    for (id, href) in pending {
        let target = href.strip_prefix('#').unwrap_or(&href);
        if target == "VOID" {
            dataset.set_void(id);
            continue;
        }
        match dataset.by_xref_id(target) {
            Some(resolved) => {
                dataset.set_pointer(id, resolved);
            }
            None => {
                return Err(GedcomError::InvalidFormat(format!(
                    "pointer to undefined xref id #{target}"
                )))
            }
        }
    }

    Ok(dataset)
}

fn build_node(
    dataset: &mut TypedDataset,
    id: TypedStructureId,
    node: &Json,
    pending: &mut Vec<(TypedStructureId, String)>,
) -> Result<(), GedcomError> {
    let Some(obj) = node.as_object() else {
        return Err(GedcomError::InvalidFormat(
            "typed JSON node must be an object".to_string(),
        ));
    };

    if let Some(xref) = obj.get("id").and_then(Json::as_str) {
        dataset.set_xref_id(id, xref.to_string());
    }

    if let Some(href) = obj.get("xref").and_then(Json::as_str) {
        pending.push((id, href.to_string()));
    } else if let Some(payload) = obj.get("payload") {
        dataset.set_text(id, &json_payload_to_gedcom_string(payload));
    }

    if let Some(sub) = obj.get("sub").and_then(Json::as_object) {
        for (type_uri, children) in sub {
            let Some(children) = children.as_array() else { continue };
            for child in children {
                let child_id = dataset.create_child(id, type_uri);
                build_node(dataset, child_id, child, pending)?;
            }
        }
    }

    Ok(())
}

/// Renders a JSON payload value (as emitted by [`value_to_json`]) back to the GEDCOM text form
/// [`super::value::Value::parse`] expects, so reconstruction goes through the one payload
/// grammar rather than a parallel JSON-specific parser.
fn json_payload_to_gedcom_string(payload: &Json) -> String {
    match payload {
        Json::String(s) => s.clone(),
        Json::Number(n) => n.to_string(),
        Json::Bool(b) => if *b { "yes".to_string() } else { String::new() },
        Json::Array(items) => items
            .iter()
            .map(json_payload_to_gedcom_string)
            .collect::<Vec<_>>()
            .join(", "),
        Json::Object(obj) => {
            if let Some(tag) = obj.get("tag").and_then(Json::as_str) {
                return tag.to_string();
            }
            if obj.contains_key("year") || obj.contains_key("calendar") {
                return parsed_date_time_from_json(obj).to_gedcom_date();
            }
            if obj.contains_key("years")
                || obj.contains_key("months")
                || obj.contains_key("weeks")
                || obj.contains_key("days")
                || obj.contains_key("mod")
            {
                return age_from_json(obj).to_gedcom_string();
            }
            if obj.contains_key("hour") {
                let hour = obj.get("hour").and_then(Json::as_u64).unwrap_or(0);
                let minute = obj.get("minute").and_then(Json::as_u64).unwrap_or(0);
                let mut time = ParsedDateTime {
                    hour: u8::try_from(hour).ok(),
                    minute: u8::try_from(minute).ok(),
                    ..Default::default()
                };
                if let Some(s) = obj.get("second").and_then(Json::as_u64) {
                    time.second = u8::try_from(s).ok();
                }
                return time.to_gedcom_time().unwrap_or_default();
            }
            if let Some(kind) = obj.get("kind").and_then(Json::as_str) {
                let date = obj.get("date").map(json_payload_to_gedcom_string).unwrap_or_default();
                let from = obj.get("from").map(json_payload_to_gedcom_string).unwrap_or_default();
                let to = obj.get("to").map(json_payload_to_gedcom_string).unwrap_or_default();
                return match kind {
                    "about" => format!("ABT {date}"),
                    "calculated" => format!("CAL {date}"),
                    "estimated" => format!("EST {date}"),
                    "range" => format!("BET {from} AND {to}"),
                    "period" => format!("FROM {from} TO {to}"),
                    other => other.to_string(),
                };
            }
            String::new()
        }
        Json::Null => String::new(),
    }
}

fn age_from_json(obj: &Map<String, Json>) -> Age {
    Age {
        modifier: obj.get("mod").and_then(Json::as_str).and_then(|s| s.chars().next()),
        years: obj.get("years").and_then(Json::as_u64).and_then(|v| u32::try_from(v).ok()),
        months: obj.get("months").and_then(Json::as_u64).and_then(|v| u32::try_from(v).ok()),
        weeks: obj.get("weeks").and_then(Json::as_u64).and_then(|v| u32::try_from(v).ok()),
        days: obj.get("days").and_then(Json::as_u64).and_then(|v| u32::try_from(v).ok()),
    }
}

fn parsed_date_time_from_json(obj: &Map<String, Json>) -> ParsedDateTime {
    let mut date = ParsedDateTime::default();
    if let Some(cal) = obj.get("calendar").and_then(Json::as_str) {
        date.calendar = super::calendar::Calendar::from_gedcom_escape(cal).unwrap_or_default();
    }
    date.year = obj.get("year").and_then(Json::as_i64).and_then(|v| i32::try_from(v).ok());
    date.month = obj.get("month").and_then(Json::as_u64).and_then(|v| u8::try_from(v).ok());
    date.day = obj.get("day").and_then(Json::as_u64).and_then(|v| u8::try_from(v).ok());
    if let Some(q) = obj.get("qualifier").and_then(Json::as_str) {
        date.qualifier = super::calendar::DateQualifier::parse(q);
    }
    date
}

/// Serializes `dataset` to the typed-layer JSON intermediate form: `{header: Node, records: {URI:
/// [Node, ...]}}`.
///
/// # Errors
///
/// Returns an error if `serde_json` fails to render the assembled tree (never expected for a
/// well-formed dataset, but propagated rather than panicking).
pub fn to_json(dataset: &TypedDataset) -> Result<String, GedcomError> {
    let lookup = dataset.lookup();

    let header = dataset
        .header()
        .map(|id| node(dataset, lookup, id))
        .unwrap_or(Json::Null);

    let mut by_type: HashMap<String, Vec<Json>> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    for &record in dataset.records() {
        if Some(record) == dataset.header() {
            continue;
        }
        let type_uri = dataset.get(record).type_.clone();
        if !by_type.contains_key(&type_uri) {
            order.push(type_uri.clone());
        }
        by_type.entry(type_uri).or_default().push(node(dataset, lookup, record));
    }

    let mut records = Map::new();
    for type_uri in order {
        records.insert(type_uri.clone(), Json::Array(by_type.remove(&type_uri).unwrap_or_default()));
    }

    serde_json::to_string_pretty(&json!({ "header": header, "records": records }))
        .map_err(|e| GedcomError::EncodingError(format!("typed JSON serialization failed: {e}")))
}

fn node(dataset: &TypedDataset, lookup: &Lookup, id: TypedStructureId) -> Json {
    let structure = dataset.get(id);
    let mut out = Map::new();

    if let Some(xref) = &structure.xref_id {
        out.insert("id".to_string(), Json::String(xref.clone()));
    }

    match &structure.payload {
        TypedPayload::None => {}
        TypedPayload::Void => {
            out.insert("xref".to_string(), Json::String("#VOID".to_string()));
        }
        TypedPayload::Pointer(target) => {
            let xref = dataset.get(*target).xref_id.clone().unwrap_or_default();
            out.insert("xref".to_string(), Json::String(format!("#{xref}")));
        }
        TypedPayload::Value(value) => {
            out.insert("payload".to_string(), value_to_json(value, lookup));
        }
    }

    let children = dataset.children(id);
    if !children.is_empty() {
        let mut by_type: HashMap<String, Vec<Json>> = HashMap::new();
        let mut order: Vec<String> = Vec::new();
        for &child in children {
            let type_uri = dataset.get(child).type_.clone();
            if !by_type.contains_key(&type_uri) {
                order.push(type_uri.clone());
            }
            by_type.entry(type_uri).or_default().push(node(dataset, lookup, child));
        }
        let mut sub = Map::new();
        for type_uri in order {
            sub.insert(type_uri.clone(), Json::Array(by_type.remove(&type_uri).unwrap_or_default()));
        }
        out.insert("sub".to_string(), Json::Object(sub));
    }

    Json::Object(out)
}

fn value_to_json(value: &Value, lookup: &Lookup) -> Json {
    match value {
        Value::Text(s) | Value::Language(s) | Value::MediaType(s) => Json::String(s.clone()),
        Value::Integer(NonNegativeInteger(n)) => json!(n),
        Value::Name(Name(s)) => Json::String(s.clone()),
        Value::YesNull(b) => Json::Bool(*b),
        Value::Age(age) => age_to_json(age),
        Value::Time(time) => time_to_json(time),
        Value::Date(date) => date_to_json(date),
        Value::DateValue(date_value) => date_value_to_json(date_value),
        Value::Enum(e) => enum_to_json(e, lookup),
        Value::ListText(items) => Json::Array(items.iter().cloned().map(Json::String).collect()),
        Value::ListEnum(items) => Json::Array(items.iter().map(|e| enum_to_json(e, lookup)).collect()),
    }
}

fn age_to_json(age: &Age) -> Json {
    let mut out = Map::new();
    if let Some(m) = age.modifier {
        out.insert("mod".to_string(), Json::String(m.to_string()));
    }
    if let Some(y) = age.years {
        out.insert("years".to_string(), json!(y));
    }
    if let Some(m) = age.months {
        out.insert("months".to_string(), json!(m));
    }
    if let Some(w) = age.weeks {
        out.insert("weeks".to_string(), json!(w));
    }
    if let Some(d) = age.days {
        out.insert("days".to_string(), json!(d));
    }
    Json::Object(out)
}

fn time_to_json(time: &Time) -> Json {
    json!({
        "hour": time.hour,
        "minute": time.minute,
        "second": time.second,
        "utc": time.utc,
    })
}

fn parsed_date_time_to_json(date: &ParsedDateTime) -> Json {
    let mut out = Map::new();
    out.insert("calendar".to_string(), Json::String(date.calendar.gedcom_escape().to_string()));
    if let Some(y) = date.year {
        out.insert("year".to_string(), json!(y));
    }
    if let Some(m) = date.month {
        out.insert("month".to_string(), json!(m));
    }
    if let Some(d) = date.day {
        out.insert("day".to_string(), json!(d));
    }
    if let Some(h) = date.hour {
        out.insert("hour".to_string(), json!(h));
    }
    if let Some(m) = date.minute {
        out.insert("minute".to_string(), json!(m));
    }
    if let Some(s) = date.second {
        out.insert("second".to_string(), json!(s));
    }
    if let Some(sub) = &date.subsecond {
        out.insert("subsecond".to_string(), Json::String(sub.clone()));
    }
    if let Some(q) = date.qualifier {
        out.insert("qualifier".to_string(), Json::String(q.as_str().to_string()));
    }
    if let Some(dual) = date.dual_year {
        out.insert("epoch".to_string(), json!(dual));
    }
    if date.bce {
        out.insert("bce".to_string(), Json::Bool(true));
    }
    Json::Object(out)
}

fn date_to_json(date: &Date) -> Json {
    parsed_date_time_to_json(&date.0)
}

fn date_value_to_json(value: &DateValue) -> Json {
    match value {
        DateValue::Empty => Json::Object(Map::new()),
        DateValue::Date(d) => date_to_json(d),
        DateValue::About(d) => json!({ "kind": "about", "date": date_to_json(d) }),
        DateValue::Calculated(d) => json!({ "kind": "calculated", "date": date_to_json(d) }),
        DateValue::Estimated(d) => json!({ "kind": "estimated", "date": date_to_json(d) }),
        DateValue::Range { from, to } => json!({
            "kind": "range",
            "from": from.as_ref().map(date_to_json),
            "to": to.as_ref().map(date_to_json),
        }),
        DateValue::Period { from, to } => json!({
            "kind": "period",
            "from": from.as_ref().map(date_to_json),
            "to": to.as_ref().map(date_to_json),
        }),
    }
}

fn enum_to_json(e: &Enum, lookup: &Lookup) -> Json {
    json!({ "tag": lookup.tag(&e.0), "uri": e.0 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::types_layer::parse;

    fn lookup_with_date() -> Lookup {
        Lookup::from_value(&serde_json::json!({
            "substructure": {
                "https://gedcom.io/terms/v7/HEAD": {
                    "GEDC": {"type": "https://gedcom.io/terms/v7/GEDC", "cardinality": "{1:1}"},
                    "DATE": {"type": "https://gedcom.io/terms/v7/HEAD-DATE", "cardinality": "{0:1}"}
                },
                "https://gedcom.io/terms/v7/GEDC": {
                    "VERS": {"type": "https://gedcom.io/terms/v7/GEDC-VERS", "cardinality": "{1:1}"}
                }
            },
            "payload": {
                "https://gedcom.io/terms/v7/GEDC-VERS": {"type": "Text"},
                "https://gedcom.io/terms/v7/HEAD-DATE": {"type": "https://gedcom.io/terms/v7/type-Date"}
            },
            "tag": {
                "https://gedcom.io/terms/v7/HEAD": "HEAD",
                "https://gedcom.io/terms/v7/GEDC": "GEDC",
                "https://gedcom.io/terms/v7/GEDC-VERS": "VERS",
                "https://gedcom.io/terms/v7/HEAD-DATE": "DATE"
            }
        }))
    }

    #[test]
    fn serializes_header_and_records() {
        let source = "0 HEAD\n1 GEDC\n2 VERS 7.0\n1 DATE 2 OCT 2021\n0 @I1@ INDI\n0 TRLR\n";
        let (dataset, warnings) = parse(source, &Dialect::gedcom_7(), lookup_with_date()).unwrap();
        assert!(warnings.is_empty());

        let text = to_json(&dataset).unwrap();
        let parsed: Json = serde_json::from_str(&text).unwrap();

        assert!(parsed["header"]["sub"]["https://gedcom.io/terms/v7/GEDC"][0]["sub"]
            ["https://gedcom.io/terms/v7/GEDC-VERS"][0]["payload"]
            .as_str()
            .unwrap()
            == "7.0");

        let date = &parsed["header"]["sub"]["https://gedcom.io/terms/v7/HEAD-DATE"][0]["payload"];
        assert_eq!(date["year"], json!(2021));
        assert_eq!(date["month"], json!(10));
        assert_eq!(date["day"], json!(2));

        assert_eq!(parsed["records"]["INDI"][0]["id"], json!("I1"));
    }

    #[test]
    fn pointer_payload_serializes_as_xref() {
        let source =
            "0 @F1@ FAM\n1 HUSB @I1@\n0 @I1@ INDI\n0 HEAD\n1 GEDC\n2 VERS 7.0\n0 TRLR\n";
        let (dataset, _) = parse(source, &Dialect::gedcom_7(), Lookup::empty()).unwrap();

        let text = to_json(&dataset).unwrap();
        let parsed: Json = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["records"]["FAM"][0]["sub"]["HUSB"][0]["xref"], json!("#I1"));
    }

    #[test]
    fn round_trips_header_date_and_pointer_through_json() {
        let source = "0 HEAD\n1 GEDC\n2 VERS 7.0\n1 DATE 2 OCT 2021\n0 @F1@ FAM\n1 HUSB @I1@\n0 @I1@ INDI\n0 TRLR\n";
        let lookup = lookup_with_date();
        let (dataset, warnings) = parse(source, &Dialect::gedcom_7(), lookup.clone()).unwrap();
        assert!(warnings.is_empty());

        let text = to_json(&dataset).unwrap();
        let mut rebuilt = from_json(&text, lookup).unwrap();

        let fam = rebuilt.by_xref_id("F1").unwrap();
        let indi = rebuilt.by_xref_id("I1").unwrap();
        let husb = rebuilt.children(fam)[0];
        assert_eq!(rebuilt.get(husb).payload, TypedPayload::Pointer(indi));

        let date_node = rebuilt.children(rebuilt.header().unwrap())[1];
        match &rebuilt.get(date_node).payload {
            TypedPayload::Value(Value::DateValue(DateValue::Date(d))) => {
                assert_eq!(d.0.year, Some(2021));
                assert_eq!(d.0.month, Some(10));
                assert_eq!(d.0.day, Some(2));
            }
            other => panic!("expected a parsed date, got {other:?}"),
        }

        assert_eq!(rebuilt.validate(), 0);
    }
}
