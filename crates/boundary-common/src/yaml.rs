//! Template document parsing using yaml-rust2
//!
//! The provisioning toolkit may print its template as JSON or YAML. Both are
//! converted to `serde_json::Value` so the rest of the pipeline works on a
//! single tree type.
//!
//! Only long-form intrinsic functions (`Fn::Sub:`, `Ref:`) are understood.
//! The YAML loader discards tags, so short-form `!Sub` would silently turn
//! into a plain string; such input is rejected instead.

use serde_json::{Map, Number, Value};
use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser, Tag};
use yaml_rust2::scanner::Marker;
use yaml_rust2::{Yaml, YamlLoader};

/// Intrinsic functions CloudFormation accepts as `!Name` tags
const SHORT_FORM_INTRINSICS: [&str; 17] = [
    "Ref", "Sub", "GetAtt", "Join", "If", "Not", "Equals", "And", "Or", "Condition",
    "Select", "Split", "FindInMap", "ImportValue", "Base64", "Cidr", "GetAZs",
];

/// Error type for template parsing
#[derive(Debug, Clone)]
pub struct YamlError(String);

impl std::fmt::Display for YamlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for YamlError {}

/// Parse a template printed as either JSON or YAML.
///
/// Input starting with `{` is treated as JSON; anything else as YAML.
pub fn parse_document(input: &str) -> Result<Value, YamlError> {
    if input.trim_start().starts_with('{') {
        serde_json::from_str(input).map_err(|e| YamlError(e.to_string()))
    } else {
        parse_yaml(input)
    }
}

/// Parse the first YAML document into a `serde_json::Value`.
///
/// Empty input yields `Value::Null`.
pub fn parse_yaml(input: &str) -> Result<Value, YamlError> {
    reject_short_form(input)?;
    let mut docs = YamlLoader::load_from_str(input).map_err(|e| YamlError(e.to_string()))?;
    if docs.is_empty() {
        return Ok(Value::Null);
    }
    to_json(docs.swap_remove(0))
}

/// Records the first CloudFormation short-form tag seen while parsing
#[derive(Default)]
struct ShortFormDetector {
    found: Option<(String, usize)>,
}

impl MarkedEventReceiver for ShortFormDetector {
    fn on_event(&mut self, event: Event, mark: Marker) {
        if self.found.is_some() {
            return;
        }
        let tag = match event {
            Event::Scalar(_, _, _, tag) => tag,
            Event::SequenceStart(_, tag) | Event::MappingStart(_, tag) => tag,
            _ => None,
        };
        if let Some(Tag { handle, suffix }) = tag {
            if handle == "!" && SHORT_FORM_INTRINSICS.contains(&suffix.as_str()) {
                self.found = Some((suffix, mark.line()));
            }
        }
    }
}

/// Long-form spelling of a short-form intrinsic
fn long_form(name: &str) -> String {
    match name {
        "Ref" | "Condition" => format!("{}:", name),
        _ => format!("Fn::{}:", name),
    }
}

fn reject_short_form(input: &str) -> Result<(), YamlError> {
    let mut detector = ShortFormDetector::default();
    Parser::new_from_str(input)
        .load(&mut detector, true)
        .map_err(|e| YamlError(e.to_string()))?;
    match detector.found {
        Some((name, line)) => Err(YamlError(format!(
            "line {}: short-form intrinsic !{} is not supported, use {}",
            line,
            name,
            long_form(&name)
        ))),
        None => Ok(()),
    }
}

fn hash_key(key: Yaml) -> Result<String, YamlError> {
    match key {
        Yaml::String(s) | Yaml::Real(s) => Ok(s),
        Yaml::Integer(i) => Ok(i.to_string()),
        Yaml::Boolean(b) => Ok(b.to_string()),
        other => Err(YamlError(format!("unsupported mapping key {:?}", other))),
    }
}

fn to_json(yaml: Yaml) -> Result<Value, YamlError> {
    let value = match yaml {
        Yaml::Null => Value::Null,
        Yaml::Boolean(b) => Value::Bool(b),
        Yaml::Integer(i) => Value::from(i),
        // Reals that do not fit an f64 (".nan", ".inf") stay textual
        Yaml::Real(text) => match text.parse::<f64>().ok().and_then(Number::from_f64) {
            Some(number) => Value::Number(number),
            None => Value::String(text),
        },
        Yaml::String(s) => Value::String(s),
        Yaml::Array(items) => Value::Array(items.into_iter().map(to_json).collect::<Result<_, _>>()?),
        Yaml::Hash(entries) => {
            let mut map = Map::with_capacity(entries.len());
            for (key, entry) in entries {
                map.insert(hash_key(key)?, to_json(entry)?);
            }
            Value::Object(map)
        }
        Yaml::Alias(_) => return Err(YamlError("YAML aliases are not supported".to_string())),
        Yaml::BadValue => return Err(YamlError("malformed YAML value".to_string())),
    };
    Ok(value)
}
