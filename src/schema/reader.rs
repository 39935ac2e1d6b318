use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use validator::Validate;

use super::clock::Clock;
use super::validation::{range_violations, ValidationError, Violation, ViolationKind};

/// Pulls typed fields out of an untyped JSON object.
///
/// Each accessor returns `None` when the field could not be produced and, for
/// anything other than an absent optional, records a violation. Callers read
/// every field first and only then decide whether a record can be built, so a
/// single pass reports all bad fields.
pub(crate) struct FieldReader<'a> {
    record: &'static str,
    map: &'a Map<String, Value>,
    prefix: String,
    violations: Vec<Violation>,
}

impl<'a> FieldReader<'a> {
    pub fn new(raw: &'a Value, record: &'static str) -> Result<Self, ValidationError> {
        match raw.as_object() {
            Some(map) => Ok(Self {
                record,
                map,
                prefix: String::new(),
                violations: Vec::new(),
            }),
            None => Err(ValidationError::new(
                record,
                vec![Violation::new(
                    "",
                    ViolationKind::InvalidFormat,
                    format!("expected a JSON object, got {}", type_name(raw)),
                )],
            )),
        }
    }

    fn path(&self, field: &str) -> String {
        format!("{}{}", self.prefix, field)
    }

    /// Null is treated the same as an absent key
    fn present(&self, field: &str) -> Option<&'a Value> {
        self.map.get(field).filter(|v| !v.is_null())
    }

    fn push(&mut self, field: &str, kind: ViolationKind, message: String) {
        let path = self.path(field);
        self.violations.push(Violation::new(path, kind, message));
    }

    fn wrong_type(&mut self, field: &str, expected: &str, got: &Value) {
        let message = format!("{} must be {}, got {}", self.path(field), expected, type_name(got));
        self.push(field, ViolationKind::InvalidFormat, message);
    }

    fn missing(&mut self, field: &str) {
        let path = self.path(field);
        self.violations.push(Violation::missing(path));
    }

    fn string_value(&mut self, field: &str, value: &Value) -> Option<String> {
        match value.as_str() {
            Some(s) => Some(s.to_string()),
            None => {
                self.wrong_type(field, "a string", value);
                None
            }
        }
    }

    pub fn required_str(&mut self, field: &str) -> Option<String> {
        match self.present(field) {
            Some(value) => self.string_value(field, value),
            None => {
                self.missing(field);
                None
            }
        }
    }

    pub fn optional_str(&mut self, field: &str) -> Option<String> {
        let value = self.present(field)?;
        self.string_value(field, value)
    }

    pub fn str_or(&mut self, field: &str, default: &str) -> Option<String> {
        match self.present(field) {
            Some(value) => self.string_value(field, value),
            None => Some(default.to_string()),
        }
    }

    /// Record identifier, stored under `_id` and accepted under `id`.
    /// Mongo extended JSON (`{"$oid": "..."}`) collapses to its hex string.
    pub fn identifier(&mut self) -> Option<String> {
        let (field, value) = match (self.present("_id"), self.present("id")) {
            (Some(value), _) => ("_id", value),
            (None, Some(value)) => ("id", value),
            (None, None) => {
                self.missing("_id");
                return None;
            }
        };

        match value {
            Value::String(s) => Some(s.clone()),
            Value::Object(obj) => match obj.get("$oid").and_then(Value::as_str) {
                Some(oid) => Some(oid.to_string()),
                None => {
                    self.wrong_type(field, "a string or {\"$oid\": string}", value);
                    None
                }
            },
            other => {
                self.wrong_type(field, "a string or {\"$oid\": string}", other);
                None
            }
        }
    }

    fn number_value(&mut self, field: &str, value: &Value) -> Option<f64> {
        match value.as_f64() {
            Some(n) => Some(n),
            None => {
                self.wrong_type(field, "a number", value);
                None
            }
        }
    }

    pub fn required_number(&mut self, field: &str) -> Option<f64> {
        match self.present(field) {
            Some(value) => self.number_value(field, value),
            None => {
                self.missing(field);
                None
            }
        }
    }

    pub fn optional_number(&mut self, field: &str) -> Option<f64> {
        let value = self.present(field)?;
        self.number_value(field, value)
    }

    pub fn number_or(&mut self, field: &str, default: f64) -> Option<f64> {
        match self.present(field) {
            Some(value) => self.number_value(field, value),
            None => Some(default),
        }
    }

    fn timestamp_value(&mut self, field: &str, value: &Value) -> Option<DateTime<Utc>> {
        let Some(text) = value.as_str() else {
            self.wrong_type(field, "an ISO-8601 date-time string", value);
            return None;
        };

        match parse_timestamp(text) {
            Some(ts) => Some(ts),
            None => {
                let message = format!("{} is not a valid date-time: {:?}", self.path(field), text);
                self.push(field, ViolationKind::InvalidFormat, message);
                None
            }
        }
    }

    pub fn required_timestamp(&mut self, field: &str) -> Option<DateTime<Utc>> {
        match self.present(field) {
            Some(value) => self.timestamp_value(field, value),
            None => {
                self.missing(field);
                None
            }
        }
    }

    pub fn optional_timestamp(&mut self, field: &str) -> Option<DateTime<Utc>> {
        let value = self.present(field)?;
        self.timestamp_value(field, value)
    }

    pub fn timestamp_or_now(&mut self, field: &str, clock: &dyn Clock) -> Option<DateTime<Utc>> {
        match self.present(field) {
            Some(value) => self.timestamp_value(field, value),
            None => Some(clock.now()),
        }
    }

    /// Closed enumerations are parsed through their serde derive; an unknown
    /// variant becomes `InvalidEnumValue`.
    fn label_value<T: DeserializeOwned>(&mut self, field: &str, value: &Value) -> Option<T> {
        if !value.is_string() {
            self.wrong_type(field, "a string", value);
            return None;
        }

        match T::deserialize(value) {
            Ok(label) => Some(label),
            Err(e) => {
                let err_string = e.to_string();
                let kind = if err_string.contains("unknown variant") {
                    ViolationKind::InvalidEnumValue
                } else {
                    ViolationKind::InvalidFormat
                };
                let message = format!("{}: {}", self.path(field), err_string);
                self.push(field, kind, message);
                None
            }
        }
    }

    pub fn required_label<T: DeserializeOwned>(&mut self, field: &str) -> Option<T> {
        match self.present(field) {
            Some(value) => self.label_value(field, value),
            None => {
                self.missing(field);
                None
            }
        }
    }

    pub fn optional_label<T: DeserializeOwned>(&mut self, field: &str) -> Option<T> {
        let value = self.present(field)?;
        self.label_value(field, value)
    }

    pub fn label_or<T: DeserializeOwned>(&mut self, field: &str, default: T) -> Option<T> {
        match self.present(field) {
            Some(value) => self.label_value(field, value),
            None => Some(default),
        }
    }

    /// Read an array of embedded objects, defaulting to empty when absent.
    /// Element violations are prefixed with `field[index].`.
    pub fn list<T>(
        &mut self,
        field: &str,
        mut parse: impl FnMut(&mut FieldReader<'a>) -> Option<T>,
    ) -> Option<Vec<T>> {
        let Some(value) = self.present(field) else {
            return Some(Vec::new());
        };
        let Some(items) = value.as_array() else {
            self.wrong_type(field, "an array", value);
            return None;
        };

        let mut parsed = Vec::with_capacity(items.len());
        let mut clean = true;
        for (index, item) in items.iter().enumerate() {
            let element = format!("{}[{}]", field, index);
            let Some(map) = item.as_object() else {
                self.wrong_type(&element, "an object", item);
                clean = false;
                continue;
            };

            let mut nested = FieldReader {
                record: self.record,
                map,
                prefix: format!("{}.", self.path(&element)),
                violations: Vec::new(),
            };
            let result = parse(&mut nested);
            if nested.violations.is_empty() {
                if let Some(value) = result {
                    parsed.push(value);
                }
            } else {
                clean = false;
                self.violations.append(&mut nested.violations);
            }
        }

        clean.then_some(parsed)
    }

    /// Run `validator` bounds on values read so far
    pub fn check<V: Validate>(&mut self, value: &V) {
        if let Err(errors) = value.validate() {
            for mut violation in range_violations(&errors) {
                violation.field = self.path(&violation.field);
                self.violations.push(violation);
            }
        }
    }

    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn into_error(self) -> ValidationError {
        ValidationError::new(self.record, self.violations)
    }
}

/// Accepts RFC 3339, naive ISO-8601 date-times (taken as UTC) and plain dates (midnight UTC)
pub(crate) fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
