use serde::Serialize;
use std::fmt;

/// Category of a single field violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Required field absent or null
    MissingField,

    /// Value not among the declared labels of an enumerated field
    InvalidEnumValue,

    /// Numeric value outside its declared bounds
    OutOfRange,

    /// Value of the wrong type or an unparseable timestamp
    InvalidFormat,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ViolationKind::MissingField => "missing field",
            ViolationKind::InvalidEnumValue => "invalid enum value",
            ViolationKind::OutOfRange => "out of range",
            ViolationKind::InvalidFormat => "invalid format",
        };
        f.write_str(label)
    }
}

/// One violated field. `field` is a path such as `amount` or `attendees[2].email`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub field: String,
    pub kind: ViolationKind,
    pub message: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind,
            message: message.into(),
        }
    }

    pub fn missing(field: impl Into<String>) -> Self {
        let field = field.into();
        let message = format!("{} is required", field);
        Self::new(field, ViolationKind::MissingField, message)
    }
}

/// Every violation found while constructing one record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    pub record: &'static str,
    pub violations: Vec<Violation>,
}

impl ValidationError {
    pub fn new(record: &'static str, violations: Vec<Violation>) -> Self {
        Self { record, violations }
    }

    /// Violations recorded against `field`
    pub fn for_field<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a Violation> + 'a {
        self.violations.iter().filter(move |v| v.field == field)
    }

    pub fn has(&self, field: &str, kind: ViolationKind) -> bool {
        self.for_field(field).any(|v| v.kind == kind)
    }

    /// Render as the `{"error", "fields"}` body used for rejected payloads
    pub fn to_response(&self) -> ErrorResponse {
        let mut fields = serde_json::Map::new();
        for violation in &self.violations {
            let entry = fields
                .entry(violation.field.clone())
                .or_insert_with(|| serde_json::json!({"errors": []}));
            if let Some(errors) = entry.get_mut("errors").and_then(|e| e.as_array_mut()) {
                errors.push(serde_json::Value::String(violation.message.clone()));
            }
        }

        ErrorResponse {
            error: format!("{} validation failed", self.record),
            fields: serde_json::Value::Object(fields),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation failed: ", self.record)?;
        for (i, violation) in self.violations.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{} ({}): {}", violation.field, violation.kind, violation.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub fields: serde_json::Value,
}

/// Convert `validator` range failures into `OutOfRange` violations, sorted by field.
pub fn range_violations(errors: &validator::ValidationErrors) -> Vec<Violation> {
    let mut violations: Vec<Violation> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errors)| {
            let field = field.to_string();
            errors.iter().map(move |e| {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Validation error in field: {}", field));
                Violation::new(field.clone(), ViolationKind::OutOfRange, message)
            })
        })
        .collect();

    violations.sort_by(|a, b| a.field.cmp(&b.field));
    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ValidationError {
        ValidationError::new(
            "Expense",
            vec![
                Violation::missing("description"),
                Violation::new(
                    "amount",
                    ViolationKind::OutOfRange,
                    "amount must be greater than 0",
                ),
                Violation::new("category", ViolationKind::InvalidEnumValue, "unknown category"),
            ],
        )
    }

    #[test]
    fn lookup_by_field_and_kind() {
        let err = sample();
        assert!(err.has("amount", ViolationKind::OutOfRange));
        assert!(!err.has("amount", ViolationKind::MissingField));
        assert_eq!(err.for_field("description").count(), 1);
    }

    #[test]
    fn display_lists_every_violation() {
        let text = sample().to_string();
        assert!(text.starts_with("Expense validation failed"));
        assert!(text.contains("description (missing field)"));
        assert!(text.contains("amount (out of range)"));
        assert!(text.contains("category (invalid enum value)"));
    }

    #[test]
    fn response_groups_messages_per_field() {
        let response = sample().to_response();
        assert_eq!(response.error, "Expense validation failed");
        assert_eq!(
            response.fields["amount"]["errors"],
            serde_json::json!(["amount must be greater than 0"])
        );
        assert_eq!(
            response.fields["description"]["errors"][0],
            "description is required"
        );
    }

    #[test]
    fn kinds_serialize_snake_case() {
        let value = serde_json::to_value(ViolationKind::InvalidEnumValue).unwrap();
        assert_eq!(value, "invalid_enum_value");
    }
}
