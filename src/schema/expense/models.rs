use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::schema::clock::Clock;
use crate::schema::reader::FieldReader;
use crate::schema::validation::{range_violations, ValidationError};
use crate::schema::Record;

/// Expense category enum. Labels are capitalised on the wire.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExpenseCategory {
    Materials,
    Transport,
    Equipment,
    Labor,
    Insurance,
    General,
    Training,
    Marketing,
    Others,
}

/// Bounded monetary fields shared by every expense projection.
/// `None` means the field is not part of the value being checked.
/// The `f64::MAX` ceilings keep derived values from leaving as infinity.
#[derive(Debug, Default, Validate)]
pub(crate) struct ExpenseFigures {
    #[validate(range(
        exclusive_min = 0.0,
        max = 1.7976931348623157e308,
        message = "amount must be a finite number greater than 0"
    ))]
    pub amount: Option<f64>,

    #[validate(range(
        min = 0.0,
        max = 1.7976931348623157e308,
        message = "vat_amount must be a finite number greater than or equal to 0"
    ))]
    pub vat_amount: Option<f64>,

    #[validate(range(min = 0.0, max = 100.0, message = "vat_rate must be between 0 and 100"))]
    pub vat_rate: Option<f64>,
}

impl ExpenseFigures {
    pub fn check(&self, record: &'static str) -> Result<(), ValidationError> {
        self.validate()
            .map_err(|errors| ValidationError::new(record, range_violations(&errors)))
    }
}

/// Stored expense. Amounts are in the company currency, `amount` excludes VAT.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Expense {
    #[serde(rename = "_id")]
    pub id: String,
    pub description: String,
    pub amount: f64,
    pub vat_amount: f64,
    pub vat_rate: f64,
    pub category: ExpenseCategory,
    pub date: DateTime<Utc>,
    pub notes: Option<String>,
    pub receipt_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Expense {
    pub(crate) fn figures(&self) -> ExpenseFigures {
        ExpenseFigures {
            amount: Some(self.amount),
            vat_amount: Some(self.vat_amount),
            vat_rate: Some(self.vat_rate),
        }
    }

    /// Re-check the bounds of a value built in code rather than through `from_raw`
    pub fn check(&self) -> Result<(), ValidationError> {
        self.figures().check(Self::KIND)
    }

    /// `amount + vat_amount`
    pub fn total(&self) -> f64 {
        self.amount + self.vat_amount
    }
}

impl Record for Expense {
    const KIND: &'static str = "Expense";

    fn from_raw_with(raw: &Value, clock: &dyn Clock) -> Result<Self, ValidationError> {
        let mut r = FieldReader::new(raw, Self::KIND)?;

        let id = r.identifier();
        let description = r.required_str("description");
        let amount = r.required_number("amount");
        let vat_amount = r.required_number("vat_amount");
        let vat_rate = r.required_number("vat_rate");
        let category = r.required_label::<ExpenseCategory>("category");
        let date = r.required_timestamp("date");
        let notes = r.optional_str("notes");
        let receipt_url = r.optional_str("receipt_url");
        let created_at = r.timestamp_or_now("created_at", clock);
        let updated_at = r.timestamp_or_now("updated_at", clock);

        r.check(&ExpenseFigures {
            amount,
            vat_amount,
            vat_rate,
        });

        match (
            id,
            description,
            amount,
            vat_amount,
            vat_rate,
            category,
            date,
            created_at,
            updated_at,
        ) {
            (
                Some(id),
                Some(description),
                Some(amount),
                Some(vat_amount),
                Some(vat_rate),
                Some(category),
                Some(date),
                Some(created_at),
                Some(updated_at),
            ) if r.is_clean() => Ok(Self {
                id,
                description,
                amount,
                vat_amount,
                vat_rate,
                category,
                date,
                notes,
                receipt_url,
                created_at,
                updated_at,
            }),
            _ => Err(r.into_error()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::clock::FixedClock;
    use crate::schema::validation::ViolationKind;
    use chrono::TimeZone;
    use serde_json::json;

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2024, 1, 2, 8, 0, 0).unwrap())
    }

    fn input() -> Value {
        json!({
            "_id": "e-1",
            "description": "Fuel",
            "amount": 50.0,
            "vat_amount": 10.0,
            "vat_rate": 20.0,
            "category": "Transport",
            "date": "2024-01-01T00:00:00Z",
        })
    }

    #[test]
    fn valid_expense_constructs() {
        let expense = Expense::from_raw_with(&input(), &clock()).unwrap();
        assert_eq!(expense.id, "e-1");
        assert_eq!(expense.category, ExpenseCategory::Transport);
        assert_eq!(expense.total(), 60.0);
        assert_eq!(expense.notes, None);
        assert_eq!(expense.created_at, clock().0);
        assert!(expense.check().is_ok());
    }

    #[test]
    fn integer_amounts_are_numbers() {
        let mut raw = input();
        raw["amount"] = json!(50);
        raw["vat_amount"] = json!(0);
        let expense = Expense::from_raw_with(&raw, &clock()).unwrap();
        assert_eq!(expense.amount, 50.0);
        assert_eq!(expense.vat_amount, 0.0);
    }

    #[test]
    fn bounds_are_enforced() {
        let mut raw = input();
        raw["amount"] = json!(0.0);
        raw["vat_amount"] = json!(-0.01);
        raw["vat_rate"] = json!(100.01);
        let err = Expense::from_raw_with(&raw, &clock()).unwrap_err();
        assert_eq!(err.violations.len(), 3);
        assert!(err.has("amount", ViolationKind::OutOfRange));
        assert!(err.has("vat_amount", ViolationKind::OutOfRange));
        assert!(err.has("vat_rate", ViolationKind::OutOfRange));
    }

    #[test]
    fn range_and_shape_errors_reported_together() {
        let mut raw = input();
        raw["amount"] = json!(-5);
        raw["category"] = json!("Snacks");
        raw.as_object_mut().unwrap().remove("description");
        let err = Expense::from_raw_with(&raw, &clock()).unwrap_err();
        assert!(err.has("amount", ViolationKind::OutOfRange));
        assert!(err.has("category", ViolationKind::InvalidEnumValue));
        assert!(err.has("description", ViolationKind::MissingField));
    }

    #[test]
    fn category_labels_are_capitalised() {
        for label in [
            "Materials",
            "Transport",
            "Equipment",
            "Labor",
            "Insurance",
            "General",
            "Training",
            "Marketing",
            "Others",
        ] {
            let category: ExpenseCategory = serde_json::from_value(json!(label)).unwrap();
            assert_eq!(serde_json::to_value(category).unwrap(), label);
        }
        assert!(serde_json::from_value::<ExpenseCategory>(json!("transport")).is_err());
    }

    #[test]
    fn infinite_vat_amount_fails_check() {
        let mut expense = Expense::from_raw_with(&input(), &clock()).unwrap();
        expense.vat_amount = f64::INFINITY;
        let err = expense.check().unwrap_err();
        assert!(err.has("vat_amount", ViolationKind::OutOfRange));
    }

    #[test]
    fn huge_amount_round_trips() {
        let mut raw = input();
        raw["amount"] = json!(1e307);
        raw["vat_amount"] = json!(2e306);
        let expense = Expense::from_raw_with(&raw, &clock()).unwrap();
        let reparsed = Expense::from_raw_with(&expense.to_value().unwrap(), &clock()).unwrap();
        assert_eq!(reparsed, expense);
    }

    #[test]
    fn serializes_iso_dates_and_stored_id() {
        let expense = Expense::from_raw_with(&input(), &clock()).unwrap();
        let value = expense.to_value().unwrap();
        assert_eq!(value["_id"], "e-1");
        assert_eq!(value["date"], "2024-01-01T00:00:00Z");
        assert_eq!(value["created_at"], "2024-01-02T08:00:00Z");
        assert_eq!(value["category"], "Transport");
        assert_eq!(value["receipt_url"], Value::Null);
    }

    #[test]
    fn check_catches_hand_built_values() {
        let mut expense = Expense::from_raw_with(&input(), &clock()).unwrap();
        expense.vat_rate = 250.0;
        let err = expense.check().unwrap_err();
        assert_eq!(err.record, "Expense");
        assert!(err.has("vat_rate", ViolationKind::OutOfRange));
    }
}
