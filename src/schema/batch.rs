use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use super::clock::Clock;
use super::validation::Violation;
use super::Record;

/// Violations for one rejected element of a batch
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct RecordError {
    pub index: usize,
    pub errors: Vec<Violation>,
}

/// Outcome of validating a batch of raw records
#[derive(Debug, Serialize)]
pub struct BatchReport<R> {
    pub message: String,
    pub accepted: Vec<R>,
    pub errors: Vec<RecordError>,
}

impl<R> BatchReport<R> {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate every element of a JSON array (a lone object is treated as a
/// one-element batch). Valid records are kept; invalid ones are reported by index.
pub fn validate_batch<R: Record>(raw: &Value, clock: &dyn Clock) -> BatchReport<R> {
    let items: Vec<&Value> = match raw {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };

    info!("Validating batch of {} {} records", items.len(), R::KIND);

    let mut accepted = Vec::new();
    let mut errors = Vec::new();

    for (index, item) in items.into_iter().enumerate() {
        match R::from_raw_with(item, clock) {
            Ok(record) => accepted.push(record),
            Err(err) => {
                warn!("Validation failed for {} #{}: {}", R::KIND, index, err);
                errors.push(RecordError {
                    index,
                    errors: err.violations,
                });
            }
        }
    }

    let error_count = errors.len();
    if error_count == 0 {
        info!("Batch validated successfully: {} accepted", accepted.len());
    } else {
        warn!("Batch validated with {} rejected records", error_count);
    }

    BatchReport {
        message: format!(
            "Batch validation completed. {} accepted, {} rejected",
            accepted.len(),
            error_count
        ),
        accepted,
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::clock::SystemClock;
    use crate::schema::expense::ExpenseCreate;
    use crate::schema::validation::ViolationKind;
    use serde_json::json;

    #[test]
    fn keeps_valid_and_reports_invalid_by_index() {
        let raw = json!([
            {"description": "Fuel", "amount": 50.0, "category": "Transport", "date": "2024-01-01"},
            {"description": "Snacks", "amount": 4.0, "category": "Snacks", "date": "2024-01-01"},
            {"description": "Gloves", "amount": 0, "category": "Materials", "date": "2024-01-02"},
        ]);
        let report = validate_batch::<ExpenseCreate>(&raw, &SystemClock);

        assert_eq!(report.accepted.len(), 1);
        assert_eq!(report.accepted[0].description, "Fuel");
        assert_eq!(report.errors.len(), 2);
        assert_eq!(report.errors[0].index, 1);
        assert_eq!(report.errors[0].errors[0].kind, ViolationKind::InvalidEnumValue);
        assert_eq!(report.errors[1].index, 2);
        assert_eq!(report.errors[1].errors[0].kind, ViolationKind::OutOfRange);
        assert_eq!(report.message, "Batch validation completed. 1 accepted, 2 rejected");
        assert!(!report.is_clean());
    }

    #[test]
    fn single_object_is_a_batch_of_one() {
        let raw = json!({
            "description": "Fuel",
            "amount": 50.0,
            "category": "Transport",
            "date": "2024-01-01",
        });
        let report = validate_batch::<ExpenseCreate>(&raw, &SystemClock);
        assert_eq!(report.accepted.len(), 1);
        assert!(report.is_clean());
    }

    #[test]
    fn scalar_element_is_rejected() {
        let report = validate_batch::<ExpenseCreate>(&json!([7]), &SystemClock);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].errors[0].kind, ViolationKind::InvalidFormat);
    }
}
