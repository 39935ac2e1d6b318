pub mod batch;
pub mod calendar;
pub mod clock;
pub mod expense;
pub(crate) mod reader;
pub mod validation;

use serde::Serialize;
use serde_json::Value;

use self::clock::{Clock, SystemClock};
use self::validation::ValidationError;

// Re-export commonly used types
pub use batch::{validate_batch, BatchReport, RecordError};
pub use calendar::{Job, JobStatus, Meeting, MeetingAttendee, MeetingStatus};
pub use clock::FixedClock;
pub use expense::{
    Expense, ExpenseCategory, ExpenseCreate, ExpenseResponse, ExpenseService, ExpenseSummary,
    ExpenseUpdate,
};
pub use validation::{ErrorResponse, Violation, ViolationKind};

/// A record kind that can be validated from untyped input and serialized back.
pub trait Record: Sized + Serialize {
    /// Name reported in validation errors
    const KIND: &'static str;

    /// Validate `raw` and construct the record, reading defaulted timestamps from `clock`
    fn from_raw_with(raw: &Value, clock: &dyn Clock) -> Result<Self, ValidationError>;

    /// Validate `raw` against the wall clock
    fn from_raw(raw: &Value) -> Result<Self, ValidationError> {
        Self::from_raw_with(raw, &SystemClock)
    }

    /// Canonical JSON form: identifiers as strings, timestamps as RFC 3339, enums as labels
    fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
