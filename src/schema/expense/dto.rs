use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::schema::clock::Clock;
use crate::schema::reader::FieldReader;
use crate::schema::validation::ValidationError;
use crate::schema::Record;

use super::models::{Expense, ExpenseCategory, ExpenseFigures};
use super::vat;

/// VAT rate applied when a create payload does not name one
pub const DEFAULT_VAT_RATE: f64 = 20.0;

/// Input for creating an expense. `vat_amount` is derived, not supplied.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ExpenseCreate {
    pub description: String,
    pub amount: f64,
    pub vat_rate: f64,
    pub category: ExpenseCategory,
    pub date: DateTime<Utc>,
    pub notes: Option<String>,
    pub receipt_url: Option<String>,
}

impl ExpenseCreate {
    /// Build the stored record under `id`, deriving `vat_amount` rounded to cents
    pub fn into_expense(
        self,
        id: impl Into<String>,
        clock: &dyn Clock,
    ) -> Result<Expense, ValidationError> {
        let now = clock.now();
        let expense = Expense {
            id: id.into(),
            vat_amount: vat::vat_amount(self.amount, self.vat_rate),
            description: self.description,
            amount: self.amount,
            vat_rate: self.vat_rate,
            category: self.category,
            date: self.date,
            notes: self.notes,
            receipt_url: self.receipt_url,
            created_at: now,
            updated_at: now,
        };
        expense.check()?;
        Ok(expense)
    }
}

impl Record for ExpenseCreate {
    const KIND: &'static str = "ExpenseCreate";

    fn from_raw_with(raw: &Value, _clock: &dyn Clock) -> Result<Self, ValidationError> {
        let mut r = FieldReader::new(raw, Self::KIND)?;

        let description = r.required_str("description");
        let amount = r.required_number("amount");
        let vat_rate = r.number_or("vat_rate", DEFAULT_VAT_RATE);
        let category = r.required_label::<ExpenseCategory>("category");
        let date = r.required_timestamp("date");
        let notes = r.optional_str("notes");
        let receipt_url = r.optional_str("receipt_url");

        r.check(&ExpenseFigures {
            amount,
            vat_rate,
            ..Default::default()
        });

        match (description, amount, vat_rate, category, date) {
            (Some(description), Some(amount), Some(vat_rate), Some(category), Some(date))
                if r.is_clean() =>
            {
                Ok(Self {
                    description,
                    amount,
                    vat_rate,
                    category,
                    date,
                    notes,
                    receipt_url,
                })
            }
            _ => Err(r.into_error()),
        }
    }
}

/// Partial update. A `None` field leaves the stored value unchanged.
#[derive(Debug, Serialize, Clone, PartialEq, Default)]
pub struct ExpenseUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vat_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ExpenseCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_url: Option<String>,
}

impl ExpenseUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Produce the updated record. `vat_amount` is recomputed when `amount` or
    /// `vat_rate` is present; `id` and `created_at` carry over.
    pub fn apply(&self, current: &Expense, clock: &dyn Clock) -> Result<Expense, ValidationError> {
        ExpenseFigures {
            amount: self.amount,
            vat_rate: self.vat_rate,
            ..Default::default()
        }
        .check(Self::KIND)?;

        let amount = self.amount.unwrap_or(current.amount);
        let vat_rate = self.vat_rate.unwrap_or(current.vat_rate);
        let vat_amount = if self.amount.is_some() || self.vat_rate.is_some() {
            vat::vat_amount(amount, vat_rate)
        } else {
            current.vat_amount
        };

        let updated = Expense {
            id: current.id.clone(),
            description: self
                .description
                .clone()
                .unwrap_or_else(|| current.description.clone()),
            amount,
            vat_amount,
            vat_rate,
            category: self.category.unwrap_or(current.category),
            date: self.date.unwrap_or(current.date),
            notes: self.notes.clone().or_else(|| current.notes.clone()),
            receipt_url: self
                .receipt_url
                .clone()
                .or_else(|| current.receipt_url.clone()),
            created_at: current.created_at,
            updated_at: clock.now(),
        };
        updated.check()?;
        Ok(updated)
    }
}

impl Record for ExpenseUpdate {
    const KIND: &'static str = "ExpenseUpdate";

    fn from_raw_with(raw: &Value, _clock: &dyn Clock) -> Result<Self, ValidationError> {
        let mut r = FieldReader::new(raw, Self::KIND)?;

        let update = Self {
            description: r.optional_str("description"),
            amount: r.optional_number("amount"),
            vat_rate: r.optional_number("vat_rate"),
            category: r.optional_label::<ExpenseCategory>("category"),
            date: r.optional_timestamp("date"),
            notes: r.optional_str("notes"),
            receipt_url: r.optional_str("receipt_url"),
        };

        r.check(&ExpenseFigures {
            amount: update.amount,
            vat_rate: update.vat_rate,
            ..Default::default()
        });

        if r.is_clean() {
            Ok(update)
        } else {
            Err(r.into_error())
        }
    }
}

/// Output projection of a stored expense, identifier rendered as `id`
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ExpenseResponse {
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

impl From<Expense> for ExpenseResponse {
    fn from(expense: Expense) -> Self {
        Self {
            id: expense.id,
            description: expense.description,
            amount: expense.amount,
            vat_amount: expense.vat_amount,
            vat_rate: expense.vat_rate,
            category: expense.category,
            date: expense.date,
            notes: expense.notes,
            receipt_url: expense.receipt_url,
            created_at: expense.created_at,
            updated_at: expense.updated_at,
        }
    }
}

impl Record for ExpenseResponse {
    const KIND: &'static str = "ExpenseResponse";

    /// Shape check only; bounds belong to the stored record
    fn from_raw_with(raw: &Value, _clock: &dyn Clock) -> Result<Self, ValidationError> {
        let mut r = FieldReader::new(raw, Self::KIND)?;

        let id = r.required_str("id");
        let description = r.required_str("description");
        let amount = r.required_number("amount");
        let vat_amount = r.required_number("vat_amount");
        let vat_rate = r.required_number("vat_rate");
        let category = r.required_label::<ExpenseCategory>("category");
        let date = r.required_timestamp("date");
        let notes = r.optional_str("notes");
        let receipt_url = r.optional_str("receipt_url");
        let created_at = r.required_timestamp("created_at");
        let updated_at = r.required_timestamp("updated_at");

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
