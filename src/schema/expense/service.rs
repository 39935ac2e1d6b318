use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::schema::clock::Clock;
use crate::schema::validation::{ValidationError, Violation, ViolationKind};

use super::dto::{ExpenseCreate, ExpenseUpdate};
use super::models::{Expense, ExpenseCategory, ExpenseFigures};
use super::split::{split_expense, SplitMethod, SplitShare};
use super::vat::{round_cents, VatBreakdown};

/// Per-category totals inside an [`ExpenseSummary`]
#[derive(Debug, Serialize, Clone, PartialEq, Default)]
pub struct CategoryTotals {
    pub count: usize,
    pub amount: f64,
    pub vat: f64,
    pub total: f64,
}

/// Totals over a set of expenses, rounded to cents
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ExpenseSummary {
    pub currency: String,
    pub count: usize,
    pub total_amount: f64,
    pub total_vat: f64,
    pub total_with_vat: f64,
    pub by_category: BTreeMap<ExpenseCategory, CategoryTotals>,
}

/// VAT calculation result in the configured currency
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct VatQuote {
    #[serde(flatten)]
    pub breakdown: VatBreakdown,
    pub currency: String,
    pub amount_includes_vat: bool,
}

/// OutOfRange for every named figure that is not finite
fn require_finite(record: &'static str, figures: &[(&str, f64)]) -> Result<(), ValidationError> {
    let violations: Vec<Violation> = figures
        .iter()
        .filter(|(_, value)| !value.is_finite())
        .map(|(field, value)| {
            let message = format!("{} overflowed to {}", field, value);
            Violation::new(*field, ViolationKind::OutOfRange, message)
        })
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::new(record, violations))
    }
}

/// Expense service containing the create/update transitions and reporting
pub struct ExpenseService {
    default_vat_rate: f64,
    currency: String,
}

impl ExpenseService {
    /// Create a new ExpenseService instance
    pub fn new(default_vat_rate: f64, currency: impl Into<String>) -> Self {
        Self {
            default_vat_rate,
            currency: currency.into(),
        }
    }

    /// Turn a validated create payload into a stored record under `id`
    pub fn create(
        &self,
        input: ExpenseCreate,
        id: impl Into<String>,
        clock: &dyn Clock,
    ) -> Result<Expense, ValidationError> {
        info!("Service: Creating expense description={}", input.description);

        let expense = input.into_expense(id, clock)?;

        info!(
            "Service: Expense {} created: amount={} vat_amount={} {}",
            expense.id, expense.amount, expense.vat_amount, self.currency
        );
        Ok(expense)
    }

    /// Apply a partial update, returning the new record
    pub fn update(
        &self,
        current: &Expense,
        patch: &ExpenseUpdate,
        clock: &dyn Clock,
    ) -> Result<Expense, ValidationError> {
        if patch.is_empty() {
            warn!("Service: Empty update for expense {}", current.id);
        }

        let updated = patch.apply(current, clock)?;
        debug!(
            "Service: Expense {} updated: amount {} -> {}, vat_amount {} -> {}",
            current.id, current.amount, updated.amount, current.vat_amount, updated.vat_amount
        );
        Ok(updated)
    }

    /// VAT breakdown for `amount`. `rate` falls back to the configured default.
    pub fn calculate_vat(
        &self,
        amount: f64,
        rate: Option<f64>,
        amount_includes_vat: bool,
    ) -> Result<VatQuote, ValidationError> {
        let rate = rate.unwrap_or(self.default_vat_rate);
        ExpenseFigures {
            amount: Some(amount),
            vat_rate: Some(rate),
            ..Default::default()
        }
        .check("VatCalculation")?;

        let breakdown = if amount_includes_vat {
            VatBreakdown::from_gross(amount, rate)
        } else {
            VatBreakdown::from_net(amount, rate)
        };
        require_finite(
            "VatCalculation",
            &[
                ("net_amount", breakdown.net_amount),
                ("vat_amount", breakdown.vat_amount),
                ("total_amount", breakdown.total_amount),
            ],
        )?;

        Ok(VatQuote {
            breakdown,
            currency: self.currency.clone(),
            amount_includes_vat,
        })
    }

    /// Split `expense` between participants, see [`split_expense`]
    pub fn split(
        &self,
        expense: &Expense,
        method: &SplitMethod,
        clock: &dyn Clock,
    ) -> Result<Vec<SplitShare>, ValidationError> {
        info!(
            "Service: Splitting expense {} method={}",
            expense.id,
            method.label()
        );

        match split_expense(expense, method, clock) {
            Ok(shares) => {
                info!(
                    "Service: Expense {} split into {} shares",
                    expense.id,
                    shares.len()
                );
                Ok(shares)
            }
            Err(e) => {
                warn!("Service: Split of expense {} rejected: {}", expense.id, e);
                Err(e)
            }
        }
    }

    /// Totals overall and per category.
    ///
    /// # Errors
    /// OutOfRange when a total overflows to infinity.
    pub fn summarize(&self, expenses: &[Expense]) -> Result<ExpenseSummary, ValidationError> {
        info!("Service: Summarizing {} expenses", expenses.len());

        let mut by_category: BTreeMap<ExpenseCategory, CategoryTotals> = BTreeMap::new();
        let mut total_amount = 0.0;
        let mut total_vat = 0.0;

        for expense in expenses {
            total_amount += expense.amount;
            total_vat += expense.vat_amount;

            let totals = by_category.entry(expense.category).or_default();
            totals.count += 1;
            totals.amount += expense.amount;
            totals.vat += expense.vat_amount;
            totals.total += expense.total();
        }

        let total_with_vat = total_amount + total_vat;
        let overflow = require_finite(
            "ExpenseSummary",
            &[
                ("total_amount", total_amount),
                ("total_vat", total_vat),
                ("total_with_vat", total_with_vat),
            ],
        );
        if let Err(e) = overflow {
            warn!("Service: Summary of {} expenses rejected: {}", expenses.len(), e);
            return Err(e);
        }

        for totals in by_category.values_mut() {
            totals.amount = round_cents(totals.amount);
            totals.vat = round_cents(totals.vat);
            totals.total = round_cents(totals.total);
        }

        Ok(ExpenseSummary {
            currency: self.currency.clone(),
            count: expenses.len(),
            total_amount: round_cents(total_amount),
            total_vat: round_cents(total_vat),
            total_with_vat: round_cents(total_with_vat),
            by_category,
        })
    }
}
