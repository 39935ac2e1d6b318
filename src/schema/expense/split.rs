use serde::Serialize;

use crate::schema::clock::Clock;
use crate::schema::validation::{ValidationError, Violation, ViolationKind};

use super::models::Expense;
use super::vat::round_cents;

/// Largest gap tolerated between the declared shares and the whole
pub const SPLIT_TOLERANCE: f64 = 0.01;

/// How an expense is divided. Shares keep their input order.
#[derive(Debug, Clone, PartialEq)]
pub enum SplitMethod {
    /// Same share for every participant
    Equal(Vec<String>),

    /// Participant and percentage of the whole; percentages sum to 100
    Percentage(Vec<(String, f64)>),

    /// Participant and net amount; amounts sum to the expense amount
    Amount(Vec<(String, f64)>),
}

impl SplitMethod {
    pub fn label(&self) -> &'static str {
        match self {
            SplitMethod::Equal(_) => "equal",
            SplitMethod::Percentage(_) => "percentage",
            SplitMethod::Amount(_) => "amount",
        }
    }
}

/// One participant's part of a split expense
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct SplitShare {
    pub original_expense_id: String,
    pub participant: String,
    pub split_method: &'static str,
    pub expense: Expense,
}

const RECORD: &str = "ExpenseSplit";

fn imbalance(field: &str, message: String) -> ValidationError {
    ValidationError::new(
        RECORD,
        vec![Violation::new(field, ViolationKind::OutOfRange, message)],
    )
}

/// Divide `expense` into one new expense per participant.
///
/// Amount and VAT of each share are rounded to cents, VAT in proportion to the
/// share of the amount. Share ids are `<id>-split-<n>` counting from 1, and
/// every share is stamped with `clock`.
pub fn split_expense(
    expense: &Expense,
    method: &SplitMethod,
    clock: &dyn Clock,
) -> Result<Vec<SplitShare>, ValidationError> {
    // (participant, fraction of the whole, net amount, description suffix)
    let parts: Vec<(&str, f64, f64, String)> = match method {
        SplitMethod::Equal(participants) => {
            if participants.is_empty() {
                return Err(imbalance(
                    "participants",
                    "participants must not be empty".to_string(),
                ));
            }
            let fraction = 1.0 / participants.len() as f64;
            participants
                .iter()
                .map(|p| (p.as_str(), fraction, expense.amount * fraction, p.clone()))
                .collect()
        }
        SplitMethod::Percentage(percentages) => {
            let sum: f64 = percentages.iter().map(|(_, pct)| pct).sum();
            if percentages.is_empty() || (sum - 100.0).abs() > SPLIT_TOLERANCE {
                return Err(imbalance(
                    "percentages",
                    format!("percentages must sum to 100, got {}", sum),
                ));
            }
            percentages
                .iter()
                .map(|(p, pct)| {
                    let fraction = pct / 100.0;
                    let suffix = format!("{} {}%", p, pct);
                    (p.as_str(), fraction, expense.amount * fraction, suffix)
                })
                .collect()
        }
        SplitMethod::Amount(amounts) => {
            let sum: f64 = amounts.iter().map(|(_, amount)| amount).sum();
            if amounts.is_empty() || (sum - expense.amount).abs() > SPLIT_TOLERANCE {
                return Err(imbalance(
                    "amounts",
                    format!("amounts must sum to {}, got {}", expense.amount, sum),
                ));
            }
            amounts
                .iter()
                .map(|(p, amount)| (p.as_str(), amount / expense.amount, *amount, p.clone()))
                .collect()
        }
    };

    let now = clock.now();
    let mut shares = Vec::with_capacity(parts.len());

    for (n, (participant, fraction, amount, suffix)) in parts.into_iter().enumerate() {
        let share = Expense {
            id: format!("{}-split-{}", expense.id, n + 1),
            description: format!("{} (Split - {})", expense.description, suffix),
            amount: round_cents(amount),
            vat_amount: round_cents(expense.vat_amount * fraction),
            created_at: now,
            updated_at: now,
            ..expense.clone()
        };
        share.check()?;

        shares.push(SplitShare {
            original_expense_id: expense.id.clone(),
            participant: participant.to_string(),
            split_method: method.label(),
            expense: share,
        });
    }

    Ok(shares)
}
