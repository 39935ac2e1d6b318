pub mod dto;
pub mod models;
pub mod service;
pub mod split;
pub mod vat;

// Re-export commonly used types
pub use dto::{ExpenseCreate, ExpenseResponse, ExpenseUpdate, DEFAULT_VAT_RATE};
pub use models::{Expense, ExpenseCategory};
pub use service::{CategoryTotals, ExpenseService, ExpenseSummary, VatQuote};
pub use split::{split_expense, SplitMethod, SplitShare};
pub use vat::VatBreakdown;
