//! Validated record schemas for a field-service backend: jobs, meetings and
//! expenses, with their create/update/response projections.

pub mod cli;
pub mod config;
pub mod logging;
pub mod schema;

pub use schema::clock::{Clock, FixedClock, SystemClock};
pub use schema::validation::{ValidationError, Violation, ViolationKind};
pub use schema::Record;
