use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::schema::clock::{Clock, SystemClock};
use crate::schema::expense::SplitMethod;
use crate::schema::validation::{ValidationError, Violation, ViolationKind};
use crate::schema::{
    validate_batch, Expense, ExpenseCreate, ExpenseResponse, ExpenseService, ExpenseUpdate, Job,
    Meeting, MeetingAttendee, Record,
};

#[derive(Parser, Debug)]
#[command(name = "fieldbook", version, about = "Validate field-service records")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate a record (or an array of records) and print the canonical form
    Validate {
        #[arg(long, value_enum)]
        kind: Kind,
        /// JSON input file, stdin when omitted
        file: Option<PathBuf>,
    },

    /// Turn an expense create payload into a stored expense
    CreateExpense {
        #[arg(long)]
        id: String,
        file: Option<PathBuf>,
    },

    /// Net / VAT / gross breakdown of an amount
    Vat {
        #[arg(long)]
        amount: f64,
        /// Percentage; the configured default when omitted
        #[arg(long)]
        rate: Option<f64>,
        /// The amount already includes VAT
        #[arg(long)]
        gross: bool,
    },

    /// Totals over an array of stored expenses
    Summary { file: Option<PathBuf> },

    /// Split a stored expense between participants
    Split {
        #[arg(long, value_enum, default_value_t = SplitBy::Equal)]
        by: SplitBy,
        /// Participant name, or `name=value` when splitting by percentage or amount
        #[arg(long = "share", required = true)]
        shares: Vec<String>,
        file: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SplitBy {
    Equal,
    Percentage,
    Amount,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    Job,
    Meeting,
    MeetingAttendee,
    Expense,
    ExpenseCreate,
    ExpenseUpdate,
    ExpenseResponse,
}

/// CLI-level errors
#[derive(Debug)]
pub enum CliError {
    /// Input could not be read or output could not be written
    Io(io::Error),

    /// Input is not JSON
    Json(serde_json::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Io(e) => write!(f, "I/O error: {}", e),
            CliError::Json(e) => write!(f, "JSON error: {}", e),
        }
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Json(e)
    }
}

/// Run one command. `Ok(false)` means the input was rejected.
pub fn run(cli: &Cli, config: &Config, out: &mut dyn Write) -> Result<bool, CliError> {
    let service = ExpenseService::new(config.default_vat_rate, config.default_currency.clone());
    let clock = SystemClock;

    match &cli.command {
        Command::Validate { kind, file } => {
            let raw = read_input(file.as_deref())?;
            validate_records(*kind, &raw, &clock, out)
        }
        Command::CreateExpense { id, file } => {
            let raw = read_input(file.as_deref())?;
            create_expense(&service, id, &raw, &clock, out)
        }
        Command::Vat {
            amount,
            rate,
            gross,
        } => match service.calculate_vat(*amount, *rate, *gross) {
            Ok(quote) => {
                print_json(out, &quote)?;
                Ok(true)
            }
            Err(err) => {
                warn!("{}", err);
                print_json(out, &err.to_response())?;
                Ok(false)
            }
        },
        Command::Summary { file } => {
            let raw = read_input(file.as_deref())?;
            summarize(&service, &raw, &clock, out)
        }
        Command::Split { by, shares, file } => {
            let raw = read_input(file.as_deref())?;
            split(&service, *by, shares, &raw, &clock, out)
        }
    }
}

fn read_input(file: Option<&Path>) -> Result<Value, CliError> {
    match file {
        Some(path) => {
            debug!("Reading input from {}", path.display());
            let reader = BufReader::new(File::open(path)?);
            Ok(serde_json::from_reader(reader)?)
        }
        None => {
            debug!("Reading input from stdin");
            Ok(serde_json::from_reader(io::stdin().lock())?)
        }
    }
}

fn print_json<T: Serialize>(out: &mut dyn Write, value: &T) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value)?;
    writeln!(out, "{}", text)?;
    Ok(())
}

fn validate_as<R: Record>(
    raw: &Value,
    clock: &dyn Clock,
    out: &mut dyn Write,
) -> Result<bool, CliError> {
    let report = validate_batch::<R>(raw, clock);
    print_json(out, &report)?;
    Ok(report.is_clean())
}

/// Validate `raw` as records of `kind` and print the batch report
pub fn validate_records(
    kind: Kind,
    raw: &Value,
    clock: &dyn Clock,
    out: &mut dyn Write,
) -> Result<bool, CliError> {
    info!("Validating input as {:?}", kind);
    match kind {
        Kind::Job => validate_as::<Job>(raw, clock, out),
        Kind::Meeting => validate_as::<Meeting>(raw, clock, out),
        Kind::MeetingAttendee => validate_as::<MeetingAttendee>(raw, clock, out),
        Kind::Expense => validate_as::<Expense>(raw, clock, out),
        Kind::ExpenseCreate => validate_as::<ExpenseCreate>(raw, clock, out),
        Kind::ExpenseUpdate => validate_as::<ExpenseUpdate>(raw, clock, out),
        Kind::ExpenseResponse => validate_as::<ExpenseResponse>(raw, clock, out),
    }
}

/// Validate a create payload and print the stored expense it becomes
pub fn create_expense(
    service: &ExpenseService,
    id: &str,
    raw: &Value,
    clock: &dyn Clock,
    out: &mut dyn Write,
) -> Result<bool, CliError> {
    let created = ExpenseCreate::from_raw_with(raw, clock)
        .and_then(|input| service.create(input, id, clock));

    match created {
        Ok(expense) => {
            print_json(out, &expense)?;
            Ok(true)
        }
        Err(err) => {
            warn!("{}", err);
            print_json(out, &err.to_response())?;
            Ok(false)
        }
    }
}

/// Summarize stored expenses; any invalid element rejects the whole input
pub fn summarize(
    service: &ExpenseService,
    raw: &Value,
    clock: &dyn Clock,
    out: &mut dyn Write,
) -> Result<bool, CliError> {
    let report = validate_batch::<Expense>(raw, clock);
    if !report.is_clean() {
        print_json(out, &report.errors)?;
        return Ok(false);
    }

    match service.summarize(&report.accepted) {
        Ok(summary) => {
            print_json(out, &summary)?;
            Ok(true)
        }
        Err(err) => {
            warn!("{}", err);
            print_json(out, &err.to_response())?;
            Ok(false)
        }
    }
}

/// Build a split method from `--share` arguments
pub fn split_method(by: SplitBy, shares: &[String]) -> Result<SplitMethod, ValidationError> {
    if by == SplitBy::Equal {
        return Ok(SplitMethod::Equal(shares.to_vec()));
    }

    let mut parsed = Vec::with_capacity(shares.len());
    let mut violations = Vec::new();
    for (i, share) in shares.iter().enumerate() {
        let pair = share.rsplit_once('=').and_then(|(name, value)| {
            let value = value.trim().parse::<f64>().ok()?;
            Some((name.trim().to_string(), value))
        });
        match pair {
            Some(pair) => parsed.push(pair),
            None => violations.push(Violation::new(
                format!("shares[{}]", i),
                ViolationKind::InvalidFormat,
                format!("shares[{}]: expected name=number, got {:?}", i, share),
            )),
        }
    }

    if !violations.is_empty() {
        return Err(ValidationError::new("ExpenseSplit", violations));
    }
    Ok(match by {
        SplitBy::Percentage => SplitMethod::Percentage(parsed),
        _ => SplitMethod::Amount(parsed),
    })
}

/// Split one stored expense and print the shares
pub fn split(
    service: &ExpenseService,
    by: SplitBy,
    shares: &[String],
    raw: &Value,
    clock: &dyn Clock,
    out: &mut dyn Write,
) -> Result<bool, CliError> {
    let result = split_method(by, shares).and_then(|method| {
        let expense = Expense::from_raw_with(raw, clock)?;
        service.split(&expense, &method, clock)
    });

    match result {
        Ok(shares) => {
            print_json(out, &shares)?;
            Ok(true)
        }
        Err(err) => {
            warn!("{}", err);
            print_json(out, &err.to_response())?;
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::clock::FixedClock;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap())
    }

    fn output(buf: Vec<u8>) -> Value {
        serde_json::from_slice(&buf).unwrap()
    }

    fn stored(id: &str, amount: f64, category: &str) -> Value {
        json!({
            "_id": id,
            "description": "Fuel",
            "amount": amount,
            "vat_amount": amount * 0.2,
            "vat_rate": 20.0,
            "category": category,
            "date": "2024-01-01",
        })
    }

    #[test]
    fn parses_validate_command() {
        let args = ["fieldbook", "validate", "--kind", "meeting-attendee", "in.json"];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::Validate { kind, file } => {
                assert_eq!(kind, Kind::MeetingAttendee);
                assert_eq!(file, Some(PathBuf::from("in.json")));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn parses_vat_command() {
        let cli = Cli::try_parse_from(["fieldbook", "vat", "--amount", "120", "--gross"]).unwrap();
        match cli.command {
            Command::Vat { amount, rate, gross } => {
                assert_eq!(amount, 120.0);
                assert_eq!(rate, None);
                assert!(gross);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!(Cli::try_parse_from(["fieldbook", "validate", "--kind", "invoice"]).is_err());
    }

    #[test]
    fn validate_prints_canonical_records() {
        let raw = json!({
            "id": "j-1",
            "title": "Fit radiator",
            "clientId": "c-1",
            "assignedTo": "w-1",
            "startTime": "2024-05-02T09:00:00+02:00",
            "endTime": "2024-05-02T11:00:00+02:00",
        });
        let mut buf = Vec::new();
        assert!(validate_records(Kind::Job, &raw, &clock(), &mut buf).unwrap());
        let printed = output(buf);
        assert_eq!(printed["accepted"][0]["_id"], "j-1");
        assert_eq!(printed["accepted"][0]["startTime"], "2024-05-02T07:00:00Z");
        assert_eq!(printed["errors"], json!([]));
    }

    #[test]
    fn validate_reports_rejections() {
        let raw = json!([{"amount": -1}]);
        let mut buf = Vec::new();
        assert!(!validate_records(Kind::ExpenseUpdate, &raw, &clock(), &mut buf).unwrap());
        let printed = output(buf);
        assert_eq!(printed["errors"][0]["index"], 0);
        assert_eq!(printed["errors"][0]["errors"][0]["kind"], "out_of_range");
    }

    #[test]
    fn create_expense_prints_stored_record() {
        let service = ExpenseService::new(20.0, "EUR");
        let raw = json!({
            "description": "Fuel",
            "amount": 50.0,
            "category": "Transport",
            "date": "2024-01-01T00:00:00Z",
        });
        let mut buf = Vec::new();
        assert!(create_expense(&service, "e-1", &raw, &clock(), &mut buf).unwrap());
        let printed = output(buf);
        assert_eq!(printed["_id"], "e-1");
        assert_eq!(printed["vat_amount"], 10.0);
        assert_eq!(printed["created_at"], "2024-05-01T00:00:00Z");
    }

    #[test]
    fn create_expense_prints_error_body() {
        let service = ExpenseService::new(20.0, "EUR");
        let raw = json!({
            "description": "Snacks",
            "amount": 3.0,
            "category": "Snacks",
            "date": "2024-01-01",
        });
        let mut buf = Vec::new();
        assert!(!create_expense(&service, "e-2", &raw, &clock(), &mut buf).unwrap());
        let printed = output(buf);
        assert_eq!(printed["error"], "ExpenseCreate validation failed");
        assert!(printed["fields"]["category"]["errors"][0]
            .as_str()
            .unwrap()
            .contains("Snacks"));
    }

    #[test]
    fn summary_over_stored_expenses() {
        let service = ExpenseService::new(20.0, "EUR");
        let raw = json!([stored("a", 50.0, "Transport"), stored("b", 30.0, "Materials")]);
        let mut buf = Vec::new();
        assert!(summarize(&service, &raw, &clock(), &mut buf).unwrap());
        let printed = output(buf);
        assert_eq!(printed["count"], 2);
        assert_eq!(printed["total_with_vat"], 96.0);
        assert_eq!(printed["by_category"]["Transport"]["count"], 1);
    }

    #[test]
    fn summary_overflow_prints_error_body() {
        let service = ExpenseService::new(20.0, "EUR");
        let raw = json!([stored("a", 1e308, "Labor"), stored("b", 1e308, "Labor")]);
        let mut buf = Vec::new();
        assert!(!summarize(&service, &raw, &clock(), &mut buf).unwrap());
        let printed = output(buf);
        assert_eq!(printed["error"], "ExpenseSummary validation failed");
        assert!(printed["fields"]["total_amount"].is_object());
    }

    #[test]
    fn parses_split_command() {
        let args = ["fieldbook", "split", "--by", "percentage", "--share", "Ana=60"];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::Split { by, shares, file } => {
                assert_eq!(by, SplitBy::Percentage);
                assert_eq!(shares, vec!["Ana=60".to_string()]);
                assert_eq!(file, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert!(Cli::try_parse_from(["fieldbook", "split"]).is_err());
    }

    #[test]
    fn split_method_parses_named_values() {
        let shares = vec!["Ana=60".to_string(), "Ben = 40".to_string()];
        let method = split_method(SplitBy::Percentage, &shares).unwrap();
        assert_eq!(
            method,
            SplitMethod::Percentage(vec![("Ana".to_string(), 60.0), ("Ben".to_string(), 40.0)])
        );

        let err = split_method(SplitBy::Amount, &["Ana".to_string()]).unwrap_err();
        assert!(err.has("shares[0]", ViolationKind::InvalidFormat));
    }

    #[test]
    fn split_prints_shares() {
        let service = ExpenseService::new(20.0, "EUR");
        let shares = vec!["Ana=30".to_string(), "Ben=20".to_string()];
        let mut buf = Vec::new();
        let raw = stored("e-3", 50.0, "Transport");
        assert!(split(&service, SplitBy::Amount, &shares, &raw, &clock(), &mut buf).unwrap());
        let printed = output(buf);
        assert_eq!(printed[0]["original_expense_id"], "e-3");
        assert_eq!(printed[0]["split_method"], "amount");
        assert_eq!(printed[0]["expense"]["_id"], "e-3-split-1");
        assert_eq!(printed[1]["expense"]["vat_amount"], 4.0);
    }
}
