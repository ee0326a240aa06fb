use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Header row of the store, in column order.
pub const HEADER: [&str; 4] = ["Date", "Category", "Amount", "Note"];

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One expense row as it sits in the store. Every field is kept as raw text:
/// the file may have been edited by hand, and a row with a garbage amount or date
/// still has to be listed (and deleted) even though aggregation or filtering will
/// skip it.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Expense {
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Amount")]
    pub amount: String,
    #[serde(rename = "Note", default)]
    pub note: String,
}

/// A validated expense, ready to be appended. It is never stored as-is: it goes
/// through `Expense` at serialization time, which is where the date gets its
/// ISO form and the amount loses its trailing zeros.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "Expense")]
pub(crate) struct NewExpense {
    pub date: NaiveDate,
    pub category: String,
    pub amount: Decimal,
    pub note: String,
}

impl From<NewExpense> for Expense {
    fn from(expense: NewExpense) -> Self {
        Self {
            date: expense.date.format(DATE_FORMAT).to_string(),
            category: expense.category,
            amount: expense.amount.normalize().to_string(),
            note: expense.note,
        }
    }
}

/// An expense read back from the store, along with its 1-based position among
/// the data rows. That position is what `delete_at` takes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Listed {
    pub index: usize,
    pub expense: Expense,
}

/// Inclusive date filter, kept as the text the user typed. A bound that isn't a
/// valid date makes the filter match nothing at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DateRange {
    pub start: String,
    pub end: String,
}

impl DateRange {
    pub fn contains(&self, date: &str) -> bool {
        let parse = |s: &str| NaiveDate::parse_from_str(s, DATE_FORMAT).ok();
        match (parse(&self.start), parse(&self.end), parse(date)) {
            (Some(start), Some(end), Some(date)) => start <= date && date <= end,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChartKind {
    Pie,
    Bar,
}

impl FromStr for ChartKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pie" => Ok(Self::Pie),
            "bar" => Ok(Self::Bar),
            other => Err(Error::InvalidChartType(other.to_string())),
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pie => "pie",
            Self::Bar => "bar",
        })
    }
}

/// Everything that can go wrong from the user's point of view. The messages are
/// shown verbatim as notices, which is why they read like sentences.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid date format. Use YYYY-MM-DD.")]
    InvalidDate,
    #[error("Category is required.")]
    MissingCategory,
    #[error("Amount must be a positive number.")]
    InvalidAmount,
    #[error("No expense file found.")]
    StoreMissing,
    /// Carries the index as it appeared in the request, which may not be a number.
    #[error("Invalid expense index for deletion: {0}.")]
    InvalidIndex(String),
    #[error("Invalid chart type requested: {0}.")]
    InvalidChartType(String),
    #[error("No expenses to visualize.")]
    NothingToVisualize,
}
