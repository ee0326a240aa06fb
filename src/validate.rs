use crate::data::{Error, NewExpense, DATE_FORMAT};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;

/// Where "today" comes from when the form leaves the date out.
pub(crate) trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub(crate) struct FixedClock(pub NaiveDate);

#[cfg(test)]
impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Raw fields of the add form; any of them may be missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct AddForm {
    pub date: Option<String>,
    pub category: Option<String>,
    pub amount: Option<String>,
    pub note: Option<String>,
}

/// Checks the form in the order date, category, amount and stops at the first
/// problem, so only one error is ever reported.
pub(crate) fn validate(form: AddForm, clock: &dyn Clock) -> Result<NewExpense, Error> {
    let date = match form.date.as_deref() {
        None | Some("") => clock.today(),
        Some(date) => {
            NaiveDate::parse_from_str(date, DATE_FORMAT).map_err(|_| Error::InvalidDate)?
        }
    };
    let category = form
        .category
        .filter(|c| !c.trim().is_empty())
        .ok_or(Error::MissingCategory)?;
    let amount = form
        .amount
        .as_deref()
        .and_then(parse_amount)
        .filter(|a| a.is_sign_positive() && !a.is_zero())
        .ok_or(Error::InvalidAmount)?;
    Ok(NewExpense {
        date,
        category,
        amount,
        note: form.note.unwrap_or_default(),
    })
}

/// Plain or scientific notation, surrounding blanks ignored.
pub(crate) fn parse_amount(s: &str) -> Option<Decimal> {
    let s = s.trim();
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}
