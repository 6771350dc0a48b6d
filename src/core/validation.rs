use chrono::{Datelike, NaiveDate};
use uuid::Uuid;

use crate::core::{AppError, Result};

/// Parses an identifier received as text
pub fn parse_id(field: &str, value: &str) -> Result<Uuid> {
    Uuid::parse_str(value.trim())
        .map_err(|_| AppError::validation(format!("{} is not a valid identifier: '{}'", field, value)))
}

/// Identifiers read back from storage must be well formed
pub fn stored_id(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| AppError::Internal(format!("Invalid identifier in storage: {}", value)))
}

/// Parses an optional identifier; blank input counts as absent
pub fn parse_optional_id(field: &str, value: Option<&str>) -> Result<Option<Uuid>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => parse_id(field, v).map(Some),
    }
}

/// Parses a `YYYY-MM-DD` date
pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        AppError::validation(format!("{} must be a date in YYYY-MM-DD format, got '{}'", field, value))
    })
}

pub fn parse_optional_date(field: &str, value: Option<&str>) -> Result<Option<NaiveDate>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => parse_date(field, v).map(Some),
    }
}

/// Parses a `YYYY-MM` reference month into its first and last day
pub fn parse_reference_month(value: &str) -> Result<(NaiveDate, NaiveDate)> {
    let invalid = || {
        AppError::validation(format!(
            "reference_month must be in YYYY-MM format, got '{}'",
            value
        ))
    };

    let trimmed = value.trim();
    let (year, month) = trimmed.split_once('-').ok_or_else(invalid)?;
    if year.len() != 4 || month.len() != 2 {
        return Err(invalid());
    }
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u32 = month.parse().map_err(|_| invalid())?;

    let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let end = start
        .checked_add_months(chrono::Months::new(1))
        .and_then(|next| next.pred_opt())
        .ok_or_else(invalid)?;

    Ok((start, end))
}

/// Formats the `YYYY-MM` reference month a date falls in
pub fn reference_month_of(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// Rejects blank mandatory text and returns it trimmed
pub fn require_non_blank(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

/// Rejects inverted date ranges
pub fn validate_date_range(start: NaiveDate, end: NaiveDate) -> Result<()> {
    if start > end {
        return Err(AppError::validation(format!(
            "start date ({}) must be before or equal to end date ({})",
            start, end
        )));
    }
    Ok(())
}
