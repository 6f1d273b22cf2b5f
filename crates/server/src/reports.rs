//! Monthly report endpoint.

use std::str::FromStr;

use api_types::report::{MonthlyReportQuery, MonthlyReportView};
use axum::{Extension, Json, extract::State};
use engine::{EngineError, MonthlyReport, Principal, ValidationErrors};

use crate::{ServerError, extract::ApiQuery, server::ServerState};

fn map_report(report: MonthlyReport) -> MonthlyReportView {
    MonthlyReportView {
        year: report.year,
        month: report.month,
        total_income: report.total_income.to_string(),
        total_expense: report.total_expense.to_string(),
        balance: report.balance.to_string(),
    }
}

fn parse_number<T: FromStr>(
    name: &str,
    raw: Option<&str>,
    errors: &mut ValidationErrors,
) -> Option<T> {
    let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        errors.add(name, "This field is required.");
        return None;
    };
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            errors.add(name, "A valid integer is required.");
            None
        }
    }
}

fn parse_period(query: &MonthlyReportQuery) -> Result<(i32, u32), EngineError> {
    let mut errors = ValidationErrors::new();
    let year = parse_number::<i32>("year", query.year.as_deref(), &mut errors);
    let month = parse_number::<u32>("month", query.month.as_deref(), &mut errors);
    match (year, month) {
        (Some(year), Some(month)) => Ok((year, month)),
        _ => Err(EngineError::Validation(errors)),
    }
}

pub async fn monthly(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    ApiQuery(query): ApiQuery<MonthlyReportQuery>,
) -> Result<Json<MonthlyReportView>, ServerError> {
    let (year, month) = parse_period(&query)?;
    let report = state.engine.monthly_report(&principal, year, month).await?;
    Ok(Json(map_report(report)))
}
