//! Monthly income/expense aggregation.

use chrono::NaiveDate;
use sea_orm::{QueryFilter, QuerySelect, prelude::*};

use crate::{Money, ResultEngine, TransactionKind, transactions};

use super::{Engine, Principal};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MonthlyReport {
    pub year: i32,
    pub month: u32,
    pub total_income: Money,
    pub total_expense: Money,
    pub balance: Money,
}

impl MonthlyReport {
    fn new(year: i32, month: u32, total_income: Money, total_expense: Money) -> Self {
        Self {
            year,
            month,
            total_income,
            total_expense,
            balance: total_income - total_expense,
        }
    }
}

/// `[first day of month, first day of next month)`, or `None` when the pair
/// does not name a calendar month.
fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let end = if month == 12 {
        NaiveDate::from_ymd_opt(year.checked_add(1)?, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((start, end))
}

impl Engine {
    /// Sums the principal's income and expenses dated within `year`/`month`.
    ///
    /// A month that cannot exist (such as 13) matches nothing and yields an
    /// all-zero report.
    pub async fn monthly_report(
        &self,
        principal: &Principal,
        year: i32,
        month: u32,
    ) -> ResultEngine<MonthlyReport> {
        let Some((start, end)) = month_bounds(year, month) else {
            return Ok(MonthlyReport::new(year, month, Money::ZERO, Money::ZERO));
        };

        let totals: Vec<(String, Option<i64>)> = transactions::Entity::find()
            .select_only()
            .column(transactions::Column::Kind)
            .column_as(transactions::Column::AmountMinor.sum(), "total")
            .filter(transactions::Column::UserId.eq(principal.user_id))
            .filter(transactions::Column::Date.gte(start))
            .filter(transactions::Column::Date.lt(end))
            .group_by(transactions::Column::Kind)
            .into_tuple()
            .all(&self.database)
            .await?;

        let mut income = Money::ZERO;
        let mut expense = Money::ZERO;
        for (kind, total) in totals {
            let total = Money::new(total.unwrap_or_default());
            match TransactionKind::try_from(kind.as_str())? {
                TransactionKind::Income => income += total,
                TransactionKind::Expense => expense += total,
            }
        }

        Ok(MonthlyReport::new(year, month, income, expense))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_roll_over_december() {
        let (start, end) = month_bounds(2024, 12).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 12, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
    }

    #[test]
    fn impossible_months_have_no_bounds() {
        assert!(month_bounds(2024, 0).is_none());
        assert!(month_bounds(2024, 13).is_none());
    }

    #[test]
    fn balance_is_income_minus_expense() {
        let report = MonthlyReport::new(2024, 3, Money::new(20000), Money::new(5000));
        assert_eq!(report.balance, Money::new(15000));
    }
}
