//! Transaction primitives.
//!
//! A `Transaction` records a single income or expense of its owner, filed
//! under one of the owner's categories.

use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{EngineError, Money, ValidationErrors};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(EngineError::invalid(
                "type",
                format!("\"{other}\" is not a valid choice."),
            )),
        }
    }
}

impl FromStr for TransactionKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub id: i64,
    pub owner_id: i64,
    pub category_id: i64,
    pub kind: TransactionKind,
    pub amount: Money,
    pub date: NaiveDate,
    pub description: String,
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            owner_id: model.user_id,
            category_id: model.category_id,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            amount: Money::new(model.amount_minor),
            date: model.date,
            description: model.description,
        })
    }
}

/// Fields supplied by the owner when recording a transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionDraft {
    pub category_id: i64,
    pub kind: TransactionKind,
    pub amount: Money,
    pub date: NaiveDate,
    pub description: Option<String>,
}

impl TransactionDraft {
    /// Field checks that need no storage access.
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        check_amount(self.amount, &mut errors);
        errors
    }
}

/// A partial update; `None` leaves the stored value untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionChanges {
    pub category_id: Option<i64>,
    pub kind: Option<TransactionKind>,
    pub amount: Option<Money>,
    pub date: Option<NaiveDate>,
    pub description: Option<String>,
}

impl TransactionChanges {
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        if let Some(amount) = self.amount {
            check_amount(amount, &mut errors);
        }
        errors
    }
}

impl From<TransactionDraft> for TransactionChanges {
    fn from(draft: TransactionDraft) -> Self {
        Self {
            category_id: Some(draft.category_id),
            kind: Some(draft.kind),
            amount: Some(draft.amount),
            date: Some(draft.date),
            description: Some(draft.description.unwrap_or_default()),
        }
    }
}

fn check_amount(amount: Money, errors: &mut ValidationErrors) {
    if !amount.is_positive() {
        errors.add("amount", "Transaction amount must be greater than zero.");
    } else if !amount.fits_storage() {
        errors.add(
            "amount",
            "Ensure that there are no more than 10 digits in total.",
        );
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    pub category_id: i64,
    pub kind: String,
    pub amount_minor: i64,
    pub date: Date,
    pub description: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::categories::Entity",
        from = "Column::CategoryId",
        to = "super::categories::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Category,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(amount: &str) -> TransactionDraft {
        TransactionDraft {
            category_id: 1,
            kind: TransactionKind::Expense,
            amount: amount.parse().unwrap(),
            date: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            description: None,
        }
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        assert_eq!(draft("0").validate().messages("amount").len(), 1);
        assert_eq!(draft("-5.00").validate().messages("amount").len(), 1);
    }

    #[test]
    fn smallest_positive_amount_is_accepted() {
        assert!(draft("0.01").validate().is_empty());
    }

    #[test]
    fn amounts_over_ten_digits_are_rejected() {
        assert!(draft("99999999.99").validate().is_empty());
        assert!(!draft("100000000").validate().is_empty());
    }

    #[test]
    fn changes_without_amount_are_valid() {
        assert!(TransactionChanges::default().validate().is_empty());
    }

    #[test]
    fn kind_parses_lowercase_names_only() {
        assert_eq!("income".parse::<TransactionKind>(), Ok(TransactionKind::Income));
        assert_eq!("expense".parse::<TransactionKind>(), Ok(TransactionKind::Expense));
        assert!("Income".parse::<TransactionKind>().is_err());
    }
}
