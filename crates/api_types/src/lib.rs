//! JSON bodies exchanged with the HTTP server.
//!
//! Request fields are optional so that missing values are reported per field
//! by the server rather than rejected wholesale by the JSON extractor.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub mod auth {
    use super::*;

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct Credentials {
        #[serde(default)]
        pub username: Option<String>,
        #[serde(default)]
        pub password: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TokenResponse {
        pub message: String,
        pub token: String,
    }
}

pub mod category {
    use super::*;

    /// Body of both create and rename.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct CategoryName {
        #[serde(default)]
        pub name: Option<String>,
    }

    #[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct CategoryView {
        pub id: i64,
        pub name: String,
    }
}

pub mod transaction {
    use std::fmt;

    use super::*;

    /// An amount as sent by a client: `"12.50"` or `12.5`.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(untagged)]
    pub enum AmountInput {
        Text(String),
        Number(serde_json::Number),
    }

    impl fmt::Display for AmountInput {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::Text(text) => f.write_str(text.trim()),
                Self::Number(number) => write!(f, "{number}"),
            }
        }
    }

    /// A category reference as sent by clients: a number, a numeric string,
    /// or anything else, which is reported as a type error.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(untagged)]
    pub enum IdInput {
        Id(i64),
        Text(String),
        Other(serde_json::Value),
    }

    /// Keeps an explicit `null` apart from a missing field.
    fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: serde::Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }

    /// Body of create, full update and partial update.
    ///
    /// Create and full update require every field but `description`; a
    /// partial update applies whichever fields are present.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionFields {
        #[serde(default)]
        pub category: Option<IdInput>,
        #[serde(default, rename = "type")]
        pub kind: Option<String>,
        #[serde(default)]
        pub amount: Option<AmountInput>,
        /// `YYYY-MM-DD`.
        #[serde(default)]
        pub date: Option<String>,
        /// `Some(None)` when the client sent `null`.
        #[serde(
            default,
            deserialize_with = "nullable",
            skip_serializing_if = "Option::is_none"
        )]
        pub description: Option<Option<String>>,
    }

    #[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: i64,
        pub category: i64,
        #[serde(rename = "type")]
        pub kind: String,
        /// Two fractional digits, e.g. `"50.00"`.
        pub amount: String,
        pub date: NaiveDate,
        pub description: String,
    }

    /// Query string of the list endpoint. Values are kept raw so that empty
    /// parameters can be told apart from malformed ones.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionListQuery {
        #[serde(default, rename = "type")]
        pub kind: Option<String>,
        #[serde(default)]
        pub category: Option<String>,
        #[serde(default)]
        pub start_date: Option<String>,
        #[serde(default)]
        pub end_date: Option<String>,
    }
}

pub mod report {
    use super::*;

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct MonthlyReportQuery {
        #[serde(default)]
        pub year: Option<String>,
        #[serde(default)]
        pub month: Option<String>,
    }

    #[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct MonthlyReportView {
        pub year: i32,
        pub month: u32,
        pub total_income: String,
        pub total_expense: String,
        pub balance: String,
    }
}

#[cfg(test)]
mod tests {
    use super::transaction::*;

    #[test]
    fn amount_accepts_strings_and_numbers() {
        let text: AmountInput = serde_json::from_str(r#""50.00""#).unwrap();
        let number: AmountInput = serde_json::from_str("12.5").unwrap();
        assert_eq!(text.to_string(), "50.00");
        assert_eq!(number.to_string(), "12.5");
    }

    #[test]
    fn kind_travels_as_type() {
        let fields: TransactionFields =
            serde_json::from_str(r#"{"type": "income", "category": 3}"#).unwrap();
        assert_eq!(fields.kind.as_deref(), Some("income"));
        assert_eq!(fields.category, Some(IdInput::Id(3)));
        assert!(fields.amount.is_none());
    }

    #[test]
    fn category_keeps_whatever_shape_was_sent() {
        let fields: TransactionFields =
            serde_json::from_str(r#"{"category": "3"}"#).unwrap();
        assert_eq!(fields.category, Some(IdInput::Text("3".to_string())));
        let fields: TransactionFields =
            serde_json::from_str(r#"{"category": [1]}"#).unwrap();
        assert!(matches!(fields.category, Some(IdInput::Other(_))));
    }

    #[test]
    fn null_description_differs_from_a_missing_one() {
        let fields: TransactionFields =
            serde_json::from_str(r#"{"description": null}"#).unwrap();
        assert_eq!(fields.description, Some(None));
        let fields: TransactionFields = serde_json::from_str("{}").unwrap();
        assert_eq!(fields.description, None);
    }
}
