//! Transactions API endpoints

use api_types::transaction::{IdInput, TransactionFields, TransactionListQuery, TransactionView};
use axum::{Extension, Json, extract::State, http::StatusCode};
use chrono::NaiveDate;
use engine::{
    EngineError, Money, Principal, TransactionChanges, TransactionDraft, TransactionKind,
    TransactionListFilter, ValidationErrors,
};

use crate::{
    ServerError,
    extract::{ApiJson, ApiQuery, IdPath},
    server::ServerState,
};

const REQUIRED: &str = "This field is required.";

fn map_transaction(tx: engine::Transaction) -> TransactionView {
    TransactionView {
        id: tx.id,
        category: tx.category_id,
        kind: tx.kind.as_str().to_string(),
        amount: tx.amount.to_string(),
        date: tx.date,
        description: tx.description,
    }
}

/// Moves a field-level failure into `errors`; any other failure is returned.
fn field<T>(
    result: Result<T, EngineError>,
    errors: &mut ValidationErrors,
) -> Result<Option<T>, ServerError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(EngineError::Validation(found)) => {
            errors.merge(found);
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

fn parse_date(name: &str, raw: &str) -> Result<NaiveDate, EngineError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        EngineError::invalid(
            name,
            "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.",
        )
    })
}

/// Accepts a numeric id or a string holding one.
fn parse_category(raw: &IdInput) -> Result<i64, EngineError> {
    let received = match raw {
        IdInput::Id(id) => return Ok(*id),
        IdInput::Text(text) => match text.trim().parse::<i64>() {
            Ok(id) => return Ok(id),
            Err(_) => "str",
        },
        IdInput::Other(value) => match value {
            serde_json::Value::Bool(_) => "bool",
            serde_json::Value::Number(_) => "float",
            serde_json::Value::Array(_) => "list",
            serde_json::Value::Object(_) => "dict",
            serde_json::Value::String(_) => "str",
            serde_json::Value::Null => "null",
        },
    };
    Err(EngineError::invalid(
        "category",
        format!("Incorrect type. Expected pk value, received {received}."),
    ))
}

/// Query values that are missing or blank both count as absent.
fn present(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().map(str::trim).filter(|value| !value.is_empty())
}

fn check_required(payload: &TransactionFields, errors: &mut ValidationErrors) {
    let missing = [
        ("category", payload.category.is_none()),
        ("type", payload.kind.is_none()),
        ("amount", payload.amount.is_none()),
        ("date", payload.date.is_none()),
    ];
    for (name, absent) in missing {
        if absent {
            errors.add(name, REQUIRED);
        }
    }
}

/// Converts whichever fields are present, collecting format errors.
fn parse_changes(
    payload: TransactionFields,
    errors: &mut ValidationErrors,
) -> Result<TransactionChanges, ServerError> {
    let kind = match payload.kind.as_deref() {
        Some(raw) => field(TransactionKind::try_from(raw), errors)?,
        None => None,
    };
    let amount = match &payload.amount {
        Some(raw) => field(raw.to_string().parse::<Money>(), errors)?,
        None => None,
    };
    let date = match payload.date.as_deref() {
        Some(raw) => field(parse_date("date", raw), errors)?,
        None => None,
    };
    let category_id = match &payload.category {
        Some(raw) => field(parse_category(raw), errors)?,
        None => None,
    };
    let description = match payload.description {
        Some(Some(text)) => Some(text),
        Some(None) => {
            errors.add("description", "This field may not be null.");
            None
        }
        None => None,
    };

    Ok(TransactionChanges {
        category_id,
        kind,
        amount,
        date,
        description,
    })
}

/// Parses a body that must carry every field but `description`.
fn parse_draft(payload: TransactionFields) -> Result<TransactionDraft, ServerError> {
    let mut errors = ValidationErrors::new();
    check_required(&payload, &mut errors);
    let changes = parse_changes(payload, &mut errors)?;

    match (changes.category_id, changes.kind, changes.amount, changes.date) {
        (Some(category_id), Some(kind), Some(amount), Some(date)) if errors.is_empty() => {
            Ok(TransactionDraft {
                category_id,
                kind,
                amount,
                date,
                description: changes.description,
            })
        }
        _ => Err(EngineError::Validation(errors).into()),
    }
}

fn parse_filter(query: &TransactionListQuery) -> Result<TransactionListFilter, ServerError> {
    let mut errors = ValidationErrors::new();

    let kind = match present(&query.kind) {
        Some(raw) => field(TransactionKind::try_from(raw), &mut errors)?,
        None => None,
    };
    let category_id = match present(&query.category) {
        Some(raw) => match raw.parse::<i64>() {
            Ok(id) => Some(id),
            Err(_) => {
                errors.add("category", "Enter a number.");
                None
            }
        },
        None => None,
    };
    let start_date = match present(&query.start_date) {
        Some(raw) => field(parse_date("start_date", raw), &mut errors)?,
        None => None,
    };
    let end_date = match present(&query.end_date) {
        Some(raw) => field(parse_date("end_date", raw), &mut errors)?,
        None => None,
    };

    errors.into_result()?;
    Ok(TransactionListFilter {
        kind,
        category_id,
        start_date,
        end_date,
    })
}

pub async fn list(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    ApiQuery(query): ApiQuery<TransactionListQuery>,
) -> Result<Json<Vec<TransactionView>>, ServerError> {
    let filter = parse_filter(&query)?;
    let transactions = state
        .engine
        .list_transactions(&principal, &filter)
        .await?
        .into_iter()
        .map(map_transaction)
        .collect();
    Ok(Json(transactions))
}

pub async fn create(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    ApiJson(payload): ApiJson<TransactionFields>,
) -> Result<(StatusCode, Json<TransactionView>), ServerError> {
    let draft = parse_draft(payload)?;
    let transaction = state.engine.create_transaction(&principal, draft).await?;
    Ok((StatusCode::CREATED, Json(map_transaction(transaction))))
}

pub async fn get(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    IdPath(transaction_id): IdPath,
) -> Result<Json<TransactionView>, ServerError> {
    let transaction = state.engine.transaction(&principal, transaction_id).await?;
    Ok(Json(map_transaction(transaction)))
}

pub async fn update(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    IdPath(transaction_id): IdPath,
    ApiJson(payload): ApiJson<TransactionFields>,
) -> Result<Json<TransactionView>, ServerError> {
    let draft = match parse_draft(payload) {
        Ok(draft) => draft,
        Err(err) => {
            // Out-of-scope ids answer 404 before the body is judged.
            state.engine.transaction(&principal, transaction_id).await?;
            return Err(err);
        }
    };
    let transaction = state
        .engine
        .update_transaction(&principal, transaction_id, draft.into())
        .await?;
    Ok(Json(map_transaction(transaction)))
}

pub async fn partial_update(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    IdPath(transaction_id): IdPath,
    ApiJson(payload): ApiJson<TransactionFields>,
) -> Result<Json<TransactionView>, ServerError> {
    let mut errors = ValidationErrors::new();
    let changes = parse_changes(payload, &mut errors)?;
    if !errors.is_empty() {
        state.engine.transaction(&principal, transaction_id).await?;
        return Err(EngineError::Validation(errors).into());
    }

    let transaction = state
        .engine
        .update_transaction(&principal, transaction_id, changes)
        .await?;
    Ok(Json(map_transaction(transaction)))
}

pub async fn delete(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    IdPath(transaction_id): IdPath,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .delete_transaction(&principal, transaction_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
