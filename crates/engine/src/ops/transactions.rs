use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait,
    prelude::*,
};

use crate::{
    EngineError, ResultEngine, Transaction, TransactionChanges, TransactionDraft,
    TransactionKind, ValidationErrors, transactions,
};

use super::{Action, Engine, Principal, with_tx};

/// Filters for listing transactions.
///
/// Each present field narrows the result; absent fields impose nothing. The
/// date bounds are inclusive and only apply when both are present.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionListFilter {
    pub kind: Option<TransactionKind>,
    pub category_id: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl TransactionListFilter {
    fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }
}

trait ApplyTxFilters: QueryFilter + Sized {
    fn apply_tx_filters(self, filter: &TransactionListFilter) -> Self;
}

impl<T> ApplyTxFilters for T
where
    T: QueryFilter + Sized,
{
    fn apply_tx_filters(mut self, filter: &TransactionListFilter) -> Self {
        if let Some(kind) = filter.kind {
            self = self.filter(transactions::Column::Kind.eq(kind.as_str()));
        }
        if let Some(category_id) = filter.category_id {
            self = self.filter(transactions::Column::CategoryId.eq(category_id));
        }
        if let Some((start, end)) = filter.date_range() {
            self = self.filter(transactions::Column::Date.between(start, end));
        }
        self
    }
}

/// Folds a category lookup failure into the field errors collected so far.
fn collect_validation(result: ResultEngine<()>, errors: &mut ValidationErrors) -> ResultEngine<()> {
    match result {
        Ok(()) => Ok(()),
        Err(EngineError::Validation(found)) => {
            errors.merge(found);
            Ok(())
        }
        Err(err) => Err(err),
    }
}

impl Engine {
    async fn check_category_reference<C: ConnectionTrait>(
        &self,
        db: &C,
        principal: &Principal,
        category_id: i64,
    ) -> ResultEngine<()> {
        self.require_category_reference(db, principal, category_id)
            .await
            .map(|_| ())
    }

    pub async fn create_transaction(
        &self,
        principal: &Principal,
        draft: TransactionDraft,
    ) -> ResultEngine<Transaction> {
        let mut errors = draft.validate();

        let model = with_tx!(self, |db_tx| {
            collect_validation(
                self.check_category_reference(&db_tx, principal, draft.category_id)
                    .await,
                &mut errors,
            )?;
            errors.into_result()?;

            let model = transactions::ActiveModel {
                id: ActiveValue::NotSet,
                user_id: ActiveValue::Set(principal.user_id),
                category_id: ActiveValue::Set(draft.category_id),
                kind: ActiveValue::Set(draft.kind.as_str().to_string()),
                amount_minor: ActiveValue::Set(draft.amount.cents()),
                date: ActiveValue::Set(draft.date),
                description: ActiveValue::Set(draft.description.clone().unwrap_or_default()),
            }
            .insert(&db_tx)
            .await?;
            Ok(model)
        })?;

        tracing::debug!(
            user_id = principal.user_id,
            transaction_id = model.id,
            "created transaction"
        );
        Transaction::try_from(model)
    }

    /// Lists the principal's transactions matching `filter`, in creation order.
    pub async fn list_transactions(
        &self,
        principal: &Principal,
        filter: &TransactionListFilter,
    ) -> ResultEngine<Vec<Transaction>> {
        transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(principal.user_id))
            .apply_tx_filters(filter)
            .order_by_asc(transactions::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Transaction::try_from)
            .collect()
    }

    pub async fn transaction(
        &self,
        principal: &Principal,
        transaction_id: i64,
    ) -> ResultEngine<Transaction> {
        let model = self
            .require_transaction(&self.database, principal, transaction_id, Action::Read)
            .await?;
        Transaction::try_from(model)
    }

    /// Applies `changes` to a transaction.
    ///
    /// A full replacement is expressed by converting a [`TransactionDraft`]
    /// into changes. The category reference is re-checked whenever a category
    /// is supplied.
    pub async fn update_transaction(
        &self,
        principal: &Principal,
        transaction_id: i64,
        changes: TransactionChanges,
    ) -> ResultEngine<Transaction> {
        let model = with_tx!(self, |db_tx| {
            let model = self
                .require_transaction(&db_tx, principal, transaction_id, Action::Write)
                .await?;

            let mut errors = changes.validate();
            if let Some(category_id) = changes.category_id {
                collect_validation(
                    self.check_category_reference(&db_tx, principal, category_id)
                        .await,
                    &mut errors,
                )?;
            }
            errors.into_result()?;

            let mut active: transactions::ActiveModel = model.clone().into();
            if let Some(category_id) = changes.category_id {
                active.category_id = ActiveValue::Set(category_id);
            }
            if let Some(kind) = changes.kind {
                active.kind = ActiveValue::Set(kind.as_str().to_string());
            }
            if let Some(amount) = changes.amount {
                active.amount_minor = ActiveValue::Set(amount.cents());
            }
            if let Some(date) = changes.date {
                active.date = ActiveValue::Set(date);
            }
            if let Some(description) = changes.description.clone() {
                active.description = ActiveValue::Set(description);
            }

            if !active.is_changed() {
                return Transaction::try_from(model);
            }
            Ok(active.update(&db_tx).await?)
        })?;

        tracing::debug!(user_id = principal.user_id, transaction_id, "updated transaction");
        Transaction::try_from(model)
    }

    pub async fn delete_transaction(
        &self,
        principal: &Principal,
        transaction_id: i64,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = self
                .require_transaction(&db_tx, principal, transaction_id, Action::Write)
                .await?;
            transactions::Entity::delete_by_id(model.id)
                .exec(&db_tx)
                .await?;
            Ok(())
        })?;

        tracing::debug!(user_id = principal.user_id, transaction_id, "deleted transaction");
        Ok(())
    }
}
