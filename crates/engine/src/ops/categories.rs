use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{Category, EngineError, ResultEngine, categories, transactions};

use super::{Action, Engine, Principal, with_tx};

const DUPLICATE_NAME: &str = "You already have a category with this name.";

/// Fails when `owner_id` already has a category called `name`, ignoring
/// `except_id` so a category never collides with itself.
async fn ensure_name_available<C: ConnectionTrait>(
    db: &C,
    owner_id: i64,
    name: &str,
    except_id: Option<i64>,
) -> ResultEngine<()> {
    let mut query = categories::Entity::find()
        .filter(categories::Column::UserId.eq(owner_id))
        .filter(categories::Column::Name.eq(name));
    if let Some(id) = except_id {
        query = query.filter(categories::Column::Id.ne(id));
    }
    if query.one(db).await?.is_some() {
        return Err(EngineError::invalid("name", DUPLICATE_NAME));
    }
    Ok(())
}

impl Engine {
    pub async fn create_category(&self, principal: &Principal, name: &str) -> ResultEngine<Category> {
        let name = categories::validate_name(name).map_err(EngineError::Validation)?;

        let model = with_tx!(self, |db_tx| {
            ensure_name_available(&db_tx, principal.user_id, &name, None).await?;
            categories::ActiveModel {
                id: ActiveValue::NotSet,
                user_id: ActiveValue::Set(principal.user_id),
                name: ActiveValue::Set(name.clone()),
            }
            .insert(&db_tx)
            .await
            .map_err(|err| EngineError::from_unique_violation(err, "name", DUPLICATE_NAME))
        })?;

        tracing::debug!(user_id = principal.user_id, category_id = model.id, "created category");
        Ok(model.into())
    }

    /// Lists the principal's categories in creation order.
    pub async fn list_categories(&self, principal: &Principal) -> ResultEngine<Vec<Category>> {
        let models = categories::Entity::find()
            .filter(categories::Column::UserId.eq(principal.user_id))
            .order_by_asc(categories::Column::Id)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(Category::from).collect())
    }

    pub async fn category(&self, principal: &Principal, category_id: i64) -> ResultEngine<Category> {
        let model = self
            .require_category(&self.database, principal, category_id, Action::Read)
            .await?;
        Ok(model.into())
    }

    /// Renames a category. Keeping the current name is always allowed.
    pub async fn update_category(
        &self,
        principal: &Principal,
        category_id: i64,
        name: &str,
    ) -> ResultEngine<Category> {
        let name = categories::validate_name(name).map_err(EngineError::Validation)?;

        let model = with_tx!(self, |db_tx| {
            let model = self
                .require_category(&db_tx, principal, category_id, Action::Write)
                .await?;
            ensure_name_available(&db_tx, principal.user_id, &name, Some(model.id)).await?;

            let mut active: categories::ActiveModel = model.into();
            active.name = ActiveValue::Set(name.clone());
            active
                .update(&db_tx)
                .await
                .map_err(|err| EngineError::from_unique_violation(err, "name", DUPLICATE_NAME))
        })?;

        tracing::debug!(user_id = principal.user_id, category_id, "renamed category");
        Ok(model.into())
    }

    /// Deletes a category together with every transaction filed under it.
    pub async fn delete_category(&self, principal: &Principal, category_id: i64) -> ResultEngine<()> {
        let removed = with_tx!(self, |db_tx| {
            let model = self
                .require_category(&db_tx, principal, category_id, Action::Write)
                .await?;

            let removed = transactions::Entity::delete_many()
                .filter(transactions::Column::CategoryId.eq(model.id))
                .exec(&db_tx)
                .await?
                .rows_affected;
            categories::Entity::delete_by_id(model.id).exec(&db_tx).await?;
            Ok(removed)
        })?;

        tracing::debug!(
            user_id = principal.user_id,
            category_id,
            transactions = removed,
            "deleted category"
        );
        Ok(())
    }
}
