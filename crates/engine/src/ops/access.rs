//! Ownership scoping.
//!
//! Two layers guard every record: lookups are always filtered by the
//! principal's user id, and the record that comes back is then checked with
//! [`can_access`] before it is returned or mutated.

use sea_orm::{ConnectionTrait, QueryFilter, prelude::*};

use crate::{
    Category, EngineError, ResultEngine, Transaction, categories, transactions,
};

use super::Engine;

/// The authenticated user a request acts on behalf of.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i64,
    pub username: String,
}

impl Principal {
    pub fn new(user_id: i64, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Read,
    Write,
}

/// A record with a single owning user.
pub trait Owned {
    fn owner_id(&self) -> i64;
}

impl Owned for categories::Model {
    fn owner_id(&self) -> i64 {
        self.user_id
    }
}

impl Owned for Category {
    fn owner_id(&self) -> i64 {
        self.owner_id
    }
}

impl Owned for transactions::Model {
    fn owner_id(&self) -> i64 {
        self.user_id
    }
}

impl Owned for Transaction {
    fn owner_id(&self) -> i64 {
        self.owner_id
    }
}

/// Reads are open to any authenticated principal; writes only to the owner.
pub fn can_access<R: Owned + ?Sized>(principal: &Principal, record: &R, action: Action) -> bool {
    match action {
        Action::Read => true,
        Action::Write => record.owner_id() == principal.user_id,
    }
}

fn ensure_access<R: Owned>(
    principal: &Principal,
    record: &R,
    action: Action,
    label: &str,
) -> ResultEngine<()> {
    if can_access(principal, record, action) {
        return Ok(());
    }
    tracing::warn!(
        user_id = principal.user_id,
        owner_id = record.owner_id(),
        "{label} reached outside its owner's scope"
    );
    Err(EngineError::Forbidden(format!(
        "you do not have permission to modify this {label}"
    )))
}

/// Generates a `require_*` lookup that scopes by owner, then checks access.
macro_rules! impl_require_owned {
    ($require_fn:ident, $entity:path, $model:path, $id_col:expr, $owner_col:expr, $label:literal) => {
        pub(super) async fn $require_fn<C: ConnectionTrait>(
            &self,
            db: &C,
            principal: &Principal,
            id: i64,
            action: Action,
        ) -> ResultEngine<$model> {
            let model = <$entity>::find()
                .filter($id_col.eq(id))
                .filter($owner_col.eq(principal.user_id))
                .one(db)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound(concat!($label, " not exists").to_string()))?;
            ensure_access(principal, &model, action, $label)?;
            Ok(model)
        }
    };
}

impl Engine {
    impl_require_owned!(
        require_category,
        categories::Entity,
        categories::Model,
        categories::Column::Id,
        categories::Column::UserId,
        "category"
    );

    impl_require_owned!(
        require_transaction,
        transactions::Entity,
        transactions::Model,
        transactions::Column::Id,
        transactions::Column::UserId,
        "transaction"
    );

    /// Resolves a category referenced by a transaction.
    ///
    /// Missing categories and categories of other users fail identically so
    /// that foreign ids reveal nothing.
    pub(super) async fn require_category_reference<C: ConnectionTrait>(
        &self,
        db: &C,
        principal: &Principal,
        category_id: i64,
    ) -> ResultEngine<categories::Model> {
        match self
            .require_category(db, principal, category_id, Action::Write)
            .await
        {
            Ok(model) => Ok(model),
            Err(EngineError::KeyNotFound(_) | EngineError::Forbidden(_)) => Err(
                EngineError::invalid("category", "You can only use your own categories."),
            ),
            Err(err) => Err(err),
        }
    }
}
