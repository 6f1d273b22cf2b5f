//! Categories owned by a single user.

use sea_orm::entity::prelude::*;

use crate::ValidationErrors;

/// Maximum length of a category name, in characters.
pub const MAX_NAME_LEN: usize = 100;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Category {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
}

impl From<Model> for Category {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            owner_id: model.user_id,
            name: model.name,
        }
    }
}

/// Trims `raw` and checks the shape of a category name.
///
/// Uniqueness depends on the owner's other categories and is checked by the
/// caller.
pub fn validate_name(raw: &str) -> Result<String, ValidationErrors> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ValidationErrors::single(
            "name",
            "Category name cannot be empty.",
        ));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationErrors::single(
            "name",
            format!("Category name must be at most {MAX_NAME_LEN} characters."),
        ));
    }
    Ok(name.to_string())
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    pub name: String,
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
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
