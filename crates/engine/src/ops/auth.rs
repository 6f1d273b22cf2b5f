//! Identity gate: registration, login and token authentication.

use chrono::Utc;
use sea_orm::{
    ActiveValue, ConnectionTrait, DatabaseTransaction, QueryFilter, SqlErr, TransactionTrait,
    prelude::*,
};

use crate::{
    EngineError, PasswordHash, ResultEngine, ValidatedPassword, ValidationErrors, auth_tokens,
    users,
};

use super::{Engine, Principal, with_tx};

const MAX_USERNAME_LEN: usize = 150;
const USERNAME_TAKEN: &str = "A user with that username already exists.";

/// Result of a successful registration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Registration {
    pub principal: Principal,
    pub token: String,
}

fn validate_username(raw: &str, errors: &mut ValidationErrors) -> String {
    let username = raw.trim();
    if username.is_empty() {
        errors.add("username", "This field may not be blank.");
    } else if username.chars().count() > MAX_USERNAME_LEN {
        errors.add(
            "username",
            format!("Ensure this field has no more than {MAX_USERNAME_LEN} characters."),
        );
    } else if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        errors.add(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
    }
    username.to_string()
}

impl Engine {
    /// Creates a user and issues its first token.
    pub async fn register(&self, username: &str, password: &str) -> ResultEngine<Registration> {
        let mut errors = ValidationErrors::new();
        let username = validate_username(username, &mut errors);
        let password = ValidatedPassword::new(password, &username);
        if let Err(password_errors) = &password {
            errors.merge(password_errors.clone());
        }

        let registration = with_tx!(self, |db_tx| {
            if errors.messages("username").is_empty() {
                let taken = users::Entity::find()
                    .filter(users::Column::Username.eq(username.as_str()))
                    .one(&db_tx)
                    .await?
                    .is_some();
                if taken {
                    errors.add("username", USERNAME_TAKEN);
                }
            }
            errors.into_result()?;
            let password = password.map_err(EngineError::Validation)?;
            let hash = PasswordHash::new(&password, self.password_cost)?;

            let user = users::ActiveModel {
                id: ActiveValue::NotSet,
                username: ActiveValue::Set(username.clone()),
                password: ActiveValue::Set(hash.as_str().to_string()),
                created_at: ActiveValue::Set(Utc::now()),
            }
            .insert(&db_tx)
            .await
            .map_err(|err| {
                EngineError::from_unique_violation(err, "username", USERNAME_TAKEN)
            })?;

            let token = Self::insert_token(&db_tx, user.id).await?;
            Ok(Registration {
                principal: Principal::new(user.id, user.username),
                token: token.key,
            })
        })?;

        tracing::info!(user_id = registration.principal.user_id, "registered user");
        Ok(registration)
    }

    /// Verifies credentials and returns the user's token, creating one if
    /// the user has none.
    pub async fn login(&self, username: &str, password: &str) -> ResultEngine<String> {
        let mut errors = ValidationErrors::new();
        if username.is_empty() {
            errors.add("username", "This field is required.");
        }
        if password.is_empty() {
            errors.add("password", "This field is required.");
        }
        errors.into_result()?;

        with_tx!(self, |db_tx| {
            let user = users::Entity::find()
                .filter(users::Column::Username.eq(username))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::Unauthorized("Invalid credentials".to_string()))?;

            if !PasswordHash::from_stored(user.password.clone()).verify(password) {
                return Err(EngineError::Unauthorized("Invalid credentials".to_string()));
            }

            let token = Self::get_or_create_token(&db_tx, user.id).await?;
            Ok(token.key)
        })
    }

    /// Resolves a bearer token to the principal that owns it.
    pub async fn authenticate(&self, token: &str) -> ResultEngine<Principal> {
        if token.is_empty() {
            return Err(EngineError::Unauthorized(
                "Authentication credentials were not provided.".to_string(),
            ));
        }

        let found = auth_tokens::Entity::find_by_id(token.to_string())
            .find_also_related(users::Entity)
            .one(&self.database)
            .await?;

        match found {
            Some((_, Some(user))) => Ok(Principal::new(user.id, user.username)),
            _ => Err(EngineError::Unauthorized("Invalid token.".to_string())),
        }
    }

    /// Revokes the principal's token.
    pub async fn logout(&self, principal: &Principal) -> ResultEngine<()> {
        auth_tokens::Entity::delete_many()
            .filter(auth_tokens::Column::UserId.eq(principal.user_id))
            .exec(&self.database)
            .await?;
        tracing::debug!(user_id = principal.user_id, "revoked token");
        Ok(())
    }

    async fn insert_token<C: ConnectionTrait>(
        db: &C,
        user_id: i64,
    ) -> Result<auth_tokens::Model, DbErr> {
        auth_tokens::ActiveModel {
            key: ActiveValue::Set(auth_tokens::generate_key()),
            user_id: ActiveValue::Set(user_id),
            created_at: ActiveValue::Set(Utc::now()),
        }
        .insert(db)
        .await
    }

    async fn get_or_create_token(
        db_tx: &DatabaseTransaction,
        user_id: i64,
    ) -> ResultEngine<auth_tokens::Model> {
        let existing = || {
            auth_tokens::Entity::find()
                .filter(auth_tokens::Column::UserId.eq(user_id))
                .one(db_tx)
        };

        if let Some(token) = existing().await? {
            return Ok(token);
        }

        match Self::insert_token(db_tx, user_id).await {
            Ok(token) => Ok(token),
            // A concurrent login created the token first.
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                existing().await?.ok_or(EngineError::Database(err))
            }
            Err(err) => Err(err.into()),
        }
    }
}
