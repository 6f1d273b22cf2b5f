//! Domain core of the expense tracker.
//!
//! Every operation takes the requesting [`Principal`] explicitly and only
//! ever reads or writes records owned by it.

pub use categories::Category;
pub use error::{EngineError, ValidationErrors};
pub use money::Money;
pub use ops::{
    Action, Engine, EngineBuilder, MonthlyReport, Owned, Principal, Registration,
    TransactionListFilter, can_access,
};
pub use password::{PasswordHash, ValidatedPassword};
pub use transactions::{Transaction, TransactionChanges, TransactionDraft, TransactionKind};

pub mod auth_tokens;
pub mod categories;
mod error;
mod money;
mod ops;
mod password;
pub mod transactions;
pub mod users;

type ResultEngine<T> = Result<T, EngineError>;
