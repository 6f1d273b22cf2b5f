//! Password validation and hashing.
//!
//! `ValidatedPassword` wraps a string and ensures it satisfies the strength
//! policy. `PasswordHash` converts a `ValidatedPassword` into a salted bcrypt
//! hash.

use std::fmt::Display;

use crate::{EngineError, ResultEngine, ValidationErrors};

const MIN_LENGTH: usize = 8;

/// Passwords rejected regardless of length.
const COMMON_PASSWORDS: &[&str] = &[
    "password",
    "password1",
    "password123",
    "12345678",
    "123456789",
    "1234567890",
    "qwertyuiop",
    "qwerty123",
    "iloveyou",
    "sunshine",
    "princess",
    "football",
    "baseball",
    "welcome1",
    "letmein1",
    "abc12345",
    "trustno1",
    "superman",
    "1q2w3e4r",
    "passw0rd",
];

/// A password that has been validated, but not yet hashed.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPassword(String);

impl ValidatedPassword {
    /// Validate `raw` for an account named `username`.
    ///
    /// # Errors
    ///
    /// Returns a validation error on the `password` field listing every rule
    /// the password breaks.
    pub fn new(raw: &str, username: &str) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let lowered = raw.to_lowercase();

        if raw.chars().count() < MIN_LENGTH {
            errors.add(
                "password",
                format!(
                    "This password is too short. It must contain at least {MIN_LENGTH} characters."
                ),
            );
        }
        if !raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit()) {
            errors.add("password", "This password is entirely numeric.");
        }
        if COMMON_PASSWORDS.contains(&lowered.as_str()) {
            errors.add("password", "This password is too common.");
        }
        let username = username.trim().to_lowercase();
        if username.chars().count() >= 3 && lowered.contains(&username) {
            errors.add("password", "The password is too similar to the username.");
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(Self(raw.to_string()))
    }
}

impl Display for ValidatedPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", str::repeat("*", 8))
    }
}

/// A salted and hashed password.
#[derive(Debug, Clone, PartialEq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Hash a validated password with the given bcrypt `cost`.
    pub fn new(password: &ValidatedPassword, cost: u32) -> ResultEngine<Self> {
        bcrypt::hash(&password.0, cost)
            .map(Self)
            .map_err(|err| EngineError::Hashing(err.to_string()))
    }

    /// Wrap a hash loaded from storage.
    pub fn from_stored(hash: String) -> Self {
        Self(hash)
    }

    /// Check that `raw_password` matches the stored hash.
    ///
    /// A malformed stored hash counts as a mismatch.
    pub fn verify(&self, raw_password: &str) -> bool {
        match bcrypt::verify(raw_password, &self.0) {
            Ok(matches) => matches,
            Err(err) => {
                tracing::error!("could not verify password hash: {err}");
                false
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
