//! Authentication primitives: credentials and password hashing.
//!
//! Passwords are stored as argon2id PHC strings. Verification failures and
//! unknown usernames produce the same error so the login endpoint does not
//! leak which accounts exist.

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};

use crate::domain::error::Error;
use crate::domain::user::{UserValidationError, Username};

/// Minimum accepted password length.
pub const PASSWORD_MIN: usize = 8;

/// Validation failures for login payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginValidationError {
    /// The username was empty or invalid.
    InvalidUsername,
    /// The password was empty.
    EmptyPassword,
}

impl std::fmt::Display for LoginValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidUsername => write!(f, "username is not valid"),
            Self::EmptyPassword => write!(f, "password must not be empty"),
        }
    }
}

impl std::error::Error for LoginValidationError {}

/// Validated login credentials.
pub struct LoginCredentials {
    username: Username,
    password: String,
}

impl LoginCredentials {
    /// Validate raw login input.
    pub fn try_from_parts(username: &str, password: &str) -> Result<Self, LoginValidationError> {
        let username =
            Username::new(username).map_err(|_| LoginValidationError::InvalidUsername)?;
        if password.is_empty() {
            return Err(LoginValidationError::EmptyPassword);
        }
        Ok(Self {
            username,
            password: password.to_owned(),
        })
    }

    /// The login name.
    pub fn username(&self) -> &Username {
        &self.username
    }

    /// The candidate password.
    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}

/// Validated registration password.
pub struct Password(String);

impl Password {
    /// Validate a registration password.
    pub fn new(password: impl Into<String>) -> Result<Self, UserValidationError> {
        let password = password.into();
        if password.chars().count() < PASSWORD_MIN {
            return Err(UserValidationError::PasswordTooShort { min: PASSWORD_MIN });
        }
        Ok(Self(password))
    }

    /// The raw password.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Hash a password into an argon2id PHC string.
pub fn hash_password(password: &str) -> Result<String, Error> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| Error::internal(format!("password hashing failed: {err}")))
}

/// Verify a candidate password against a stored PHC string.
///
/// Undecodable hashes verify as false rather than erroring: a corrupted hash
/// must lock the account out, not open it up.
pub fn verify_password(stored_hash: &str, candidate: &str) -> bool {
    PasswordHash::new(stored_hash).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(candidate.as_bytes(), &parsed)
            .is_ok()
    })
}
