//! User aggregate: identity, role, account state, and wallet linkage.

use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::subscription::Subscription;

/// Validation errors for user components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    /// The id was empty.
    EmptyId,
    /// The id was not a valid UUID.
    InvalidId,
    /// The username was empty after trimming.
    EmptyUsername,
    /// The username was shorter than the minimum.
    UsernameTooShort {
        /// Minimum accepted length.
        min: usize,
    },
    /// The username exceeded the maximum.
    UsernameTooLong {
        /// Maximum accepted length.
        max: usize,
    },
    /// The username contained characters outside `[a-z0-9_]`.
    UsernameInvalidCharacters,
    /// The display name was empty after trimming.
    EmptyDisplayName,
    /// The display name was shorter than the minimum.
    DisplayNameTooShort {
        /// Minimum accepted length.
        min: usize,
    },
    /// The display name exceeded the maximum.
    DisplayNameTooLong {
        /// Maximum accepted length.
        max: usize,
    },
    /// The display name contained disallowed characters.
    DisplayNameInvalidCharacters,
    /// The password was shorter than the minimum.
    PasswordTooShort {
        /// Minimum accepted length.
        min: usize,
    },
    /// The wallet address was empty after trimming.
    EmptyWalletAddress,
    /// The wallet address exceeded the maximum.
    WalletAddressTooLong {
        /// Maximum accepted length.
        max: usize,
    },
}

impl fmt::Display for UserValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyId => write!(f, "user id must not be empty"),
            Self::InvalidId => write!(f, "user id must be a valid UUID"),
            Self::EmptyUsername => write!(f, "username must not be empty"),
            Self::UsernameTooShort { min } => {
                write!(f, "username must be at least {min} characters")
            }
            Self::UsernameTooLong { max } => {
                write!(f, "username must be at most {max} characters")
            }
            Self::UsernameInvalidCharacters => write!(
                f,
                "username may only contain lowercase letters, digits, or underscores",
            ),
            Self::EmptyDisplayName => write!(f, "display name must not be empty"),
            Self::DisplayNameTooShort { min } => {
                write!(f, "display name must be at least {min} characters")
            }
            Self::DisplayNameTooLong { max } => {
                write!(f, "display name must be at most {max} characters")
            }
            Self::DisplayNameInvalidCharacters => write!(
                f,
                "display name may only contain letters, numbers, spaces, or underscores",
            ),
            Self::PasswordTooShort { min } => {
                write!(f, "password must be at least {min} characters")
            }
            Self::EmptyWalletAddress => write!(f, "wallet address must not be empty"),
            Self::WalletAddressTooLong { max } => {
                write!(f, "wallet address must be at most {max} characters")
            }
        }
    }
}

impl std::error::Error for UserValidationError {}

/// Stable user identifier stored as a UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(Uuid);

impl UserId {
    /// Validate and construct a [`UserId`] from string input.
    pub fn new(id: impl AsRef<str>) -> Result<Self, UserValidationError> {
        let raw = id.as_ref();
        if raw.is_empty() {
            return Err(UserValidationError::EmptyId);
        }
        if raw.trim() != raw {
            return Err(UserValidationError::InvalidId);
        }
        let parsed = Uuid::parse_str(raw).map_err(|_| UserValidationError::InvalidId)?;
        Ok(Self(parsed))
    }

    /// Generate a new random [`UserId`].
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an already-parsed UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for UserId {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Minimum allowed length for usernames and display names.
pub const NAME_MIN: usize = 3;
/// Maximum allowed length for usernames and display names.
pub const NAME_MAX: usize = 32;
/// Maximum allowed length for a Pi wallet address.
pub const WALLET_ADDRESS_MAX: usize = 64;

static USERNAME_RE: OnceLock<Regex> = OnceLock::new();
static DISPLAY_NAME_RE: OnceLock<Regex> = OnceLock::new();

fn username_regex() -> &'static Regex {
    USERNAME_RE.get_or_init(|| {
        // Length is enforced separately; this regex constrains allowed characters.
        Regex::new("^[a-z0-9_]+$")
            .unwrap_or_else(|error| panic!("username regex failed to compile: {error}"))
    })
}

fn display_name_regex() -> &'static Regex {
    DISPLAY_NAME_RE.get_or_init(|| {
        Regex::new("^[A-Za-z0-9_ ]+$")
            .unwrap_or_else(|error| panic!("display name regex failed to compile: {error}"))
    })
}

/// Unique login name. Lowercase letters, digits, and underscores only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    /// Validate and construct a [`Username`].
    pub fn new(username: impl Into<String>) -> Result<Self, UserValidationError> {
        let username = username.into();
        if username.trim().is_empty() {
            return Err(UserValidationError::EmptyUsername);
        }
        let length = username.chars().count();
        if length < NAME_MIN {
            return Err(UserValidationError::UsernameTooShort { min: NAME_MIN });
        }
        if length > NAME_MAX {
            return Err(UserValidationError::UsernameTooLong { max: NAME_MAX });
        }
        if !username_regex().is_match(&username) {
            return Err(UserValidationError::UsernameInvalidCharacters);
        }
        Ok(Self(username))
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<Username> for String {
    fn from(value: Username) -> Self {
        value.0
    }
}

impl TryFrom<String> for Username {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Human readable display name for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DisplayName(String);

impl DisplayName {
    /// Validate and construct a [`DisplayName`].
    pub fn new(display_name: impl Into<String>) -> Result<Self, UserValidationError> {
        let display_name = display_name.into();
        if display_name.trim().is_empty() {
            return Err(UserValidationError::EmptyDisplayName);
        }
        let length = display_name.chars().count();
        if length < NAME_MIN {
            return Err(UserValidationError::DisplayNameTooShort { min: NAME_MIN });
        }
        if length > NAME_MAX {
            return Err(UserValidationError::DisplayNameTooLong { max: NAME_MAX });
        }
        if !display_name_regex().is_match(&display_name) {
            return Err(UserValidationError::DisplayNameInvalidCharacters);
        }
        Ok(Self(display_name))
    }
}

impl AsRef<str> for DisplayName {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<DisplayName> for String {
    fn from(value: DisplayName) -> Self {
        value.0
    }
}

impl TryFrom<String> for DisplayName {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Pi Network wallet address linked to the account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WalletAddress(String);

impl WalletAddress {
    /// Validate and construct a [`WalletAddress`].
    pub fn new(address: impl Into<String>) -> Result<Self, UserValidationError> {
        let address = address.into();
        let trimmed = address.trim();
        if trimmed.is_empty() {
            return Err(UserValidationError::EmptyWalletAddress);
        }
        if trimmed.chars().count() > WALLET_ADDRESS_MAX {
            return Err(UserValidationError::WalletAddressTooLong {
                max: WALLET_ADDRESS_MAX,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl AsRef<str> for WalletAddress {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl From<WalletAddress> for String {
    fn from(value: WalletAddress) -> Self {
        value.0
    }
}

impl TryFrom<String> for WalletAddress {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Account role controlling endpoint access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Reader: published articles, likes, subscriptions, donations.
    Public,
    /// Author: may create and submit articles.
    Journalist,
    /// Back office: review queues, user administration.
    Admin,
}

impl Role {
    /// Stable string form used for persistence.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Journalist => "journalist",
            Self::Admin => "admin",
        }
    }

    /// Parse the persisted string form.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "public" => Some(Self::Public),
            "journalist" => Some(Self::Journalist),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Whether this role may author articles.
    pub fn can_author(self) -> bool {
        matches!(self, Self::Journalist | Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameter object for creating a [`User`].
pub struct NewUser {
    /// Identifier for the new account.
    pub id: UserId,
    /// Unique login name.
    pub username: Username,
    /// Display name shown to other users.
    pub display_name: DisplayName,
    /// Initial role.
    pub role: Role,
    /// Argon2id PHC string for the account password.
    pub password_hash: String,
}

/// Application user account.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    id: UserId,
    username: Username,
    display_name: DisplayName,
    role: Role,
    disabled: bool,
    wallet_address: Option<WalletAddress>,
    subscription: Subscription,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl User {
    /// Build a new account with a free subscription and an enabled state.
    pub fn new(parts: NewUser, created_at: DateTime<Utc>) -> Self {
        let NewUser {
            id,
            username,
            display_name,
            role,
            password_hash,
        } = parts;
        Self {
            id,
            username,
            display_name,
            role,
            disabled: false,
            wallet_address: None,
            subscription: Subscription::free(),
            password_hash,
            created_at,
        }
    }

    /// Reassemble a user from persisted state.
    #[expect(clippy::too_many_arguments, reason = "persistence rehydration point")]
    pub fn from_parts(
        id: UserId,
        username: Username,
        display_name: DisplayName,
        role: Role,
        disabled: bool,
        wallet_address: Option<WalletAddress>,
        subscription: Subscription,
        password_hash: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            username,
            display_name,
            role,
            disabled,
            wallet_address,
            subscription,
            password_hash,
            created_at,
        }
    }

    /// Stable user identifier.
    pub fn id(&self) -> &UserId {
        &self.id
    }

    /// Unique login name.
    pub fn username(&self) -> &Username {
        &self.username
    }

    /// Display name shown to other users.
    pub fn display_name(&self) -> &DisplayName {
        &self.display_name
    }

    /// Current role.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Whether the account is blocked from authenticating.
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Linked wallet address, if any.
    pub fn wallet_address(&self) -> Option<&WalletAddress> {
        self.wallet_address.as_ref()
    }

    /// Current subscription state.
    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    /// Argon2id PHC string for the account password.
    pub fn password_hash(&self) -> &str {
        self.password_hash.as_str()
    }

    /// Account creation timestamp.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Block the account from authenticating.
    pub fn disable(&mut self) {
        self.disabled = true;
    }

    /// Re-enable a blocked account.
    pub fn enable(&mut self) {
        self.disabled = false;
    }

    /// Change the account role.
    pub fn set_role(&mut self, role: Role) {
        self.role = role;
    }

    /// Link or clear the wallet address.
    pub fn set_wallet_address(&mut self, address: Option<WalletAddress>) {
        self.wallet_address = address;
    }

    /// Replace the subscription state.
    pub fn set_subscription(&mut self, subscription: Subscription) {
        self.subscription = subscription;
    }
}
