//! Journalist applications: how readers become authors.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::user::UserId;

/// Maximum statement length in characters.
pub const STATEMENT_MAX: usize = 2000;

/// Validation errors for application components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplicationValidationError {
    /// The id was not a valid UUID.
    InvalidId,
    /// The statement was empty after trimming.
    EmptyStatement,
    /// The statement exceeded [`STATEMENT_MAX`].
    StatementTooLong {
        /// Maximum accepted length.
        max: usize,
    },
    /// The portfolio URL failed to parse.
    InvalidPortfolioUrl,
}

impl fmt::Display for ApplicationValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidId => write!(f, "application id must be a valid UUID"),
            Self::EmptyStatement => write!(f, "statement must not be empty"),
            Self::StatementTooLong { max } => {
                write!(f, "statement must be at most {max} characters")
            }
            Self::InvalidPortfolioUrl => write!(f, "portfolio URL must be a valid URL"),
        }
    }
}

impl std::error::Error for ApplicationValidationError {}

/// Decision attempted on an application that is no longer pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("application has already been decided ({status})")]
pub struct ApplicationDecisionError {
    /// The status the application was found in.
    pub status: ApplicationStatus,
}

/// Stable application identifier stored as a UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ApplicationId(Uuid);

impl ApplicationId {
    /// Validate and construct an [`ApplicationId`] from string input.
    pub fn new(id: impl AsRef<str>) -> Result<Self, ApplicationValidationError> {
        let parsed =
            Uuid::parse_str(id.as_ref()).map_err(|_| ApplicationValidationError::InvalidId)?;
        Ok(Self(parsed))
    }

    /// Generate a new random [`ApplicationId`].
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

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<ApplicationId> for String {
    fn from(value: ApplicationId) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for ApplicationId {
    type Error = ApplicationValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Review state of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    /// Waiting for an admin decision.
    Pending,
    /// Approved; the applicant was promoted to journalist.
    Approved,
    /// Declined.
    Rejected,
}

impl ApplicationStatus {
    /// Stable string form used for persistence.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parse the persisted string form.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated application statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement(String);

impl Statement {
    /// Validate and construct a [`Statement`].
    pub fn new(statement: impl Into<String>) -> Result<Self, ApplicationValidationError> {
        let statement = statement.into();
        let trimmed = statement.trim();
        if trimmed.is_empty() {
            return Err(ApplicationValidationError::EmptyStatement);
        }
        if trimmed.chars().count() > STATEMENT_MAX {
            return Err(ApplicationValidationError::StatementTooLong { max: STATEMENT_MAX });
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl AsRef<str> for Statement {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

/// Parse and validate an optional portfolio URL.
pub fn parse_portfolio_url(raw: Option<&str>) -> Result<Option<Url>, ApplicationValidationError> {
    match raw {
        Some(value) if !value.trim().is_empty() => Url::parse(value.trim())
            .map(Some)
            .map_err(|_| ApplicationValidationError::InvalidPortfolioUrl),
        _ => Ok(None),
    }
}

/// A reader's application to become a journalist.
#[derive(Debug, Clone, PartialEq)]
pub struct JournalistApplication {
    id: ApplicationId,
    applicant: UserId,
    statement: Statement,
    portfolio_url: Option<Url>,
    status: ApplicationStatus,
    decided_by: Option<UserId>,
    decided_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl JournalistApplication {
    /// Open a new pending application.
    pub fn open(
        id: ApplicationId,
        applicant: UserId,
        statement: Statement,
        portfolio_url: Option<Url>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            applicant,
            statement,
            portfolio_url,
            status: ApplicationStatus::Pending,
            decided_by: None,
            decided_at: None,
            created_at: now,
        }
    }

    /// Reassemble an application from persisted state.
    #[expect(clippy::too_many_arguments, reason = "persistence rehydration point")]
    pub fn from_parts(
        id: ApplicationId,
        applicant: UserId,
        statement: Statement,
        portfolio_url: Option<Url>,
        status: ApplicationStatus,
        decided_by: Option<UserId>,
        decided_at: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            applicant,
            statement,
            portfolio_url,
            status,
            decided_by,
            decided_at,
            created_at,
        }
    }

    /// Stable application identifier.
    pub fn id(&self) -> &ApplicationId {
        &self.id
    }

    /// Applying user.
    pub fn applicant(&self) -> &UserId {
        &self.applicant
    }

    /// Motivation statement.
    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    /// Optional portfolio link.
    pub fn portfolio_url(&self) -> Option<&Url> {
        self.portfolio_url.as_ref()
    }

    /// Review state.
    pub fn status(&self) -> ApplicationStatus {
        self.status
    }

    /// Reviewing admin, once decided.
    pub fn decided_by(&self) -> Option<&UserId> {
        self.decided_by.as_ref()
    }

    /// Decision timestamp, once decided.
    pub fn decided_at(&self) -> Option<DateTime<Utc>> {
        self.decided_at
    }

    /// Submission timestamp.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn decide(
        &mut self,
        status: ApplicationStatus,
        reviewer: UserId,
        now: DateTime<Utc>,
    ) -> Result<(), ApplicationDecisionError> {
        if self.status != ApplicationStatus::Pending {
            return Err(ApplicationDecisionError {
                status: self.status,
            });
        }
        self.status = status;
        self.decided_by = Some(reviewer);
        self.decided_at = Some(now);
        Ok(())
    }

    /// Approve the application. The caller promotes the applicant.
    pub fn approve(
        &mut self,
        reviewer: UserId,
        now: DateTime<Utc>,
    ) -> Result<(), ApplicationDecisionError> {
        self.decide(ApplicationStatus::Approved, reviewer, now)
    }

    /// Decline the application.
    pub fn reject(
        &mut self,
        reviewer: UserId,
        now: DateTime<Utc>,
    ) -> Result<(), ApplicationDecisionError> {
        self.decide(ApplicationStatus::Rejected, reviewer, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn application() -> JournalistApplication {
        JournalistApplication::open(
            ApplicationId::random(),
            UserId::random(),
            Statement::new("I cover Pi markets.").expect("valid statement"),
            None,
            Utc::now(),
        )
    }

    #[test]
    fn approval_records_the_reviewer() {
        let mut application = application();
        let reviewer = UserId::random();
        application
            .approve(reviewer, Utc::now())
            .expect("pending application approves");
        assert_eq!(application.status(), ApplicationStatus::Approved);
        assert_eq!(application.decided_by(), Some(&reviewer));
        assert!(application.decided_at().is_some());
    }

    #[test]
    fn decided_applications_cannot_be_decided_again() {
        let mut application = application();
        application
            .reject(UserId::random(), Utc::now())
            .expect("pending application rejects");

        let error = application
            .approve(UserId::random(), Utc::now())
            .expect_err("second decision must fail");
        assert_eq!(error.status, ApplicationStatus::Rejected);
    }

    #[test]
    fn statements_are_bounded() {
        let long = "x".repeat(STATEMENT_MAX + 1);
        assert_eq!(
            Statement::new(long).map(|_| ()),
            Err(ApplicationValidationError::StatementTooLong { max: STATEMENT_MAX })
        );
    }

    #[test]
    fn portfolio_urls_are_parsed_when_present() {
        assert!(parse_portfolio_url(None).expect("absent is fine").is_none());
        assert!(
            parse_portfolio_url(Some("   "))
                .expect("blank is treated as absent")
                .is_none()
        );
        let url = parse_portfolio_url(Some("https://example.org/clips"))
            .expect("valid url parses")
            .expect("url present");
        assert_eq!(url.as_str(), "https://example.org/clips");
        assert_eq!(
            parse_portfolio_url(Some("not a url")),
            Err(ApplicationValidationError::InvalidPortfolioUrl)
        );
    }
}
