//! Response DTOs shared across HTTP handlers.
//!
//! Entities keep their invariants private; these DTOs are the serialisation
//! contract. Password hashes never appear here.

use chrono::{DateTime, Utc};
use pagination::{PageRequest, PageRequestError};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::journalist::JournalistApplication;
use crate::domain::payment::{PaymentPurpose, PaymentRecord, PaymentState};
use crate::domain::subscription::Subscription;
use crate::domain::task::{Task, TaskStatus};
use crate::domain::user::Role;
use crate::domain::{Error, User};

/// Standard `page`/`limit` query parameters.
#[derive(Debug, Clone, Copy, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    /// 1-based page number; defaults to 1.
    pub page: Option<u32>,
    /// Page size; defaults to 20, capped at 100.
    pub limit: Option<u32>,
}

impl PageQuery {
    /// Validate into a [`PageRequest`].
    pub fn into_request(self) -> Result<PageRequest, Error> {
        PageRequest::from_params(self.page, self.limit).map_err(map_page_error)
    }
}

fn map_page_error(error: PageRequestError) -> Error {
    Error::invalid_request(error.to_string())
}

/// Public view of a user account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    /// Stable user identifier.
    pub id: String,
    /// Unique login name.
    pub username: String,
    /// Display name shown to other users.
    pub display_name: String,
    /// Account role.
    pub role: Role,
    /// Whether the account is blocked from authenticating.
    pub disabled: bool,
    /// Linked Pi wallet address, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
    /// Subscription state.
    pub subscription: Subscription,
    /// Account creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        Self {
            id: user.id().to_string(),
            username: user.username().to_string(),
            display_name: user.display_name().to_string(),
            role: user.role(),
            disabled: user.is_disabled(),
            wallet_address: user.wallet_address().map(|w| w.as_ref().to_owned()),
            subscription: user.subscription().clone(),
            created_at: user.created_at(),
        }
    }
}

/// Full article payload.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArticleDto {
    /// Stable article identifier.
    pub id: String,
    /// Authoring user id.
    pub author_id: String,
    /// Headline.
    pub title: String,
    /// Optional standfirst.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Full body text.
    pub body: String,
    /// Topic tags.
    pub tags: Vec<String>,
    /// Editorial status.
    pub status: crate::domain::article::ArticleStatus,
    /// Reviewer feedback; present only while rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    /// View counter.
    pub views: u64,
    /// Like counter.
    pub likes: u64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last content or status change.
    pub updated_at: DateTime<Utc>,
    /// Publication timestamp; present only once published.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
}

impl From<&crate::domain::article::Article> for ArticleDto {
    fn from(article: &crate::domain::article::Article) -> Self {
        Self {
            id: article.id().to_string(),
            author_id: article.author().to_string(),
            title: article.content().title.as_ref().to_owned(),
            summary: article.content().summary.clone(),
            body: article.content().body.clone(),
            tags: article.content().tags.as_slice().to_vec(),
            status: article.status(),
            rejection_reason: article
                .rejection_reason()
                .map(|reason| reason.as_ref().to_owned()),
            views: article.views(),
            likes: article.likes(),
            created_at: article.created_at(),
            updated_at: article.updated_at(),
            published_at: article.published_at(),
        }
    }
}

/// Journalist application payload.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationDto {
    /// Stable application identifier.
    pub id: String,
    /// Applying user id.
    pub applicant_id: String,
    /// Motivation statement.
    pub statement: String,
    /// Optional portfolio link.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portfolio_url: Option<String>,
    /// Review state.
    pub status: crate::domain::journalist::ApplicationStatus,
    /// Reviewing admin, once decided.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_by: Option<String>,
    /// Decision timestamp, once decided.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
    /// Submission timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<&JournalistApplication> for ApplicationDto {
    fn from(application: &JournalistApplication) -> Self {
        Self {
            id: application.id().to_string(),
            applicant_id: application.applicant().to_string(),
            statement: application.statement().as_ref().to_owned(),
            portfolio_url: application.portfolio_url().map(|url| url.to_string()),
            status: application.status(),
            decided_by: application.decided_by().map(ToString::to_string),
            decided_at: application.decided_at(),
            created_at: application.created_at(),
        }
    }
}

/// Payment record payload.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDto {
    /// Platform payment identifier.
    pub payment_id: String,
    /// Paid amount in Pi.
    pub amount: f64,
    /// Free-text memo from the platform, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    /// What the payment bought.
    pub purpose: PaymentPurpose,
    /// Local lifecycle state.
    pub state: PaymentState,
    /// Blockchain transaction id, once known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub txid: Option<String>,
    /// Verification timestamp.
    pub verified_at: DateTime<Utc>,
    /// Completion timestamp, once completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&PaymentRecord> for PaymentDto {
    fn from(record: &PaymentRecord) -> Self {
        Self {
            payment_id: record.payment_id().to_string(),
            amount: record.amount().as_pi(),
            memo: record.memo().map(str::to_owned),
            purpose: record.purpose().clone(),
            state: record.state(),
            txid: record.txid().map(|txid| txid.as_ref().to_owned()),
            verified_at: record.verified_at(),
            completed_at: record.completed_at(),
        }
    }
}

/// Task payload with the derived status.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskDto {
    /// Stable task identifier.
    pub id: String,
    /// Short description of the work.
    pub title: String,
    /// Optional free-form notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Optional due date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_at: Option<DateTime<Utc>>,
    /// Derived status: pending, completed, or overdue.
    pub status: TaskStatus,
    /// Completion timestamp, once completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl TaskDto {
    /// Build a DTO, deriving the reported status at `now`.
    pub fn from_task(task: &Task, now: DateTime<Utc>) -> Self {
        Self {
            id: task.id().to_string(),
            title: task.content().title.clone(),
            notes: task.content().notes.clone(),
            due_at: task.content().due_at,
            status: task.status_at(now),
            completed_at: task.completed_at(),
            created_at: task.created_at(),
            updated_at: task.updated_at(),
        }
    }
}
