//! Article aggregate and its editorial lifecycle.
//!
//! ```text
//! draft --submit--> pending --approve--> published
//!                       \----reject----> rejected --revise--> draft
//! ```
//!
//! Published articles are immutable apart from the view/like counters.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::user::UserId;

/// Maximum title length in characters.
pub const TITLE_MAX: usize = 200;
/// Maximum summary length in characters.
pub const SUMMARY_MAX: usize = 500;
/// Maximum number of tags per article.
pub const TAGS_MAX: usize = 8;
/// Maximum tag length in characters.
pub const TAG_MAX: usize = 32;
/// Maximum rejection reason length in characters.
pub const REJECTION_REASON_MAX: usize = 500;

/// Validation errors for article components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArticleValidationError {
    /// The id was not a valid UUID.
    InvalidId,
    /// The title was empty after trimming.
    EmptyTitle,
    /// The title exceeded [`TITLE_MAX`].
    TitleTooLong {
        /// Maximum accepted length.
        max: usize,
    },
    /// The summary exceeded [`SUMMARY_MAX`].
    SummaryTooLong {
        /// Maximum accepted length.
        max: usize,
    },
    /// The body was empty after trimming.
    EmptyBody,
    /// More than [`TAGS_MAX`] tags were supplied.
    TooManyTags {
        /// Maximum accepted count.
        max: usize,
    },
    /// A tag was empty after trimming.
    EmptyTag,
    /// A tag exceeded [`TAG_MAX`].
    TagTooLong {
        /// Maximum accepted length.
        max: usize,
    },
    /// The rejection reason was empty after trimming.
    EmptyRejectionReason,
    /// The rejection reason exceeded [`REJECTION_REASON_MAX`].
    RejectionReasonTooLong {
        /// Maximum accepted length.
        max: usize,
    },
}

impl fmt::Display for ArticleValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidId => write!(f, "article id must be a valid UUID"),
            Self::EmptyTitle => write!(f, "title must not be empty"),
            Self::TitleTooLong { max } => write!(f, "title must be at most {max} characters"),
            Self::SummaryTooLong { max } => {
                write!(f, "summary must be at most {max} characters")
            }
            Self::EmptyBody => write!(f, "body must not be empty"),
            Self::TooManyTags { max } => write!(f, "at most {max} tags are allowed"),
            Self::EmptyTag => write!(f, "tags must not be empty"),
            Self::TagTooLong { max } => write!(f, "tags must be at most {max} characters"),
            Self::EmptyRejectionReason => write!(f, "rejection reason must not be empty"),
            Self::RejectionReasonTooLong { max } => {
                write!(f, "rejection reason must be at most {max} characters")
            }
        }
    }
}

impl std::error::Error for ArticleValidationError {}

/// Invalid lifecycle transition attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("article cannot move from {from} to {to}")]
pub struct ArticleTransitionError {
    /// Status the article was in.
    pub from: ArticleStatus,
    /// Status the operation tried to reach.
    pub to: ArticleStatus,
}

/// Stable article identifier stored as a UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArticleId(Uuid);

impl ArticleId {
    /// Validate and construct an [`ArticleId`] from string input.
    pub fn new(id: impl AsRef<str>) -> Result<Self, ArticleValidationError> {
        let parsed =
            Uuid::parse_str(id.as_ref()).map_err(|_| ArticleValidationError::InvalidId)?;
        Ok(Self(parsed))
    }

    /// Generate a new random [`ArticleId`].
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

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<ArticleId> for String {
    fn from(value: ArticleId) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for ArticleId {
    type Error = ArticleValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Editorial status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    /// Being written; visible only to the author.
    Draft,
    /// Submitted and waiting for review.
    Pending,
    /// Publicly visible.
    Published,
    /// Sent back with a reason.
    Rejected,
}

impl ArticleStatus {
    /// Stable string form used for persistence.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Published => "published",
            Self::Rejected => "rejected",
        }
    }

    /// Parse the persisted string form.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "draft" => Some(Self::Draft),
            "pending" => Some(Self::Pending),
            "published" => Some(Self::Published),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Whether the article content may still be edited by its author.
    pub fn is_editable(self) -> bool {
        matches!(self, Self::Draft | Self::Rejected)
    }
}

impl fmt::Display for ArticleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated article title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Title(String);

impl Title {
    /// Validate and construct a [`Title`].
    pub fn new(title: impl Into<String>) -> Result<Self, ArticleValidationError> {
        let title = title.into();
        let trimmed = title.trim();
        if trimmed.is_empty() {
            return Err(ArticleValidationError::EmptyTitle);
        }
        if trimmed.chars().count() > TITLE_MAX {
            return Err(ArticleValidationError::TitleTooLong { max: TITLE_MAX });
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl AsRef<str> for Title {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl From<Title> for String {
    fn from(value: Title) -> Self {
        value.0
    }
}

impl TryFrom<String> for Title {
    type Error = ArticleValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Validated, lowercased tag list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Tags(Vec<String>);

impl Tags {
    /// Validate a raw tag list: at most [`TAGS_MAX`] entries, each trimmed,
    /// lowercased, non-empty, at most [`TAG_MAX`] characters. Duplicates are
    /// collapsed while preserving first-seen order.
    pub fn new(raw: Vec<String>) -> Result<Self, ArticleValidationError> {
        if raw.len() > TAGS_MAX {
            return Err(ArticleValidationError::TooManyTags { max: TAGS_MAX });
        }
        let mut tags: Vec<String> = Vec::with_capacity(raw.len());
        for tag in raw {
            let tag = tag.trim().to_lowercase();
            if tag.is_empty() {
                return Err(ArticleValidationError::EmptyTag);
            }
            if tag.chars().count() > TAG_MAX {
                return Err(ArticleValidationError::TagTooLong { max: TAG_MAX });
            }
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        Ok(Self(tags))
    }

    /// Tags in first-seen order.
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl From<Tags> for Vec<String> {
    fn from(value: Tags) -> Self {
        value.0
    }
}

impl TryFrom<Vec<String>> for Tags {
    type Error = ArticleValidationError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Editable content fields, validated as a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleContent {
    /// Headline.
    pub title: Title,
    /// Optional standfirst shown in listings.
    pub summary: Option<String>,
    /// Full body text.
    pub body: String,
    /// Topic tags.
    pub tags: Tags,
}

impl ArticleContent {
    /// Validate raw content fields.
    pub fn new(
        title: impl Into<String>,
        summary: Option<String>,
        body: impl Into<String>,
        tags: Vec<String>,
    ) -> Result<Self, ArticleValidationError> {
        let title = Title::new(title)?;
        let summary = match summary {
            Some(raw) => {
                let trimmed = raw.trim().to_owned();
                if trimmed.chars().count() > SUMMARY_MAX {
                    return Err(ArticleValidationError::SummaryTooLong { max: SUMMARY_MAX });
                }
                (!trimmed.is_empty()).then_some(trimmed)
            }
            None => None,
        };
        let body = body.into();
        if body.trim().is_empty() {
            return Err(ArticleValidationError::EmptyBody);
        }
        let tags = Tags::new(tags)?;
        Ok(Self {
            title,
            summary,
            body,
            tags,
        })
    }
}

/// Validated rejection reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectionReason(String);

impl RejectionReason {
    /// Validate and construct a [`RejectionReason`].
    pub fn new(reason: impl Into<String>) -> Result<Self, ArticleValidationError> {
        let reason = reason.into();
        let trimmed = reason.trim();
        if trimmed.is_empty() {
            return Err(ArticleValidationError::EmptyRejectionReason);
        }
        if trimmed.chars().count() > REJECTION_REASON_MAX {
            return Err(ArticleValidationError::RejectionReasonTooLong {
                max: REJECTION_REASON_MAX,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl AsRef<str> for RejectionReason {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

/// Article aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    id: ArticleId,
    author: UserId,
    content: ArticleContent,
    status: ArticleStatus,
    rejection_reason: Option<RejectionReason>,
    views: u64,
    likes: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    published_at: Option<DateTime<Utc>>,
}

impl Article {
    /// Create a fresh draft.
    pub fn draft(
        id: ArticleId,
        author: UserId,
        content: ArticleContent,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            author,
            content,
            status: ArticleStatus::Draft,
            rejection_reason: None,
            views: 0,
            likes: 0,
            created_at: now,
            updated_at: now,
            published_at: None,
        }
    }

    /// Reassemble an article from persisted state.
    #[expect(clippy::too_many_arguments, reason = "persistence rehydration point")]
    pub fn from_parts(
        id: ArticleId,
        author: UserId,
        content: ArticleContent,
        status: ArticleStatus,
        rejection_reason: Option<RejectionReason>,
        views: u64,
        likes: u64,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        published_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            author,
            content,
            status,
            rejection_reason,
            views,
            likes,
            created_at,
            updated_at,
            published_at,
        }
    }

    /// Stable article identifier.
    pub fn id(&self) -> &ArticleId {
        &self.id
    }

    /// Authoring user.
    pub fn author(&self) -> &UserId {
        &self.author
    }

    /// Content fields.
    pub fn content(&self) -> &ArticleContent {
        &self.content
    }

    /// Editorial status.
    pub fn status(&self) -> ArticleStatus {
        self.status
    }

    /// Reviewer feedback; present only while rejected.
    pub fn rejection_reason(&self) -> Option<&RejectionReason> {
        self.rejection_reason.as_ref()
    }

    /// View counter.
    pub fn views(&self) -> u64 {
        self.views
    }

    /// Like counter.
    pub fn likes(&self) -> u64 {
        self.likes
    }

    /// Creation timestamp.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Last content or status change.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Publication timestamp; present only once published.
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }

    fn transition_error(&self, to: ArticleStatus) -> ArticleTransitionError {
        ArticleTransitionError {
            from: self.status,
            to,
        }
    }

    /// Replace the content of a draft or rejected article.
    pub fn edit(
        &mut self,
        content: ArticleContent,
        now: DateTime<Utc>,
    ) -> Result<(), ArticleTransitionError> {
        if !self.status.is_editable() {
            return Err(self.transition_error(self.status));
        }
        self.content = content;
        self.updated_at = now;
        Ok(())
    }

    /// Submit a draft for review.
    pub fn submit(&mut self, now: DateTime<Utc>) -> Result<(), ArticleTransitionError> {
        if self.status != ArticleStatus::Draft {
            return Err(self.transition_error(ArticleStatus::Pending));
        }
        self.status = ArticleStatus::Pending;
        self.updated_at = now;
        Ok(())
    }

    /// Approve a pending article, publishing it.
    pub fn approve(&mut self, now: DateTime<Utc>) -> Result<(), ArticleTransitionError> {
        if self.status != ArticleStatus::Pending {
            return Err(self.transition_error(ArticleStatus::Published));
        }
        self.status = ArticleStatus::Published;
        self.rejection_reason = None;
        self.published_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Reject a pending article with reviewer feedback.
    pub fn reject(
        &mut self,
        reason: RejectionReason,
        now: DateTime<Utc>,
    ) -> Result<(), ArticleTransitionError> {
        if self.status != ArticleStatus::Pending {
            return Err(self.transition_error(ArticleStatus::Rejected));
        }
        self.status = ArticleStatus::Rejected;
        self.rejection_reason = Some(reason);
        self.updated_at = now;
        Ok(())
    }

    /// Move a rejected article back to draft for another pass.
    pub fn revise(&mut self, now: DateTime<Utc>) -> Result<(), ArticleTransitionError> {
        if self.status != ArticleStatus::Rejected {
            return Err(self.transition_error(ArticleStatus::Draft));
        }
        self.status = ArticleStatus::Draft;
        self.rejection_reason = None;
        self.updated_at = now;
        Ok(())
    }

    /// Record one more public view.
    pub fn record_view(&mut self) {
        self.views = self.views.saturating_add(1);
    }

    /// Record one more like.
    pub fn record_like(&mut self) {
        self.likes = self.likes.saturating_add(1);
    }
}
