//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and never
//! reach the domain; each adapter converts rows into validated aggregates.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use super::schema::{
    article_likes, articles, donations, journalist_applications, payments, tasks, users,
};

/// Row struct for reading from the users table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
    pub role: String,
    pub disabled: bool,
    pub wallet_address: Option<String>,
    pub subscription_plan: String,
    pub subscription_status: String,
    pub subscription_expires_at: Option<DateTime<Utc>>,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Insertable struct for creating new user records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub id: Uuid,
    pub username: &'a str,
    pub display_name: &'a str,
    pub role: &'a str,
    pub disabled: bool,
    pub wallet_address: Option<&'a str>,
    pub subscription_plan: &'a str,
    pub subscription_status: &'a str,
    pub subscription_expires_at: Option<DateTime<Utc>>,
    pub password_hash: &'a str,
    pub created_at: DateTime<Utc>,
}

/// Changeset struct for updating existing user records.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = users)]
pub(crate) struct UserUpdate<'a> {
    pub display_name: &'a str,
    pub role: &'a str,
    pub disabled: bool,
    pub wallet_address: Option<Option<&'a str>>,
    pub subscription_plan: &'a str,
    pub subscription_status: &'a str,
    pub subscription_expires_at: Option<Option<DateTime<Utc>>>,
}

/// Row struct for reading from the articles table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = articles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ArticleRow {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub summary: Option<String>,
    pub body: String,
    pub tags: Vec<String>,
    pub status: String,
    pub rejection_reason: Option<String>,
    pub views: i64,
    pub likes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

/// Insertable struct for creating new article records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = articles)]
pub(crate) struct NewArticleRow<'a> {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: &'a str,
    pub summary: Option<&'a str>,
    pub body: &'a str,
    pub tags: &'a [String],
    pub status: &'a str,
    pub rejection_reason: Option<&'a str>,
    pub views: i64,
    pub likes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

/// Changeset struct for updating existing article records.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = articles)]
pub(crate) struct ArticleUpdate<'a> {
    pub title: &'a str,
    pub summary: Option<Option<&'a str>>,
    pub body: &'a str,
    pub tags: &'a [String],
    pub status: &'a str,
    pub rejection_reason: Option<Option<&'a str>>,
    pub updated_at: DateTime<Utc>,
    pub published_at: Option<Option<DateTime<Utc>>>,
}

/// Insertable struct for like rows.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = article_likes)]
pub(crate) struct NewArticleLikeRow {
    pub article_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Row struct for reading from the journalist applications table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = journalist_applications)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ApplicationRow {
    pub id: Uuid,
    pub applicant_id: Uuid,
    pub statement: String,
    pub portfolio_url: Option<String>,
    pub status: String,
    pub decided_by: Option<Uuid>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Insertable struct for creating new application records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = journalist_applications)]
pub(crate) struct NewApplicationRow<'a> {
    pub id: Uuid,
    pub applicant_id: Uuid,
    pub statement: &'a str,
    pub portfolio_url: Option<&'a str>,
    pub status: &'a str,
    pub decided_by: Option<Uuid>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Changeset struct for application decisions.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = journalist_applications)]
pub(crate) struct ApplicationUpdate<'a> {
    pub status: &'a str,
    pub decided_by: Option<Uuid>,
    pub decided_at: Option<DateTime<Utc>>,
}

/// Row struct for reading from the payments table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = payments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct PaymentRow {
    pub payment_id: String,
    pub payer_id: Uuid,
    pub amount_micropi: i64,
    pub memo: Option<String>,
    pub purpose_kind: String,
    pub purpose_plan: Option<String>,
    pub purpose_article_id: Option<Uuid>,
    pub state: String,
    pub payload_fingerprint: String,
    pub txid: Option<String>,
    pub verified_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Insertable struct for creating new payment records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = payments)]
pub(crate) struct NewPaymentRow<'a> {
    pub payment_id: &'a str,
    pub payer_id: Uuid,
    pub amount_micropi: i64,
    pub memo: Option<&'a str>,
    pub purpose_kind: &'a str,
    pub purpose_plan: Option<&'a str>,
    pub purpose_article_id: Option<Uuid>,
    pub state: &'a str,
    pub payload_fingerprint: &'a str,
    pub txid: Option<&'a str>,
    pub verified_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Changeset struct for payment completion.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = payments)]
pub(crate) struct PaymentUpdate<'a> {
    pub state: &'a str,
    pub txid: Option<&'a str>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Insertable struct for donation records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = donations)]
pub(crate) struct NewDonationRow<'a> {
    pub id: Uuid,
    pub donor_id: Uuid,
    pub amount_micropi: i64,
    pub article_id: Option<Uuid>,
    pub payment_id: &'a str,
    pub created_at: DateTime<Utc>,
}

/// Row struct for reading from the tasks table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct TaskRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub notes: Option<String>,
    pub due_at: Option<DateTime<Utc>>,
    pub state: String,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insertable struct for creating new task records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = tasks)]
pub(crate) struct NewTaskRow<'a> {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: &'a str,
    pub notes: Option<&'a str>,
    pub due_at: Option<DateTime<Utc>>,
    pub state: &'a str,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Changeset struct for updating existing task records.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = tasks)]
pub(crate) struct TaskUpdateRow<'a> {
    pub title: &'a str,
    pub notes: Option<Option<&'a str>>,
    pub due_at: Option<Option<DateTime<Utc>>>,
    pub state: &'a str,
    pub completed_at: Option<Option<DateTime<Utc>>>,
    pub updated_at: DateTime<Utc>,
}
