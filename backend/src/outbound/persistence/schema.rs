//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match the migrations under `migrations/` exactly;
//! regenerate with `diesel print-schema` after schema changes.

diesel::table! {
    /// User accounts.
    users (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// Unique login name.
        username -> Varchar,
        /// Display name shown to other users.
        display_name -> Varchar,
        /// Role: public, journalist, or admin.
        role -> Varchar,
        /// Whether the account is blocked from authenticating.
        disabled -> Bool,
        /// Linked Pi wallet address.
        wallet_address -> Nullable<Varchar>,
        /// Subscription tier: free, basic, or premium.
        subscription_plan -> Varchar,
        /// Subscription state: active, expired, or cancelled.
        subscription_status -> Varchar,
        /// End of the paid period.
        subscription_expires_at -> Nullable<Timestamptz>,
        /// Argon2id PHC string.
        password_hash -> Text,
        /// Record creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Articles in every editorial status.
    articles (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// Authoring user.
        author_id -> Uuid,
        /// Headline.
        title -> Varchar,
        /// Optional standfirst.
        summary -> Nullable<Text>,
        /// Full body text.
        body -> Text,
        /// Topic tags.
        tags -> Array<Text>,
        /// Status: draft, pending, published, or rejected.
        status -> Varchar,
        /// Reviewer feedback; set only while rejected.
        rejection_reason -> Nullable<Text>,
        /// View counter.
        views -> Int8,
        /// Like counter.
        likes -> Int8,
        /// Record creation timestamp.
        created_at -> Timestamptz,
        /// Last content or status change.
        updated_at -> Timestamptz,
        /// Publication timestamp; set only once published.
        published_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// One row per (article, user) like; the composite key enforces
    /// like-once semantics even under concurrent requests.
    article_likes (article_id, user_id) {
        /// Liked article.
        article_id -> Uuid,
        /// Liking user.
        user_id -> Uuid,
        /// Like timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Journalist applications.
    journalist_applications (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// Applying user.
        applicant_id -> Uuid,
        /// Motivation statement.
        statement -> Text,
        /// Optional portfolio link.
        portfolio_url -> Nullable<Text>,
        /// Status: pending, approved, or rejected.
        status -> Varchar,
        /// Reviewing admin.
        decided_by -> Nullable<Uuid>,
        /// Decision timestamp.
        decided_at -> Nullable<Timestamptz>,
        /// Submission timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Verified and completed Pi payments.
    payments (payment_id) {
        /// Primary key: the platform payment identifier.
        payment_id -> Varchar,
        /// Paying user.
        payer_id -> Uuid,
        /// Amount in micro-Pi.
        amount_micropi -> Int8,
        /// Free-text memo from the platform.
        memo -> Nullable<Text>,
        /// Purpose discriminant: subscription or donation.
        purpose_kind -> Varchar,
        /// Purchased tier for subscription payments.
        purpose_plan -> Nullable<Varchar>,
        /// Target article for earmarked donations.
        purpose_article_id -> Nullable<Uuid>,
        /// Local state: verified or completed.
        state -> Varchar,
        /// Fingerprint of the upstream payload at verification.
        payload_fingerprint -> Varchar,
        /// Blockchain transaction id.
        txid -> Nullable<Varchar>,
        /// Verification timestamp.
        verified_at -> Timestamptz,
        /// Completion timestamp.
        completed_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Donations derived from verified donation payments.
    donations (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// Donating user.
        donor_id -> Uuid,
        /// Amount in micro-Pi.
        amount_micropi -> Int8,
        /// Target article, if earmarked.
        article_id -> Nullable<Uuid>,
        /// Originating payment.
        payment_id -> Varchar,
        /// Recording timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Per-user tasks.
    tasks (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// Owning user.
        owner_id -> Uuid,
        /// Short description of the work.
        title -> Varchar,
        /// Optional free-form notes.
        notes -> Nullable<Text>,
        /// Optional due date.
        due_at -> Nullable<Timestamptz>,
        /// Persisted state: pending or completed.
        state -> Varchar,
        /// Completion timestamp.
        completed_at -> Nullable<Timestamptz>,
        /// Record creation timestamp.
        created_at -> Timestamptz,
        /// Last modification timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    users,
    articles,
    article_likes,
    journalist_applications,
    payments,
    donations,
    tasks,
);
