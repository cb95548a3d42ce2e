//! PostgreSQL-backed `ArticleRepository` implementation using Diesel.
//!
//! Counter updates run as atomic SQL increments; like-once semantics rest on
//! the composite primary key of `article_likes`.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use pagination::PageRequest;

use crate::domain::article::{
    Article, ArticleContent, ArticleId, ArticleStatus, RejectionReason, Tags, Title,
};
use crate::domain::ports::{ArticlePersistenceError, ArticleRepository, LikeOutcome};
use crate::domain::user::UserId;

use super::error_mapping::{DbFailure, classify_diesel, classify_pool};
use super::models::{ArticleRow, ArticleUpdate, NewArticleLikeRow, NewArticleRow};
use super::pool::DbPool;
use super::schema::{article_likes, articles};

/// Diesel-backed implementation of the `ArticleRepository` port.
#[derive(Clone)]
pub struct DieselArticleRepository {
    pool: DbPool,
}

impl DieselArticleRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn conn(
        &self,
    ) -> Result<
        diesel_async::pooled_connection::bb8::PooledConnection<'_, diesel_async::AsyncPgConnection>,
        ArticlePersistenceError,
    > {
        self.pool
            .get()
            .await
            .map_err(|err| map_failure(classify_pool(err)))
    }
}

fn map_failure(failure: DbFailure) -> ArticlePersistenceError {
    match failure {
        DbFailure::Connection(message) => ArticlePersistenceError::connection(message),
        DbFailure::Query(message) | DbFailure::UniqueViolation(message) => {
            ArticlePersistenceError::query(message)
        }
    }
}

fn row_to_article(row: ArticleRow) -> Result<Article, ArticlePersistenceError> {
    let corrupted =
        |what: &str| ArticlePersistenceError::query(format!("corrupted {what} in database"));

    let title = Title::new(row.title).map_err(|_| corrupted("title"))?;
    let tags = Tags::new(row.tags).map_err(|_| corrupted("tags"))?;
    let status = ArticleStatus::parse(&row.status).ok_or_else(|| corrupted("status"))?;
    let rejection_reason = match row.rejection_reason {
        Some(raw) => Some(RejectionReason::new(raw).map_err(|_| corrupted("rejection reason"))?),
        None => None,
    };
    let content = ArticleContent {
        title,
        summary: row.summary,
        body: row.body,
        tags,
    };
    Ok(Article::from_parts(
        ArticleId::from_uuid(row.id),
        UserId::from_uuid(row.author_id),
        content,
        status,
        rejection_reason,
        row.views.unsigned_abs(),
        row.likes.unsigned_abs(),
        row.created_at,
        row.updated_at,
        row.published_at,
    ))
}

fn rows_to_articles(rows: Vec<ArticleRow>) -> Result<Vec<Article>, ArticlePersistenceError> {
    rows.into_iter().map(row_to_article).collect()
}

#[async_trait]
impl ArticleRepository for DieselArticleRepository {
    async fn insert(&self, article: &Article) -> Result<(), ArticlePersistenceError> {
        let mut conn = self.conn().await?;
        let content = article.content();
        let row = NewArticleRow {
            id: *article.id().as_uuid(),
            author_id: *article.author().as_uuid(),
            title: content.title.as_ref(),
            summary: content.summary.as_deref(),
            body: &content.body,
            tags: content.tags.as_slice(),
            status: article.status().as_str(),
            rejection_reason: article.rejection_reason().map(AsRef::as_ref),
            views: 0,
            likes: 0,
            created_at: article.created_at(),
            updated_at: article.updated_at(),
            published_at: article.published_at(),
        };
        diesel::insert_into(articles::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|err| map_failure(classify_diesel(err)))
    }

    async fn update(&self, article: &Article) -> Result<(), ArticlePersistenceError> {
        let mut conn = self.conn().await?;
        let content = article.content();
        let changes = ArticleUpdate {
            title: content.title.as_ref(),
            summary: Some(content.summary.as_deref()),
            body: &content.body,
            tags: content.tags.as_slice(),
            status: article.status().as_str(),
            rejection_reason: Some(article.rejection_reason().map(AsRef::as_ref)),
            updated_at: article.updated_at(),
            published_at: Some(article.published_at()),
        };
        diesel::update(articles::table.find(article.id().as_uuid()))
            .set(&changes)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|err| map_failure(classify_diesel(err)))
    }

    async fn find_by_id(
        &self,
        id: &ArticleId,
    ) -> Result<Option<Article>, ArticlePersistenceError> {
        let mut conn = self.conn().await?;
        let row: Option<ArticleRow> = articles::table
            .find(id.as_uuid())
            .select(ArticleRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|err| map_failure(classify_diesel(err)))?;
        row.map(row_to_article).transpose()
    }

    async fn delete(&self, id: &ArticleId) -> Result<(), ArticlePersistenceError> {
        let mut conn = self.conn().await?;
        diesel::delete(article_likes::table.filter(article_likes::article_id.eq(id.as_uuid())))
            .execute(&mut conn)
            .await
            .map_err(|err| map_failure(classify_diesel(err)))?;
        diesel::delete(articles::table.find(id.as_uuid()))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|err| map_failure(classify_diesel(err)))
    }

    async fn list_published(
        &self,
        page: PageRequest,
    ) -> Result<(Vec<Article>, u64), ArticlePersistenceError> {
        let mut conn = self.conn().await?;
        let base = articles::table.filter(articles::status.eq(ArticleStatus::Published.as_str()));

        let total: i64 = base.clone()
            .count()
            .get_result(&mut conn)
            .await
            .map_err(|err| map_failure(classify_diesel(err)))?;

        let rows: Vec<ArticleRow> = base
            .order(articles::published_at.desc())
            .offset(page.offset())
            .limit(i64::from(page.limit()))
            .select(ArticleRow::as_select())
            .load(&mut conn)
            .await
            .map_err(|err| map_failure(classify_diesel(err)))?;

        Ok((rows_to_articles(rows)?, total.unsigned_abs()))
    }

    async fn list_by_author(
        &self,
        author: &UserId,
        page: PageRequest,
    ) -> Result<(Vec<Article>, u64), ArticlePersistenceError> {
        let mut conn = self.conn().await?;
        let base = articles::table.filter(articles::author_id.eq(author.as_uuid()));

        let total: i64 = base.clone()
            .count()
            .get_result(&mut conn)
            .await
            .map_err(|err| map_failure(classify_diesel(err)))?;

        let rows: Vec<ArticleRow> = base
            .order(articles::updated_at.desc())
            .offset(page.offset())
            .limit(i64::from(page.limit()))
            .select(ArticleRow::as_select())
            .load(&mut conn)
            .await
            .map_err(|err| map_failure(classify_diesel(err)))?;

        Ok((rows_to_articles(rows)?, total.unsigned_abs()))
    }

    async fn list_by_status(
        &self,
        status: ArticleStatus,
        page: PageRequest,
    ) -> Result<(Vec<Article>, u64), ArticlePersistenceError> {
        let mut conn = self.conn().await?;
        let base = articles::table.filter(articles::status.eq(status.as_str()));

        let total: i64 = base.clone()
            .count()
            .get_result(&mut conn)
            .await
            .map_err(|err| map_failure(classify_diesel(err)))?;

        let rows: Vec<ArticleRow> = base
            .order(articles::updated_at.asc())
            .offset(page.offset())
            .limit(i64::from(page.limit()))
            .select(ArticleRow::as_select())
            .load(&mut conn)
            .await
            .map_err(|err| map_failure(classify_diesel(err)))?;

        Ok((rows_to_articles(rows)?, total.unsigned_abs()))
    }

    async fn increment_views(&self, id: &ArticleId) -> Result<(), ArticlePersistenceError> {
        let mut conn = self.conn().await?;
        diesel::update(articles::table.find(id.as_uuid()))
            .set(articles::views.eq(articles::views + 1_i64))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|err| map_failure(classify_diesel(err)))
    }

    async fn like(
        &self,
        id: &ArticleId,
        user: &UserId,
    ) -> Result<LikeOutcome, ArticlePersistenceError> {
        let mut conn = self.conn().await?;
        let row = NewArticleLikeRow {
            article_id: *id.as_uuid(),
            user_id: *user.as_uuid(),
            created_at: Utc::now(),
        };
        match diesel::insert_into(article_likes::table)
            .values(&row)
            .execute(&mut conn)
            .await
        {
            Ok(_) => {}
            Err(err) => {
                return match classify_diesel(err) {
                    DbFailure::UniqueViolation(_) => Ok(LikeOutcome::AlreadyLiked),
                    other => Err(map_failure(other)),
                };
            }
        }
        diesel::update(articles::table.find(id.as_uuid()))
            .set(articles::likes.eq(articles::likes + 1_i64))
            .execute(&mut conn)
            .await
            .map_err(|err| map_failure(classify_diesel(err)))?;
        Ok(LikeOutcome::Liked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str) -> ArticleRow {
        ArticleRow {
            id: uuid::Uuid::new_v4(),
            author_id: uuid::Uuid::new_v4(),
            title: "Title".to_owned(),
            summary: None,
            body: "Body".to_owned(),
            tags: vec!["pi".to_owned()],
            status: status.to_owned(),
            rejection_reason: None,
            views: 3,
            likes: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            published_at: None,
        }
    }

    #[test]
    fn valid_rows_rehydrate_with_counters() {
        let article = row_to_article(row("draft")).expect("row rehydrates");
        assert_eq!(article.status(), ArticleStatus::Draft);
        assert_eq!(article.views(), 3);
        assert_eq!(article.likes(), 1);
    }

    #[test]
    fn unknown_statuses_fail_rehydration() {
        let error = row_to_article(row("archived")).expect_err("bad status must fail");
        assert!(error.to_string().contains("corrupted status"));
    }
}
